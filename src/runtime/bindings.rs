//! Binding resolver
//!
//! Turns one declared [`Binding`] into a concrete, frame- and
//! multiplex-scoped view. Resolution is a pure lookup: it never creates or
//! destroys resources, and applying the result touches nothing but the
//! targeted shader-state slot.

use crate::driver::types::{BlobView, BufferViewHandle, ScalarValue, TextureViewHandle};
use crate::driver::Driver;
use crate::driver::ShaderVarId;
use crate::graph::multiplexing::{self, MultiplexingIndex};
use crate::graph::{Binding, Resource, ResourceIndex, ResourceSource};
use crate::runtime::scheduler::{GatheredResources, PhysicalResource, ResourceScheduler};
use crate::{ExecutionError, ExecutionResult};

/// A binding resolved to something the driver can consume directly
#[derive(Debug, Clone)]
pub enum ResolvedBinding {
    Texture(TextureViewHandle),
    Buffer(BufferViewHandle),
    Blob(BlobView),
    Scalar(ScalarValue),
}

/// Stateless resolution service over the frame's resource tables.
///
/// Externally gathered instances win over scheduler-owned ones; a resource
/// the graph marked external is never looked up in the scheduler.
pub(crate) struct BindingResolver<'a> {
    pub resources: &'a [Resource],
    pub gathered: &'a GatheredResources,
    pub scheduler: &'a dyn ResourceScheduler,
}

impl BindingResolver<'_> {
    /// An index outside the resource table can never resolve; it is the
    /// same defect as a missing instance.
    fn resource(
        &self,
        index: ResourceIndex,
        frame: usize,
        logical: MultiplexingIndex,
    ) -> ExecutionResult<&Resource> {
        self.resources
            .get(index.index())
            .ok_or(ExecutionError::UnresolvedResource {
                resource: index,
                frame,
                multiplexing: logical,
            })
    }

    pub fn lookup(
        &self,
        index: ResourceIndex,
        frame: usize,
        logical: MultiplexingIndex,
    ) -> ExecutionResult<PhysicalResource> {
        let resource = self.resource(index, frame, logical)?;
        let physical = multiplexing::physical_index(logical, resource.multiplexing);

        let instance = match &resource.source {
            ResourceSource::External { .. } => self.gathered.get(index, physical).cloned(),
            ResourceSource::Scheduled => {
                if resource.kind.is_texture() {
                    self.scheduler
                        .texture(index, frame, physical)
                        .map(PhysicalResource::Texture)
                } else if resource.kind == crate::graph::usage::ResourceKind::Buffer {
                    self.scheduler
                        .buffer(index, frame, physical)
                        .map(PhysicalResource::Buffer)
                } else {
                    self.scheduler.blob(index, frame, physical).map(PhysicalResource::Blob)
                }
            }
        };

        instance.ok_or(ExecutionError::UnresolvedResource {
            resource: index,
            frame,
            multiplexing: physical,
        })
    }

    /// Resolve one binding for the given frame slots and logical index.
    pub fn resolve(
        &self,
        binding: &Binding,
        prev_frame: usize,
        curr_frame: usize,
        logical: MultiplexingIndex,
    ) -> ExecutionResult<ResolvedBinding> {
        match binding {
            Binding::Texture { resource, history } => {
                let frame = if *history { prev_frame } else { curr_frame };
                match self.lookup(*resource, frame, logical)? {
                    PhysicalResource::Texture(view) => Ok(ResolvedBinding::Texture(view)),
                    other => Err(self.kind_mismatch(*resource, frame, logical, &other)),
                }
            }
            Binding::Buffer { resource } => match self.lookup(*resource, curr_frame, logical)? {
                PhysicalResource::Buffer(view) => Ok(ResolvedBinding::Buffer(view)),
                other => Err(self.kind_mismatch(*resource, curr_frame, logical, &other)),
            },
            Binding::Blob { resource } => match self.lookup(*resource, curr_frame, logical)? {
                PhysicalResource::Blob(blob) => Ok(ResolvedBinding::Blob(blob)),
                other => Err(self.kind_mismatch(*resource, curr_frame, logical, &other)),
            },
            Binding::Scalar(value) => Ok(ResolvedBinding::Scalar(*value)),
        }
    }

    /// An instance exists but has the wrong shape for the binding. Treated
    /// the same as a missing instance: a defect in the compiled graph.
    fn kind_mismatch(
        &self,
        resource: ResourceIndex,
        frame: usize,
        logical: MultiplexingIndex,
        instance: &PhysicalResource,
    ) -> ExecutionError {
        let found = match instance {
            PhysicalResource::Texture(_) => "texture",
            PhysicalResource::Buffer(_) => "buffer",
            PhysicalResource::Blob(_) => "blob",
        };
        let multiplexing = match self.resources.get(resource.index()) {
            Some(entry) => {
                log::warn!(
                    "resource '{}' resolved to a {found} where the binding expects a different kind",
                    entry.name,
                );
                multiplexing::physical_index(logical, entry.multiplexing)
            }
            None => logical,
        };
        ExecutionError::UnresolvedResource {
            resource,
            frame,
            multiplexing,
        }
    }
}

/// Apply a resolved binding to the driver's shader-state store.
pub(crate) fn apply(driver: &mut dyn Driver, var: ShaderVarId, resolved: &ResolvedBinding) {
    match resolved {
        ResolvedBinding::Texture(view) => driver.set_texture(var, *view),
        ResolvedBinding::Buffer(view) => driver.set_buffer(var, *view),
        ResolvedBinding::Blob(blob) => driver.set_blob(var, blob),
        ResolvedBinding::Scalar(value) => driver.set_scalar(var, *value),
    }
}
