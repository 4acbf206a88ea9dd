//! Interfaces towards the resource scheduler and the externally-provided
//! resources registry
//!
//! The scheduler is the sole owner of physical resource lifetime. This
//! crate only consumes its precomputed per-frame event stream and looks up
//! live instances; it never creates or destroys anything.

use crate::driver::types::{
    ActivationAction, Barrier, BlobView, BufferViewHandle, TextureViewHandle,
};
use crate::graph::multiplexing::MultiplexingIndex;
use crate::graph::ResourceIndex;
use std::collections::HashMap;

/// One precomputed scheduler event, replayed every frame.
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerEvent {
    /// Synchronize two consecutive usages of a resource instance.
    Barrier {
        resource: ResourceIndex,
        multiplexing: MultiplexingIndex,
        barrier: Barrier,
    },
    /// First-use-of-the-frame action derived from the resource's history.
    Activate {
        resource: ResourceIndex,
        multiplexing: MultiplexingIndex,
        action: ActivationAction,
    },
    /// The instance's backing memory must be live from here on.
    BeginLifetime {
        resource: ResourceIndex,
        multiplexing: MultiplexingIndex,
    },
    /// The instance's backing memory may be aliased after this point.
    EndLifetime {
        resource: ResourceIndex,
        multiplexing: MultiplexingIndex,
    },
}

/// Per-frame event stream, keyed to node positions in execution order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameEvents {
    /// Applied once, before any node runs.
    pub frame_start: Vec<SchedulerEvent>,
    /// Applied immediately before the node at the same position.
    pub per_node: Vec<Vec<SchedulerEvent>>,
}

impl FrameEvents {
    pub fn empty(node_count: usize) -> Self {
        Self {
            frame_start: Vec::new(),
            per_node: vec![Vec::new(); node_count],
        }
    }

    pub fn for_node(&self, position: usize) -> &[SchedulerEvent] {
        self.per_node.get(position).map_or(&[], Vec::as_slice)
    }
}

/// Lookup of live physical resource instances.
///
/// Implemented by the external resource scheduler. All lookups are
/// synchronous map-like accesses against state prepared before `execute`
/// is called; `None` means no live instance exists for that combination.
pub trait ResourceScheduler {
    fn texture(
        &self,
        resource: ResourceIndex,
        frame: usize,
        multiplexing: MultiplexingIndex,
    ) -> Option<TextureViewHandle>;

    fn buffer(
        &self,
        resource: ResourceIndex,
        frame: usize,
        multiplexing: MultiplexingIndex,
    ) -> Option<BufferViewHandle>;

    fn blob(
        &self,
        resource: ResourceIndex,
        frame: usize,
        multiplexing: MultiplexingIndex,
    ) -> Option<BlobView>;
}

/// A gathered or scheduled physical instance of a resource
#[derive(Debug, Clone)]
pub enum PhysicalResource {
    Texture(TextureViewHandle),
    Buffer(BufferViewHandle),
    Blob(BlobView),
}

/// Read-only registry of resources owned outside the graph, keyed by
/// provider name and multiplexing index.
#[derive(Debug, Default)]
pub struct ExternalResources {
    entries: HashMap<String, HashMap<MultiplexingIndex, PhysicalResource>>,
}

impl ExternalResources {
    pub fn new() -> Self {
        Self::default()
    }

    fn provide(
        &mut self,
        name: impl Into<String>,
        multiplexing: MultiplexingIndex,
        instance: PhysicalResource,
    ) {
        self.entries
            .entry(name.into())
            .or_default()
            .insert(multiplexing, instance);
    }

    pub fn provide_texture(
        &mut self,
        name: impl Into<String>,
        multiplexing: MultiplexingIndex,
        view: TextureViewHandle,
    ) {
        self.provide(name, multiplexing, PhysicalResource::Texture(view));
    }

    pub fn provide_buffer(
        &mut self,
        name: impl Into<String>,
        multiplexing: MultiplexingIndex,
        view: BufferViewHandle,
    ) {
        self.provide(name, multiplexing, PhysicalResource::Buffer(view));
    }

    pub fn provide_blob(
        &mut self,
        name: impl Into<String>,
        multiplexing: MultiplexingIndex,
        blob: BlobView,
    ) {
        self.provide(name, multiplexing, PhysicalResource::Blob(blob));
    }

    pub fn get(&self, name: &str, multiplexing: MultiplexingIndex) -> Option<&PhysicalResource> {
        self.entries.get(name)?.get(&multiplexing)
    }
}

/// The per-frame table of externally provided instances, rebuilt by the
/// executor's gathering phase before any event runs.
#[derive(Debug, Default)]
pub(crate) struct GatheredResources {
    entries: HashMap<(ResourceIndex, MultiplexingIndex), PhysicalResource>,
}

impl GatheredResources {
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn insert(
        &mut self,
        resource: ResourceIndex,
        multiplexing: MultiplexingIndex,
        instance: PhysicalResource,
    ) {
        self.entries.insert((resource, multiplexing), instance);
    }

    pub fn contains(&self, resource: ResourceIndex, multiplexing: MultiplexingIndex) -> bool {
        self.entries.contains_key(&(resource, multiplexing))
    }

    pub fn get(
        &self,
        resource: ResourceIndex,
        multiplexing: MultiplexingIndex,
    ) -> Option<&PhysicalResource> {
        self.entries.get(&(resource, multiplexing))
    }
}
