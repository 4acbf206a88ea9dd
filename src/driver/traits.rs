//! Driver abstraction traits
//!
//! The [`Driver`] trait is the only way the execution engine talks to the
//! GPU. All engine output -- barriers, activations, state sets, binds and
//! dispatches -- flows through it as side effects; nothing is returned.

use crate::driver::types::*;
use std::collections::HashMap;

/// Identifier of a global shader variable.
///
/// Resolved from a name exactly once, when the owning component is
/// constructed, through [`ShaderVarRegistry::resolve`]. Components store
/// the resolved id as an immutable field; there is no process-wide cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderVarId(u32);

impl ShaderVarId {
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Name to [`ShaderVarId`] mapping for the global shader-state store.
///
/// The mapping is persistent: resolving the same name twice yields the
/// same id.
#[derive(Debug, Default)]
pub struct ShaderVarRegistry {
    ids: HashMap<String, ShaderVarId>,
}

impl ShaderVarRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a variable name to its id, registering it on first use.
    pub fn resolve(&mut self, name: &str) -> ShaderVarId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = ShaderVarId(self.ids.len() as u32);
        self.ids.insert(name.to_string(), id);
        id
    }

    /// Look up an already-registered variable.
    pub fn lookup(&self, name: &str) -> Option<ShaderVarId> {
        self.ids.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// GPU command and shader-state sink.
///
/// Implementations translate these calls into the concrete graphics API.
/// The execution engine guarantees it never asks a driver to create or
/// destroy a resource mid-frame; [`Driver::create_texture`] and the shader
/// loaders exist for clients (such as the fluid solver) that own their
/// resources outright.
pub trait Driver {
    // Synchronization and lifetime

    /// Insert a barrier before the next command that touches `view`.
    fn insert_barrier(&mut self, view: GpuResourceView, barrier: Barrier);

    /// Apply an activation action to a resource on its first use this frame.
    fn activate(&mut self, view: GpuResourceView, action: ActivationAction);

    /// Mark the point from which `view` must be backed by live memory.
    fn begin_lifetime(&mut self, view: GpuResourceView);

    /// Mark the point after which `view`'s backing memory may be aliased.
    fn end_lifetime(&mut self, view: GpuResourceView);

    // Pipeline and shader state

    /// Override non-resource pipeline state (blend, depth).
    fn set_pipeline_state(&mut self, state: &PipelineState);

    /// Bind a texture view to a global shader variable.
    fn set_texture(&mut self, var: ShaderVarId, view: TextureViewHandle);

    /// Bind a buffer view to a global shader variable.
    fn set_buffer(&mut self, var: ShaderVarId, view: BufferViewHandle);

    /// Write an opaque blob into a global shader variable.
    fn set_blob(&mut self, var: ShaderVarId, blob: &BlobView);

    /// Write a plain scalar into the global shader-state store.
    fn set_scalar(&mut self, var: ShaderVarId, value: ScalarValue);

    // Work submission

    /// Open a debug region for a node; commands until [`Driver::end_node`]
    /// belong to it.
    fn begin_node(&mut self, name: &str);

    fn end_node(&mut self);

    /// Dispatch a compute shader over at least `x * y * z` threads.
    fn dispatch_threads(&mut self, shader: ComputeShaderHandle, x: u32, y: u32, z: u32);

    /// Run a full-screen post effect.
    fn render_postfx(&mut self, postfx: PostFxHandle);

    // Client-owned resource setup (not used by the per-frame engine)

    /// Create a texture owned by the caller.
    fn create_texture(&mut self, desc: &TextureDesc) -> TextureViewHandle;

    /// Load a compute shader by name.
    fn load_compute_shader(&mut self, name: &str) -> ComputeShaderHandle;

    /// Load a full-screen post effect by name.
    fn load_postfx(&mut self, name: &str) -> PostFxHandle;
}
