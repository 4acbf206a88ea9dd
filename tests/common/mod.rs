//! Shared test doubles: a driver that records every call and a map-backed
//! resource scheduler.

// Not every test binary exercises every helper.
#![allow(dead_code)]

use framegraph_engine::driver::types::{
    ActivationAction, Barrier, BlobView, BufferViewHandle, ComputeShaderHandle, GpuResourceView,
    PipelineState, PostFxHandle, ScalarValue, TextureDesc, TextureViewHandle,
};
use framegraph_engine::driver::{Driver, ShaderVarId};
use framegraph_engine::graph::multiplexing::MultiplexingIndex;
use framegraph_engine::graph::ResourceIndex;
use framegraph_engine::runtime::ResourceScheduler;
use std::collections::HashMap;

/// One recorded driver call. Mirrors the `Driver` trait one-to-one so a
/// test can assert on the exact command stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Barrier(GpuResourceView, Barrier),
    Activate(GpuResourceView, ActivationAction),
    BeginLifetime(GpuResourceView),
    EndLifetime(GpuResourceView),
    PipelineState(PipelineState),
    SetTexture(ShaderVarId, TextureViewHandle),
    SetBuffer(ShaderVarId, BufferViewHandle),
    SetBlob(ShaderVarId, Vec<u8>),
    SetScalar(ShaderVarId, ScalarValue),
    BeginNode(String),
    EndNode,
    Dispatch(ComputeShaderHandle, u32, u32, u32),
    RenderPostFx(PostFxHandle),
    CreateTexture(String),
    LoadComputeShader(String),
    LoadPostFx(String),
}

/// Driver double that appends every call to a command list.
#[derive(Default)]
pub struct RecordingDriver {
    pub commands: Vec<Command>,
    next_handle: u64,
}

impl RecordingDriver {
    pub fn new() -> Self {
        // Opt-in logging: RUST_LOG=framegraph_engine=trace surfaces the
        // executor's phase tracing in test output.
        let _ = env_logger::builder().is_test(true).try_init();
        Self::default()
    }

    fn mint(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    /// Commands recorded between `begin_node(name)` and its `end_node`.
    pub fn node_commands(&self, name: &str) -> &[Command] {
        let begin = self
            .commands
            .iter()
            .position(|c| matches!(c, Command::BeginNode(n) if n == name))
            .unwrap_or_else(|| panic!("no node named '{name}' was recorded"));
        let end = self.commands[begin..]
            .iter()
            .position(|c| matches!(c, Command::EndNode))
            .map(|offset| begin + offset)
            .unwrap_or_else(|| panic!("node '{name}' was never ended"));
        &self.commands[begin + 1..end]
    }

    pub fn count(&self, predicate: impl Fn(&Command) -> bool) -> usize {
        self.commands.iter().filter(|c| predicate(c)).count()
    }
}

impl Driver for RecordingDriver {
    fn insert_barrier(&mut self, view: GpuResourceView, barrier: Barrier) {
        self.commands.push(Command::Barrier(view, barrier));
    }

    fn activate(&mut self, view: GpuResourceView, action: ActivationAction) {
        self.commands.push(Command::Activate(view, action));
    }

    fn begin_lifetime(&mut self, view: GpuResourceView) {
        self.commands.push(Command::BeginLifetime(view));
    }

    fn end_lifetime(&mut self, view: GpuResourceView) {
        self.commands.push(Command::EndLifetime(view));
    }

    fn set_pipeline_state(&mut self, state: &PipelineState) {
        self.commands.push(Command::PipelineState(*state));
    }

    fn set_texture(&mut self, var: ShaderVarId, view: TextureViewHandle) {
        self.commands.push(Command::SetTexture(var, view));
    }

    fn set_buffer(&mut self, var: ShaderVarId, view: BufferViewHandle) {
        self.commands.push(Command::SetBuffer(var, view));
    }

    fn set_blob(&mut self, var: ShaderVarId, blob: &BlobView) {
        self.commands.push(Command::SetBlob(var, blob.bytes().to_vec()));
    }

    fn set_scalar(&mut self, var: ShaderVarId, value: ScalarValue) {
        self.commands.push(Command::SetScalar(var, value));
    }

    fn begin_node(&mut self, name: &str) {
        self.commands.push(Command::BeginNode(name.to_string()));
    }

    fn end_node(&mut self) {
        self.commands.push(Command::EndNode);
    }

    fn dispatch_threads(&mut self, shader: ComputeShaderHandle, x: u32, y: u32, z: u32) {
        self.commands.push(Command::Dispatch(shader, x, y, z));
    }

    fn render_postfx(&mut self, postfx: PostFxHandle) {
        self.commands.push(Command::RenderPostFx(postfx));
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> TextureViewHandle {
        self.commands.push(Command::CreateTexture(desc.label.clone()));
        TextureViewHandle::new(self.mint())
    }

    fn load_compute_shader(&mut self, name: &str) -> ComputeShaderHandle {
        self.commands.push(Command::LoadComputeShader(name.to_string()));
        ComputeShaderHandle::new(self.mint())
    }

    fn load_postfx(&mut self, name: &str) -> PostFxHandle {
        self.commands.push(Command::LoadPostFx(name.to_string()));
        PostFxHandle::new(self.mint())
    }
}

type Key = (ResourceIndex, usize, MultiplexingIndex);

/// Scheduler double backed by plain maps.
#[derive(Default)]
pub struct TestScheduler {
    textures: HashMap<Key, TextureViewHandle>,
    buffers: HashMap<Key, BufferViewHandle>,
    blobs: HashMap<Key, BlobView>,
}

impl TestScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_texture(
        &mut self,
        resource: ResourceIndex,
        frame: usize,
        multiplexing: MultiplexingIndex,
        view: TextureViewHandle,
    ) {
        self.textures.insert((resource, frame, multiplexing), view);
    }

    pub fn put_buffer(
        &mut self,
        resource: ResourceIndex,
        frame: usize,
        multiplexing: MultiplexingIndex,
        view: BufferViewHandle,
    ) {
        self.buffers.insert((resource, frame, multiplexing), view);
    }

    pub fn put_blob(
        &mut self,
        resource: ResourceIndex,
        frame: usize,
        multiplexing: MultiplexingIndex,
        blob: BlobView,
    ) {
        self.blobs.insert((resource, frame, multiplexing), blob);
    }
}

impl ResourceScheduler for TestScheduler {
    fn texture(
        &self,
        resource: ResourceIndex,
        frame: usize,
        multiplexing: MultiplexingIndex,
    ) -> Option<TextureViewHandle> {
        self.textures.get(&(resource, frame, multiplexing)).copied()
    }

    fn buffer(
        &self,
        resource: ResourceIndex,
        frame: usize,
        multiplexing: MultiplexingIndex,
    ) -> Option<BufferViewHandle> {
        self.buffers.get(&(resource, frame, multiplexing)).copied()
    }

    fn blob(
        &self,
        resource: ResourceIndex,
        frame: usize,
        multiplexing: MultiplexingIndex,
    ) -> Option<BlobView> {
        self.blobs.get(&(resource, frame, multiplexing)).cloned()
    }
}
