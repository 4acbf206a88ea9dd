//! Frame graph execution engine
//!
//! Replays a precompiled frame graph once per frame: scheduler events
//! (barriers, activations, lifetime marks) land before the node they
//! belong to, declared bindings are resolved to live physical instances
//! and applied, and each node body runs once per multiplexing instance.
//! Compilation, resource scheduling and the GPU itself live behind the
//! [`driver::Driver`] and [`runtime::ResourceScheduler`] seams.

pub mod driver;
pub mod graph;
pub mod runtime;
pub mod solver;

pub use driver::{Driver, ShaderVarId, ShaderVarRegistry};
pub use graph::multiplexing::{Axis, Extents, MultiplexingIndex, MultiplexingMode};
pub use graph::usage::{Access, History, ResourceKind, ResourceUsage, UsageKind};
pub use graph::{
    Binding, BindingsMap, Graph, Node, NodeContext, NodeId, Resource, ResourceIndex,
    ResourceSource, StateChange, StateDeltas,
};
pub use runtime::{ExternalResources, FrameEvents, NodeExecutor, ResourceScheduler, SchedulerEvent};
pub use solver::{CascadeSolver, PlotType, SolveState, Solver};

use crate::driver::types::Stage;
use thiserror::Error;

/// Errors surfaced while validating or executing a frame
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionError {
    /// A declared usage is impossible for the resource's type.
    #[error("invalid usage: {access:?} {kind:?} at stage {stage:?} on a {resource:?} resource")]
    InvalidUsage {
        access: Access,
        kind: UsageKind,
        stage: Stage,
        resource: ResourceKind,
    },

    /// No live physical instance exists for a resource a frame needs.
    #[error("no physical instance for resource {resource:?}, frame slot {frame}, index {multiplexing:?}")]
    UnresolvedResource {
        resource: ResourceIndex,
        frame: usize,
        multiplexing: MultiplexingIndex,
    },

    /// A node or resource owns a multiplexing axis the frame's extents
    /// don't provide.
    #[error("multiplexing axis {axis} has zero extent but is required")]
    MultiplexingMismatch { axis: Axis },
}

pub type ExecutionResult<T> = Result<T, ExecutionError>;
