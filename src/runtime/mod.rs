//! Per-frame execution runtime

pub mod bindings;
pub mod executor;
pub mod scheduler;

pub use bindings::ResolvedBinding;
pub use executor::NodeExecutor;
pub use scheduler::{ExternalResources, FrameEvents, PhysicalResource, ResourceScheduler, SchedulerEvent};
