//! Per-frame node executor
//!
//! Drives one frame through the phases
//! `GatheringExternal -> ApplyingEvents -> PerNode{ApplyState ->
//! ApplyBindings -> Invoke} -> Done` as a single linear pass over the
//! precomputed node order. Nothing here suspends, blocks or locks; the
//! frame either completes or fails fast on the first resolution error,
//! with no partial rollback.

use crate::driver::types::GpuResourceView;
use crate::driver::Driver;
use crate::graph::multiplexing::{self, Extents};
use crate::graph::{Graph, NodeContext, NodeStateDelta, ResourceSource, StateChange, StateDeltas};
use crate::runtime::bindings::{self, BindingResolver};
use crate::runtime::scheduler::{
    ExternalResources, FrameEvents, GatheredResources, ResourceScheduler, SchedulerEvent,
};
use crate::{ExecutionError, ExecutionResult};

/// Executor for a compiled, resolved frame graph.
///
/// Created once per compiled graph; usage validation runs here, not per
/// frame. The node body callbacks are the only mutable part of the graph,
/// which is why the executor takes it by `&mut`.
pub struct NodeExecutor<'g> {
    graph: &'g mut Graph,
    externals: &'g ExternalResources,
    gathered: GatheredResources,
}

impl<'g> NodeExecutor<'g> {
    /// Wrap a compiled graph, rejecting it outright if any declared usage
    /// is illegal for its resource type.
    pub fn new(graph: &'g mut Graph, externals: &'g ExternalResources) -> ExecutionResult<Self> {
        graph.validate_usages()?;
        Ok(Self {
            graph,
            externals,
            gathered: GatheredResources::default(),
        })
    }

    /// Execute one frame.
    ///
    /// `prev_frame`/`curr_frame` select the double-buffered slots;
    /// `events` and `state_deltas` are the scheduler's and compiler's
    /// precomputed per-frame streams, keyed to node positions in the
    /// execution order.
    pub fn execute(
        &mut self,
        driver: &mut dyn Driver,
        scheduler: &dyn ResourceScheduler,
        prev_frame: usize,
        curr_frame: usize,
        extents: Extents,
        events: &FrameEvents,
        state_deltas: &StateDeltas,
    ) -> ExecutionResult<()> {
        log::trace!("executing frame (prev slot {prev_frame}, curr slot {curr_frame})");

        self.gather_external(extents)?;

        let Graph {
            nodes,
            execution_order,
            resources,
        } = &mut *self.graph;

        let resolver = BindingResolver {
            resources: resources.as_slice(),
            gathered: &self.gathered,
            scheduler,
        };

        log::trace!("applying {} frame-start events", events.frame_start.len());
        apply_events(driver, &resolver, curr_frame, &events.frame_start)?;

        for (position, &node_index) in execution_order.iter().enumerate() {
            let node = &mut nodes[node_index];

            // Barriers and activations bound to this node must land before
            // anything the node does.
            apply_events(driver, &resolver, curr_frame, events.for_node(position))?;

            driver.begin_node(&node.name);
            apply_state(driver, state_deltas.for_node(position), curr_frame);

            let instances = multiplexing::instance_count(node.multiplexing, extents)?;
            for flat in 0..instances {
                let logical = multiplexing::logical_index(node.multiplexing, flat, extents)?;

                for (var, binding) in &node.bindings {
                    let resolved = resolver.resolve(binding, prev_frame, curr_frame, logical)?;
                    bindings::apply(driver, *var, &resolved);
                }

                let mut ctx = NodeContext {
                    driver: &mut *driver,
                    prev_frame,
                    curr_frame,
                    multiplexing_index: logical,
                };
                (node.body)(&mut ctx);
            }

            driver.end_node();
        }

        log::trace!("frame done");
        Ok(())
    }

    /// Resolve every externally owned resource any node consumes into the
    /// per-frame table. Runs strictly before barrier/activation logic so
    /// event application sees the complete resource set.
    fn gather_external(&mut self, extents: Extents) -> ExecutionResult<()> {
        self.gathered.clear();
        let graph = &*self.graph;

        for &node_index in &graph.execution_order {
            let node = &graph.nodes[node_index];
            let instances = multiplexing::instance_count(node.multiplexing, extents)?;
            for flat in 0..instances {
                let logical = multiplexing::logical_index(node.multiplexing, flat, extents)?;
                for usage_ref in &node.usages {
                    // Dangling usage indices were rejected at activation.
                    let Some(resource) = graph.resource(usage_ref.resource) else {
                        continue;
                    };
                    let ResourceSource::External { provider_name } = &resource.source else {
                        continue;
                    };
                    let physical = multiplexing::physical_index(logical, resource.multiplexing);
                    if self.gathered.contains(usage_ref.resource, physical) {
                        continue;
                    }
                    match self.externals.get(provider_name, physical) {
                        Some(instance) => {
                            self.gathered
                                .insert(usage_ref.resource, physical, instance.clone());
                        }
                        // Absence surfaces as UnresolvedResource at the
                        // first binding that needs the instance.
                        None => log::debug!(
                            "external resource '{provider_name}' not provided for {physical:?}"
                        ),
                    }
                }
            }
        }
        Ok(())
    }
}

fn apply_events(
    driver: &mut dyn Driver,
    resolver: &BindingResolver<'_>,
    curr_frame: usize,
    events: &[SchedulerEvent],
) -> ExecutionResult<()> {
    for event in events {
        match event {
            SchedulerEvent::Barrier {
                resource,
                multiplexing,
                barrier,
            } => {
                let view = gpu_view(resolver, *resource, curr_frame, *multiplexing)?;
                driver.insert_barrier(view, *barrier);
            }
            SchedulerEvent::Activate {
                resource,
                multiplexing,
                action,
            } => {
                let view = gpu_view(resolver, *resource, curr_frame, *multiplexing)?;
                driver.activate(view, *action);
            }
            SchedulerEvent::BeginLifetime {
                resource,
                multiplexing,
            } => {
                let view = gpu_view(resolver, *resource, curr_frame, *multiplexing)?;
                driver.begin_lifetime(view);
            }
            SchedulerEvent::EndLifetime {
                resource,
                multiplexing,
            } => {
                let view = gpu_view(resolver, *resource, curr_frame, *multiplexing)?;
                driver.end_lifetime(view);
            }
        }
    }
    Ok(())
}

/// Events address GPU instances; blobs have none.
fn gpu_view(
    resolver: &BindingResolver<'_>,
    resource: crate::graph::ResourceIndex,
    frame: usize,
    multiplexing: crate::graph::multiplexing::MultiplexingIndex,
) -> ExecutionResult<GpuResourceView> {
    use crate::runtime::scheduler::PhysicalResource;
    match resolver.lookup(resource, frame, multiplexing)? {
        PhysicalResource::Texture(view) => Ok(GpuResourceView::Texture(view)),
        PhysicalResource::Buffer(view) => Ok(GpuResourceView::Buffer(view)),
        PhysicalResource::Blob(_) => Err(ExecutionError::UnresolvedResource {
            resource,
            frame,
            multiplexing,
        }),
    }
}

fn apply_state(driver: &mut dyn Driver, delta: &NodeStateDelta, curr_frame: usize) {
    for change in &delta.changes {
        match change {
            StateChange::Scalar { var, value } => driver.set_scalar(*var, *value),
            StateChange::SlotScalar { var, per_slot } => {
                driver.set_scalar(*var, per_slot[curr_frame % 2])
            }
            StateChange::Pipeline(state) => driver.set_pipeline_state(state),
        }
    }
}
