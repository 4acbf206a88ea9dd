//! Intermediate representation of a compiled frame graph
//!
//! Produced by an external compiler and treated as immutable for the
//! duration of a frame. Nodes come with a precomputed total execution
//! order; this crate never reorders them.

pub mod multiplexing;
pub mod usage;

use crate::driver::{Driver, PipelineState, ScalarValue, ShaderVarId};
use crate::graph::multiplexing::{MultiplexingIndex, MultiplexingMode};
use crate::graph::usage::{History, ResourceKind, ResourceUsage};
use crate::driver::types::CreationFlags;
use crate::{ExecutionError, ExecutionResult};

/// Stable, name-derived identifier of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

/// Index into the intermediate graph's resource table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceIndex(pub u32);

impl ResourceIndex {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Where a resource's physical instances come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceSource {
    /// Owned and scheduled by the resource scheduler.
    Scheduled,
    /// Owned outside the graph; gathered from the provided-resources
    /// registry under this name every frame.
    External { provider_name: String },
}

/// One entry of the intermediate graph's resource table
#[derive(Debug, Clone)]
pub struct Resource {
    pub name: String,
    pub kind: ResourceKind,
    pub history: History,
    pub source: ResourceSource,
    /// Axes this resource is replicated over; nodes multiplexed along other
    /// axes share the same physical instance.
    pub multiplexing: MultiplexingMode,
}

/// A declared usage of one resource by one node
#[derive(Debug, Clone, Copy)]
pub struct UsageRef {
    pub resource: ResourceIndex,
    pub usage: ResourceUsage,
}

/// A declared shader-variable binding, tagged by what it binds.
///
/// One variant per binding kind keeps the resolver's contract uniform
/// without virtual dispatch.
#[derive(Debug, Clone)]
pub enum Binding {
    Texture {
        resource: ResourceIndex,
        /// Bind the previous frame's instance instead of the current one.
        history: bool,
    },
    Buffer {
        resource: ResourceIndex,
    },
    Blob {
        resource: ResourceIndex,
    },
    Scalar(ScalarValue),
}

/// Ordered (shader variable, binding) pairs of one node
pub type BindingsMap = Vec<(ShaderVarId, Binding)>;

/// Context handed to a node's work callback
pub struct NodeContext<'a> {
    pub driver: &'a mut dyn Driver,
    pub prev_frame: usize,
    pub curr_frame: usize,
    /// The logical multiplexing index of this invocation.
    pub multiplexing_index: MultiplexingIndex,
}

/// Opaque compiled node body (a compute dispatch, a draw, ...).
///
/// The executor invokes it after state and bindings are applied and does
/// not inspect what it does.
pub type NodeBody = Box<dyn FnMut(&mut NodeContext<'_>)>;

/// One work-unit of the compiled graph
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub multiplexing: MultiplexingMode,
    pub usages: Vec<UsageRef>,
    pub bindings: BindingsMap,
    pub body: NodeBody,
}

impl Node {
    pub fn new(id: NodeId, name: impl Into<String>, body: NodeBody) -> Self {
        Self {
            id,
            name: name.into(),
            multiplexing: MultiplexingMode::FULL,
            usages: Vec::new(),
            bindings: Vec::new(),
            body,
        }
    }
}

/// A single global state change attached to a node position
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    /// Write a scalar shader variable.
    Scalar { var: ShaderVarId, value: ScalarValue },
    /// Write a scalar whose value depends on the current frame slot, so
    /// state referring to double-buffered data never points at the stale
    /// slot.
    SlotScalar {
        var: ShaderVarId,
        per_slot: [ScalarValue; 2],
    },
    /// Override non-resource pipeline state.
    Pipeline(PipelineState),
}

/// Precomputed state changes to apply immediately before one node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeStateDelta {
    pub changes: Vec<StateChange>,
}

/// Per-frame state deltas, indexed by node position in execution order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateDeltas {
    pub per_node: Vec<NodeStateDelta>,
}

impl StateDeltas {
    pub fn empty(node_count: usize) -> Self {
        Self {
            per_node: vec![NodeStateDelta::default(); node_count],
        }
    }

    pub fn for_node(&self, position: usize) -> &NodeStateDelta {
        static EMPTY: NodeStateDelta = NodeStateDelta { changes: Vec::new() };
        self.per_node.get(position).unwrap_or(&EMPTY)
    }
}

/// The resolved intermediate graph: an ordered node list plus the shared
/// resource table.
pub struct Graph {
    pub nodes: Vec<Node>,
    /// Precomputed total order, as indices into `nodes`. The only source
    /// of ordering during execution.
    pub execution_order: Vec<usize>,
    pub resources: Vec<Resource>,
}

impl Graph {
    pub fn new(nodes: Vec<Node>, execution_order: Vec<usize>, resources: Vec<Resource>) -> Self {
        debug_assert!(execution_order.iter().all(|&i| i < nodes.len()));
        Self {
            nodes,
            execution_order,
            resources,
        }
    }

    pub fn resource(&self, index: ResourceIndex) -> Option<&Resource> {
        self.resources.get(index.index())
    }

    /// Validate every declared usage against its resource type.
    ///
    /// Run once when the compiled graph is activated; a failure here is a
    /// fatal configuration error, not a per-frame condition. A usage whose
    /// index points outside the resource table can never resolve, so it is
    /// rejected here as well.
    pub fn validate_usages(&self) -> ExecutionResult<()> {
        for node in &self.nodes {
            for usage_ref in &node.usages {
                let resource = self.resource(usage_ref.resource).ok_or(
                    ExecutionError::UnresolvedResource {
                        resource: usage_ref.resource,
                        frame: 0,
                        multiplexing: MultiplexingIndex::default(),
                    },
                )?;
                usage::validate(usage_ref.usage, resource.kind)?;
            }
        }
        Ok(())
    }

    /// Union of creation flags a resource needs across all its usages.
    ///
    /// Computed once per resource at compile time, never mutated afterward.
    pub fn creation_flags(&self, index: ResourceIndex) -> CreationFlags {
        let Some(kind) = self.resource(index).map(|r| r.kind) else {
            return CreationFlags::empty();
        };
        let mut flags = CreationFlags::empty();
        for node in &self.nodes {
            for usage_ref in &node.usages {
                if usage_ref.resource == index {
                    flags |= usage::creation_flags_for(usage_ref.usage, kind);
                }
            }
        }
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::types::Stage;
    use crate::graph::usage::{Access, UsageKind};

    fn noop_node(id: u32, name: &str) -> Node {
        Node::new(NodeId(id), name, Box::new(|_| {}))
    }

    fn texture(name: &str) -> Resource {
        Resource {
            name: name.to_string(),
            kind: ResourceKind::Texture2d,
            history: History::DontCare,
            source: ResourceSource::Scheduled,
            multiplexing: MultiplexingMode::FULL,
        }
    }

    #[test]
    fn validate_usages_rejects_bad_declarations() {
        let mut node = noop_node(0, "bad");
        node.usages.push(UsageRef {
            resource: ResourceIndex(0),
            usage: ResourceUsage::new(Access::ReadOnly, UsageKind::Sampled, Stage::FRAGMENT),
        });
        let mut resources = vec![texture("ok")];
        let graph = Graph::new(vec![node], vec![0], resources.clone());
        graph.validate_usages().unwrap();

        resources[0].kind = ResourceKind::Buffer;
        let mut node = noop_node(0, "bad");
        node.usages.push(UsageRef {
            resource: ResourceIndex(0),
            usage: ResourceUsage::new(Access::ReadOnly, UsageKind::Sampled, Stage::FRAGMENT),
        });
        let graph = Graph::new(vec![node], vec![0], resources);
        assert!(graph.validate_usages().is_err());
    }

    #[test]
    fn usage_pointing_outside_the_resource_table_is_rejected() {
        let mut node = noop_node(0, "dangling");
        node.usages.push(UsageRef {
            resource: ResourceIndex(1),
            usage: ResourceUsage::new(Access::ReadOnly, UsageKind::Sampled, Stage::FRAGMENT),
        });
        let graph = Graph::new(vec![node], vec![0], vec![texture("only")]);
        let err = graph.validate_usages().unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::UnresolvedResource {
                resource: ResourceIndex(1),
                ..
            }
        ));
    }

    #[test]
    fn creation_flags_accumulate_across_nodes() {
        let mut producer = noop_node(0, "producer");
        producer.usages.push(UsageRef {
            resource: ResourceIndex(0),
            usage: ResourceUsage::new(Access::ReadWrite, UsageKind::Storage, Stage::COMPUTE),
        });
        let mut consumer = noop_node(1, "consumer");
        consumer.usages.push(UsageRef {
            resource: ResourceIndex(0),
            usage: ResourceUsage::new(Access::ReadOnly, UsageKind::CopySource, Stage::TRANSFER),
        });
        let graph = Graph::new(vec![producer, consumer], vec![0, 1], vec![texture("shared")]);
        let flags = graph.creation_flags(ResourceIndex(0));
        assert!(flags.contains(CreationFlags::UNORDERED_ACCESS));
        assert!(flags.contains(CreationFlags::COPY_SOURCE));
    }
}
