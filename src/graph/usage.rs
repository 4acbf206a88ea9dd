//! Resource usage policy
//!
//! Pure functions deciding, for a declared resource usage: whether it is
//! legal at all, what barrier separates it from the previous usage, whether
//! the first use in a frame needs an activation action, and which creation
//! flags the physical resource must carry. None of these run per frame
//! except [`barrier_for_transition`], which the scheduler precomputes into
//! its event stream anyway.

use crate::driver::types::{ActivationAction, Barrier, CreationFlags, Stage, SyncKind};
use crate::{ExecutionError, ExecutionResult};

/// Access mode of a usage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

/// How a node binds a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageKind {
    /// Sampled through a texture unit.
    Sampled,
    /// Random access through a storage view.
    Storage,
    /// Bound as a color render target.
    ColorTarget,
    /// Bound as the depth/stencil target.
    DepthTarget,
    /// Read as a uniform/constant buffer.
    Uniform,
    /// Source of a copy/blit.
    CopySource,
    /// Destination of a copy/blit.
    CopyDestination,
    /// CPU-side blob access; never touches the GPU.
    Blob,
}

/// Declared type of a resource in the intermediate graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Texture2d,
    Texture3d,
    CubeTexture,
    CubeArrayTexture,
    Buffer,
    Blob,
}

impl ResourceKind {
    pub fn is_texture(&self) -> bool {
        matches!(
            self,
            ResourceKind::Texture2d
                | ResourceKind::Texture3d
                | ResourceKind::CubeTexture
                | ResourceKind::CubeArrayTexture
        )
    }
}

/// Cross-frame content policy of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum History {
    /// Contents at the start of a frame are don't-care.
    DontCare,
    /// Contents must read back as zero on the first use each frame.
    ClearOnFirstUse,
    /// Contents must survive from the previous frame untouched.
    Preserve,
}

/// One declared (access, binding kind, pipeline stage) triple
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceUsage {
    pub access: Access,
    pub kind: UsageKind,
    pub stage: Stage,
}

impl ResourceUsage {
    pub const fn new(access: Access, kind: UsageKind, stage: Stage) -> Self {
        Self { access, kind, stage }
    }

    pub fn is_read_only(&self) -> bool {
        self.access == Access::ReadOnly
    }

    pub fn is_write(&self) -> bool {
        self.access == Access::ReadWrite
    }
}

/// Check that a usage triple is legal for the declared resource type.
///
/// This is a static correctness check performed once when a compiled graph
/// is activated; invalid combinations are configuration errors and are
/// never coerced into something runnable.
pub fn validate(usage: ResourceUsage, resource: ResourceKind) -> ExecutionResult<()> {
    let invalid = || {
        Err(ExecutionError::InvalidUsage {
            access: usage.access,
            kind: usage.kind,
            stage: usage.stage,
            resource,
        })
    };

    if usage.stage.is_empty() && usage.kind != UsageKind::Blob {
        return invalid();
    }

    match resource {
        ResourceKind::Blob => {
            // Blobs live on the CPU; any GPU-style binding is a mistake.
            if usage.kind != UsageKind::Blob {
                return invalid();
            }
        }
        ResourceKind::Buffer => match usage.kind {
            UsageKind::Storage | UsageKind::Uniform | UsageKind::CopySource | UsageKind::CopyDestination => {}
            _ => return invalid(),
        },
        kind if kind.is_texture() => {
            match usage.kind {
                UsageKind::Sampled
                | UsageKind::Storage
                | UsageKind::CopySource
                | UsageKind::CopyDestination => {}
                UsageKind::ColorTarget | UsageKind::DepthTarget => {
                    // Attachments are single-subresource; only 2d targets qualify.
                    if kind != ResourceKind::Texture2d {
                        return invalid();
                    }
                }
                UsageKind::Uniform | UsageKind::Blob => return invalid(),
            }
            // Cube array views are not writable through storage access.
            if kind == ResourceKind::CubeArrayTexture
                && usage.kind == UsageKind::Storage
                && usage.access == Access::ReadWrite
            {
                return invalid();
            }
        }
        _ => unreachable!(),
    }

    // Sampled reads are read-only by definition.
    if usage.kind == UsageKind::Sampled && usage.access == Access::ReadWrite {
        return invalid();
    }
    // Uniform reads likewise.
    if usage.kind == UsageKind::Uniform && usage.access == Access::ReadWrite {
        return invalid();
    }

    Ok(())
}

/// Compute the minimal barrier between two consecutive usages of the same
/// resource.
///
/// Returns `None` when no synchronization is needed: both usages are
/// read-only and bind the resource the same way. The result is purely a
/// function of the two usages; identical inputs always yield an identical
/// barrier.
pub fn barrier_for_transition(before: ResourceUsage, after: ResourceUsage) -> Option<Barrier> {
    if before.is_read_only() && after.is_read_only() && before.kind == after.kind {
        return None;
    }

    let sync = if before.is_write() {
        // The consumer must observe the producer's completed writes.
        SyncKind::Flush
    } else {
        // Read-to-write or a binding-kind change: execution/layout
        // dependency only, nothing to flush.
        SyncKind::Transition
    };

    Some(Barrier {
        src_stage: before.stage,
        dst_stage: after.stage,
        sync,
    })
}

/// Decide the activation action for a resource's first usage in a frame.
///
/// Preserved resources never get one; their previous-frame contents are
/// the whole point.
pub fn activation_for(
    history: History,
    usage: ResourceUsage,
    resource: ResourceKind,
) -> Option<ActivationAction> {
    // Blobs are initialized by their owner, not by the GPU.
    if resource == ResourceKind::Blob {
        return None;
    }
    match history {
        History::ClearOnFirstUse => Some(ActivationAction::ClearToZero),
        History::DontCare if usage.is_write() => Some(ActivationAction::Discard),
        _ => None,
    }
}

/// Creation flags a physical resource needs to satisfy one usage.
///
/// Callers union the result over all of a resource's declared usages once,
/// at compile time; the accumulated flags are never mutated afterward.
pub fn creation_flags_for(usage: ResourceUsage, resource: ResourceKind) -> CreationFlags {
    if resource == ResourceKind::Blob {
        return CreationFlags::empty();
    }
    let mut flags = CreationFlags::empty();
    match usage.kind {
        UsageKind::Storage => flags |= CreationFlags::UNORDERED_ACCESS,
        UsageKind::ColorTarget => flags |= CreationFlags::RENDER_TARGET,
        UsageKind::DepthTarget => flags |= CreationFlags::DEPTH_STENCIL,
        UsageKind::CopySource => flags |= CreationFlags::COPY_SOURCE,
        UsageKind::CopyDestination => flags |= CreationFlags::COPY_DESTINATION,
        UsageKind::Sampled | UsageKind::Uniform | UsageKind::Blob => {}
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sampled(stage: Stage) -> ResourceUsage {
        ResourceUsage::new(Access::ReadOnly, UsageKind::Sampled, stage)
    }

    fn storage_write(stage: Stage) -> ResourceUsage {
        ResourceUsage::new(Access::ReadWrite, UsageKind::Storage, stage)
    }

    #[test]
    fn cube_array_storage_write_is_invalid() {
        let usage = storage_write(Stage::COMPUTE);
        let err = validate(usage, ResourceKind::CubeArrayTexture).unwrap_err();
        assert!(matches!(err, crate::ExecutionError::InvalidUsage { .. }));
        // Reading the same view is fine.
        let read = ResourceUsage::new(Access::ReadOnly, UsageKind::Storage, Stage::COMPUTE);
        validate(read, ResourceKind::CubeArrayTexture).unwrap();
    }

    #[test]
    fn buffers_cannot_be_attachments_or_sampled() {
        for kind in [UsageKind::Sampled, UsageKind::ColorTarget, UsageKind::DepthTarget] {
            let usage = ResourceUsage::new(Access::ReadOnly, kind, Stage::FRAGMENT);
            assert!(validate(usage, ResourceKind::Buffer).is_err(), "{kind:?}");
        }
        let uniform = ResourceUsage::new(Access::ReadOnly, UsageKind::Uniform, Stage::VERTEX);
        validate(uniform, ResourceKind::Buffer).unwrap();
    }

    #[test]
    fn blobs_accept_only_blob_usage() {
        let blob = ResourceUsage::new(Access::ReadWrite, UsageKind::Blob, Stage::empty());
        validate(blob, ResourceKind::Blob).unwrap();
        let gpu = ResourceUsage::new(Access::ReadOnly, UsageKind::Uniform, Stage::COMPUTE);
        assert!(validate(gpu, ResourceKind::Blob).is_err());
    }

    #[test]
    fn compatible_reads_need_no_barrier() {
        assert_eq!(
            barrier_for_transition(sampled(Stage::FRAGMENT), sampled(Stage::COMPUTE)),
            None
        );
    }

    #[test]
    fn write_to_read_flushes() {
        let barrier =
            barrier_for_transition(storage_write(Stage::COMPUTE), sampled(Stage::FRAGMENT)).unwrap();
        assert_eq!(barrier.sync, SyncKind::Flush);
        assert_eq!(barrier.src_stage, Stage::COMPUTE);
        assert_eq!(barrier.dst_stage, Stage::FRAGMENT);
    }

    #[test]
    fn read_to_write_is_a_transition() {
        let barrier =
            barrier_for_transition(sampled(Stage::FRAGMENT), storage_write(Stage::COMPUTE)).unwrap();
        assert_eq!(barrier.sync, SyncKind::Transition);
    }

    #[test]
    fn incompatible_reads_transition() {
        let storage_read = ResourceUsage::new(Access::ReadOnly, UsageKind::Storage, Stage::COMPUTE);
        let barrier = barrier_for_transition(sampled(Stage::COMPUTE), storage_read).unwrap();
        assert_eq!(barrier.sync, SyncKind::Transition);
    }

    #[test]
    fn barriers_are_deterministic() {
        let before = storage_write(Stage::COMPUTE);
        let after = sampled(Stage::FRAGMENT);
        assert_eq!(
            barrier_for_transition(before, after),
            barrier_for_transition(before, after)
        );
    }

    #[test]
    fn preserved_resources_are_never_cleared_or_discarded() {
        for usage in [
            sampled(Stage::FRAGMENT),
            storage_write(Stage::COMPUTE),
            ResourceUsage::new(Access::ReadWrite, UsageKind::ColorTarget, Stage::FRAGMENT),
        ] {
            assert_eq!(activation_for(History::Preserve, usage, ResourceKind::Texture2d), None);
        }
    }

    #[test]
    fn dont_care_first_write_discards() {
        assert_eq!(
            activation_for(History::DontCare, storage_write(Stage::COMPUTE), ResourceKind::Texture2d),
            Some(ActivationAction::Discard)
        );
        // A first read of a don't-care resource preserves whatever is there.
        assert_eq!(
            activation_for(History::DontCare, sampled(Stage::FRAGMENT), ResourceKind::Texture2d),
            None
        );
    }

    #[test]
    fn clear_history_always_clears() {
        assert_eq!(
            activation_for(History::ClearOnFirstUse, sampled(Stage::COMPUTE), ResourceKind::Texture2d),
            Some(ActivationAction::ClearToZero)
        );
    }

    #[test]
    fn creation_flags_union_over_usages() {
        let mut flags = CreationFlags::empty();
        flags |= creation_flags_for(storage_write(Stage::COMPUTE), ResourceKind::Texture2d);
        flags |= creation_flags_for(
            ResourceUsage::new(Access::ReadWrite, UsageKind::ColorTarget, Stage::FRAGMENT),
            ResourceKind::Texture2d,
        );
        flags |= creation_flags_for(sampled(Stage::FRAGMENT), ResourceKind::Texture2d);
        assert!(flags.contains(CreationFlags::UNORDERED_ACCESS));
        assert!(flags.contains(CreationFlags::RENDER_TARGET));
        assert!(!flags.contains(CreationFlags::DEPTH_STENCIL));
    }
}
