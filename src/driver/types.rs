//! Common types of the driver command surface
//!
//! Everything the execution engine emits towards the GPU is expressed in
//! this vocabulary: opaque handles, synchronization barriers, activation
//! actions, pipeline state and shader-variable values.

use bytemuck::Pod;
use glam::{IVec4, Mat4, UVec2, Vec4};
use std::sync::Arc;

/// Handle to a texture view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureViewHandle(u64);

/// Handle to a buffer view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferViewHandle(u64);

/// Handle to a loaded compute shader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComputeShaderHandle(u64);

/// Handle to a loaded full-screen post effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PostFxHandle(u64);

macro_rules! impl_raw_handle {
    ($($ty:ident),*) => {
        $(impl $ty {
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn raw(self) -> u64 {
                self.0
            }
        })*
    };
}

impl_raw_handle!(TextureViewHandle, BufferViewHandle, ComputeShaderHandle, PostFxHandle);

/// A concrete GPU resource view a barrier or activation applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuResourceView {
    Texture(TextureViewHandle),
    Buffer(BufferViewHandle),
}

/// Pipeline stage flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Stage(u32);

impl Stage {
    pub const VERTEX: Self = Self(1 << 0);
    pub const FRAGMENT: Self = Self(1 << 1);
    pub const COMPUTE: Self = Self(1 << 2);
    pub const TRANSFER: Self = Self(1 << 3);
    pub const ALL_GRAPHICS: Self = Self((1 << 0) | (1 << 1));

    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    pub fn intersects(&self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }
}

impl std::ops::BitOr for Stage {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// What a barrier must enforce between two usages of the same resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncKind {
    /// Execution/layout dependency only; no pending writes to make visible.
    Transition,
    /// Pending writes of the source stage must be flushed and made visible.
    Flush,
}

/// Synchronization barrier between two consecutive usages of a resource.
///
/// Purely a function of the two usages; see
/// [`barrier_for_transition`](crate::graph::usage::barrier_for_transition).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Barrier {
    pub src_stage: Stage,
    pub dst_stage: Stage,
    pub sync: SyncKind,
}

/// Action applied to a resource on its first use in a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationAction {
    /// Contents must read back as zero.
    ClearToZero,
    /// Contents are don't-care; backing memory may be reused as-is.
    Discard,
}

/// Capability flags a physical resource must be created with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreationFlags(u32);

impl CreationFlags {
    pub const UNORDERED_ACCESS: Self = Self(1 << 0);
    pub const RENDER_TARGET: Self = Self(1 << 1);
    pub const DEPTH_STENCIL: Self = Self(1 << 2);
    pub const COPY_SOURCE: Self = Self(1 << 3);
    pub const COPY_DESTINATION: Self = Self(1 << 4);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    pub fn bits(&self) -> u32 {
        self.0
    }
}

impl std::ops::BitOr for CreationFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for CreationFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Texture format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8Unorm,
    Rgba16Float,
    Rgba32Float,
    R32Float,
    Rg32Float,
    Depth32Float,
}

/// Address mode for out-of-range texture reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMode {
    ClampToEdge,
    Repeat,
    MirrorRepeat,
}

/// Texture creation descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDesc {
    pub label: String,
    pub size: UVec2,
    pub format: TextureFormat,
    pub flags: CreationFlags,
    pub address_mode: AddressMode,
}

/// Compare function for depth testing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareFunction {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

/// Blend factor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    One,
    Src,
    OneMinusSrc,
    SrcAlpha,
    OneMinusSrcAlpha,
    Dst,
    OneMinusDst,
    DstAlpha,
    OneMinusDstAlpha,
}

/// Blend operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendOperation {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

/// Blend component state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendComponent {
    pub src_factor: BlendFactor,
    pub dst_factor: BlendFactor,
    pub operation: BlendOperation,
}

impl Default for BlendComponent {
    fn default() -> Self {
        Self {
            src_factor: BlendFactor::One,
            dst_factor: BlendFactor::Zero,
            operation: BlendOperation::Add,
        }
    }
}

/// Blend state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlendState {
    pub color: BlendComponent,
    pub alpha: BlendComponent,
}

impl BlendState {
    pub fn alpha_blending() -> Self {
        Self {
            color: BlendComponent {
                src_factor: BlendFactor::SrcAlpha,
                dst_factor: BlendFactor::OneMinusSrcAlpha,
                operation: BlendOperation::Add,
            },
            alpha: BlendComponent {
                src_factor: BlendFactor::One,
                dst_factor: BlendFactor::OneMinusSrcAlpha,
                operation: BlendOperation::Add,
            },
        }
    }

    pub fn additive() -> Self {
        Self {
            color: BlendComponent {
                src_factor: BlendFactor::One,
                dst_factor: BlendFactor::One,
                operation: BlendOperation::Add,
            },
            alpha: BlendComponent::default(),
        }
    }
}

/// Non-resource pipeline state a node may override before it runs.
///
/// `None` fields leave the corresponding state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PipelineState {
    pub blend: Option<BlendState>,
    pub depth_write: Option<bool>,
    pub depth_compare: Option<CompareFunction>,
}

/// A plain scalar value written into the global shader-state store
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalarValue {
    Int(i32),
    Float(f32),
    Int4(IVec4),
    Color(Vec4),
    Matrix(Mat4),
}

/// Immutable view over an opaque CPU-side blob resource
#[derive(Debug, Clone)]
pub struct BlobView {
    data: Arc<[u8]>,
}

impl BlobView {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self { data: bytes.into() }
    }

    /// Wrap a plain-old-data value as a blob.
    pub fn from_pod<T: Pod>(value: &T) -> Self {
        Self::new(bytemuck::bytes_of(value).to_vec())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Reinterpret the blob as a plain-old-data value, if the size matches.
    pub fn read<T: Pod>(&self) -> Option<&T> {
        bytemuck::try_from_bytes(&self.data).ok()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<Vec<u8>> for BlobView {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}
