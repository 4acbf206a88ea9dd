//! External GPU driver and shader-state seam

pub mod traits;
pub mod types;

pub use traits::{Driver, ShaderVarId, ShaderVarRegistry};
pub use types::*;
