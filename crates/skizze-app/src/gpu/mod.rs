pub mod context;
pub mod shape;
#[cfg(feature = "video")]
pub mod blit;
#[cfg(feature = "video")]
pub mod video_texture;

pub use context::GpuContext;
pub use shape::{Shape, ShapeMode};
