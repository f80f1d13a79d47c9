pub mod backend;
pub mod config;
pub mod constants;
pub mod error;
pub mod frame_loop;
pub mod geometry;
pub mod scene;
pub mod texture;
pub mod widget;

// Shaders bundled as string constants
pub static MESH_WGSL: &str = include_str!("../shaders/mesh.wgsl");
pub static STEREO_VERT_GLSL: &str = include_str!("../shaders/stereo.vert");
pub static STEREO_FRAG_GLSL: &str = include_str!("../shaders/stereo.frag");

pub use backend::*;
pub use config::*;
pub use error::{Result, WidgetError};
pub use frame_loop::*;
pub use geometry::*;
pub use scene::*;
pub use texture::*;
pub use widget::Widget;
