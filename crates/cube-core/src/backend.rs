//! Narrow capability interfaces over the platform rendering and presentation
//! layers. The web front-end implements them with WebGPU and WebXR; tests
//! implement them with recording mocks.

use crate::error::Result;
use crate::frame_loop::ClockSource;
use crate::scene::{Camera, Dimensions, Mesh, Scene};

/// Draws the scene into the flat canvas through the normal camera.
pub trait RenderBackend {
    /// Upload geometry and material for a mesh that was just added to the scene.
    fn create_mesh(&mut self, mesh: &Mesh) -> Result<()>;

    fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<()>;

    fn set_size(&mut self, dimensions: Dimensions);
}

/// Immersive display access: availability, presenting status, head tracking,
/// stereo output and the frame clocks.
pub trait PresentationBridge {
    /// Append the enter/exit toggle control to the component root.
    fn attach_toggle(&mut self) -> Result<()>;

    /// Start the asynchronous availability query. The host reports the result
    /// through `Widget::on_display_settled`.
    fn query_display(&mut self);

    fn is_presenting(&self) -> bool;

    /// Ask `clock` for the next frame callback.
    fn request_frame(&mut self, clock: ClockSource);

    /// Drop any pending frame callback.
    fn cancel_frame(&mut self);

    /// Size of the stereo presentation wrapper.
    fn set_size(&mut self, dimensions: Dimensions);

    /// Copy the tracked head pose into the camera.
    fn update_tracking(&mut self, camera: &mut Camera);

    /// Render once per eye into the immersive display. Returns `false` when
    /// there was nothing to draw into, such as a page-clock frame.
    fn render_stereo(&mut self, scene: &Scene, camera: &Camera) -> Result<bool>;

    /// Remove the toggle control and end any active session.
    fn detach(&mut self);
}
