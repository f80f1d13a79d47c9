// Recording backends shared by the widget tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use cube_core::{
    Camera, ClockSource, Dimensions, Mesh, MeshKind, PresentationBridge, RenderBackend, Result,
    Scene, TextureData, Widget, WidgetConfig, WidgetError,
};
use glam::{Quat, Vec3};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    CreateMesh(MeshKind),
    Render,
    RendererSetSize(Dimensions),
    AttachToggle,
    QueryDisplay,
    RequestFrame(ClockSource),
    CancelFrame,
    BridgeSetSize(Dimensions),
    UpdateTracking,
    RenderStereo,
    Detach,
}

pub type CallLog = Rc<RefCell<Vec<Call>>>;

pub struct RecordingRenderer {
    pub log: CallLog,
    pub fail_render: bool,
    pub fail_upload: Option<MeshKind>,
}

impl RenderBackend for RecordingRenderer {
    fn create_mesh(&mut self, mesh: &Mesh) -> Result<()> {
        self.log.borrow_mut().push(Call::CreateMesh(mesh.kind));
        if self.fail_upload == Some(mesh.kind) {
            return Err(WidgetError::Render("out of memory".into()));
        }
        Ok(())
    }

    fn render(&mut self, _scene: &Scene, _camera: &Camera) -> Result<()> {
        self.log.borrow_mut().push(Call::Render);
        if self.fail_render {
            return Err(WidgetError::Render("surface lost".into()));
        }
        Ok(())
    }

    fn set_size(&mut self, dimensions: Dimensions) {
        self.log.borrow_mut().push(Call::RendererSetSize(dimensions));
    }
}

pub struct MockBridge {
    pub log: CallLog,
    pub presenting: Rc<RefCell<bool>>,
    pub head_position: Vec3,
    pub fail_stereo: bool,
    pub stereo_target: bool,
}

impl PresentationBridge for MockBridge {
    fn attach_toggle(&mut self) -> Result<()> {
        self.log.borrow_mut().push(Call::AttachToggle);
        Ok(())
    }

    fn query_display(&mut self) {
        self.log.borrow_mut().push(Call::QueryDisplay);
    }

    fn is_presenting(&self) -> bool {
        *self.presenting.borrow()
    }

    fn request_frame(&mut self, clock: ClockSource) {
        self.log.borrow_mut().push(Call::RequestFrame(clock));
    }

    fn cancel_frame(&mut self) {
        self.log.borrow_mut().push(Call::CancelFrame);
    }

    fn set_size(&mut self, dimensions: Dimensions) {
        self.log.borrow_mut().push(Call::BridgeSetSize(dimensions));
    }

    fn update_tracking(&mut self, camera: &mut Camera) {
        self.log.borrow_mut().push(Call::UpdateTracking);
        camera.set_pose(self.head_position, Quat::from_rotation_y(0.5));
    }

    fn render_stereo(&mut self, _scene: &Scene, _camera: &Camera) -> Result<bool> {
        self.log.borrow_mut().push(Call::RenderStereo);
        if self.fail_stereo {
            return Err(WidgetError::Render("layer lost".into()));
        }
        Ok(self.stereo_target)
    }

    fn detach(&mut self) {
        self.log.borrow_mut().push(Call::Detach);
    }
}

pub struct Harness {
    pub widget: Widget<RecordingRenderer, MockBridge>,
    pub log: CallLog,
    pub presenting: Rc<RefCell<bool>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(WidgetConfig::default())
    }

    pub fn with_config(config: WidgetConfig) -> Self {
        let log: CallLog = Rc::new(RefCell::new(Vec::new()));
        let renderer = RecordingRenderer {
            log: log.clone(),
            fail_render: false,
            fail_upload: None,
        };
        let widget = Widget::new(config, renderer).expect("widget");
        Self {
            widget,
            log,
            presenting: Rc::new(RefCell::new(false)),
        }
    }

    pub fn bridge(&self) -> MockBridge {
        MockBridge {
            log: self.log.clone(),
            presenting: self.presenting.clone(),
            head_position: Vec3::new(0.1, 1.7, 0.2),
            fail_stereo: false,
            stereo_target: true,
        }
    }

    /// Texture loaded and display query answered.
    pub fn started(display: Result<()>) -> Self {
        let mut h = Self::new();
        let bridge = h.bridge();
        h.widget
            .on_texture_settled(Ok(texture()), bridge)
            .expect("assembled");
        h.widget.on_display_settled(display);
        h.clear_log();
        h
    }

    pub fn set_presenting(&self, presenting: bool) {
        *self.presenting.borrow_mut() = presenting;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.borrow().clone()
    }

    pub fn clear_log(&self) {
        self.log.borrow_mut().clear();
    }

    pub fn count(&self, call: &Call) -> usize {
        self.log.borrow().iter().filter(|c| *c == call).count()
    }
}

pub fn texture() -> TextureData {
    TextureData::new(2, 2, vec![200; 16]).expect("texture")
}
