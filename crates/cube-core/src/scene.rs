//! Scene graph, materials and camera for the widget.
//!
//! These types avoid platform-specific APIs; the web front-end reads them to
//! upload meshes and build per-frame matrices.

use std::f32::consts::TAU;
use std::rc::Rc;

use glam::{Mat4, Quat, Vec3};

use crate::constants::{WIDGET_HEIGHT, WIDGET_WIDTH};
use crate::error::{Result, WidgetError};
use crate::geometry::BoxGeometry;
use crate::texture::TextureData;

/// Fixed widget size, applied to the flat canvas and the stereo viewport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    /// Backing-store size in device pixels for a given pixel ratio.
    pub fn scaled(&self, pixel_ratio: f64) -> (u32, u32) {
        let ratio = if pixel_ratio > 0.0 { pixel_ratio } else { 1.0 };
        (
            ((self.width as f64 * ratio).round() as u32).max(1),
            ((self.height as f64 * ratio).round() as u32).max(1),
        )
    }
}

impl Default for Dimensions {
    fn default() -> Self {
        Self::new(WIDGET_WIDTH, WIDGET_HEIGHT)
    }
}

/// 8-bit sRGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::from_rgb(255, 255, 255);

    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as u8,
            g: ((hex >> 8) & 0xff) as u8,
            b: (hex & 0xff) as u8,
        }
    }

    /// Gamma-encoded channels in 0..=1, for targets without sRGB conversion.
    pub fn to_rgba(&self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            1.0,
        ]
    }

    /// Linear channels, for sRGB render targets.
    pub fn to_linear_rgba(&self) -> [f32; 4] {
        let [r, g, b, a] = self.to_rgba();
        [srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b), a]
    }
}

#[inline]
fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Which faces a material is drawn on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Front,
    Back,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wrapping {
    Repeat,
    ClampToEdge,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextureMap {
    pub texture: Rc<TextureData>,
    pub repeat: [f32; 2],
    pub wrap: Wrapping,
}

/// Unlit material: color, optionally multiplied by a texture.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub color: Color,
    pub map: Option<TextureMap>,
    pub side: Side,
}

impl Material {
    pub fn basic(color: Color) -> Self {
        Self {
            color,
            map: None,
            side: Side::Front,
        }
    }

    pub fn with_map(mut self, map: TextureMap) -> Self {
        self.map = Some(map);
        self
    }

    pub fn with_side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    pub fn uv_scale(&self) -> [f32; 2] {
        self.map.as_ref().map(|m| m.repeat).unwrap_or([1.0, 1.0])
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshKind {
    Cube,
    Skybox,
}

#[derive(Clone, Debug)]
pub struct Mesh {
    pub id: MeshId,
    pub kind: MeshKind,
    pub geometry: BoxGeometry,
    pub material: Material,
    pub position: Vec3,
    rotation_y: f32,
}

impl Mesh {
    /// Rotation about the vertical axis, kept in `[0, 2π)`.
    pub fn rotation_y(&self) -> f32 {
        self.rotation_y
    }

    pub fn rotate_y(&mut self, angle: f32) {
        self.rotation_y = (self.rotation_y + angle).rem_euclid(TAU);
    }

    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position) * Mat4::from_rotation_y(self.rotation_y)
    }
}

/// Root container. Holds exactly one cube and at most one skybox.
#[derive(Clone, Debug)]
pub struct Scene {
    meshes: Vec<Mesh>,
    next_id: u32,
    pub background: Color,
}

impl Scene {
    pub fn new(background: Color) -> Self {
        Self {
            meshes: Vec::new(),
            next_id: 0,
            background,
        }
    }

    pub fn add(
        &mut self,
        kind: MeshKind,
        geometry: BoxGeometry,
        material: Material,
        position: Vec3,
    ) -> Result<MeshId> {
        if self.count(kind) > 0 {
            return Err(WidgetError::DuplicateMesh(kind));
        }
        let id = MeshId(self.next_id);
        self.next_id += 1;
        self.meshes.push(Mesh {
            id,
            kind,
            geometry,
            material,
            position,
            rotation_y: 0.0,
        });
        Ok(id)
    }

    /// Take a mesh back out, e.g. when its upload failed.
    pub fn remove(&mut self, id: MeshId) -> Option<Mesh> {
        let index = self.meshes.iter().position(|m| m.id == id)?;
        Some(self.meshes.remove(index))
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn get(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.iter().find(|m| m.id == id)
    }

    pub fn count(&self, kind: MeshKind) -> usize {
        self.meshes.iter().filter(|m| m.kind == kind).count()
    }

    pub fn cube(&self) -> Option<&Mesh> {
        self.meshes.iter().find(|m| m.kind == MeshKind::Cube)
    }

    pub fn cube_mut(&mut self) -> Option<&mut Mesh> {
        self.meshes.iter_mut().find(|m| m.kind == MeshKind::Cube)
    }

    pub fn skybox(&self) -> Option<&Mesh> {
        self.meshes.iter().find(|m| m.kind == MeshKind::Skybox)
    }
}

/// Right-handed perspective camera with a cached projection matrix.
#[derive(Clone, Debug)]
pub struct Camera {
    pub fovy_degrees: f32,
    pub aspect: f32,
    pub znear: f32,
    pub zfar: f32,
    pub position: Vec3,
    pub orientation: Quat,
    projection: Mat4,
    projection_revision: u64,
}

impl Camera {
    pub fn new(fovy_degrees: f32, aspect: f32, znear: f32, zfar: f32) -> Self {
        let mut camera = Self {
            fovy_degrees,
            aspect,
            znear,
            zfar,
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            projection: Mat4::IDENTITY,
            projection_revision: 0,
        };
        camera.update_projection_matrix();
        camera
    }

    /// Recompute the projection after changing fov, aspect or planes.
    pub fn update_projection_matrix(&mut self) {
        self.projection = Mat4::perspective_rh(
            self.fovy_degrees.to_radians(),
            self.aspect,
            self.znear,
            self.zfar,
        );
        self.projection_revision += 1;
    }

    /// Projection as of the last `update_projection_matrix` call.
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    /// Incremented on every projection recompute.
    pub fn projection_revision(&self) -> u64 {
        self.projection_revision
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation, self.position).inverse()
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }

    pub fn set_pose(&mut self, position: Vec3, orientation: Quat) {
        self.position = position;
        self.orientation = orientation;
    }
}
