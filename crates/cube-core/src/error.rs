use thiserror::Error;

use crate::scene::MeshKind;

/// Errors surfaced by the widget core and its backends.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WidgetError {
    #[error("failed to load texture {path}: {reason}")]
    TextureLoad { path: String, reason: String },

    #[error("texture {path} did not load within {timeout_ms} ms")]
    TextureTimeout { path: String, timeout_ms: u32 },

    #[error("invalid texture data: {0}")]
    InvalidTexture(String),

    #[error("no immersive display available: {0}")]
    DisplayUnavailable(String),

    #[error("scene already contains a {0:?} mesh")]
    DuplicateMesh(MeshKind),

    #[error("scene was already assembled")]
    AlreadyAssembled,

    #[error("render failed: {0}")]
    Render(String),

    #[error("page element unavailable: {0}")]
    Dom(String),

    #[error("invalid config value for {key}: {value}")]
    InvalidConfig { key: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, WidgetError>;
