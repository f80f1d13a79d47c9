// Fixed widget and scene parameters shared by every front-end.

// Widget size (CSS pixels), used for both the flat canvas and the stereo viewport
pub const WIDGET_WIDTH: u32 = 350;
pub const WIDGET_HEIGHT: u32 = 400;

// Camera projection
pub const FIELD_OF_VIEW_DEG: f32 = 75.0;
pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 1000.0;

// Eye height above the floor when the tracking system reports nothing better
pub const DEFAULT_STANDING_HEIGHT: f32 = 1.6;

// Cube
pub const CUBE_SIZE: f32 = 0.25;
pub const CUBE_COLOR_RGB: [u8; 3] = [255, 96, 70];
pub const CUBE_DISTANCE: f32 = 0.8; // in front of the viewer, along -Z
pub const ROTATION_STEP_RAD: f32 = 0.03; // per frame, not time normalized

// Skybox
pub const SKYBOX_SIZE: f32 = 5.0;
pub const SKYBOX_COLOR_HEX: u32 = 0xb5e8fc;

// Flat background shown behind the cube (and instead of the skybox when the texture fails)
pub const BACKGROUND_RGB: [u8; 3] = [0, 0, 0];

// Assets
pub const TEXTURE_PATH: &str = "assets/textures/box.png";
pub const TEXTURE_LOAD_TIMEOUT_MS: u32 = 10_000;

// Renderer
pub const ANTIALIAS: bool = false;

// Log a frame summary every N frames
pub const FRAME_LOG_INTERVAL: u64 = 600;
