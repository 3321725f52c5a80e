use bevy::math::Vec3;

/// Minimum interval between processed pointer-move events (leading-edge throttle).
pub const MOUSE_THROTTLE_SECS: f64 = 0.005;

/// Hits farther than this along the hover ray are treated as misses.
pub const MAX_INTERSECTION_DISTANCE: f32 = 200.0;

/// Colour components arrive as 0-255 integers and are normalised by this.
pub const COLOR_SCALE: f32 = 255.0;

/// Base uniform scale of one cell proxy sphere.
pub const CELL_BASE_SCALE: f32 = 10.0;

/// Shrink factor applied to the base scale so adjacent cells do not touch.
pub const CELL_SCALE_FACTOR: f32 = 0.99;

/// Effective world-space radius of one rendered cell proxy sphere.
pub const CELL_PROXY_RADIUS: f32 = CELL_BASE_SCALE * CELL_SCALE_FACTOR;

/// Opacity of the translucent front-facing cell batch.
pub const FRONT_FACE_OPACITY: f32 = 0.05;

/// Opacity of the back-facing cell batch.
pub const BACK_FACE_OPACITY: f32 = 0.9;

/// Tiling of the surface-detail normal map across one cell sphere.
pub const NORMAL_MAP_REPEAT: f32 = 30.0;

/// Strength of the surface-detail normal perturbation.
pub const NORMAL_MAP_SCALE: f32 = 0.3;

/// Camera placement on startup, above and far out from the tissue section.
pub const INITIAL_CAMERA_POSITION: Vec3 = Vec3::new(11.0, 72.0, 17921.0);
