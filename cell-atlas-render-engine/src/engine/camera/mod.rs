/// Orbit/fly viewport camera with smoothed transforms.
pub mod viewport_camera;
