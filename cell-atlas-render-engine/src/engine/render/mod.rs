use bevy::prelude::*;
use bevy::render::extract_resource::ExtractResource;

/// Custom instanced pipeline drawing both cell batches in one call each.
pub mod instanced_render_plugin;

/// Main-world camera state mirrored into the render world each frame.
#[derive(Resource, Default, Clone, ExtractResource)]
pub struct CellRenderState {
    pub camera_position: Vec3,
}

pub fn update_cell_render_state(
    mut render_state: ResMut<CellRenderState>,
    cameras: Query<&GlobalTransform, With<Camera3d>>,
) {
    if let Ok(camera_transform) = cameras.single() {
        render_state.camera_position = camera_transform.translation();
    }
}
