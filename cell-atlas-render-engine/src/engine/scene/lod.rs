use crate::engine::mesh::cell_sphere::cell_sphere_mesh;
use crate::engine::scene::cell_batches::CellBatchSide;
use bevy::prelude::*;
use constants::lod::LOD_LEVELS;

/// Detail selection for the shared cell sphere.
///
/// One mesh per level is created up front; `update_lod` swaps the handle bound
/// to both batches when the camera crosses a distance threshold, so exactly one
/// level mesh is bound at any time and nothing is rebuilt per frame.
#[derive(Resource)]
pub struct LodController {
    level_meshes: Vec<Handle<Mesh>>,
    current: usize,
    anchor: Vec3,
}

impl LodController {
    pub fn new(meshes: &mut Assets<Mesh>, anchor: Vec3) -> Self {
        let level_meshes = LOD_LEVELS
            .iter()
            .map(|level| meshes.add(cell_sphere_mesh(level.segments)))
            .collect();

        Self {
            level_meshes,
            current: 0,
            anchor,
        }
    }

    /// First level whose threshold strictly exceeds the distance wins; the
    /// final level is the unbounded fallback.
    pub fn level_for_distance(distance: f32) -> usize {
        LOD_LEVELS
            .iter()
            .position(|level| distance < level.distance)
            .unwrap_or(LOD_LEVELS.len() - 1)
    }

    pub fn anchor(&self) -> Vec3 {
        self.anchor
    }

    pub fn current_mesh(&self) -> Handle<Mesh> {
        self.level_meshes[self.current].clone()
    }

    /// Returns the mesh to bind when the selected level changed, `None` when
    /// the current binding already matches.
    pub fn rebind_for_distance(&mut self, distance: f32) -> Option<Handle<Mesh>> {
        let level = Self::level_for_distance(distance);
        if level == self.current {
            return None;
        }
        self.current = level;
        Some(self.level_meshes[level].clone())
    }

    /// Release every precomputed level mesh. Consumes the controller, so the
    /// meshes cannot be released twice.
    pub fn teardown(self, meshes: &mut Assets<Mesh>) {
        for handle in self.level_meshes {
            meshes.remove(&handle);
        }
    }
}

pub fn update_lod(
    controller: Option<ResMut<LodController>>,
    cameras: Query<&GlobalTransform, With<Camera3d>>,
    mut batches: Query<&mut Mesh3d, With<CellBatchSide>>,
) {
    let Some(mut controller) = controller else {
        return;
    };
    let Ok(camera_transform) = cameras.single() else {
        return;
    };

    let distance = camera_transform.translation().distance(controller.anchor());
    if let Some(mesh) = controller.rebind_for_distance(distance) {
        for mut bound in &mut batches {
            bound.0 = mesh.clone();
        }
    }
}
