use crate::engine::assets::cell_dataset::CellInstanceStore;
use crate::engine::render::instanced_render_plugin::{CellInstance, CellInstanceData};
use bevy::prelude::*;
use bevy::render::extract_component::ExtractComponent;
use bevy::render::view::NoFrustumCulling;
use constants::render_settings::{BACK_FACE_OPACITY, CELL_PROXY_RADIUS, FRONT_FACE_OPACITY};
use std::fmt;

/// Which face set a batch renders. The translucent front pass and the more
/// opaque back pass share instance data but cull opposite faces.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq, Hash, ExtractComponent)]
pub enum CellBatchSide {
    Front,
    Back,
}

impl CellBatchSide {
    pub fn opacity(self) -> f32 {
        match self {
            CellBatchSide::Front => FRONT_FACE_OPACITY,
            CellBatchSide::Back => BACK_FACE_OPACITY,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum CellBatchError {
    NonFiniteCoordinate { label: String, index: usize },
}

impl fmt::Display for CellBatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellBatchError::NonFiniteCoordinate { label, index } => write!(
                f,
                "cell '{label}' (instance {index}) has a non-finite coordinate"
            ),
        }
    }
}

impl std::error::Error for CellBatchError {}

/// Build the per-instance data for every cell in the store in one pass.
///
/// The whole vector is produced before anything is uploaded; a validation
/// failure drops the partial batch and re-raises, leaving no allocation
/// behind for the caller to roll back.
pub fn build_cell_instances(store: &CellInstanceStore) -> Result<Vec<CellInstance>, CellBatchError> {
    let mut instances = Vec::with_capacity(store.len());

    for (index, record) in store.records().iter().enumerate() {
        let position = record.position();
        if !position.is_finite() {
            return Err(CellBatchError::NonFiniteCoordinate {
                label: record.label.clone(),
                index,
            });
        }

        let [r, g, b] = record.colour_components();
        instances.push(CellInstance {
            position: position.to_array(),
            scale: CELL_PROXY_RADIUS,
            colour: [r, g, b, 1.0],
        });
    }

    Ok(instances)
}

fn side_instances(instances: &[CellInstance], opacity: f32) -> Vec<CellInstance> {
    instances
        .iter()
        .map(|instance| CellInstance {
            colour: [
                instance.colour[0],
                instance.colour[1],
                instance.colour[2],
                opacity,
            ],
            ..*instance
        })
        .collect()
}

/// Spawn the front and back instanced batches sharing one level mesh.
/// Instances carry world positions, so culling is disabled on the batch
/// entities and both sit at the store anchor.
pub fn spawn_cell_batches(
    commands: &mut Commands,
    instances: &[CellInstance],
    level_mesh: Handle<Mesh>,
    anchor: Vec3,
) {
    for side in [CellBatchSide::Front, CellBatchSide::Back] {
        commands.spawn((
            Mesh3d(level_mesh.clone()),
            CellInstanceData(side_instances(instances, side.opacity())),
            side,
            Transform::from_translation(anchor),
            NoFrustumCulling,
        ));
    }
}

/// Remove both batches and their instance buffers.
pub fn despawn_cell_batches(
    commands: &mut Commands,
    batches: &Query<Entity, With<CellBatchSide>>,
) {
    for entity in batches.iter() {
        commands.entity(entity).despawn();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::assets::cell_dataset::CellRecord;
    use bevy::ecs::system::RunSystemOnce;

    fn record(label: &str, class: &str, position: [f32; 3]) -> CellRecord {
        CellRecord {
            label: label.to_string(),
            x: position[0],
            y: position[1],
            z: position[2],
            r: 10,
            g: 20,
            b: 30,
            top_class: class.to_string(),
        }
    }

    #[test]
    fn instance_count_matches_non_sentinel_records() {
        let records = vec![
            record("c0", "Astro.1", [0.0, 0.0, 0.0]),
            record("c1", "ZeroXXX", [1.0, 0.0, 0.0]),
            record("c2", "Oligo", [2.0, 0.0, 0.0]),
        ];
        let store = CellInstanceStore::from_records(&records);

        let instances = build_cell_instances(&store).expect("valid records build");
        assert_eq!(instances.len(), 2);
    }

    #[test]
    fn instance_i_carries_filtered_record_i_position_and_colour() {
        let records = vec![
            record("c0", "Astro.1", [1.0, 2.0, 3.0]),
            record("c1", "Oligo", [4.0, 5.0, 6.0]),
        ];
        let store = CellInstanceStore::from_records(&records);
        let instances = build_cell_instances(&store).expect("valid records build");

        for (instance, stored) in instances.iter().zip(store.records()) {
            assert_eq!(instance.position, stored.position().to_array());
            let [r, g, b] = stored.colour_components();
            assert_eq!(&instance.colour[..3], &[r, g, b]);
            assert_eq!(instance.scale, CELL_PROXY_RADIUS);
        }
    }

    #[test]
    fn sides_differ_only_in_opacity() {
        let records = vec![record("c0", "Astro.1", [1.0, 2.0, 3.0])];
        let store = CellInstanceStore::from_records(&records);
        let instances = build_cell_instances(&store).expect("valid records build");

        let front = side_instances(&instances, CellBatchSide::Front.opacity());
        let back = side_instances(&instances, CellBatchSide::Back.opacity());

        assert_eq!(front[0].colour[3], 0.05);
        assert_eq!(back[0].colour[3], 0.9);
        assert_eq!(front[0].position, back[0].position);
        assert_eq!(&front[0].colour[..3], &back[0].colour[..3]);
    }

    #[test]
    fn both_batches_spawn_once_and_despawn_exactly_once() {
        let mut world = World::new();
        let records = vec![record("c0", "Astro.1", [0.0, 0.0, 0.0])];
        let store = CellInstanceStore::from_records(&records);
        let instances = build_cell_instances(&store).expect("valid records build");

        world
            .run_system_once(move |mut commands: Commands| {
                spawn_cell_batches(&mut commands, &instances, Handle::default(), Vec3::ZERO);
            })
            .expect("system runs");

        let mut sides = world.query::<&CellBatchSide>();
        let spawned: Vec<CellBatchSide> = sides.iter(&world).copied().collect();
        assert_eq!(spawned.len(), 2);
        assert!(spawned.contains(&CellBatchSide::Front));
        assert!(spawned.contains(&CellBatchSide::Back));

        let teardown = |mut commands: Commands, batches: Query<Entity, With<CellBatchSide>>| {
            despawn_cell_batches(&mut commands, &batches);
        };
        world.run_system_once(teardown).expect("system runs");
        assert_eq!(world.query::<&CellBatchSide>().iter(&world).count(), 0);

        // Releasing with nothing left is a no-op.
        world.run_system_once(teardown).expect("system runs");
        assert_eq!(world.query::<&CellBatchSide>().iter(&world).count(), 0);
    }

    #[test]
    fn non_finite_coordinate_fails_the_whole_batch() {
        let records = vec![
            record("c0", "Astro.1", [0.0, 0.0, 0.0]),
            record("c1", "Oligo", [f32::NAN, 0.0, 0.0]),
        ];
        let store = CellInstanceStore::from_records(&records);

        assert_eq!(
            build_cell_instances(&store),
            Err(CellBatchError::NonFiniteCoordinate {
                label: "c1".to_string(),
                index: 1,
            })
        );
    }
}
