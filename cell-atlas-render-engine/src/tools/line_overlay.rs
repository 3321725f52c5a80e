use crate::engine::assets::enrichment::{GeneColourTable, SpotRecord};
use bevy::prelude::*;
use bevy::render::mesh::PrimitiveTopology;
use bevy::render::render_asset::RenderAssetUsages;

/// Tags one spawned line with the cell it belongs to. The line's mesh and
/// material handles live on the entity, so despawning releases them.
#[derive(Component, Debug)]
pub struct CellLink {
    pub label: String,
}

/// Two-vertex line from a spot to its owning cell.
pub fn link_line_mesh(from: Vec3, to: Vec3) -> Mesh {
    Mesh::new(PrimitiveTopology::LineList, RenderAssetUsages::default())
        .with_inserted_attribute(
            Mesh::ATTRIBUTE_POSITION,
            vec![from.to_array(), to.to_array()],
        )
        .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, vec![[0.0, 1.0, 0.0]; 2])
        .with_inserted_attribute(Mesh::ATTRIBUTE_UV_0, vec![[0.0, 0.0]; 2])
}

/// Spawn one line per spot, coloured by exact gene lookup (black if unmapped).
pub fn spawn_cell_links(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    spots: &[SpotRecord],
    target_position: Vec3,
    target_label: &str,
    colours: &GeneColourTable,
) {
    for spot in spots {
        let colour = colours.colour_for(&spot.gene);
        commands.spawn((
            Mesh3d(meshes.add(link_line_mesh(spot.position(), target_position))),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: colour,
                unlit: true,
                ..default()
            })),
            CellLink {
                label: target_label.to_string(),
            },
        ));
    }
}

/// Despawn every scene-attached link. Safe to call with none present, and
/// calling it twice releases nothing twice.
pub fn clear_cell_links(
    commands: &mut Commands,
    links: &Query<Entity, With<CellLink>>,
) -> usize {
    let mut removed = 0;
    for entity in links.iter() {
        commands.entity(entity).despawn();
        removed += 1;
    }
    removed
}

/// System wrapper over `clear_cell_links` for schedules and tests.
pub fn despawn_cell_links(mut commands: Commands, links: Query<Entity, With<CellLink>>) {
    clear_cell_links(&mut commands, &links);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::system::RunSystemOnce;

    fn spot(gene: &str, position: [f32; 3]) -> SpotRecord {
        SpotRecord {
            gene: gene.to_string(),
            x: position[0],
            y: position[1],
            z: position[2],
        }
    }

    fn world_with_assets() -> World {
        let mut world = World::new();
        world.insert_resource(Assets::<Mesh>::default());
        world.insert_resource(Assets::<StandardMaterial>::default());
        world
    }

    fn link_count(world: &mut World) -> usize {
        world.query::<&CellLink>().iter(world).count()
    }

    #[test]
    fn line_mesh_runs_from_spot_to_cell() {
        let mesh = link_line_mesh(Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0));
        let positions = mesh
            .attribute(Mesh::ATTRIBUTE_POSITION)
            .and_then(|values| values.as_float3())
            .expect("positions are present");
        assert_eq!(positions, &[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    }

    #[test]
    fn one_link_per_spot_tagged_with_the_target_label() {
        let mut world = world_with_assets();
        let spots = vec![spot("Gad1", [1.0, 0.0, 0.0]), spot("Vip", [0.0, 1.0, 0.0])];
        let colours = GeneColourTable::from_entries([("Gad1".to_string(), [10, 20, 30])]);

        world
            .run_system_once(
                move |mut commands: Commands,
                      mut meshes: ResMut<Assets<Mesh>>,
                      mut materials: ResMut<Assets<StandardMaterial>>| {
                    spawn_cell_links(
                        &mut commands,
                        &mut meshes,
                        &mut materials,
                        &spots,
                        Vec3::ZERO,
                        "c3",
                        &colours,
                    );
                },
            )
            .expect("system runs");

        assert_eq!(link_count(&mut world), 2);
        let mut labels = world.query::<&CellLink>();
        assert!(labels.iter(&world).all(|link| link.label == "c3"));
    }

    #[test]
    fn link_materials_carry_the_resolved_gene_colour() {
        let mut world = world_with_assets();
        let spots = vec![spot("Gad1", [1.0, 0.0, 0.0]), spot("Unknown", [2.0, 0.0, 0.0])];
        let colours = GeneColourTable::from_entries([("Gad1".to_string(), [10, 20, 30])]);

        world
            .run_system_once(
                move |mut commands: Commands,
                      mut meshes: ResMut<Assets<Mesh>>,
                      mut materials: ResMut<Assets<StandardMaterial>>| {
                    spawn_cell_links(
                        &mut commands,
                        &mut meshes,
                        &mut materials,
                        &spots,
                        Vec3::ZERO,
                        "c3",
                        &colours,
                    );
                },
            )
            .expect("system runs");

        let materials = world.resource::<Assets<StandardMaterial>>();
        let mut base_colours: Vec<Color> = materials
            .iter()
            .map(|(_, material)| material.base_color)
            .collect();
        base_colours.sort_by(|a, b| {
            a.to_srgba()
                .red
                .partial_cmp(&b.to_srgba().red)
                .expect("finite components")
        });

        assert_eq!(
            base_colours,
            vec![
                Color::srgb(0.0, 0.0, 0.0),
                Color::srgb(10.0 / 255.0, 20.0 / 255.0, 30.0 / 255.0),
            ]
        );
    }

    #[test]
    fn teardown_is_idempotent() {
        let mut world = world_with_assets();
        world.spawn(CellLink {
            label: "c1".to_string(),
        });
        world.spawn(CellLink {
            label: "c1".to_string(),
        });

        world
            .run_system_once(despawn_cell_links)
            .expect("system runs");
        assert_eq!(link_count(&mut world), 0);

        // A second teardown with nothing attached is a no-op.
        world
            .run_system_once(despawn_cell_links)
            .expect("system runs");
        assert_eq!(link_count(&mut world), 0);
    }
}
