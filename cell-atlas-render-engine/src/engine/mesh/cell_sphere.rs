use bevy::prelude::*;
use bevy::render::mesh::Indices;
use bevy::render::mesh::PrimitiveTopology;
use bevy::render::render_asset::RenderAssetUsages;
use std::f32::consts::PI;

/// Create the shared unit sphere for one detail level.
///
/// `segments` is the longitudinal sector count; the latitudinal stack count is
/// half of it. Instances scale this up to the cell proxy radius, so the base
/// radius here is always 1.
pub fn cell_sphere_mesh(segments: u32) -> Mesh {
    let sectors = segments.max(3);
    let stacks = (segments / 2).max(2);

    let mut positions: Vec<[f32; 3]> = Vec::with_capacity(sphere_vertex_count(segments));
    let mut normals: Vec<[f32; 3]> = Vec::with_capacity(positions.capacity());
    let mut uvs: Vec<[f32; 2]> = Vec::with_capacity(positions.capacity());

    for stack in 0..=stacks {
        let phi = PI * stack as f32 / stacks as f32;
        for sector in 0..=sectors {
            let theta = 2.0 * PI * sector as f32 / sectors as f32;
            let position = [
                phi.sin() * theta.cos(),
                phi.cos(),
                phi.sin() * theta.sin(),
            ];
            positions.push(position);
            // Unit sphere centred at the origin, the position is the normal.
            normals.push(position);
            uvs.push([
                sector as f32 / sectors as f32,
                stack as f32 / stacks as f32,
            ]);
        }
    }

    let mut indices: Vec<u32> = Vec::with_capacity((sectors * stacks * 6) as usize);
    for stack in 0..stacks {
        for sector in 0..sectors {
            let a = stack * (sectors + 1) + sector;
            let b = a + sectors + 1;
            if stack != 0 {
                indices.extend([a, b, a + 1]);
            }
            if stack != stacks - 1 {
                indices.extend([a + 1, b, b + 1]);
            }
        }
    }

    Mesh::new(
        PrimitiveTopology::TriangleList,
        RenderAssetUsages::default(),
    )
    .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
    .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, normals)
    .with_inserted_attribute(Mesh::ATTRIBUTE_UV_0, uvs)
    .with_inserted_indices(Indices::U32(indices))
}

/// Vertex count produced by `cell_sphere_mesh` for a given segment count.
pub fn sphere_vertex_count(segments: u32) -> usize {
    let sectors = segments.max(3);
    let stacks = (segments / 2).max(2);
    ((sectors + 1) * (stacks + 1)) as usize
}
