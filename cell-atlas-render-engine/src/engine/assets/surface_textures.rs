use bevy::asset::LoadState;
use bevy::prelude::*;
use bevy::render::extract_resource::ExtractResource;
use bevy::render::render_asset::RenderAssetUsages;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};

const NORMAL_MAP_TEXTURE_PATH: &str = "textures/cell_surface_normal.png";

/// Handles for the cell surface detail texture. The normal map loads
/// asynchronously; `flat_fallback` is a 1x1 neutral normal that is always
/// resident so the batches keep rendering when the real texture is missing.
#[derive(Resource, Clone, ExtractResource)]
pub struct CellSurfaceTextures {
    pub normal_map: Handle<Image>,
    pub flat_fallback: Handle<Image>,
}

pub fn load_surface_textures(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut images: ResMut<Assets<Image>>,
) {
    commands.insert_resource(CellSurfaceTextures {
        normal_map: asset_server.load(NORMAL_MAP_TEXTURE_PATH),
        flat_fallback: images.add(flat_normal_image()),
    });
}

/// Swap to the flat fallback if the normal map load fails. The batches keep
/// their colour and opacity, only the surface detail is lost.
pub fn monitor_surface_textures(
    mut textures: ResMut<CellSurfaceTextures>,
    asset_server: Res<AssetServer>,
) {
    if textures.normal_map == textures.flat_fallback {
        return;
    }

    if matches!(
        asset_server.load_state(&textures.normal_map),
        LoadState::Failed(_)
    ) {
        warn!("cell surface normal map failed to load, rendering without surface detail");
        textures.normal_map = textures.flat_fallback.clone();
    }
}

fn flat_normal_image() -> Image {
    Image::new_fill(
        Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        // Unperturbed tangent-space normal.
        &[128, 128, 255, 255],
        TextureFormat::Rgba8Unorm,
        RenderAssetUsages::RENDER_WORLD,
    )
}
