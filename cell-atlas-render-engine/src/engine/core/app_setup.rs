use bevy::asset::AssetMetaCheck;
use bevy::diagnostic::FrameTimeDiagnosticsPlugin;
use bevy::prelude::*;
use bevy_common_assets::csv::CsvAssetPlugin;
use bevy_common_assets::json::JsonAssetPlugin;

// Crate engine modules
use crate::engine::assets::cell_dataset::CellDataset;
use crate::engine::assets::enrichment::{GeneColourRow, SpotDocument};
use crate::engine::assets::surface_textures::{load_surface_textures, monitor_surface_textures};
use crate::engine::camera::viewport_camera::{ViewportCamera, camera_controller};
use crate::engine::core::app_state::{AppState, FpsText};
use crate::engine::core::window_config::create_window_config;
use crate::engine::render::instanced_render_plugin::CellInstancedRenderPlugin;
use crate::engine::render::{CellRenderState, update_cell_render_state};
use crate::engine::scene::lod::update_lod;
use crate::engine::scene::setup::{DatasetLoader, build_scene_when_ready, start_dataset_load};
use crate::engine::systems::fps_tracking::fps_notification_system;
// Crate tools modules
use crate::tools::class_selection::{
    ClassSelectionEvent, ClassSelectionState, handle_class_selection,
};
use crate::tools::enrichment::{PendingEnrichment, poll_enrichment};
use crate::tools::hover::{HoverSession, hover_session_system};
// Web RPC modules
use crate::rpc::web_rpc::WebRpcPlugin;

use constants::render_settings::INITIAL_CAMERA_POSITION;

#[cfg(not(target_arch = "wasm32"))]
use crate::engine::systems::fps_tracking::fps_text_update_system;

pub fn create_app() -> App {
    let mut app = App::new();

    app.add_plugins(create_default_plugins())
        .init_state::<AppState>()
        .add_plugins(CellInstancedRenderPlugin)
        .add_plugins(FrameTimeDiagnosticsPlugin::default())
        // Registers the typed dataset, spot document and colour sheet loaders.
        .add_plugins(JsonAssetPlugin::<CellDataset>::new(&["cells.json"]))
        .add_plugins(JsonAssetPlugin::<SpotDocument>::new(&["spots.json"]))
        .add_plugins(CsvAssetPlugin::<GeneColourRow>::new(&["csv"]))
        .add_plugins(WebRpcPlugin);

    app.init_resource::<DatasetLoader>()
        .init_resource::<HoverSession>()
        .init_resource::<PendingEnrichment>()
        .init_resource::<ClassSelectionState>()
        .init_resource::<CellRenderState>()
        .add_event::<ClassSelectionEvent>();

    app.add_systems(Startup, (setup, start_dataset_load, load_surface_textures))
        .add_systems(Update, monitor_surface_textures)
        .add_systems(
            Update,
            build_scene_when_ready.run_if(in_state(AppState::Loading)),
        );

    // Runtime systems, active once the batches exist.
    let runtime_systems = (
        camera_controller,
        update_cell_render_state,
        update_lod,
        hover_session_system,
        poll_enrichment,
        handle_class_selection,
        fps_notification_system,
    );
    app.add_systems(Update, runtime_systems.run_if(in_state(AppState::Running)));

    #[cfg(not(target_arch = "wasm32"))]
    {
        app.add_systems(Update, fps_text_update_system);
    }

    app
}

fn setup(mut commands: Commands) {
    spawn_lighting(&mut commands);
    spawn_viewport_camera(&mut commands);

    #[cfg(not(target_arch = "wasm32"))]
    {
        create_native_overlays(&mut commands);
    }
}

fn spawn_lighting(commands: &mut Commands) {
    commands.spawn((
        DirectionalLight {
            shadows_enabled: false,
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(
            EulerRot::ZYX,
            0.0,
            1.0,
            -std::f32::consts::FRAC_PI_4,
        )),
    ));
}

fn spawn_viewport_camera(commands: &mut Commands) {
    commands.spawn((
        Camera3d::default(),
        Transform::from_translation(INITIAL_CAMERA_POSITION).looking_at(Vec3::ZERO, Vec3::Y),
    ));
    commands.insert_resource(ViewportCamera::default());
}

#[cfg(not(target_arch = "wasm32"))]
fn create_native_overlays(commands: &mut Commands) {
    commands
        .spawn(Node {
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            ..default()
        })
        .with_children(|parent| {
            parent.spawn((
                Text::new("FPS: "),
                TextFont {
                    font_size: 16.0,
                    ..default()
                },
                TextColor(Color::srgb(1., 0., 0.)),
                Node {
                    position_type: PositionType::Absolute,
                    bottom: Val::Px(12.0),
                    right: Val::Px(12.0),
                    ..default()
                },
                FpsText,
            ));
        });
}

fn create_default_plugins() -> impl PluginGroup {
    let window_config = WindowPlugin {
        primary_window: Some(create_window_config()),
        ..default()
    };

    let asset_config = AssetPlugin {
        meta_check: AssetMetaCheck::Never,
        ..default()
    };

    DefaultPlugins.set(window_config).set(asset_config)
}
