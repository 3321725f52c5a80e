use crate::engine::assets::cell_dataset::{CELL_DATASET_PATH, CellDataset, CellInstanceStore};
use crate::engine::core::app_state::AppState;
use crate::engine::scene::cell_batches::{build_cell_instances, spawn_cell_batches};
use crate::engine::scene::lod::LodController;
use crate::rpc::web_rpc::WebRpcInterface;
use crate::tools::class_tree::{build_class_tree, unique_class_names};
use bevy::asset::LoadState;
use bevy::prelude::*;

#[derive(Resource, Default)]
pub struct DatasetLoader {
    handle: Option<Handle<CellDataset>>,
    failed: bool,
}

pub fn start_dataset_load(mut loader: ResMut<DatasetLoader>, asset_server: Res<AssetServer>) {
    info!("Loading cell dataset from: {CELL_DATASET_PATH}");
    loader.handle = Some(asset_server.load(CELL_DATASET_PATH));
}

/// Build the whole scene once the dataset resolves: instance store, front and
/// back batches, detail controller, and the class filter tree. A load or
/// construction failure is fatal to the visualization pass; nothing is
/// spawned and the app stays in `Loading`.
pub fn build_scene_when_ready(
    mut loader: ResMut<DatasetLoader>,
    asset_server: Res<AssetServer>,
    datasets: Res<Assets<CellDataset>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut commands: Commands,
    mut rpc_interface: ResMut<WebRpcInterface>,
    mut next_state: ResMut<NextState<AppState>>,
) {
    if loader.failed {
        return;
    }
    let Some(handle) = loader.handle.as_ref() else {
        return;
    };

    if matches!(asset_server.load_state(handle), LoadState::Failed(_)) {
        error!("cell dataset failed to load or decode, aborting scene initialization");
        loader.failed = true;
        return;
    }
    let Some(dataset) = datasets.get(handle) else {
        return;
    };

    let store = CellInstanceStore::from_records(&dataset.0);
    if store.is_empty() {
        warn!("cell dataset contains no renderable cells");
    }

    let instances = match build_cell_instances(&store) {
        Ok(instances) => instances,
        Err(error) => {
            error!("cell batch construction failed: {error}");
            loader.failed = true;
            return;
        }
    };

    let lod = LodController::new(&mut meshes, store.anchor());
    spawn_cell_batches(&mut commands, &instances, lod.current_mesh(), store.anchor());

    let class_names = unique_class_names(store.records());
    let tree = build_class_tree(&class_names);
    match serde_json::to_value(&tree) {
        Ok(tree_value) => rpc_interface.send_notification("class_tree", tree_value),
        Err(error) => error!("failed to serialize class tree: {error}"),
    }

    rpc_interface.send_notification(
        "scene_ready",
        serde_json::json!({ "cells": store.len() }),
    );
    info!("scene built with {} cells", store.len());

    commands.insert_resource(store);
    commands.insert_resource(lod);
    loader.handle = None;
    next_state.set(AppState::Running);
}
