use bevy::prelude::*;

/// Scene lifecycle: the dataset loads and the batches are built in `Loading`,
/// interaction systems run only once `Running` is reached.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, States)]
pub enum AppState {
    #[default]
    Loading,
    Running,
}

#[derive(Component)]
pub struct FpsText;
