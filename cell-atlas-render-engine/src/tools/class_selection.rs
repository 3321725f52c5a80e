use bevy::prelude::*;

/// Selection-change echo from the frontend tree widget: the set of checked
/// layer identifiers (full dotted class paths).
#[derive(Event, Debug, Clone)]
pub struct ClassSelectionEvent {
    pub selected: Vec<String>,
}

#[derive(Resource, Default, Debug)]
pub struct ClassSelectionState {
    pub selected_layers: Vec<String>,
}

pub fn handle_class_selection(
    mut events: EventReader<ClassSelectionEvent>,
    mut selection_state: ResMut<ClassSelectionState>,
) {
    for event in events.read() {
        info!("class selection changed: {} layers", event.selected.len());
        selection_state.selected_layers = event.selected.clone();
    }
}
