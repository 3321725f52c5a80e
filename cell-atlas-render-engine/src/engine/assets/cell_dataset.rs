use bevy::prelude::*;
use constants::class::is_renderable_class;
use constants::render_settings::COLOR_SCALE;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Dataset path, resolved against the asset root (an HTTP fetch on web builds).
pub const CELL_DATASET_PATH: &str = "cell_data/atlas.cells.json";

/// One cell observation from the input dataset. Immutable once loaded.
/// All fields are required, a malformed document is a typed decode error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellRecord {
    pub label: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub r: u8,
    pub g: u8,
    pub b: u8,
    #[serde(rename = "topClass")]
    pub top_class: String,
}

impl CellRecord {
    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// Colour components normalised to the 0.0..=1.0 range.
    pub fn colour_components(&self) -> [f32; 3] {
        [
            self.r as f32 / COLOR_SCALE,
            self.g as f32 / COLOR_SCALE,
            self.b as f32 / COLOR_SCALE,
        ]
    }
}

/// Complete cell dataset as a Bevy asset. Mirrors the JSON document exactly.
#[derive(Asset, TypePath, Debug, Clone, Serialize, Deserialize)]
pub struct CellDataset(pub Vec<CellRecord>);

/// Ordered, sentinel-filtered cell records backing the two instance batches.
///
/// Fixed at creation: instance index `i` maps to `records()[i]` for the whole
/// scene lifetime, and `by_label` resolves hover targets back to records.
#[derive(Resource, Debug)]
pub struct CellInstanceStore {
    records: Vec<CellRecord>,
    index_by_label: HashMap<String, usize>,
    anchor: Vec3,
}

impl CellInstanceStore {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a CellRecord>) -> Self {
        let records: Vec<CellRecord> = records
            .into_iter()
            .filter(|record| is_renderable_class(&record.top_class))
            .cloned()
            .collect();

        let index_by_label = records
            .iter()
            .enumerate()
            .map(|(index, record)| (record.label.clone(), index))
            .collect();

        Self {
            records,
            index_by_label,
            // Instances carry world positions, so both batches sit at the origin.
            anchor: Vec3::ZERO,
        }
    }

    pub fn records(&self) -> &[CellRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CellRecord> {
        self.records.get(index)
    }

    pub fn by_label(&self, label: &str) -> Option<&CellRecord> {
        self.index_by_label
            .get(label)
            .and_then(|&index| self.records.get(index))
    }

    /// Shared anchor of the instanced batches, used for camera distance checks.
    pub fn anchor(&self) -> Vec3 {
        self.anchor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(label: &str, class: &str, position: [f32; 3]) -> CellRecord {
        CellRecord {
            label: label.to_string(),
            x: position[0],
            y: position[1],
            z: position[2],
            r: 255,
            g: 0,
            b: 127,
            top_class: class.to_string(),
        }
    }

    #[test]
    fn store_filters_sentinel_class_and_keeps_order() {
        let records = vec![
            record("c0", "Astro.1", [1.0, 0.0, 0.0]),
            record("c1", "ZeroXXX", [2.0, 0.0, 0.0]),
            record("c2", "Oligo", [3.0, 0.0, 0.0]),
        ];

        let store = CellInstanceStore::from_records(&records);

        assert_eq!(store.len(), 2);
        assert_eq!(store.get(0).map(|r| r.label.as_str()), Some("c0"));
        assert_eq!(store.get(1).map(|r| r.label.as_str()), Some("c2"));
        assert!(store.by_label("c1").is_none());
    }

    #[test]
    fn by_label_resolves_to_the_same_record_as_its_index() {
        let records = vec![
            record("c0", "Astro.1", [1.0, 2.0, 3.0]),
            record("c1", "Astro.2", [4.0, 5.0, 6.0]),
        ];

        let store = CellInstanceStore::from_records(&records);

        let by_label = store.by_label("c1").expect("label is present");
        assert_eq!(by_label.position(), Vec3::new(4.0, 5.0, 6.0));
        assert_eq!(store.get(1).map(|r| r.label.as_str()), Some("c1"));
    }

    #[test]
    fn colour_components_are_normalised() {
        let cell = record("c0", "Astro.1", [0.0; 3]);
        let [r, g, b] = cell.colour_components();
        assert_eq!(r, 1.0);
        assert_eq!(g, 0.0);
        assert_eq!(b, 127.0 / 255.0);
    }
}
