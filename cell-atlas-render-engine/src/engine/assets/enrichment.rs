use bevy::prelude::*;
use bevy_common_assets::csv::LoadedCsv;
use constants::render_settings::COLOR_SCALE;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Gene colour lookup sheet, shared by every hover cycle.
pub const GENE_COLOUR_SHEET_PATH: &str = "cell_data/gene_colour_scheme.csv";

/// Per-cell spot document, fetched on demand for the hovered cell.
pub fn spot_document_path(label: &str) -> String {
    format!("cell_data/{label}.spots.json")
}

/// One gene expression observation, tied to a cell by the document it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotRecord {
    pub gene: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl SpotRecord {
    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

/// Spot document as a Bevy asset. Mirrors the remote JSON array exactly.
#[derive(Asset, TypePath, Debug, Clone, Serialize, Deserialize)]
pub struct SpotDocument(pub Vec<SpotRecord>);

/// One row of the gene colour sheet (columns: gene, r, g, b).
#[derive(Asset, TypePath, Debug, Clone, Deserialize)]
pub struct GeneColourRow {
    pub gene: String,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

pub type GeneColourSheet = LoadedCsv<GeneColourRow>;

/// Exact-match gene to colour lookup resolved from the sheet.
#[derive(Debug, Default, Clone)]
pub struct GeneColourTable(HashMap<String, [u8; 3]>);

impl GeneColourTable {
    pub fn from_sheet(sheet: &GeneColourSheet, rows: &Assets<GeneColourRow>) -> Self {
        Self(
            sheet
                .rows
                .iter()
                .filter_map(|handle| rows.get(handle))
                .map(|row| (row.gene.clone(), [row.r, row.g, row.b]))
                .collect(),
        )
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, [u8; 3])>) -> Self {
        Self(entries.into_iter().collect())
    }

    /// Unmapped genes resolve to black.
    pub fn colour_for(&self, gene: &str) -> Color {
        let [r, g, b] = self.0.get(gene).copied().unwrap_or([0, 0, 0]);
        Color::srgb(
            r as f32 / COLOR_SCALE,
            g as f32 / COLOR_SCALE,
            b as f32 / COLOR_SCALE,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapped_gene_resolves_to_its_sheet_colour() {
        let table = GeneColourTable::from_entries([("Gad1".to_string(), [10, 20, 30])]);
        assert_eq!(
            table.colour_for("Gad1"),
            Color::srgb(10.0 / 255.0, 20.0 / 255.0, 30.0 / 255.0)
        );
    }

    #[test]
    fn unmapped_gene_resolves_to_black() {
        let table = GeneColourTable::from_entries([("Gad1".to_string(), [10, 20, 30])]);
        assert_eq!(table.colour_for("Unknown"), Color::srgb(0.0, 0.0, 0.0));
    }

    #[test]
    fn spot_document_paths_are_keyed_by_label() {
        assert_eq!(spot_document_path("c3"), "cell_data/c3.spots.json");
    }
}
