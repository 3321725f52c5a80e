use crate::engine::assets::cell_dataset::CellInstanceStore;
use crate::engine::assets::enrichment::{
    GENE_COLOUR_SHEET_PATH, GeneColourRow, GeneColourSheet, GeneColourTable, SpotDocument,
    SpotRecord, spot_document_path,
};
use crate::rpc::web_rpc::WebRpcInterface;
use crate::tools::hover::HoverSession;
use crate::tools::line_overlay::{CellLink, clear_cell_links, spawn_cell_links};
use bevy::asset::LoadState;
use bevy::prelude::*;
use std::collections::BTreeMap;

/// One in-flight enrichment fetch: the spot document for the hovered cell and
/// the shared gene colour sheet, joined once both resolve.
///
/// The target label is captured at request time. A newer request replaces the
/// slot, which implicitly abandons the superseded one.
pub struct EnrichmentRequest {
    pub label: String,
    spots: Handle<SpotDocument>,
    colours: Handle<GeneColourSheet>,
}

#[derive(Resource, Default)]
pub struct PendingEnrichment {
    request: Option<EnrichmentRequest>,
}

impl PendingEnrichment {
    pub fn begin(&mut self, label: String, asset_server: &AssetServer) {
        let spots = asset_server.load(spot_document_path(&label));
        let colours = asset_server.load(GENE_COLOUR_SHEET_PATH);
        self.request = Some(EnrichmentRequest {
            label,
            spots,
            colours,
        });
    }

    /// Drop the in-flight request, reporting whether there was one.
    pub fn clear(&mut self) -> bool {
        self.request.take().is_some()
    }

    pub fn target_label(&self) -> Option<&str> {
        self.request.as_ref().map(|request| request.label.as_str())
    }
}

/// Only the response matching the current hover label may touch the overlay.
pub fn should_apply(request_label: &str, current: Option<&str>) -> bool {
    current == Some(request_label)
}

/// Spot counts per gene, ordered for stable table rendering.
pub fn group_spots_by_gene(spots: &[SpotRecord]) -> BTreeMap<String, usize> {
    let mut groups = BTreeMap::new();
    for spot in spots {
        *groups.entry(spot.gene.clone()).or_insert(0) += 1;
    }
    groups
}

fn load_failed(asset_server: &AssetServer, request: &EnrichmentRequest) -> bool {
    matches!(asset_server.load_state(&request.spots), LoadState::Failed(_))
        || matches!(
            asset_server.load_state(&request.colours),
            LoadState::Failed(_)
        )
}

/// Join the two enrichment loads, discard stale results, and rebuild the
/// overlay plus the frontend panels for the still-hovered cell.
pub fn poll_enrichment(
    mut pending: ResMut<PendingEnrichment>,
    session: Res<HoverSession>,
    asset_server: Res<AssetServer>,
    spot_documents: Res<Assets<SpotDocument>>,
    colour_sheets: Res<Assets<GeneColourSheet>>,
    colour_rows: Res<Assets<GeneColourRow>>,
    store: Option<Res<CellInstanceStore>>,
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    links: Query<Entity, With<CellLink>>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    {
        let Some(request) = pending.request.as_ref() else {
            return;
        };

        // A failed fetch aborts this enrichment only; the overlay state of the
        // previous hover is left untouched.
        if load_failed(&asset_server, request) {
            warn!(
                "enrichment fetch for cell '{}' failed, keeping current overlay",
                request.label
            );
            pending.request = None;
            return;
        }

        if spot_documents.get(&request.spots).is_none()
            || colour_sheets.get(&request.colours).is_none()
        {
            return;
        }
    }

    let Some(request) = pending.request.take() else {
        return;
    };

    if !should_apply(&request.label, session.current.as_deref()) {
        debug!(
            "discarding stale enrichment for cell '{}'",
            request.label
        );
        return;
    }

    let Some(store) = store else {
        return;
    };
    let Some(target) = store.by_label(&request.label) else {
        return;
    };
    let (Some(document), Some(sheet)) = (
        spot_documents.get(&request.spots),
        colour_sheets.get(&request.colours),
    ) else {
        return;
    };

    let colours = GeneColourTable::from_sheet(sheet, &colour_rows);

    // Clear before build so an earlier overlay never leaks its resources.
    clear_cell_links(&mut commands, &links);
    spawn_cell_links(
        &mut commands,
        &mut meshes,
        &mut materials,
        &document.0,
        target.position(),
        &target.label,
        &colours,
    );

    let genes = group_spots_by_gene(&document.0);
    rpc_interface.send_notification("show_controls", serde_json::json!({}));
    rpc_interface.send_notification(
        "render_data_table",
        serde_json::json!({
            "cell": target.label,
            "genes": genes,
        }),
    );
    rpc_interface.send_notification(
        "donut_chart",
        serde_json::json!({
            "cell": target.label,
            "class": target.top_class,
            "colour": [target.r, target.g, target.b],
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_current_label_applies() {
        assert!(should_apply("c3", Some("c3")));
        assert!(!should_apply("c3", Some("c4")));
        assert!(!should_apply("c3", None));
    }

    #[test]
    fn newer_request_supersedes_the_slot() {
        // Two quick hovers: the first response still in flight must not win.
        let mut pending = PendingEnrichment::default();
        pending.request = Some(EnrichmentRequest {
            label: "c1".to_string(),
            spots: Handle::default(),
            colours: Handle::default(),
        });
        pending.request = Some(EnrichmentRequest {
            label: "c2".to_string(),
            spots: Handle::default(),
            colours: Handle::default(),
        });

        assert_eq!(pending.target_label(), Some("c2"));
        assert!(!should_apply("c1", pending.target_label()));
        assert!(should_apply("c2", pending.target_label()));
    }

    #[test]
    fn clear_reports_whether_a_request_was_dropped() {
        let mut pending = PendingEnrichment::default();
        assert!(!pending.clear());

        pending.request = Some(EnrichmentRequest {
            label: "c1".to_string(),
            spots: Handle::default(),
            colours: Handle::default(),
        });
        assert!(pending.clear());
        assert!(!pending.clear());
    }

    #[test]
    fn spots_group_by_gene_with_counts() {
        let spots = vec![
            SpotRecord {
                gene: "Vip".to_string(),
                x: 0.0,
                y: 0.0,
                z: 0.0,
            },
            SpotRecord {
                gene: "Gad1".to_string(),
                x: 1.0,
                y: 0.0,
                z: 0.0,
            },
            SpotRecord {
                gene: "Gad1".to_string(),
                x: 2.0,
                y: 0.0,
                z: 0.0,
            },
        ];

        let groups = group_spots_by_gene(&spots);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["Gad1"], 2);
        assert_eq!(groups["Vip"], 1);
    }
}
