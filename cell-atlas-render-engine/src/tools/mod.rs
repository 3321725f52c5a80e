//! Hover interaction over the instanced cell batches.
//!
//! A throttled pointer raycast resolves the hovered cell, per-cell spot data
//! is fetched asynchronously, and line overlays connect the spots to their
//! cell while the hover lasts. The class filter tree is built once from the
//! dataset and handed to the frontend tree widget.
//!
//! ```text
//! CursorMoved (throttled)
//!   └─> hover_session_system
//!       ├─> miss  ─> clear overlay, reset cursor, hide panels
//!       └─> enter ─> clear overlay, start enrichment fetch
//!                      └─> poll_enrichment (stale results discarded)
//!                            └─> spawn links, show panels, table, chart
//! ```

/// Hover session state machine and pointer raycasting.
pub mod hover;

/// Per-hover line segments from spots to their owning cell.
pub mod line_overlay;

/// Asynchronous spot/colour fetch join with stale-response discard.
pub mod enrichment;

/// Class filter tree built from the dotted classification names.
pub mod class_tree;

/// Selection state echoed back from the frontend tree widget.
pub mod class_selection;
