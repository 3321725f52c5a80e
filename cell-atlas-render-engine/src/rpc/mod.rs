//! JSON-RPC 2.0 communication layer for the embedding React frontend.
//!
//! Implements bidirectional messaging between the Bevy engine and the React
//! UI via iframe postMessage, supporting both request-response and
//! notification patterns.
//!
//! ## Message Flow
//!
//! ```text
//! React (Parent Window)  <──postMessage──>  Bevy (iframe)
//!        │                                        │
//!        ├─ Request (with ID) ──────────────────> │
//!        │                                        ├─ Process request
//!        │ <───────────────── Response (with ID) ─┤
//!        │                                        │
//!        │ <────────── Notification (no ID) ─────┤
//! ```
//!
//! ## Existing Methods
//!
//! - `class_selection`: echo of the tree widget's selection change
//! - `get_fps`: retrieve the current frame rate
//!
//! ## Outgoing Notifications
//!
//! - `scene_ready`: batches are built, the frontend may drop its preloader
//! - `class_tree`: the serialized class filter tree
//! - `cursor_changed`: pointer cursor on hover-in, default on a miss
//! - `show_controls` / `hide_controls`: detail panel visibility
//! - `render_data_table`: per-gene spot counts for the hovered cell
//! - `donut_chart`: hovered cell identity and colour for the chart
//! - `fps_update`: periodic frame-rate sample

/// JSON-RPC 2.0 bidirectional communication system for React integration.
///
/// Handles request-response patterns, notifications, and WASM message listeners.
pub mod web_rpc;
