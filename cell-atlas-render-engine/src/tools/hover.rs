use crate::engine::assets::cell_dataset::CellInstanceStore;
use crate::rpc::web_rpc::WebRpcInterface;
use crate::tools::enrichment::PendingEnrichment;
use crate::tools::line_overlay::{CellLink, clear_cell_links};
use bevy::prelude::*;
use constants::render_settings::{
    CELL_PROXY_RADIUS, MAX_INTERSECTION_DISTANCE, MOUSE_THROTTLE_SECS,
};

/// Current hover target plus the leading-edge throttle window.
///
/// `current` is the hovered cell label or `None`; it is mutated only by
/// `hover_session_system` and read by the enrichment poll to discard stale
/// responses.
#[derive(Resource, Default)]
pub struct HoverSession {
    pub current: Option<String>,
    window_start: Option<f64>,
}

impl HoverSession {
    /// Leading-edge throttle: the first event in a window is processed
    /// immediately, later events in the window are dropped, and a new window
    /// opens once the interval has elapsed.
    pub fn throttle_allows(&mut self, now: f64) -> bool {
        match self.window_start {
            Some(start) if now - start < MOUSE_THROTTLE_SECS => false,
            _ => {
                self.window_start = Some(now);
                true
            }
        }
    }
}

/// Nearest instance hit by the pointer ray.
#[derive(Debug, Clone, PartialEq)]
pub struct CellHit {
    pub index: usize,
    pub distance: f32,
}

/// Ray/sphere intersection, returns the nearest non-negative ray parameter.
/// A ray starting inside the sphere reports its exit point.
pub fn ray_sphere_hit_t(origin: Vec3, direction: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let oc = origin - center;
    let a = direction.length_squared();
    if a <= f32::EPSILON {
        return None;
    }

    let half_b = oc.dot(direction);
    let c = oc.length_squared() - radius * radius;
    let discriminant = half_b * half_b - a * c;
    if discriminant < 0.0 {
        return None;
    }

    let sqrt_d = discriminant.sqrt();
    let t_near = (-half_b - sqrt_d) / a;
    if t_near >= 0.0 {
        return Some(t_near);
    }
    let t_far = (-half_b + sqrt_d) / a;
    (t_far >= 0.0).then_some(t_far)
}

/// Scan every instance of the front batch for the nearest ray intersection.
pub fn nearest_cell_hit(
    origin: Vec3,
    direction: Vec3,
    store: &CellInstanceStore,
) -> Option<CellHit> {
    let mut nearest: Option<CellHit> = None;
    for (index, record) in store.records().iter().enumerate() {
        let Some(distance) =
            ray_sphere_hit_t(origin, direction, record.position(), CELL_PROXY_RADIUS)
        else {
            continue;
        };
        if nearest.as_ref().is_none_or(|hit| distance < hit.distance) {
            nearest = Some(CellHit { index, distance });
        }
    }
    nearest
}

/// What a processed pointer event does to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum HoverTransition {
    /// Same cell as before, nothing to do.
    None,
    /// No intersection, or the nearest one is beyond the interaction range.
    Miss,
    /// A new cell became the hover target.
    Enter(String),
}

/// Classify a raycast result against the current hover label.
///
/// "No intersection" and "intersection too far" are one miss transition.
pub fn hover_transition(
    current: Option<&str>,
    hit: Option<&CellHit>,
    store: &CellInstanceStore,
) -> HoverTransition {
    let valid = hit.filter(|hit| hit.distance < MAX_INTERSECTION_DISTANCE);
    match valid.and_then(|hit| store.get(hit.index)) {
        Some(record) if current == Some(record.label.as_str()) => HoverTransition::None,
        Some(record) => HoverTransition::Enter(record.label.clone()),
        None => HoverTransition::Miss,
    }
}

pub fn hover_session_system(
    mut cursor_moved: EventReader<CursorMoved>,
    time: Res<Time>,
    mut session: ResMut<HoverSession>,
    mut pending: ResMut<PendingEnrichment>,
    store: Option<Res<CellInstanceStore>>,
    cameras: Query<(&Camera, &GlobalTransform), With<Camera3d>>,
    asset_server: Res<AssetServer>,
    mut rpc_interface: ResMut<WebRpcInterface>,
    mut commands: Commands,
    links: Query<Entity, With<CellLink>>,
) {
    let Some(store) = store else {
        return;
    };

    let now = time.elapsed_secs_f64();
    let mut cursor_position = None;
    for event in cursor_moved.read() {
        // Excess events within the throttle window are dropped, not queued.
        if cursor_position.is_none() && session.throttle_allows(now) {
            cursor_position = Some(event.position);
        }
    }
    let Some(cursor_position) = cursor_position else {
        return;
    };

    let Ok((camera, camera_transform)) = cameras.single() else {
        return;
    };
    let Ok(ray) = camera.viewport_to_world(camera_transform, cursor_position) else {
        return;
    };

    let hit = nearest_cell_hit(ray.origin, ray.direction.as_vec3(), &store);
    match hover_transition(session.current.as_deref(), hit.as_ref(), &store) {
        HoverTransition::None => {}
        HoverTransition::Miss => {
            let cleared_links = clear_cell_links(&mut commands, &links) > 0;
            let had_hover = session.current.take().is_some();
            let dropped_request = pending.clear();

            if had_hover || dropped_request || cleared_links {
                rpc_interface.send_notification(
                    "cursor_changed",
                    serde_json::json!({ "cursor": "default" }),
                );
                rpc_interface.send_notification("hide_controls", serde_json::json!({}));
            }
        }
        HoverTransition::Enter(label) => {
            clear_cell_links(&mut commands, &links);
            session.current = Some(label.clone());
            pending.begin(label, &asset_server);
            rpc_interface.send_notification(
                "cursor_changed",
                serde_json::json!({ "cursor": "pointer" }),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::assets::cell_dataset::CellRecord;

    fn record(label: &str, position: [f32; 3]) -> CellRecord {
        CellRecord {
            label: label.to_string(),
            x: position[0],
            y: position[1],
            z: position[2],
            r: 0,
            g: 0,
            b: 0,
            top_class: "Astro.1".to_string(),
        }
    }

    fn store(records: &[CellRecord]) -> CellInstanceStore {
        CellInstanceStore::from_records(records)
    }

    #[test]
    fn ray_hits_a_sphere_straight_ahead() {
        let t = ray_sphere_hit_t(Vec3::ZERO, Vec3::Z, Vec3::new(0.0, 0.0, 100.0), 10.0);
        assert_eq!(t, Some(90.0));
    }

    #[test]
    fn ray_misses_a_sphere_off_axis() {
        let t = ray_sphere_hit_t(Vec3::ZERO, Vec3::Z, Vec3::new(50.0, 0.0, 100.0), 10.0);
        assert_eq!(t, None);
    }

    #[test]
    fn ray_starting_inside_reports_the_exit() {
        let t = ray_sphere_hit_t(Vec3::ZERO, Vec3::Z, Vec3::ZERO, 10.0);
        assert_eq!(t, Some(10.0));
    }

    #[test]
    fn sphere_behind_the_origin_is_not_hit() {
        let t = ray_sphere_hit_t(Vec3::ZERO, Vec3::Z, Vec3::new(0.0, 0.0, -100.0), 10.0);
        assert_eq!(t, None);
    }

    #[test]
    fn nearest_of_two_cells_wins() {
        let records = vec![
            record("far", [0.0, 0.0, 300.0]),
            record("near", [0.0, 0.0, 50.0]),
        ];
        let store = store(&records);

        let hit = nearest_cell_hit(Vec3::ZERO, Vec3::Z, &store).expect("both are on the ray");
        assert_eq!(hit.index, 1);
        assert!(hit.distance < 50.0);
    }

    #[test]
    fn valid_hit_on_a_new_cell_enters() {
        let records = vec![record("c3", [0.0, 0.0, 199.0])];
        let store = store(&records);
        let hit = CellHit {
            index: 0,
            distance: 199.0,
        };

        assert_eq!(
            hover_transition(None, Some(&hit), &store),
            HoverTransition::Enter("c3".to_string())
        );
    }

    #[test]
    fn repeated_hit_on_the_current_cell_is_idempotent() {
        let records = vec![record("c3", [0.0, 0.0, 100.0])];
        let store = store(&records);
        let hit = CellHit {
            index: 0,
            distance: 100.0,
        };

        assert_eq!(
            hover_transition(Some("c3"), Some(&hit), &store),
            HoverTransition::None
        );
    }

    #[test]
    fn distant_hit_and_no_hit_are_both_misses() {
        let records = vec![record("c3", [0.0, 0.0, 500.0])];
        let store = store(&records);
        let too_far = CellHit {
            index: 0,
            distance: 250.0,
        };
        let boundary = CellHit {
            index: 0,
            distance: MAX_INTERSECTION_DISTANCE,
        };

        assert_eq!(
            hover_transition(Some("c3"), Some(&too_far), &store),
            HoverTransition::Miss
        );
        assert_eq!(
            hover_transition(Some("c3"), Some(&boundary), &store),
            HoverTransition::Miss
        );
        assert_eq!(hover_transition(Some("c3"), None, &store), HoverTransition::Miss);
    }

    #[test]
    fn hover_then_leave_clears_the_target() {
        // Pointer lands on instance 3 within range, then the same instance
        // falls out of range: the second event must clear the stored label.
        let records = vec![
            record("c0", [0.0, 0.0, 1000.0]),
            record("c1", [0.0, 0.0, 1000.0]),
            record("c2", [0.0, 0.0, 1000.0]),
            record("c3", [0.0, 0.0, 199.0]),
        ];
        let store = store(&records);
        let mut current: Option<String> = None;

        let near = CellHit {
            index: 3,
            distance: 199.0,
        };
        match hover_transition(current.as_deref(), Some(&near), &store) {
            HoverTransition::Enter(label) => current = Some(label),
            other => panic!("expected enter, got {other:?}"),
        }
        assert_eq!(current.as_deref(), Some("c3"));

        let far = CellHit {
            index: 3,
            distance: 250.0,
        };
        match hover_transition(current.as_deref(), Some(&far), &store) {
            HoverTransition::Miss => current = None,
            other => panic!("expected miss, got {other:?}"),
        }
        assert_eq!(current, None);
    }

    #[test]
    fn throttle_is_leading_edge() {
        let mut session = HoverSession::default();

        assert!(session.throttle_allows(0.0));
        assert!(!session.throttle_allows(0.001));
        assert!(!session.throttle_allows(0.0049));
        assert!(session.throttle_allows(0.0051));
        assert!(!session.throttle_allows(0.0052));
    }
}
