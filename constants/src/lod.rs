/// One detail level for the shared cell sphere geometry.
///
/// `distance` is the exclusive upper bound on camera distance for which the
/// level applies; `segments` is the sphere's longitudinal vertex density
/// (latitudinal density is half of it).
pub struct LodLevel {
    pub distance: f32,
    pub segments: u32,
}

/// Ordered nearest-to-farthest; the first level whose `distance` strictly
/// exceeds the camera distance wins, and the last level is unbounded.
pub const LOD_LEVELS: &[LodLevel] = &[
    LodLevel {
        distance: 300.0,
        segments: 16,
    },
    LodLevel {
        distance: 1000.0,
        segments: 8,
    },
    LodLevel {
        distance: f32::INFINITY,
        segments: 4,
    },
];
