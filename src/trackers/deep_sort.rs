use crate::utils::bbox::BoundingBox;

/// Detection passed to the tracker
pub mod detection;

/// Matching cascade and IoU association stages
pub mod matching;

/// Nearest neighbor appearance metric with per-track galleries
pub mod metric;

/// Tracker configuration
pub mod options;

/// Track state and lifecycle
pub mod track;

/// DeepSORT tracker
pub mod tracker;

/// Lifecycle of the track
///
/// `Tentative -> Confirmed -> Deleted` and `Tentative -> Deleted`. `Deleted` is terminal.
///
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackState {
    #[default]
    Tentative,
    Confirmed,
    Deleted,
}

/// How the track received its last observation
///
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub enum MatchSource {
    /// The track was created from the observation
    #[default]
    Initiated,
    /// Matched by the appearance cascade with the given cost
    Appearance(f32),
    /// Matched by the IoU stage with the given `1 - IoU` cost
    IoU(f32),
}

/// Online track structure that contains tracking information for the last tracker update
///
#[derive(Debug, Clone)]
pub struct DeepSortTrack {
    /// id of the track
    ///
    pub id: u64,
    /// the box estimated by KF, (left, top, width, height)
    ///
    pub bbox: BoundingBox,
    /// lifecycle state
    ///
    pub state: TrackState,
    /// the number of `predict` calls since the last successful match
    ///
    pub time_since_update: usize,
    /// the number of observations merged into the track
    ///
    pub hits: usize,
    /// the number of frames since the track was created
    ///
    pub age: usize,
    /// the confidence of the last matched detection
    ///
    pub confidence: f32,
    /// custom class id passed by the user with the detection
    ///
    pub class_id: Option<i64>,
    /// what kind of matching led to the last update
    ///
    pub match_source: MatchSource,
}

impl DeepSortTrack {
    /// The track is worth rendering: it is confirmed and missed at most one frame
    ///
    pub fn is_visible(&self) -> bool {
        self.state == TrackState::Confirmed && self.time_since_update <= 1
    }
}

/// The track removed from the tracker
///
#[derive(Debug, Clone)]
pub struct WastedDeepSortTrack {
    /// id of the track
    ///
    pub id: u64,
    /// the last box estimated by KF
    ///
    pub bbox: BoundingBox,
    /// the number of observations merged into the track
    ///
    pub hits: usize,
    /// the number of frames the track lived
    ///
    pub age: usize,
    /// whether the track was confirmed before removal
    ///
    pub was_confirmed: bool,
    /// the history of observed boxes, at most `kept_history_length` last ones
    ///
    pub observed_boxes: Vec<BoundingBox>,
}
