use crate::feature::Feature;
use crate::trackers::deep_sort::detection::Detection;
use crate::trackers::deep_sort::{DeepSortTrack, MatchSource, TrackState, WastedDeepSortTrack};
use crate::utils::bbox::{BoundingBox, XyahBox};
use crate::utils::kalman::kalman_bbox::{BoxKalmanFilter, DIM_BOX_X2};
use crate::utils::kalman::KalmanState;
use std::collections::VecDeque;

/// Single target track with the state space `(x, y, a, h)` and their velocities, where `(x, y)`
/// is the center of the box, `a` is the aspect ratio and `h` is the height.
///
#[derive(Debug, Clone)]
pub struct Track {
    track_id: u64,
    state: TrackState,
    kalman_state: KalmanState<DIM_BOX_X2>,
    n_init: usize,
    max_age: usize,
    hits: usize,
    age: usize,
    time_since_update: usize,
    confidence: f32,
    class_id: Option<i64>,
    match_source: MatchSource,
    /// features not yet handed to the metric
    features: Vec<Feature>,
    observed_boxes: VecDeque<BoundingBox>,
    kept_history_length: usize,
}

impl Track {
    /// Creates the track from the unmatched detection
    ///
    /// # Parameters
    /// * `measurement` - the detection box in the `xyah` form;
    /// * `n_init` - the number of hits required to confirm the track;
    /// * `max_age` - the number of misses before a confirmed track is deleted.
    ///
    pub fn new(
        track_id: u64,
        kalman_state: KalmanState<DIM_BOX_X2>,
        detection: &Detection,
        n_init: usize,
        max_age: usize,
        kept_history_length: usize,
    ) -> Self {
        let state = if n_init <= 1 {
            TrackState::Confirmed
        } else {
            TrackState::Tentative
        };

        Self {
            track_id,
            state,
            kalman_state,
            n_init,
            max_age,
            hits: 1,
            age: 1,
            time_since_update: 0,
            confidence: detection.confidence(),
            class_id: detection.class_id(),
            match_source: MatchSource::Initiated,
            features: vec![detection.feature().clone()],
            observed_boxes: VecDeque::from([*detection.bbox()]),
            kept_history_length,
        }
    }

    /// Propagates the state distribution to the current time step
    ///
    pub fn predict(&mut self, kf: &BoxKalmanFilter) {
        self.kalman_state = kf.predict(&self.kalman_state);
        self.age += 1;
        self.time_since_update += 1;
    }

    /// Merges the associated detection into the track
    ///
    pub fn update(
        &mut self,
        kf: &BoxKalmanFilter,
        detection: &Detection,
        measurement: &XyahBox,
        match_source: MatchSource,
    ) {
        self.kalman_state = kf.update(&self.kalman_state, measurement);
        self.features.push(detection.feature().clone());
        self.confidence = detection.confidence();
        if detection.class_id().is_some() {
            self.class_id = detection.class_id();
        }
        self.match_source = match_source;

        self.observed_boxes.push_back(*detection.bbox());
        while self.observed_boxes.len() > self.kept_history_length {
            self.observed_boxes.pop_front();
        }

        self.hits += 1;
        self.time_since_update = 0;
        if self.state == TrackState::Tentative && self.hits >= self.n_init {
            self.state = TrackState::Confirmed;
        }
    }

    /// Marks the track missed in the current frame
    ///
    pub fn mark_missed(&mut self) {
        if self.state == TrackState::Tentative || self.time_since_update > self.max_age {
            self.state = TrackState::Deleted;
        }
    }

    pub fn is_tentative(&self) -> bool {
        self.state == TrackState::Tentative
    }

    pub fn is_confirmed(&self) -> bool {
        self.state == TrackState::Confirmed
    }

    pub fn is_deleted(&self) -> bool {
        self.state == TrackState::Deleted
    }

    /// Hands over the features collected since the last call
    ///
    pub fn take_features(&mut self) -> Vec<Feature> {
        std::mem::take(&mut self.features)
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// The current estimate in the `(left, top, width, height)` form
    ///
    pub fn to_tlwh(&self) -> BoundingBox {
        BoundingBox::from(&self.kalman_state)
    }

    pub fn to_tlbr(&self) -> [f32; 4] {
        self.to_tlwh().as_tlbr()
    }

    pub fn track_id(&self) -> u64 {
        self.track_id
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    pub fn kalman_state(&self) -> &KalmanState<DIM_BOX_X2> {
        &self.kalman_state
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn age(&self) -> usize {
        self.age
    }

    pub fn time_since_update(&self) -> usize {
        self.time_since_update
    }

    pub fn observed_boxes(&self) -> &VecDeque<BoundingBox> {
        &self.observed_boxes
    }
}

impl From<&Track> for DeepSortTrack {
    fn from(t: &Track) -> Self {
        DeepSortTrack {
            id: t.track_id,
            bbox: t.to_tlwh(),
            state: t.state,
            time_since_update: t.time_since_update,
            hits: t.hits,
            age: t.age,
            confidence: t.confidence,
            class_id: t.class_id,
            match_source: t.match_source,
        }
    }
}

impl From<Track> for WastedDeepSortTrack {
    fn from(t: Track) -> Self {
        WastedDeepSortTrack {
            id: t.track_id,
            bbox: t.to_tlwh(),
            hits: t.hits,
            age: t.age,
            was_confirmed: t.hits >= t.n_init,
            observed_boxes: t.observed_boxes.into_iter().collect(),
        }
    }
}
