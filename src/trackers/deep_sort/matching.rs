use crate::trackers::deep_sort::detection::Detection;
use crate::trackers::deep_sort::metric::NearestNeighborDistanceMetric;
use crate::trackers::deep_sort::track::Track;
use crate::trackers::deep_sort::MatchSource;
use crate::utils::bbox::{BoundingBox, XyahBox};
use crate::utils::kalman::kalman_bbox::BoxKalmanFilter;
use crate::utils::linear_sum_assignment::{min_cost_matching, INFTY_COST};
use log::debug;
use nalgebra::DMatrix;
use std::collections::HashSet;

/// The detection accepted for the association together with its Kalman measurement
///
#[derive(Debug, Clone)]
pub struct Measurement<'a> {
    pub detection: &'a Detection,
    pub xyah: XyahBox,
}

/// Result of a matching stage. Indices refer to the tracks and the measurements passed to the stage.
///
#[derive(Debug, Default, Clone)]
pub struct Matches {
    pub matches: Vec<(usize, usize, MatchSource)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

/// Appearance cost between the tracks and the measurements, the pairs which are implausible
/// according to the Kalman state are set to [INFTY_COST]
///
pub fn gated_appearance_cost(
    metric: &NearestNeighborDistanceMetric,
    kf: &BoxKalmanFilter,
    tracks: &[Track],
    track_indices: &[usize],
    measurements: &[Measurement],
    detection_indices: &[usize],
) -> DMatrix<f32> {
    let targets = track_indices
        .iter()
        .map(|t| tracks[*t].track_id())
        .collect::<Vec<_>>();
    let features = detection_indices
        .iter()
        .map(|d| measurements[*d].detection.feature())
        .collect::<Vec<_>>();

    let mut cost = metric.distance(&targets, &features);
    gate_cost_matrix(kf, &mut cost, tracks, track_indices, measurements, detection_indices);
    cost
}

/// Sets the cost of the pairs which squared Mahalanobis distance exceeds the gating threshold
/// to [INFTY_COST]
///
pub fn gate_cost_matrix(
    kf: &BoxKalmanFilter,
    cost: &mut DMatrix<f32>,
    tracks: &[Track],
    track_indices: &[usize],
    measurements: &[Measurement],
    detection_indices: &[usize],
) {
    for (row, t) in track_indices.iter().enumerate() {
        let state = tracks[*t].kalman_state();
        for (col, d) in detection_indices.iter().enumerate() {
            if BoxKalmanFilter::is_gated(kf.distance(state, &measurements[*d].xyah)) {
                cost[(row, col)] = INFTY_COST;
            }
        }
    }
}

/// `1 - IoU` cost between the predicted boxes and the detections. The tracks which missed more
/// than one frame get [INFTY_COST] for every detection.
///
pub fn iou_cost(
    tracks: &[Track],
    track_indices: &[usize],
    measurements: &[Measurement],
    detection_indices: &[usize],
) -> DMatrix<f32> {
    let boxes = track_indices
        .iter()
        .map(|t| (tracks[*t].time_since_update() <= 1, tracks[*t].to_tlwh()))
        .collect::<Vec<_>>();

    DMatrix::from_fn(track_indices.len(), detection_indices.len(), |row, col| {
        let (recent, track_box) = &boxes[row];
        if *recent {
            1.0 - BoundingBox::iou(track_box, measurements[detection_indices[col]].detection.bbox())
        } else {
            INFTY_COST
        }
    })
}

fn assign(
    cost: &DMatrix<f32>,
    max_distance: f32,
    track_indices: &[usize],
    detection_indices: &[usize],
    source: fn(f32) -> MatchSource,
) -> Matches {
    let mut assignment = min_cost_matching(cost, max_distance);

    // excluded pairs never match, whatever the threshold is
    let (matches, excluded): (Vec<_>, Vec<_>) = assignment
        .matches
        .into_iter()
        .partition(|(_, _, v)| *v < INFTY_COST);
    for (r, c, _) in excluded {
        assignment.unmatched_rows.push(r);
        assignment.unmatched_columns.push(c);
    }
    assignment.unmatched_rows.sort_unstable();
    assignment.unmatched_columns.sort_unstable();

    Matches {
        matches: matches
            .into_iter()
            .map(|(r, c, v)| (track_indices[r], detection_indices[c], source(v)))
            .collect(),
        unmatched_tracks: assignment
            .unmatched_rows
            .into_iter()
            .map(|r| track_indices[r])
            .collect(),
        unmatched_detections: assignment
            .unmatched_columns
            .into_iter()
            .map(|c| detection_indices[c])
            .collect(),
    }
}

/// Matching cascade: the tracks which were updated recently get the first chance to claim the
/// detections. Level `l` matches the tracks with `time_since_update == l + 1` against the
/// detections left after the previous levels.
///
pub fn matching_cascade(
    metric: &NearestNeighborDistanceMetric,
    kf: &BoxKalmanFilter,
    cascade_depth: usize,
    tracks: &[Track],
    track_indices: &[usize],
    measurements: &[Measurement],
    detection_indices: &[usize],
) -> Matches {
    let mut unmatched_detections = detection_indices.to_vec();
    let mut matches = Vec::default();

    for level in 0..cascade_depth {
        if unmatched_detections.is_empty() {
            break;
        }

        let level_tracks = track_indices
            .iter()
            .copied()
            .filter(|t| tracks[*t].time_since_update() == level + 1)
            .collect::<Vec<_>>();
        if level_tracks.is_empty() {
            continue;
        }

        let cost = gated_appearance_cost(
            metric,
            kf,
            tracks,
            &level_tracks,
            measurements,
            &unmatched_detections,
        );
        let level_matches = assign(
            &cost,
            metric.matching_threshold(),
            &level_tracks,
            &unmatched_detections,
            MatchSource::Appearance,
        );
        debug!(
            "Cascade level {}: {} tracks, {} matches",
            level,
            level_tracks.len(),
            level_matches.matches.len()
        );

        matches.extend(level_matches.matches);
        unmatched_detections = level_matches.unmatched_detections;
    }

    let matched = matches.iter().map(|(t, _, _)| *t).collect::<HashSet<_>>();
    Matches {
        unmatched_tracks: track_indices
            .iter()
            .copied()
            .filter(|t| !matched.contains(t))
            .collect(),
        matches,
        unmatched_detections,
    }
}

/// IoU stage matching the tracks with the detections by the box overlap only
///
pub fn iou_matching(
    max_iou_distance: f32,
    tracks: &[Track],
    track_indices: &[usize],
    measurements: &[Measurement],
    detection_indices: &[usize],
) -> Matches {
    let cost = iou_cost(tracks, track_indices, measurements, detection_indices);
    assign(
        &cost,
        max_iou_distance,
        track_indices,
        detection_indices,
        MatchSource::IoU,
    )
}
