use crate::utils::bbox::BoundingBox;
use itertools::Itertools;
use std::collections::HashSet;

#[derive(Clone, Debug)]
struct Candidate<'a> {
    bbox: &'a BoundingBox,
    rank: f32,
    index: usize,
}

impl<'a> Candidate<'a> {
    pub fn new(bbox: &'a BoundingBox, rank: &Option<f32>, index: usize) -> Self {
        Self {
            bbox,
            rank: rank.unwrap_or(bbox.height()),
            index,
        }
    }
}

/// NMS algorithm implementation
///
/// Returns the indices of the kept detections ordered by decreasing score. The candidates with the
/// same score keep the order they have in `detections`, so the earlier one suppresses the later one.
///
/// # Parameters
/// * `detections` - boxes with optional scores to filter out with NMS; if `detection.1` is `None`, that the score is set as `detection.0.height`;
/// * `nms_threshold` - the box is excluded when its IoU with a higher-ranked kept box is greater than the threshold; `1.0` disables the suppression;
/// * `score_threshold` - when to exclude the box from set by initial score. if `score_threshold` is None, then `f32::MIN` is used.
///
pub fn nms(
    detections: &[(BoundingBox, Option<f32>)],
    nms_threshold: f32,
    score_threshold: Option<f32>,
) -> Vec<usize> {
    let score_threshold = score_threshold.unwrap_or(f32::MIN);
    let nms_boxes = detections
        .iter()
        .enumerate()
        .filter(|(_, (b, score))| {
            score.unwrap_or(f32::MAX) > score_threshold && !b.is_degenerate()
        })
        .map(|(index, (b, score))| Candidate::new(b, score, index))
        .sorted_by(|a, b| b.rank.total_cmp(&a.rank))
        .collect::<Vec<_>>();

    let mut excluded = HashSet::new();

    for (index, cb) in nms_boxes.iter().enumerate() {
        if excluded.contains(&cb.index) {
            continue;
        }

        for ob in &nms_boxes[index + 1..] {
            if excluded.contains(&ob.index) {
                continue;
            }

            if BoundingBox::iou(cb.bbox, ob.bbox) > nms_threshold {
                excluded.insert(ob.index);
            }
        }
    }

    nms_boxes
        .into_iter()
        .filter(|e| !excluded.contains(&e.index))
        .map(|e| e.index)
        .collect()
}
