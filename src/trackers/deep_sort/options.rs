use crate::trackers::deep_sort::metric::VisualMetricType;
use crate::utils::linear_sum_assignment::INFTY_COST;

/// Class that is used to configure the DeepSORT tracker
///
/// By default: cosine metric with `0.3` threshold, unlimited galleries, NMS disabled, `n_init=3`,
/// `max_age=30`, `max_iou_distance=0.7`.
///
#[derive(Debug, Clone)]
pub struct DeepSortOptions {
    pub(crate) visual_metric: VisualMetricType,
    pub(crate) nn_budget: Option<usize>,
    pub(crate) nms_max_overlap: f32,
    pub(crate) n_init: usize,
    pub(crate) max_age: usize,
    pub(crate) max_iou_distance: f32,
    pub(crate) kalman_position_weight: f32,
    pub(crate) kalman_velocity_weight: f32,
    pub(crate) kept_history_length: usize,
}

impl Default for DeepSortOptions {
    fn default() -> Self {
        Self {
            visual_metric: VisualMetricType::default(),
            nn_budget: None,
            nms_max_overlap: 1.0,
            n_init: 3,
            max_age: 30,
            max_iou_distance: 0.7,
            kalman_position_weight: 1.0 / 20.0,
            kalman_velocity_weight: 1.0 / 160.0,
            kept_history_length: 10,
        }
    }
}

impl DeepSortOptions {
    /// The appearance distance and the gating threshold of the matching cascade. The one you
    /// choose is defined by the ReID model used.
    ///
    pub fn visual_metric(mut self, metric: VisualMetricType) -> Self {
        let threshold = metric.threshold();
        assert!(
            threshold >= 0.0 && threshold < INFTY_COST,
            "Threshold must lay within [0.0:INFTY_COST)"
        );
        self.visual_metric = metric;
        self
    }

    /// The maximum number of appearance features kept per track, the oldest ones are dropped
    /// first. `None` keeps all of them.
    ///
    pub fn nn_budget(mut self, budget: Option<usize>) -> Self {
        assert!(
            budget.map(|b| b > 0).unwrap_or(true),
            "Budget must be a positive number"
        );
        self.nn_budget = budget;
        self
    }

    /// The IoU above which the lower-scored detection is suppressed by
    /// [DeepSort::suppress](crate::trackers::deep_sort::tracker::DeepSort::suppress). `1.0` keeps every detection.
    ///
    pub fn nms_max_overlap(mut self, overlap: f32) -> Self {
        assert!(
            (0.0..=1.0).contains(&overlap),
            "Overlap must lay within [0.0:1.0]"
        );
        self.nms_max_overlap = overlap;
        self
    }

    /// The number of consecutive hits required to confirm the track
    ///
    pub fn n_init(mut self, n: usize) -> Self {
        assert!(n > 0, "The number of hits must be a positive number");
        self.n_init = n;
        self
    }

    /// The number of frames the confirmed track survives without observations.
    ///
    /// It also sets the depth of the matching cascade: the tracks which missed more frames than
    /// `max_age` are never matched.
    ///
    pub fn max_age(mut self, n: usize) -> Self {
        assert!(n > 0, "Max age must be a positive number");
        self.max_age = n;
        self
    }

    /// The largest `1 - IoU` which still allows the IoU stage to match the detection with the track
    ///
    pub fn max_iou_distance(mut self, distance: f32) -> Self {
        assert!(
            (0.0..=1.0).contains(&distance),
            "IoU distance must lay within [0.0:1.0]"
        );
        self.max_iou_distance = distance;
        self
    }

    pub fn kalman_position_weight(mut self, weight: f32) -> Self {
        assert!(weight > 0.0, "Weight must be a positive number");
        self.kalman_position_weight = weight;
        self
    }

    pub fn kalman_velocity_weight(mut self, weight: f32) -> Self {
        assert!(weight > 0.0, "Weight must be a positive number");
        self.kalman_velocity_weight = weight;
        self
    }

    /// The number of last observed boxes kept within the track and returned with the wasted
    /// track.
    ///
    pub fn kept_history_length(mut self, n: usize) -> Self {
        assert!(n > 0, "History length must be a positive number");
        self.kept_history_length = n;
        self
    }
}
