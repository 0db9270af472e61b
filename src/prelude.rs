pub use crate::feature::{Feature, FromVec};
pub use crate::trackers::deep_sort::detection::Detection;
pub use crate::trackers::deep_sort::metric::{NearestNeighborDistanceMetric, VisualMetricType};
pub use crate::trackers::deep_sort::options::DeepSortOptions;
pub use crate::trackers::deep_sort::tracker::DeepSort;
pub use crate::trackers::deep_sort::{DeepSortTrack, MatchSource, TrackState, WastedDeepSortTrack};
pub use crate::utils::bbox::{BoundingBox, XyahBox};
pub use crate::utils::nms::nms;
