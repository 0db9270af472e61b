use crate::trackers::deep_sort::detection::Detection;
use crate::trackers::deep_sort::matching::{iou_matching, matching_cascade, Matches, Measurement};
use crate::trackers::deep_sort::metric::NearestNeighborDistanceMetric;
use crate::trackers::deep_sort::options::DeepSortOptions;
use crate::trackers::deep_sort::track::Track;
use crate::trackers::deep_sort::{DeepSortTrack, WastedDeepSortTrack};
use crate::utils::kalman::kalman_bbox::BoxKalmanFilter;
use crate::Errors;
use anyhow::Result;
use log::{debug, warn};

/// DeepSORT multi-target tracker
///
/// Every frame the caller invokes [predict](DeepSort::predict) and then
/// [update](DeepSort::update) with the detections of the frame.
///
#[derive(Debug)]
pub struct DeepSort {
    opts: DeepSortOptions,
    metric: NearestNeighborDistanceMetric,
    kf: BoxKalmanFilter,
    tracks: Vec<Track>,
    wasted_store: Vec<WastedDeepSortTrack>,
    track_id: u64,
}

impl DeepSort {
    /// Creates new tracker
    ///
    /// # Parameters
    /// * `opts` - tracker options
    ///
    pub fn new(opts: &DeepSortOptions) -> Self {
        Self {
            metric: NearestNeighborDistanceMetric::new(opts.visual_metric, opts.nn_budget),
            kf: BoxKalmanFilter::new(opts.kalman_position_weight, opts.kalman_velocity_weight),
            opts: opts.clone(),
            tracks: Vec::default(),
            wasted_store: Vec::default(),
            track_id: 0,
        }
    }

    /// Propagates the track state distributions one time step forward. Must be called once per
    /// frame before [update](DeepSort::update).
    ///
    pub fn predict(&mut self) {
        for t in &mut self.tracks {
            t.predict(&self.kf);
        }
    }

    /// Performs measurement update and track management
    ///
    /// The detections with a non-positive width or height are skipped.
    ///
    /// # Parameters
    /// * `detections` - the detections of the current frame
    ///
    pub fn update(&mut self, detections: &[Detection]) {
        let measurements = detections
            .iter()
            .enumerate()
            .filter_map(|(i, detection)| match detection.to_xyah() {
                Ok(xyah) => Some(Measurement { detection, xyah }),
                Err(e) => {
                    warn!("Detection {} is skipped: {}", i, e);
                    None
                }
            })
            .collect::<Vec<_>>();

        let matches = self.associate(&measurements);

        for (t, d, source) in matches.matches {
            let m = &measurements[d];
            self.tracks[t].update(&self.kf, m.detection, &m.xyah, source);
        }

        for t in matches.unmatched_tracks {
            self.tracks[t].mark_missed();
        }

        for d in matches.unmatched_detections {
            self.initiate_track(&measurements[d]);
        }

        let (wasted, tracks): (Vec<_>, Vec<_>) = std::mem::take(&mut self.tracks)
            .into_iter()
            .partition(|t| t.is_deleted());
        self.tracks = tracks;
        if !wasted.is_empty() {
            debug!(
                "Tracks deleted: {:?}",
                wasted.iter().map(|t| t.track_id()).collect::<Vec<_>>()
            );
        }
        self.wasted_store
            .extend(wasted.into_iter().map(WastedDeepSortTrack::from));

        self.fit_metric();
    }

    /// Applies NMS with the configured `nms_max_overlap` to the detections
    ///
    pub fn suppress(&self, detections: Vec<Detection>) -> Vec<Detection> {
        Detection::suppress(detections, self.opts.nms_max_overlap)
    }

    /// Snapshots of all tracks kept by the tracker
    ///
    pub fn tracks(&self) -> Vec<DeepSortTrack> {
        self.tracks.iter().map(DeepSortTrack::from).collect()
    }

    /// Snapshots of the tracks which are confirmed and were updated in the current or the previous frame
    ///
    pub fn visible_tracks(&self) -> Vec<DeepSortTrack> {
        self.tracks
            .iter()
            .map(DeepSortTrack::from)
            .filter(|t| t.is_visible())
            .collect()
    }

    /// Snapshot of the track with `id`
    ///
    pub fn track(&self, id: u64) -> Result<DeepSortTrack> {
        self.tracks
            .iter()
            .find(|t| t.track_id() == id)
            .map(DeepSortTrack::from)
            .ok_or_else(|| Errors::MissingTrack(id).into())
    }

    /// Receive the tracks deleted since the last call
    ///
    pub fn wasted(&mut self) -> Vec<WastedDeepSortTrack> {
        std::mem::take(&mut self.wasted_store)
    }

    pub fn metric(&self) -> &NearestNeighborDistanceMetric {
        &self.metric
    }

    fn associate(&self, measurements: &[Measurement]) -> Matches {
        let (confirmed, unconfirmed): (Vec<usize>, Vec<usize>) =
            (0..self.tracks.len()).partition(|t| self.tracks[*t].is_confirmed());
        let detection_indices = (0..measurements.len()).collect::<Vec<_>>();

        let cascade = matching_cascade(
            &self.metric,
            &self.kf,
            self.opts.max_age,
            &self.tracks,
            &confirmed,
            measurements,
            &detection_indices,
        );

        // the tracks missed in the previous frame get the second chance by IoU
        let (recent, stale): (Vec<usize>, Vec<usize>) = cascade
            .unmatched_tracks
            .into_iter()
            .partition(|t| self.tracks[*t].time_since_update() == 1);
        let iou_candidates = unconfirmed.into_iter().chain(recent).collect::<Vec<_>>();

        let iou = iou_matching(
            self.opts.max_iou_distance,
            &self.tracks,
            &iou_candidates,
            measurements,
            &cascade.unmatched_detections,
        );

        debug!(
            "Matched by appearance: {}, by IoU: {}, new detections: {}",
            cascade.matches.len(),
            iou.matches.len(),
            iou.unmatched_detections.len()
        );

        Matches {
            matches: cascade.matches.into_iter().chain(iou.matches).collect(),
            unmatched_tracks: stale.into_iter().chain(iou.unmatched_tracks).collect(),
            unmatched_detections: iou.unmatched_detections,
        }
    }

    fn initiate_track(&mut self, m: &Measurement) {
        self.track_id += 1;
        self.tracks.push(Track::new(
            self.track_id,
            self.kf.initiate(&m.xyah),
            m.detection,
            self.opts.n_init,
            self.opts.max_age,
            self.opts.kept_history_length,
        ));
    }

    /// Hands the features of the confirmed tracks over to the metric and forgets the galleries of
    /// the tracks which are no longer confirmed
    ///
    fn fit_metric(&mut self) {
        let mut features = Vec::default();
        let mut active_targets = Vec::default();
        for t in self.tracks.iter_mut().filter(|t| t.is_confirmed()) {
            let id = t.track_id();
            active_targets.push(id);
            features.extend(t.take_features().into_iter().map(|f| (id, f)));
        }
        self.metric.partial_fit(features, &active_targets);
    }
}

#[cfg(test)]
mod tests {
    use crate::examples::{unit_vector, BoxGen2, FeatGen};
    use crate::feature::{Feature, FromVec};
    use crate::trackers::deep_sort::detection::Detection;
    use crate::trackers::deep_sort::metric::{NearestNeighborDistanceMetric, VisualMetricType};
    use crate::trackers::deep_sort::options::DeepSortOptions;
    use crate::trackers::deep_sort::tracker::DeepSort;
    use crate::trackers::deep_sort::{MatchSource, TrackState};
    use crate::utils::bbox::BoundingBox;
    use crate::Errors;

    fn detection(bbox: BoundingBox, axis: usize) -> Detection {
        Detection::new(bbox, 0.9, Feature::from_vec(unit_vector(16, axis)))
    }

    fn frame(tracker: &mut DeepSort, detections: &[Detection]) {
        tracker.predict();
        tracker.update(detections);
    }

    #[test]
    fn confirmation() {
        let mut tracker = DeepSort::new(&DeepSortOptions::default());
        let d = detection(BoundingBox::new(10.0, 10.0, 50.0, 100.0), 0);

        frame(&mut tracker, &[d.clone()]);
        let tracks = tracker.tracks();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].id, 1);
        assert_eq!(tracks[0].state, TrackState::Tentative);
        assert_eq!(tracks[0].match_source, MatchSource::Initiated);
        assert!(tracker.visible_tracks().is_empty());

        frame(&mut tracker, &[d.clone()]);
        frame(&mut tracker, &[d]);
        let tracks = tracker.tracks();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].id, 1);
        assert_eq!(tracks[0].state, TrackState::Confirmed);
        assert_eq!(tracks[0].hits, 3);
        assert!(matches!(tracks[0].match_source, MatchSource::IoU(_)));
        assert_eq!(tracker.visible_tracks().len(), 1);

        // the features collected while the track was tentative are in the gallery now
        assert_eq!(tracker.metric().gallery_len(1), 3);
    }

    #[test]
    fn single_hit_confirmation() {
        let mut tracker = DeepSort::new(&DeepSortOptions::default().n_init(1));
        frame(
            &mut tracker,
            &[detection(BoundingBox::new(10.0, 10.0, 50.0, 100.0), 0)],
        );
        let visible = tracker.visible_tracks();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, 1);
        assert_eq!(visible[0].state, TrackState::Confirmed);
        assert_eq!(tracker.metric().gallery_len(1), 1);
    }

    #[test]
    fn far_detection_starts_new_track() {
        let opts = DeepSortOptions::default().n_init(1);
        let mut tracker = DeepSort::new(&opts);
        // the gated pairs must be excluded even with the widest threshold allowed
        tracker.metric = NearestNeighborDistanceMetric::new(VisualMetricType::Euclidean(2e5), None);

        frame(
            &mut tracker,
            &[detection(BoundingBox::new(10.0, 10.0, 50.0, 100.0), 0)],
        );
        frame(
            &mut tracker,
            &[detection(BoundingBox::new(3000.0, 2000.0, 50.0, 100.0), 0)],
        );

        let mut tracks = tracker.tracks();
        tracks.sort_by_key(|t| t.id);
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].time_since_update, 1);
        assert_eq!(tracks[0].bbox, BoundingBox::new(10.0, 10.0, 50.0, 100.0));
        assert_eq!(tracks[1].id, 2);
        assert_eq!(tracks[1].match_source, MatchSource::Initiated);
    }

    #[test]
    fn tentative_track_is_deleted_on_miss() {
        let mut tracker = DeepSort::new(&DeepSortOptions::default());
        frame(
            &mut tracker,
            &[detection(BoundingBox::new(10.0, 10.0, 50.0, 100.0), 0)],
        );
        frame(&mut tracker, &[]);
        assert!(tracker.tracks().is_empty());

        let wasted = tracker.wasted();
        assert_eq!(wasted.len(), 1);
        assert!(!wasted[0].was_confirmed);
        assert!(tracker.wasted().is_empty());
    }

    #[test]
    fn confirmed_track_expires() {
        let opts = DeepSortOptions::default().n_init(2).max_age(5);
        let mut tracker = DeepSort::new(&opts);
        let d = detection(BoundingBox::new(10.0, 10.0, 50.0, 100.0), 0);
        frame(&mut tracker, &[d.clone()]);
        frame(&mut tracker, &[d]);
        assert_eq!(tracker.track(1).unwrap().state, TrackState::Confirmed);

        for tsu in 1..=5 {
            frame(&mut tracker, &[]);
            let t = tracker.track(1).unwrap();
            assert_eq!(t.state, TrackState::Confirmed);
            assert_eq!(t.time_since_update, tsu);
            assert_eq!(t.is_visible(), tsu <= 1);
        }

        frame(&mut tracker, &[]);
        assert!(tracker.tracks().is_empty());
        let err = tracker.track(1).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Errors>(),
            Some(Errors::MissingTrack(1))
        ));
        assert!(tracker.metric().targets().is_empty());

        let wasted = tracker.wasted();
        assert_eq!(wasted.len(), 1);
        assert!(wasted[0].was_confirmed);
        assert_eq!(wasted[0].observed_boxes.len(), 2);
    }

    #[test]
    fn occluded_track_keeps_identity() {
        let opts = DeepSortOptions::default().n_init(2);
        let mut tracker = DeepSort::new(&opts);
        let d = detection(BoundingBox::new(100.0, 50.0, 40.0, 80.0), 3);
        frame(&mut tracker, &[d.clone()]);
        frame(&mut tracker, &[d.clone()]);

        for _ in 0..3 {
            frame(&mut tracker, &[]);
        }
        assert_eq!(tracker.track(1).unwrap().time_since_update, 3);

        frame(&mut tracker, &[d]);
        let tracks = tracker.tracks();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].id, 1);
        assert_eq!(tracks[0].time_since_update, 0);
        assert_eq!(tracks[0].hits, 3);
        assert!(matches!(
            tracks[0].match_source,
            MatchSource::Appearance(_)
        ));
    }

    #[test]
    fn degenerate_detections_are_skipped() {
        let mut tracker = DeepSort::new(&DeepSortOptions::default());
        frame(&mut tracker, &[]);
        assert!(tracker.tracks().is_empty());

        frame(
            &mut tracker,
            &[
                detection(BoundingBox::new(10.0, 10.0, 0.0, 100.0), 0),
                detection(BoundingBox::new(10.0, 10.0, 50.0, 100.0), 1),
            ],
        );
        let tracks = tracker.tracks();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].id, 1);
        assert_eq!(tracks[0].bbox, BoundingBox::new(10.0, 10.0, 50.0, 100.0));
    }

    #[test]
    fn suppression() {
        let opts = DeepSortOptions::default().nms_max_overlap(0.7);
        let tracker = DeepSort::new(&opts);
        let detections = vec![
            Detection::new(
                BoundingBox::new(0.0, 0.0, 100.0, 90.0),
                0.4,
                Feature::from_vec(unit_vector(16, 0)),
            ),
            Detection::new(
                BoundingBox::new(0.0, 0.0, 100.0, 100.0),
                0.9,
                Feature::from_vec(unit_vector(16, 0)),
            ),
        ];
        let kept = tracker.suppress(detections);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].confidence(), 0.9);
    }

    #[test]
    fn identities_are_stable() {
        let opts = DeepSortOptions::default().nn_budget(Some(10));
        let mut tracker = DeepSort::new(&opts);
        let mut boxes1 = BoxGen2::new(100.0, 100.0, 50.0, 100.0, 1.0, 0.5);
        let mut boxes2 = BoxGen2::new(600.0, 100.0, 50.0, 100.0, 1.0, 0.5);
        let mut feats1 = FeatGen::new(unit_vector(16, 0), 0.05);
        let mut feats2 = FeatGen::new(unit_vector(16, 1), 0.05);

        for i in 0..50 {
            let b1 = boxes1.next().unwrap();
            let b2 = boxes2.next().unwrap();
            frame(
                &mut tracker,
                &[
                    Detection::new(b1, 0.9, feats1.next().unwrap()),
                    Detection::new(b2, 0.8, feats2.next().unwrap()),
                ],
            );

            let mut tracks = tracker.tracks();
            tracks.sort_by_key(|t| t.id);
            assert_eq!(tracks.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1, 2]);
            assert!((tracks[0].bbox.left() - b1.left()).abs() < 10.0);
            assert!((tracks[1].bbox.left() - b2.left()).abs() < 10.0);
            if i >= 2 {
                assert_eq!(tracker.visible_tracks().len(), 2);
            }
        }
        assert_eq!(tracker.metric().gallery_len(1), 10);
        assert_eq!(tracker.metric().gallery_len(2), 10);
    }
}
