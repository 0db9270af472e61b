use crate::distance::{cosine_distance, euclidean};
use crate::feature::Feature;
use crate::trackers::deep_sort::metric::VisualMetricType::{Cosine, Euclidean};
use crate::utils::linear_sum_assignment::INFTY_COST;
use nalgebra::DMatrix;
use std::collections::{HashMap, HashSet, VecDeque};

/// Appearance distance with the matching threshold: the pairs which distance is greater than the
/// threshold are never matched by appearance.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VisualMetricType {
    /// `1 - cos(a, b)`, lays within `[0.0; 2.0]`
    Cosine(f32),
    /// Euclidean distance
    Euclidean(f32),
}

impl Default for VisualMetricType {
    fn default() -> Self {
        Cosine(0.3)
    }
}

impl VisualMetricType {
    pub fn cosine(threshold: f32) -> Self {
        assert!(
            (0.0..=2.0).contains(&threshold),
            "Threshold must lay within [0.0:2.0]"
        );
        Cosine(threshold)
    }

    pub fn euclidean(threshold: f32) -> Self {
        assert!(
            threshold > 0.0 && threshold < INFTY_COST,
            "Threshold must lay within (0.0:INFTY_COST)"
        );
        Euclidean(threshold)
    }

    pub fn threshold(&self) -> f32 {
        match self {
            Euclidean(t) | Cosine(t) => *t,
        }
    }

    /// Distance between two features, a broken (NaN) feature is infinitely far from anything
    ///
    pub fn distance(&self, f1: &Feature, f2: &Feature) -> f32 {
        let d = match self {
            Cosine(_) => cosine_distance(f1, f2),
            Euclidean(_) => euclidean(f1, f2),
        };
        if d.is_nan() {
            INFTY_COST
        } else {
            d.max(0.0)
        }
    }
}

/// Nearest neighbor distance metric. For every target it keeps the gallery of the recent features
/// and reports the smallest distance between the query feature and the gallery.
///
#[derive(Debug, Clone, Default)]
pub struct NearestNeighborDistanceMetric {
    kind: VisualMetricType,
    budget: Option<usize>,
    samples: HashMap<u64, VecDeque<Feature>>,
}

impl NearestNeighborDistanceMetric {
    /// Constructor
    ///
    /// # Parameters
    /// * `kind` - distance function and the matching threshold;
    /// * `budget` - the maximum number of features kept for a target, the oldest are dropped first; `None` means unlimited.
    ///
    pub fn new(kind: VisualMetricType, budget: Option<usize>) -> Self {
        assert!(
            budget.map(|b| b > 0).unwrap_or(true),
            "Budget must be a positive number"
        );
        Self {
            kind,
            budget,
            samples: HashMap::default(),
        }
    }

    pub fn kind(&self) -> VisualMetricType {
        self.kind
    }

    pub fn budget(&self) -> Option<usize> {
        self.budget
    }

    pub fn matching_threshold(&self) -> f32 {
        self.kind.threshold()
    }

    /// Adds the features to the galleries of their targets and forgets every target which is not
    /// listed in `active_targets`
    ///
    pub fn partial_fit(&mut self, features: Vec<(u64, Feature)>, active_targets: &[u64]) {
        for (target, feature) in features {
            let gallery = self.samples.entry(target).or_default();
            gallery.push_back(feature);
            if let Some(budget) = self.budget {
                while gallery.len() > budget {
                    gallery.pop_front();
                }
            }
        }

        let active = active_targets.iter().collect::<HashSet<_>>();
        self.samples.retain(|target, _| active.contains(target));
    }

    /// The distance matrix of shape `targets x features`. The cell holds the smallest distance
    /// between the feature and the target's gallery, the targets without gallery get [INFTY_COST].
    ///
    pub fn distance(&self, targets: &[u64], features: &[&Feature]) -> DMatrix<f32> {
        DMatrix::from_fn(targets.len(), features.len(), |row, col| {
            match self.samples.get(&targets[row]) {
                Some(gallery) if !gallery.is_empty() => gallery
                    .iter()
                    .map(|g| self.kind.distance(g, features[col]))
                    .fold(f32::INFINITY, f32::min)
                    .min(INFTY_COST),
                _ => INFTY_COST,
            }
        })
    }

    pub fn gallery(&self, target: u64) -> Option<&VecDeque<Feature>> {
        self.samples.get(&target)
    }

    pub fn gallery_len(&self, target: u64) -> usize {
        self.samples.get(&target).map(|g| g.len()).unwrap_or(0)
    }

    /// Targets which have a gallery
    ///
    pub fn targets(&self) -> Vec<u64> {
        let mut targets = self.samples.keys().copied().collect::<Vec<_>>();
        targets.sort_unstable();
        targets
    }
}

#[cfg(test)]
mod tests {
    use crate::examples::unit_vector;
    use crate::feature::{Feature, FromVec};
    use crate::trackers::deep_sort::metric::{NearestNeighborDistanceMetric, VisualMetricType};
    use crate::utils::linear_sum_assignment::INFTY_COST;
    use crate::EPS;

    fn feat(axis: usize) -> Feature {
        Feature::from_vec(unit_vector(4, axis))
    }

    #[test]
    fn metric_type() {
        let m = VisualMetricType::cosine(0.2);
        assert_eq!(m.threshold(), 0.2);
        assert!(m.distance(&feat(0), &feat(0)).abs() < EPS);
        assert!((m.distance(&feat(0), &feat(1)) - 1.0).abs() < EPS);

        let m = VisualMetricType::euclidean(0.5);
        assert!((m.distance(&feat(0), &feat(1)) - 2.0_f32.sqrt()).abs() < EPS);
        assert_eq!(VisualMetricType::default(), VisualMetricType::Cosine(0.3));
    }

    #[test]
    fn broken_feature_never_matches() {
        let broken = Feature::from_vec(vec![f32::NAN, 0.0, 0.0, 0.0]);
        for kind in [VisualMetricType::cosine(0.3), VisualMetricType::euclidean(0.5)] {
            assert_eq!(kind.distance(&broken, &feat(0)), INFTY_COST);
            assert_eq!(kind.distance(&feat(0), &broken), INFTY_COST);
        }

        let mut metric = NearestNeighborDistanceMetric::new(VisualMetricType::cosine(0.3), None);
        metric.partial_fit(vec![(1, feat(0))], &[1]);
        assert_eq!(metric.distance(&[1], &[&broken])[(0, 0)], INFTY_COST);
    }

    #[test]
    #[should_panic]
    fn wrong_euclidean_threshold() {
        VisualMetricType::euclidean(INFTY_COST);
    }

    #[test]
    #[should_panic]
    fn wrong_cosine_threshold() {
        VisualMetricType::cosine(2.5);
    }

    #[test]
    fn budget_is_enforced() {
        let mut metric = NearestNeighborDistanceMetric::new(VisualMetricType::cosine(0.3), Some(2));
        metric.partial_fit(vec![(1, feat(0)), (1, feat(1)), (1, feat(2))], &[1]);
        assert_eq!(metric.gallery_len(1), 2);

        // the oldest feature was dropped
        let d = metric.distance(&[1], &[&feat(0), &feat(2)]);
        assert!((d[(0, 0)] - 1.0).abs() < EPS);
        assert!(d[(0, 1)].abs() < EPS);

        let mut metric = NearestNeighborDistanceMetric::new(VisualMetricType::cosine(0.3), None);
        metric.partial_fit((0..50).map(|_| (1, feat(0))).collect(), &[1]);
        assert_eq!(metric.gallery_len(1), 50);
    }

    #[test]
    fn inactive_targets_are_forgotten() {
        let mut metric = NearestNeighborDistanceMetric::new(VisualMetricType::cosine(0.3), None);
        metric.partial_fit(vec![(1, feat(0)), (2, feat(1))], &[1, 2]);
        assert_eq!(metric.targets(), vec![1, 2]);

        metric.partial_fit(vec![], &[2, 3]);
        assert_eq!(metric.targets(), vec![2]);
        assert!(metric.gallery(1).is_none());
        assert_eq!(metric.gallery_len(3), 0);
    }

    #[test]
    fn nearest_neighbor() {
        let mut metric = NearestNeighborDistanceMetric::new(VisualMetricType::cosine(0.3), None);
        metric.partial_fit(vec![(1, feat(0)), (1, feat(1)), (2, feat(2))], &[1, 2]);

        let d = metric.distance(&[1, 2, 7], &[&feat(1), &feat(2)]);
        assert_eq!(d.shape(), (3, 2));
        assert!(d[(0, 0)].abs() < EPS);
        assert!((d[(0, 1)] - 1.0).abs() < EPS);
        assert!((d[(1, 0)] - 1.0).abs() < EPS);
        assert!(d[(1, 1)].abs() < EPS);
        assert_eq!(d[(2, 0)], INFTY_COST);
        assert_eq!(d[(2, 1)], INFTY_COST);

        let d = metric.distance(&[], &[&feat(1)]);
        assert_eq!(d.shape(), (0, 1));
    }
}
