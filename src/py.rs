use crate::feature::{Feature, FromVec};
use crate::trackers::deep_sort::detection::Detection;
use crate::trackers::deep_sort::metric::VisualMetricType;
use crate::trackers::deep_sort::options::DeepSortOptions;
use crate::trackers::deep_sort::tracker::DeepSort;
use crate::trackers::deep_sort::{DeepSortTrack, WastedDeepSortTrack};
use crate::utils::bbox::BoundingBox;
use crate::utils::nms::nms;
use pyo3::exceptions::PyKeyError;
use pyo3::prelude::*;

type Ltwh = (f32, f32, f32, f32);

fn to_bbox(ltwh: Ltwh) -> BoundingBox {
    BoundingBox::new(ltwh.0, ltwh.1, ltwh.2, ltwh.3)
}

fn to_ltwh(bbox: &BoundingBox) -> Ltwh {
    (bbox.left(), bbox.top(), bbox.width(), bbox.height())
}

#[pyclass(name = "Detection")]
#[derive(Debug, Clone)]
pub struct PyDetection(Detection);

#[pymethods]
impl PyDetection {
    #[new]
    #[pyo3(signature = (ltwh, confidence, feature, class_id = None))]
    fn new(ltwh: Ltwh, confidence: f32, feature: Vec<f32>, class_id: Option<i64>) -> Self {
        let detection = Detection::new(to_bbox(ltwh), confidence, Feature::from_vec(feature));
        Self(match class_id {
            Some(c) => detection.with_class_id(c),
            None => detection,
        })
    }

    #[getter]
    fn ltwh(&self) -> Ltwh {
        to_ltwh(self.0.bbox())
    }

    #[getter]
    fn confidence(&self) -> f32 {
        self.0.confidence()
    }

    fn __repr__(&self) -> String {
        format!("{:?}", self.0)
    }
}

#[pyclass(name = "DeepSortTrack")]
#[derive(Debug, Clone)]
pub struct PyDeepSortTrack(DeepSortTrack);

#[pymethods]
impl PyDeepSortTrack {
    #[getter]
    fn id(&self) -> u64 {
        self.0.id
    }

    #[getter]
    fn ltwh(&self) -> Ltwh {
        to_ltwh(&self.0.bbox)
    }

    #[getter]
    fn tlbr(&self) -> Ltwh {
        let [l, t, r, b] = self.0.bbox.as_tlbr();
        (l, t, r, b)
    }

    #[getter]
    fn state(&self) -> String {
        format!("{:?}", self.0.state)
    }

    #[getter]
    fn time_since_update(&self) -> usize {
        self.0.time_since_update
    }

    #[getter]
    fn hits(&self) -> usize {
        self.0.hits
    }

    #[getter]
    fn age(&self) -> usize {
        self.0.age
    }

    #[getter]
    fn confidence(&self) -> f32 {
        self.0.confidence
    }

    #[getter]
    fn class_id(&self) -> Option<i64> {
        self.0.class_id
    }

    fn is_visible(&self) -> bool {
        self.0.is_visible()
    }

    fn __repr__(&self) -> String {
        format!("{:?}", self.0)
    }
}

#[pyclass(name = "WastedDeepSortTrack")]
#[derive(Debug, Clone)]
pub struct PyWastedDeepSortTrack(WastedDeepSortTrack);

#[pymethods]
impl PyWastedDeepSortTrack {
    #[getter]
    fn id(&self) -> u64 {
        self.0.id
    }

    #[getter]
    fn ltwh(&self) -> Ltwh {
        to_ltwh(&self.0.bbox)
    }

    #[getter]
    fn hits(&self) -> usize {
        self.0.hits
    }

    #[getter]
    fn was_confirmed(&self) -> bool {
        self.0.was_confirmed
    }

    #[getter]
    fn observed_boxes(&self) -> Vec<Ltwh> {
        self.0.observed_boxes.iter().map(to_ltwh).collect()
    }

    fn __repr__(&self) -> String {
        format!("{:?}", self.0)
    }
}

#[pyclass(name = "DeepSort")]
pub struct PyDeepSort(DeepSort);

#[pymethods]
impl PyDeepSort {
    #[new]
    #[pyo3(signature = (
        max_cosine_distance = 0.3,
        nn_budget = None,
        nms_max_overlap = 1.0,
        n_init = 3,
        max_age = 30,
        max_iou_distance = 0.7,
        kept_history_length = 10
    ))]
    fn new(
        max_cosine_distance: f32,
        nn_budget: Option<usize>,
        nms_max_overlap: f32,
        n_init: usize,
        max_age: usize,
        max_iou_distance: f32,
        kept_history_length: usize,
    ) -> Self {
        let opts = DeepSortOptions::default()
            .visual_metric(VisualMetricType::cosine(max_cosine_distance))
            .nn_budget(nn_budget)
            .nms_max_overlap(nms_max_overlap)
            .n_init(n_init)
            .max_age(max_age)
            .max_iou_distance(max_iou_distance)
            .kept_history_length(kept_history_length);
        Self(DeepSort::new(&opts))
    }

    fn predict(&mut self) {
        self.0.predict()
    }

    fn update(&mut self, detections: Vec<PyDetection>) {
        let detections = detections.into_iter().map(|d| d.0).collect::<Vec<_>>();
        self.0.update(&detections)
    }

    fn suppress(&self, detections: Vec<PyDetection>) -> Vec<PyDetection> {
        self.0
            .suppress(detections.into_iter().map(|d| d.0).collect())
            .into_iter()
            .map(PyDetection)
            .collect()
    }

    fn tracks(&self) -> Vec<PyDeepSortTrack> {
        self.0.tracks().into_iter().map(PyDeepSortTrack).collect()
    }

    fn visible_tracks(&self) -> Vec<PyDeepSortTrack> {
        self.0
            .visible_tracks()
            .into_iter()
            .map(PyDeepSortTrack)
            .collect()
    }

    fn track(&self, id: u64) -> PyResult<PyDeepSortTrack> {
        self.0
            .track(id)
            .map(PyDeepSortTrack)
            .map_err(|e| PyKeyError::new_err(e.to_string()))
    }

    fn wasted(&mut self) -> Vec<PyWastedDeepSortTrack> {
        self.0
            .wasted()
            .into_iter()
            .map(PyWastedDeepSortTrack)
            .collect()
    }
}

/// NMS over `(left, top, width, height)` boxes with optional scores, returns the indices of the
/// kept boxes. The GIL is released during the computation.
///
#[pyfunction]
#[pyo3(
    name = "nms",
    signature = (detections, nms_threshold, score_threshold = None)
)]
fn nms_py(
    py: Python<'_>,
    detections: Vec<(Ltwh, Option<f32>)>,
    nms_threshold: f32,
    score_threshold: Option<f32>,
) -> Vec<usize> {
    py.allow_threads(|| {
        let detections = detections
            .into_iter()
            .map(|(b, score)| (to_bbox(b), score))
            .collect::<Vec<_>>();
        nms(&detections, nms_threshold, score_threshold)
    })
}

#[pymodule]
#[pyo3(name = "deepsort")]
fn deepsort(m: &Bound<'_, PyModule>) -> PyResult<()> {
    pyo3_log::init();

    m.add_class::<PyDetection>()?;
    m.add_class::<PyDeepSortTrack>()?;
    m.add_class::<PyWastedDeepSortTrack>()?;
    m.add_class::<PyDeepSort>()?;
    m.add_function(wrap_pyfunction!(nms_py, m)?)?;
    Ok(())
}
