use crate::feature::{Feature, FromVec};
use crate::utils::bbox::{BoundingBox, XyahBox};
use crate::utils::nms::nms;
use crate::Errors;
use anyhow::Result;

/// Single-frame observation: the box and the confidence received from a detector and the
/// appearance feature received from a re-identification model
///
#[derive(Debug, Clone)]
pub struct Detection {
    bbox: BoundingBox,
    confidence: f32,
    feature: Feature,
    class_id: Option<i64>,
}

impl Detection {
    pub fn new(bbox: BoundingBox, confidence: f32, feature: Feature) -> Self {
        Self {
            bbox,
            confidence,
            feature,
            class_id: None,
        }
    }

    /// Attaches the user-defined class id which is passed to the track the detection is merged with
    ///
    pub fn with_class_id(mut self, class_id: i64) -> Self {
        self.class_id = Some(class_id);
        self
    }

    /// Builds detections from the parallel outputs of the detector and the feature extractor
    ///
    pub fn zip(
        boxes: &[BoundingBox],
        confidences: &[f32],
        features: &[Vec<f32>],
    ) -> Result<Vec<Detection>> {
        if boxes.len() != confidences.len() || boxes.len() != features.len() {
            return Err(Errors::DetectionFeatureMismatch(
                boxes.len(),
                confidences.len(),
                features.len(),
            )
            .into());
        }

        if let Some(first) = features.first() {
            if let Some(f) = features.iter().find(|f| f.len() != first.len()) {
                return Err(Errors::FeatureLengthMismatch(first.len(), f.len()).into());
            }
        }

        Ok(boxes
            .iter()
            .zip(confidences)
            .zip(features)
            .map(|((bbox, confidence), feature)| {
                Detection::new(*bbox, *confidence, Feature::from_vec(feature.as_slice()))
            })
            .collect())
    }

    /// Removes overlapping detections with NMS, the survivors are ordered by decreasing confidence
    ///
    pub fn suppress(detections: Vec<Detection>, nms_max_overlap: f32) -> Vec<Detection> {
        let boxes = detections
            .iter()
            .map(|d| (d.bbox, Some(d.confidence)))
            .collect::<Vec<_>>();

        let mut detections = detections.into_iter().map(Some).collect::<Vec<_>>();
        nms(&boxes, nms_max_overlap, None)
            .into_iter()
            .filter_map(|i| detections[i].take())
            .collect()
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn feature(&self) -> &Feature {
        &self.feature
    }

    pub fn class_id(&self) -> Option<i64> {
        self.class_id
    }

    pub fn to_tlbr(&self) -> [f32; 4] {
        self.bbox.as_tlbr()
    }

    pub fn to_xyah(&self) -> Result<XyahBox> {
        self.bbox.as_xyah()
    }
}
