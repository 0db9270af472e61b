use anyhow::Result;
use deepsort::examples::{unit_vector, BoxGen2, FeatGen};
use deepsort::feature::FromVec;
use deepsort::trackers::deep_sort::detection::Detection;
use deepsort::trackers::deep_sort::options::DeepSortOptions;
use deepsort::trackers::deep_sort::tracker::DeepSort;
use deepsort::utils::bbox::BoundingBox;
use log::info;

const FEATURE_DIM: usize = 128;
const MAX_AGE: usize = 30;

/// Stands for the detector, called once per frame
struct Scene {
    objects: Vec<(BoxGen2, f32)>,
}

impl Scene {
    fn detect(&mut self) -> (Vec<BoundingBox>, Vec<f32>) {
        self.objects
            .iter_mut()
            .filter_map(|(g, confidence)| g.next().map(|b| (b, *confidence)))
            .unzip()
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let opts = DeepSortOptions::default()
        .nn_budget(Some(100))
        .nms_max_overlap(0.9)
        .max_age(MAX_AGE);
    let mut tracker = DeepSort::new(&opts);

    let mut scene = Scene {
        objects: vec![
            (BoxGen2::new_monotonous(100.0, 100.0, 40.0, 80.0, 2.0, 0.5), 0.9),
            (BoxGen2::new_monotonous(400.0, 120.0, 35.0, 70.0, 2.0, 0.5), 0.8),
            (BoxGen2::new(250.0, 300.0, 50.0, 90.0, 1.0, 0.5), 0.7),
        ],
    };
    let mut reid = (0..scene.objects.len())
        .map(|i| FeatGen::new(unit_vector(FEATURE_DIM, i), 0.05))
        .collect::<Vec<_>>();

    for frame in 0..100 {
        let (boxes, confidences) = scene.detect();
        let features = reid
            .iter_mut()
            .filter_map(|g| g.next())
            .map(|f| Vec::<f32>::from_vec(&f))
            .collect::<Vec<_>>();

        let detections = tracker.suppress(Detection::zip(&boxes, &confidences, &features)?);
        tracker.predict();
        tracker.update(&detections);

        for t in tracker.visible_tracks() {
            info!(
                "Frame {}: track {} at {:?}, hits={}",
                frame,
                t.id,
                t.bbox.as_ltwh(),
                t.hits
            );
        }
    }

    // the objects leave the scene
    for _ in 0..=MAX_AGE {
        tracker.predict();
        tracker.update(&[]);
    }

    for t in tracker.wasted() {
        eprintln!(
            "Track id: {}, hits: {}, last boxes: {:#?}",
            t.id, t.hits, t.observed_boxes
        );
    }
    Ok(())
}

