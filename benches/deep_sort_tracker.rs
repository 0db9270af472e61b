#![feature(test)]

extern crate test;

use deepsort::examples::{unit_vector, BoxGen2, FeatGen};
use deepsort::trackers::deep_sort::detection::Detection;
use deepsort::trackers::deep_sort::options::DeepSortOptions;
use deepsort::trackers::deep_sort::tracker::DeepSort;
use test::Bencher;

const FEATURE_DIM: usize = 128;

#[bench]
fn deep_sort_00010(b: &mut Bencher) {
    bench_deep_sort(10, b);
}

#[bench]
fn deep_sort_00050(b: &mut Bencher) {
    bench_deep_sort(50, b);
}

#[bench]
fn deep_sort_00100(b: &mut Bencher) {
    bench_deep_sort(100, b);
}

fn bench_deep_sort(objects: usize, b: &mut Bencher) {
    let mut generators = (0..objects)
        .map(|i| {
            (
                BoxGen2::new((i % 20) as f32 * 100.0, (i / 20) as f32 * 200.0, 50.0, 100.0, 1.0, 0.2),
                FeatGen::new(unit_vector(FEATURE_DIM, i % FEATURE_DIM), 0.05),
            )
        })
        .collect::<Vec<_>>();

    let mut tracker = DeepSort::new(&DeepSortOptions::default().nn_budget(Some(100)));

    b.iter(|| {
        let detections = generators
            .iter_mut()
            .map(|(boxes, feats)| Detection::new(boxes.next().unwrap(), 0.9, feats.next().unwrap()))
            .collect::<Vec<_>>();
        tracker.predict();
        tracker.update(&detections);
    });
}
