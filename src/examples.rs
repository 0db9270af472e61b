use crate::feature::{Feature, FromVec};
use crate::utils::bbox::BoundingBox;
use rand::distributions::Uniform;
use rand::prelude::ThreadRng;
use rand::Rng;

/// Generates a randomly drifting box
///
pub struct BoxGen2 {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    gen: ThreadRng,
    dist_pos: Uniform<f32>,
    dist_box: Uniform<f32>,
}

impl BoxGen2 {
    pub fn new(x: f32, y: f32, width: f32, height: f32, pos_drift: f32, box_drift: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            gen: rand::thread_rng(),
            dist_pos: Uniform::new(-pos_drift, pos_drift),
            dist_box: Uniform::new(-box_drift, box_drift),
        }
    }

    /// The box moves only to the right and down
    ///
    pub fn new_monotonous(
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        pos_drift: f32,
        box_drift: f32,
    ) -> Self {
        Self {
            x,
            y,
            width,
            height,
            gen: rand::thread_rng(),
            dist_pos: Uniform::new(0.0, pos_drift),
            dist_box: Uniform::new(-box_drift, box_drift),
        }
    }
}

impl Iterator for BoxGen2 {
    type Item = BoundingBox;

    fn next(&mut self) -> Option<Self::Item> {
        self.x += self.gen.sample(self.dist_pos);
        self.y += self.gen.sample(self.dist_pos);

        self.width += self.gen.sample(self.dist_box);
        self.height += self.gen.sample(self.dist_box);

        if self.width < 1.0 {
            self.width = 1.0;
        }
        if self.height < 1.0 {
            self.height = 1.0;
        }

        Some(BoundingBox::new(self.x, self.y, self.width, self.height))
    }
}

/// Vector of `len` zeros with `1.0` at `axis`
///
pub fn unit_vector(len: usize, axis: usize) -> Vec<f32> {
    assert!(axis < len, "Axis must be less than the vector length");
    let mut v = vec![0.0; len];
    v[axis] = 1.0;
    v
}

/// Generates appearance features scattered around the base vector, imitates a re-identification
/// model output for the same object
///
pub struct FeatGen {
    base: Vec<f32>,
    gen: ThreadRng,
    dist: Uniform<f32>,
}

impl FeatGen {
    pub fn new(base: Vec<f32>, drift: f32) -> Self {
        Self {
            base,
            gen: rand::thread_rng(),
            dist: Uniform::new_inclusive(-drift, drift),
        }
    }
}

impl Iterator for FeatGen {
    type Item = Feature;

    fn next(&mut self) -> Option<Self::Item> {
        let v = self
            .base
            .iter()
            .map(|x| x + self.gen.sample(self.dist))
            .collect::<Vec<_>>();
        Some(Feature::from_vec(v))
    }
}
