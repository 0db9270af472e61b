use crate::feature::Feature;

/// Euclidian distance between two feature vectors
///
/// When the features distances lengths don't match, the longer feature vector is truncated to
/// shorter one when the distance is calculated
///
pub fn euclidean(f1: &Feature, f2: &Feature) -> f32 {
    f1.iter()
        .zip(f2.iter())
        .fold(0.0_f32, |acc, (a, b)| {
            let d = *a - *b;
            acc + (d * d).reduce_add()
        })
        .sqrt()
}

/// Cosine similarity between two vectors
///
/// When the features distances lengths don't match, the longer feature vector is truncated to
/// shorter one when the distance is calculated. A zero vector is not similar to anything, NaN
/// components give NaN.
///
pub fn cosine(f1: &Feature, f2: &Feature) -> f32 {
    let (divided, f1_divisor, f2_divisor) = f1.iter().zip(f2.iter()).fold(
        (0.0_f32, 0.0_f32, 0.0_f32),
        |(dot, n1, n2), (a, b)| {
            (
                dot + (*a * *b).reduce_add(),
                n1 + (*a * *a).reduce_add(),
                n2 + (*b * *b).reduce_add(),
            )
        },
    );

    let divisor = (f1_divisor * f2_divisor).sqrt();
    if divisor == 0.0 {
        0.0
    } else {
        divided / divisor
    }
}

/// Cosine distance `1 - cosine similarity`, lays within `[0.0, 2.0]`
///
pub fn cosine_distance(f1: &Feature, f2: &Feature) -> f32 {
    1.0 - cosine(f1, f2)
}
