/// ==============================================================================================
/// ================================ Trace Post-Processing Helpers ===============================
/// ==============================================================================================

use num_traits::Float;

/// Trapezoidal smoothing: `y_i' = 0.5 (y_i + y_{i-1})`, first sample kept.
///     Drivers apply this before display to suppress step-edge ripple from
///     discretized transmission lines.
pub fn smooth<T: Float>(samples: &[T]) -> Vec<T> {
    let half = T::from(0.5).unwrap();
    let mut out = Vec::with_capacity(samples.len());
    let mut prev: Option<T> = None;
    for &y in samples {
        match prev {
            Some(p) => out.push(half * (y + p)),
            None => out.push(y),
        }
        prev = Some(y);
    }
    out
}

/// Uniform downsampling to at most `target` points (first sample kept).
///     `target == 0` yields an empty vector; inputs already small enough
///     are returned as-is.
pub fn downsample<T: Float>(samples: &[T], target: usize) -> Vec<T> {
    if target == 0 {
        return Vec::new();
    }
    if samples.len() <= target {
        return samples.to_vec();
    }
    let step = samples.len() as f64 / target as f64;
    (0..target)
        .map(|k| samples[(k as f64 * step) as usize])
        .collect()
}
