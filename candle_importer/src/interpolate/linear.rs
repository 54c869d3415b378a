use super::hold_or;

/// Straight line between the nearest known neighbours of each target.
pub fn interpolate(xs: &[f64], ys: &[f64], targets: &[f64]) -> Vec<f64> {
    targets
        .iter()
        .map(|&t| {
            hold_or(xs, ys, t, |i| {
                let (x0, x1) = (xs[i - 1], xs[i]);
                let (y0, y1) = (ys[i - 1], ys[i]);
                y0 + (y1 - y0) * (t - x0) / (x1 - x0)
            })
        })
        .collect()
}
