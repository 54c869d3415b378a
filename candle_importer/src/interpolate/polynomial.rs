use super::hold_or;

/// Degree-`order` polynomial through the `order + 1` known points nearest
/// each target, evaluated with Neville's scheme.
///
/// Callers guarantee `xs.len() > order`.
pub fn interpolate(xs: &[f64], ys: &[f64], targets: &[f64], order: usize) -> Vec<f64> {
    let width = order + 1;
    targets
        .iter()
        .map(|&t| {
            hold_or(xs, ys, t, |i| {
                // i is the first known x past t; centre the stencil on the gap
                let lo = i.saturating_sub(width / 2).min(xs.len() - width);
                neville(&xs[lo..lo + width], &ys[lo..lo + width], t)
            })
        })
        .collect()
}

fn neville(xs: &[f64], ys: &[f64], t: f64) -> f64 {
    let mut p = ys.to_vec();
    let n = xs.len();
    for level in 1..n {
        for i in 0..n - level {
            let j = i + level;
            p[i] = ((t - xs[j]) * p[i] + (xs[i] - t) * p[i + 1]) / (xs[i] - xs[j]);
        }
    }
    p[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reproduces_a_quadratic() {
        let xs: Vec<f64> = vec![0.0, 1.0, 2.0, 4.0, 5.0];
        let ys: Vec<f64> = xs.iter().map(|x| x * x - 3.0 * x + 1.0).collect();
        let out = interpolate(&xs, &ys, &[3.0], 2);
        assert!((out[0] - 1.0).abs() < 1e-9, "{out:?}");
    }

    #[test]
    fn order_one_matches_linear() {
        let xs = [0.0, 4.0, 8.0];
        let ys = [0.0, 8.0, 0.0];
        assert_eq!(interpolate(&xs, &ys, &[2.0, 6.0], 1), vec![4.0, 4.0]);
    }

    #[test]
    fn stencil_near_the_edge_stays_in_bounds() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [1.0, 2.0, 3.0, 4.0];
        let out = interpolate(&xs, &ys, &[0.5, 2.5], 3);
        assert!((out[0] - 1.5).abs() < 1e-9);
        assert!((out[1] - 3.5).abs() < 1e-9);
    }
}
