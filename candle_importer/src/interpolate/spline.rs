//! Interpolating B-spline of arbitrary degree.
//!
//! Knots are clamped at both ends and placed by averaging interior data
//! sites (de Boor's choice), which keeps the collocation matrix banded and
//! totally positive, so elimination needs no pivoting.

use super::hold_or;

pub const MAX_DEGREE: usize = 5;

/// Fits a degree-`degree` spline through every known point and evaluates it
/// at `targets`.
///
/// Callers guarantee `xs` is strictly increasing and `xs.len() > degree`.
pub fn interpolate(xs: &[f64], ys: &[f64], targets: &[f64], degree: usize) -> Vec<f64> {
    let spline = BSpline::fit(xs, ys, degree);
    targets
        .iter()
        .map(|&t| hold_or(xs, ys, t, |_| spline.eval(t)))
        .collect()
}

struct BSpline {
    knots: Vec<f64>,
    coeffs: Vec<f64>,
    degree: usize,
}

impl BSpline {
    fn fit(xs: &[f64], ys: &[f64], k: usize) -> Self {
        let n = xs.len();
        let knots = averaged_knots(xs, k);

        // band[i][c] holds A[i][i + c - k] for c in 0..=2k
        let width = 2 * k + 1;
        let mut band = vec![vec![0.0; width]; n];
        let mut basis = vec![0.0; k + 1];
        for (i, &x) in xs.iter().enumerate() {
            let span = find_span(&knots, n, k, x);
            basis_functions(&knots, span, x, k, &mut basis);
            for (r, &b) in basis.iter().enumerate() {
                let col = span - k + r;
                band[i][col + k - i] = b;
            }
        }

        let coeffs = solve_banded(band, ys.to_vec(), k);
        Self {
            knots,
            coeffs,
            degree: k,
        }
    }

    fn eval(&self, x: f64) -> f64 {
        let k = self.degree;
        let n = self.coeffs.len();
        let span = find_span(&self.knots, n, k, x);
        let mut basis = vec![0.0; k + 1];
        basis_functions(&self.knots, span, x, k, &mut basis);
        basis
            .iter()
            .enumerate()
            .map(|(r, b)| b * self.coeffs[span - k + r])
            .sum()
    }
}

fn averaged_knots(xs: &[f64], k: usize) -> Vec<f64> {
    let n = xs.len();
    let mut knots = Vec::with_capacity(n + k + 1);
    knots.extend(std::iter::repeat_n(xs[0], k + 1));
    for j in 1..n - k {
        let sum: f64 = xs[j..j + k].iter().sum();
        knots.push(sum / k as f64);
    }
    knots.extend(std::iter::repeat_n(xs[n - 1], k + 1));
    knots
}

/// Index `mu` in `k..n` with `knots[mu] <= x < knots[mu + 1]`; the right
/// end maps to the last non-empty span.
fn find_span(knots: &[f64], n: usize, k: usize, x: f64) -> usize {
    if x >= knots[n] {
        return n - 1;
    }
    if x <= knots[k] {
        return k;
    }
    // first knot strictly greater than x, minus one
    let upper = knots[..=n].partition_point(|&t| t <= x);
    (upper - 1).clamp(k, n - 1)
}

/// Non-zero basis values `N[span-k..=span]` at `x` (Cox–de Boor).
fn basis_functions(knots: &[f64], span: usize, x: f64, k: usize, out: &mut [f64]) {
    let mut left = vec![0.0; k + 1];
    let mut right = vec![0.0; k + 1];
    out[0] = 1.0;
    for j in 1..=k {
        left[j] = x - knots[span + 1 - j];
        right[j] = knots[span + j] - x;
        let mut saved = 0.0;
        for r in 0..j {
            let temp = out[r] / (right[r + 1] + left[j - r]);
            out[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        out[j] = saved;
    }
}

/// Gaussian elimination on a band matrix with half-width `k`, no pivoting.
fn solve_banded(mut band: Vec<Vec<f64>>, mut rhs: Vec<f64>, k: usize) -> Vec<f64> {
    let n = rhs.len();
    let at = |i: usize, j: usize| j + k - i;

    for p in 0..n {
        let pivot = band[p][at(p, p)];
        for r in p + 1..(p + k + 1).min(n) {
            let factor = band[r][at(r, p)] / pivot;
            if factor == 0.0 {
                continue;
            }
            for c in p..(p + k + 1).min(n) {
                let v = band[p][at(p, c)];
                band[r][at(r, c)] -= factor * v;
            }
            rhs[r] -= factor * rhs[p];
        }
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut acc = rhs[i];
        for c in i + 1..(i + k + 1).min(n) {
            acc -= band[i][at(i, c)] * x[c];
        }
        x[i] = acc / band[i][at(i, i)];
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn passes_through_every_known_point() {
        let xs = [0.0, 1.0, 3.0, 4.0, 7.0, 8.0];
        let ys = [2.0, -1.0, 5.0, 4.0, 0.5, 3.0];
        for degree in 1..=MAX_DEGREE {
            let s = BSpline::fit(&xs, &ys, degree);
            for (x, y) in xs.iter().zip(ys) {
                assert!(close(s.eval(*x), y), "degree {degree} at {x}: {}", s.eval(*x));
            }
        }
    }

    #[test]
    fn degree_one_is_piecewise_linear() {
        let xs = [0.0, 2.0, 6.0];
        let ys = [10.0, 20.0, 0.0];
        let out = interpolate(&xs, &ys, &[1.0, 4.0], 1);
        assert!(close(out[0], 15.0));
        assert!(close(out[1], 10.0));
    }

    #[test]
    fn cubic_reproduces_a_cubic() {
        let f = |x: f64| 0.5 * x * x * x - x * x + 2.0;
        let xs: Vec<f64> = [0.0, 1.0, 2.0, 4.0, 5.0, 6.0, 9.0].to_vec();
        let ys: Vec<f64> = xs.iter().map(|&x| f(x)).collect();
        let out = interpolate(&xs, &ys, &[3.0, 7.5], 3);
        assert!(close(out[0], f(3.0)), "{out:?}");
        assert!(close(out[1], f(7.5)), "{out:?}");
    }

    #[test]
    fn minimal_point_count_is_a_single_polynomial() {
        let xs = [0.0, 1.0, 2.0];
        let ys = [1.0, 2.0, 5.0]; // x^2 + 1
        let out = interpolate(&xs, &ys, &[1.5], 2);
        assert!(close(out[0], 3.25), "{out:?}");
    }
}
