//! One-dimensional node sets and quadrature on the reference interval `[-1, 1]`.

use fenris_quadrature::univariate;
use itertools::izip;
use std::f64::consts::PI;

const NEWTON_TOL: f64 = 1e-15;
const NEWTON_MAXITER: usize = 100;

/// A quadrature rule on the reference interval `[-1, 1]`.
#[derive(Debug, Clone)]
pub struct QuadRule {
  nodes: Vec<f64>,
  weights: Vec<f64>,
}
impl QuadRule {
  pub fn npoints(&self) -> usize {
    self.nodes.len()
  }
  pub fn nodes(&self) -> &[f64] {
    &self.nodes
  }
  pub fn weights(&self) -> &[f64] {
    &self.weights
  }
  pub fn apply<F>(&self, f: F) -> f64
  where
    F: Fn(f64) -> f64,
  {
    izip!(&self.nodes, &self.weights).map(|(&x, &w)| w * f(x)).sum()
  }
}

/// Legendre polynomial `P_n(x)` together with `P_{n-1}(x)`.
///
/// The derivative formula is singular at `|x| == 1`.
#[derive(Debug, Clone, Copy)]
struct LegendreRecurrence {
  n: usize,
  x: f64,
  p: f64,
  pprev: f64,
}
impl LegendreRecurrence {
  fn evaluate(n: usize, x: f64) -> Self {
    // m P_m(x) = (2m - 1) x P_{m-1}(x) - (m - 1) P_{m-2}(x)
    let mut p = 1.0;
    let mut pprev = 0.0;
    for m in 1..=n {
      let m = m as f64;
      let pnext = ((2.0 * m - 1.0) * x * p - (m - 1.0) * pprev) / m;
      pprev = p;
      p = pnext;
    }
    Self { n, x, p, pprev }
  }
  fn value(&self) -> f64 {
    self.p
  }
  fn derivative(&self) -> f64 {
    let n = self.n as f64;
    n * (self.x * self.p - self.pprev) / (self.x * self.x - 1.0)
  }
  /// From the Legendre equation `(1 - x²) P'' = 2x P' - n(n+1) P`.
  fn second_derivative(&self) -> f64 {
    let n = self.n as f64;
    let x = self.x;
    (2.0 * x * self.derivative() - n * (n + 1.0) * self.p) / (1.0 - x * x)
  }
}

fn newton<F>(mut x: f64, step: F) -> f64
where
  F: Fn(f64) -> f64,
{
  for _ in 0..NEWTON_MAXITER {
    let dx = step(x);
    x += dx;
    if dx.abs() <= NEWTON_TOL {
      break;
    }
  }
  x
}

/// Gauss–Legendre rule with `npoints` points, exact up to degree `2 npoints - 1`.
///
/// Nodes are returned in ascending order.
///
/// # Panics
///
/// Panics if zero points are requested.
pub fn gauss_legendre(npoints: usize) -> QuadRule {
  let (weights, points) = univariate::gauss(npoints);
  let mut pairs: Vec<(f64, f64)> = izip!(points, weights).map(|([x], w)| (x, w)).collect();
  pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

  let (nodes, weights) = pairs.into_iter().unzip();
  QuadRule { nodes, weights }
}

/// Gauss–Legendre–Lobatto nodes: `±1` and the roots of `P'_{npoints-1}`.
pub fn lobatto_nodes(npoints: usize) -> Vec<f64> {
  assert!(npoints >= 2, "Lobatto nodes need at least two points");
  let n = npoints - 1;
  let mut nodes = Vec::with_capacity(npoints);
  nodes.push(-1.0);
  for i in 1..n {
    let guess = -(PI * i as f64 / n as f64).cos();
    let x = newton(guess, |x| {
      let rec = LegendreRecurrence::evaluate(n, x);
      -rec.derivative() / rec.second_derivative()
    });
    nodes.push(x);
  }
  nodes.push(1.0);
  nodes
}

/// Gauss–Legendre–Radau nodes containing `+1` but not `-1`.
///
/// Obtained by reflecting the left Radau rule, whose nodes are the roots of
/// `P_n + P_{n-1}`, one of them `-1`.
pub fn radau_nodes(npoints: usize) -> Vec<f64> {
  assert!(npoints >= 2, "Radau nodes need at least two points");
  let n = npoints;
  let mut left = Vec::with_capacity(n);
  left.push(-1.0);
  for i in 1..n {
    let guess = -(2.0 * PI * i as f64 / (2 * n - 1) as f64).cos();
    let x = newton(guess, |x| {
      let rec = LegendreRecurrence::evaluate(n, x);
      let recprev = LegendreRecurrence::evaluate(n - 1, x);
      let f = rec.value() + recprev.value();
      let df = rec.derivative() + recprev.derivative();
      // deflate the known root at -1
      -f / (df - f / (x + 1.0))
    });
    left.push(x);
  }
  let mut nodes: Vec<f64> = left.into_iter().map(|x| -x).collect();
  nodes.sort_by(f64::total_cmp);
  nodes
}

/// Chebyshev extrema `-cos(π i / (npoints - 1))`, including both endpoints.
pub fn chebyshev_lobatto_nodes(npoints: usize) -> Vec<f64> {
  assert!(npoints >= 2, "Chebyshev-Lobatto nodes need at least two points");
  let n = (npoints - 1) as f64;
  (0..npoints).map(|i| -(PI * i as f64 / n).cos()).collect()
}

/// Chebyshev–Radau nodes containing `+1` but not `-1`.
pub fn chebyshev_radau_nodes(npoints: usize) -> Vec<f64> {
  assert!(npoints >= 2, "Chebyshev-Radau nodes need at least two points");
  let denom = (2 * npoints - 1) as f64;
  (0..npoints)
    .rev()
    .map(|i| (2.0 * PI * i as f64 / denom).cos())
    .collect()
}

/// Lagrange interpolation basis on a set of distinct nodes.
#[derive(Debug, Clone)]
pub struct LagrangeBasis {
  nodes: Vec<f64>,
  /// `∏_{k≠j} (x_j - x_k)`
  denoms: Vec<f64>,
}
impl LagrangeBasis {
  pub fn new(nodes: Vec<f64>) -> Self {
    let denoms = (0..nodes.len())
      .map(|j| {
        (0..nodes.len())
          .filter(|&k| k != j)
          .map(|k| nodes[j] - nodes[k])
          .product()
      })
      .collect();
    Self { nodes, denoms }
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }
  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }
  pub fn nodes(&self) -> &[f64] {
    &self.nodes
  }

  /// `ℓ_j(x)`
  pub fn eval(&self, j: usize, x: f64) -> f64 {
    let numer: f64 = (0..self.len())
      .filter(|&k| k != j)
      .map(|k| x - self.nodes[k])
      .product();
    numer / self.denoms[j]
  }

  /// `ℓ_j'(x)`
  pub fn deriv(&self, j: usize, x: f64) -> f64 {
    let n = self.len();
    let mut sum = 0.0;
    for l in (0..n).filter(|&l| l != j) {
      let prod: f64 = (0..n)
        .filter(|&k| k != j && k != l)
        .map(|k| x - self.nodes[k])
        .product();
      sum += prod;
    }
    sum / self.denoms[j]
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use approx::assert_abs_diff_eq;

  #[test]
  fn gauss_exact_for_max_degree() {
    for n in 1..=10 {
      let rule = gauss_legendre(n);
      assert_eq!(rule.npoints(), n);
      for degree in 0..2 * n {
        let exact = if degree % 2 == 0 {
          2.0 / (degree as f64 + 1.0)
        } else {
          0.0
        };
        let approx = rule.apply(|x| x.powi(degree as i32));
        assert_abs_diff_eq!(approx, exact, epsilon = 1e-13);
      }
      assert!(rule.nodes().windows(2).all(|w| w[0] < w[1]));
    }
  }

  #[test]
  fn lobatto_nodes_are_symmetric_extrema() {
    for n in 2..=12 {
      let nodes = lobatto_nodes(n);
      assert_eq!(nodes.len(), n);
      assert_eq!(nodes[0], -1.0);
      assert_eq!(nodes[n - 1], 1.0);
      for i in 0..n {
        assert_abs_diff_eq!(nodes[i], -nodes[n - 1 - i], epsilon = 1e-14);
      }
      for &x in &nodes[1..n - 1] {
        let dp = LegendreRecurrence::evaluate(n - 1, x).derivative();
        assert_abs_diff_eq!(dp, 0.0, epsilon = 1e-10);
      }
      assert!(nodes.windows(2).all(|w| w[0] < w[1]));
    }
  }

  #[test]
  fn lobatto_five_points() {
    let nodes = lobatto_nodes(5);
    let inner = (3.0f64 / 7.0).sqrt();
    assert_abs_diff_eq!(nodes[1], -inner, epsilon = 1e-14);
    assert_abs_diff_eq!(nodes[2], 0.0, epsilon = 1e-15);
  }

  #[test]
  fn radau_nodes_contain_right_endpoint_only() {
    for n in 2..=12 {
      let nodes = radau_nodes(n);
      assert_eq!(nodes.len(), n);
      assert_eq!(nodes[n - 1], 1.0);
      assert!(nodes[0] > -1.0);
      assert!(nodes.windows(2).all(|w| w[0] < w[1]));
    }
    // two point right Radau rule: {-1/3, 1}
    assert_abs_diff_eq!(radau_nodes(2)[0], -1.0 / 3.0, epsilon = 1e-15);
  }

  #[test]
  fn chebyshev_nodes() {
    let lobatto = chebyshev_lobatto_nodes(5);
    assert_abs_diff_eq!(lobatto[0], -1.0);
    assert_abs_diff_eq!(lobatto[2], 0.0, epsilon = 1e-15);
    assert_abs_diff_eq!(lobatto[4], 1.0);

    let radau = chebyshev_radau_nodes(4);
    assert_eq!(radau[3], 1.0);
    assert!(radau[0] > -1.0);
    assert!(radau.windows(2).all(|w| w[0] < w[1]));
  }

  #[test]
  fn lagrange_basis_is_nodal_and_partitions_unity() {
    let basis = LagrangeBasis::new(lobatto_nodes(6));
    for i in 0..basis.len() {
      for j in 0..basis.len() {
        let expected = if i == j { 1.0 } else { 0.0 };
        assert_abs_diff_eq!(basis.eval(j, basis.nodes()[i]), expected, epsilon = 1e-14);
      }
    }
    for &x in &[-0.9, -0.3, 0.1, 0.77] {
      let sum: f64 = (0..basis.len()).map(|j| basis.eval(j, x)).sum();
      let dsum: f64 = (0..basis.len()).map(|j| basis.deriv(j, x)).sum();
      assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-13);
      assert_abs_diff_eq!(dsum, 0.0, epsilon = 1e-12);
    }
  }

  #[test]
  fn lagrange_derivative_reproduces_polynomials() {
    let basis = LagrangeBasis::new(radau_nodes(5));
    let f = |x: f64| x.powi(4) - 2.0 * x;
    let df = |x: f64| 4.0 * x.powi(3) - 2.0;
    for &x in &[-1.0, -0.5, 0.2, 1.0] {
      let approx: f64 = (0..basis.len())
        .map(|j| f(basis.nodes()[j]) * basis.deriv(j, x))
        .sum();
      assert_abs_diff_eq!(approx, df(x), epsilon = 1e-11);
    }
  }
}
