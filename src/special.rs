//! Special functions needed by the Rosenbluth potentials.

use std::f64::consts::FRAC_PI_2;

const AGM_MAXITER: usize = 64;

pub fn erf(x: f64) -> f64 {
  statrs::function::erf::erf(x)
}

/// Complete elliptic integrals of the first and second kind, `(K(m), E(m))`,
/// with parameter `m = k²`, by the arithmetic-geometric mean.
///
/// Valid for `0 <= m < 1`.
pub fn ellipk_ellipe(m: f64) -> (f64, f64) {
  debug_assert!((0.0..1.0).contains(&m), "elliptic parameter {m} outside [0, 1)");
  let mut a = 1.0;
  let mut b = (1.0 - m).sqrt();
  let mut c = m.sqrt();
  let mut pow2 = 0.5;
  let mut sum = pow2 * c * c;
  for _ in 0..AGM_MAXITER {
    if c.abs() <= 1e-17 * a {
      break;
    }
    let an = 0.5 * (a + b);
    let bn = (a * b).sqrt();
    c = 0.5 * (a - b);
    a = an;
    b = bn;
    pow2 *= 2.0;
    sum += pow2 * c * c;
  }
  let ellipk = FRAC_PI_2 / a;
  (ellipk, ellipk * (1.0 - sum))
}

#[cfg(test)]
mod test {
  use super::*;
  use approx::assert_relative_eq;

  #[test]
  fn reference_values() {
    let (k, e) = ellipk_ellipe(0.0);
    assert_relative_eq!(k, FRAC_PI_2, epsilon = 1e-15);
    assert_relative_eq!(e, FRAC_PI_2, epsilon = 1e-15);

    let (k, e) = ellipk_ellipe(0.5);
    assert_relative_eq!(k, 1.854_074_677_301_372, epsilon = 1e-14);
    assert_relative_eq!(e, 1.350_643_881_047_675, epsilon = 1e-14);
  }

  #[test]
  fn legendre_relation() {
    for &m in &[0.1, 0.3, 0.7, 0.95, 0.999] {
      let (k, e) = ellipk_ellipe(m);
      let (kc, ec) = ellipk_ellipe(1.0 - m);
      assert_relative_eq!(e * kc + ec * k - k * kc, FRAC_PI_2, epsilon = 1e-13);
    }
  }

  #[test]
  fn erf_limits() {
    assert_eq!(erf(0.0), 0.0);
    assert_relative_eq!(erf(1.0), 0.842_700_792_949_714_9, epsilon = 1e-14);
    assert_relative_eq!(erf(6.0), 1.0, epsilon = 1e-15);
  }
}
