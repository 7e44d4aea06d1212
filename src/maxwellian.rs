//! Drifting Maxwellian with closed-form Rosenbluth potentials.

use crate::{
  boundary::PotentialField,
  elliptic::Potentials,
  operators::FokkerPlanckOperators,
  special::erf,
  Result,
};

use common::util::max_abs;
use std::f64::consts::PI;

const SERIES_THRESHOLD: f64 = 0.5;
const SERIES_NTERMS: usize = 16;

/// `F = n / (π^{3/2} vth³) exp(-((vpa - upar)² + vperp²) / vth²)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Maxwellian {
  pub density: f64,
  pub upar: f64,
  pub vth: f64,
}

impl Maxwellian {
  pub fn new(density: f64, upar: f64, vth: f64) -> Self {
    Self {
      density,
      upar,
      vth,
    }
  }

  pub fn pdf(&self, vpa: f64, vperp: f64) -> f64 {
    let x = vpa - self.upar;
    let norm = self.density / (PI.powf(1.5) * self.vth.powi(3));
    norm * (-(x * x + vperp * vperp) / (self.vth * self.vth)).exp()
  }

  /// Values of all eight potential fields at one velocity.
  pub fn potentials_at(&self, vpa: f64, vperp: f64) -> [f64; 8] {
    let x = vpa - self.upar;
    let y = vperp;
    let r = x.hypot(y);
    let eta = r / self.vth;

    let h = RadialProfile::h(eta).scaled(self.density / self.vth, self.vth);
    let g = RadialProfile::g(eta).scaled(self.density * self.vth, self.vth);

    // unit direction, arbitrary at the centre where the first derivatives vanish
    let (xhat, yhat) = if r > 0.0 { (x / r, y / r) } else { (1.0, 0.0) };

    let mut values = [0.0; 8];
    values[PotentialField::H.index()] = h.value;
    values[PotentialField::DhDvpa.index()] = h.d1 * xhat;
    values[PotentialField::DhDvperp.index()] = h.d1 * yhat;
    values[PotentialField::G.index()] = g.value;
    values[PotentialField::D2gDvpa2.index()] = g.d2 * xhat * xhat + g.d1_over_r * yhat * yhat;
    values[PotentialField::DgDvperp.index()] = g.d1 * yhat;
    values[PotentialField::D2gDvperp2.index()] = g.d2 * yhat * yhat + g.d1_over_r * xhat * xhat;
    values[PotentialField::D2gDvperpDvpa.index()] = (g.d2 - g.d1_over_r) * xhat * yhat;
    values
  }

  pub fn potential(&self, field: PotentialField, vpa: f64, vperp: f64) -> f64 {
    self.potentials_at(vpa, vperp)[field.index()]
  }

  pub fn discretize(&self, ops: &FokkerPlanckOperators) -> na::DMatrix<f64> {
    ops.sample(|vpa, vperp| self.pdf(vpa, vperp))
  }

  /// Maximum pointwise deviation of computed potentials from the closed forms.
  pub fn potential_errors(
    &self,
    ops: &FokkerPlanckOperators,
    potentials: &Potentials,
  ) -> Result<PotentialErrors> {
    potentials.check_len(ops)?;
    let exact: Vec<[f64; 8]> = (0..ops.ndofs())
      .map(|ic| {
        let (vpa, vperp) = ops.velocity(ic);
        self.potentials_at(vpa, vperp)
      })
      .collect();
    let mut max_abs_errors = [0.0; 8];
    for field in PotentialField::ALL {
      let computed = potentials.field(field);
      let diffs: Vec<f64> = exact
        .iter()
        .enumerate()
        .map(|(ic, values)| computed[ic] - values[field.index()])
        .collect();
      max_abs_errors[field.index()] = max_abs(&diffs);
    }
    Ok(PotentialErrors { max_abs_errors })
  }
}

/// Maximum absolute error per potential field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PotentialErrors {
  max_abs_errors: [f64; 8],
}
impl PotentialErrors {
  pub fn get(&self, field: PotentialField) -> f64 {
    self.max_abs_errors[field.index()]
  }
  pub fn iter(&self) -> impl Iterator<Item = (PotentialField, f64)> + '_ {
    PotentialField::ALL.into_iter().map(|f| (f, self.get(f)))
  }
}

/// Radial profile `f(r)` with `f'`, `f''` and the regular quotient `f'/r`.
#[derive(Debug, Clone, Copy)]
struct RadialProfile {
  value: f64,
  d1: f64,
  d2: f64,
  d1_over_r: f64,
}
impl RadialProfile {
  /// `h(η) = erf(η) / η`
  fn h(eta: f64) -> Self {
    if eta < SERIES_THRESHOLD {
      Self::h_series(eta)
    } else {
      Self::h_closed(eta)
    }
  }

  /// `g(η) = (η + 1/(2η)) erf(η) + exp(-η²)/√π`
  fn g(eta: f64) -> Self {
    if eta < SERIES_THRESHOLD {
      Self::g_series(eta)
    } else {
      Self::g_closed(eta)
    }
  }

  fn h_series(eta: f64) -> Self {
    // erf(η)/η = 2/√π Σ (-1)^k η^{2k} / (k! (2k+1))
    let coeffs = (0..SERIES_NTERMS).map(|k| 2.0 / PI.sqrt() * erf_series_coeff(k));
    Self::from_even_series(eta, coeffs)
  }

  fn g_series(eta: f64) -> Self {
    let coeffs = (0..SERIES_NTERMS).map(|k| {
      let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
      let exp_coeff = sign / factorial(k);
      let prev = if k > 0 { 2.0 * erf_series_coeff(k - 1) } else { 0.0 };
      (prev + erf_series_coeff(k) + exp_coeff) / PI.sqrt()
    });
    Self::from_even_series(eta, coeffs)
  }

  fn h_closed(eta: f64) -> Self {
    let erf = erf(eta);
    let gauss = (-eta * eta).exp() / PI.sqrt();
    let value = erf / eta;
    let d1 = 2.0 * gauss / eta - erf / (eta * eta);
    let d2 = -4.0 * gauss - 4.0 * gauss / (eta * eta) + 2.0 * erf / eta.powi(3);
    Self {
      value,
      d1,
      d2,
      d1_over_r: d1 / eta,
    }
  }

  fn g_closed(eta: f64) -> Self {
    let erf = erf(eta);
    let gauss = (-eta * eta).exp() / PI.sqrt();
    let value = (eta + 0.5 / eta) * erf + gauss;
    let d1 = (1.0 - 0.5 / (eta * eta)) * erf + gauss / eta;
    let d2 = erf / eta.powi(3) - 2.0 * gauss / (eta * eta);
    Self {
      value,
      d1,
      d2,
      d1_over_r: d1 / eta,
    }
  }

  /// `f(η) = Σ c_k η^{2k}` and its derivatives.
  fn from_even_series(eta: f64, coeffs: impl Iterator<Item = f64>) -> Self {
    let eta2 = eta * eta;
    let mut this = Self {
      value: 0.0,
      d1: 0.0,
      d2: 0.0,
      d1_over_r: 0.0,
    };
    let mut pow = 1.0;
    let mut pow_prev = 0.0;
    for (k, c) in coeffs.enumerate() {
      let two_k = 2.0 * k as f64;
      this.value += c * pow;
      this.d1_over_r += c * two_k * pow_prev;
      this.d2 += c * two_k * (two_k - 1.0) * pow_prev;
      pow_prev = pow;
      pow *= eta2;
    }
    this.d1 = this.d1_over_r * eta;
    this
  }

  /// `F(r) = scale · f(r / vth)`
  fn scaled(self, scale: f64, vth: f64) -> Self {
    Self {
      value: scale * self.value,
      d1: scale * self.d1 / vth,
      d2: scale * self.d2 / (vth * vth),
      d1_over_r: scale * self.d1_over_r / (vth * vth),
    }
  }
}

/// Coefficient of `η^{2k}` in `(√π / 2) erf(η) / η`.
fn erf_series_coeff(k: usize) -> f64 {
  let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
  sign / (factorial(k) * (2 * k + 1) as f64)
}

fn factorial(k: usize) -> f64 {
  (1..=k).map(|i| i as f64).product()
}
