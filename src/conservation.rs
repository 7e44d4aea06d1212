//! Velocity moments of the collision operator and the conservation corrector.

use crate::{
  assemble::GalVec,
  index::ravel,
  operators::FokkerPlanckOperators,
  Result,
};

/// Relative bound on the corrected moments, measured against `∫ |φ C|`.
pub const CONSERVATION_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Moment {
  Density,
  ParallelMomentum,
  Energy,
}
impl Moment {
  pub const ALL: [Self; 3] = [Self::Density, Self::ParallelMomentum, Self::Energy];

  /// Velocity weight `φ` of the moment `∫ φ C d³v`.
  fn weight(self, vpa: f64, vperp: f64) -> f64 {
    match self {
      Self::Density => 1.0,
      Self::ParallelMomentum => vpa,
      Self::Energy => vpa * vpa + vperp * vperp,
    }
  }
}

/// `∫ C`, `∫ vpa C` and `∫ v² C`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MomentResiduals {
  pub density: f64,
  pub momentum: f64,
  pub energy: f64,
}
impl MomentResiduals {
  pub fn get(&self, moment: Moment) -> f64 {
    match moment {
      Moment::Density => self.density,
      Moment::ParallelMomentum => self.momentum,
      Moment::Energy => self.energy,
    }
  }
  pub fn max_abs(&self) -> f64 {
    self.density.abs().max(self.momentum.abs()).max(self.energy.abs())
  }
}

/// A corrected moment that stayed above its tolerance. Not an error: the
/// collision rate is still returned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergenceWarning {
  pub moment: Moment,
  pub residual: f64,
  pub bound: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Correction {
  /// Removes `∫ C` only; used between different species.
  Density,
  /// Removes density, parallel momentum and energy moments; used for self-collisions.
  DensityMomentumEnergy,
}
impl Correction {
  fn moments(self) -> &'static [Moment] {
    match self {
      Self::Density => &[Moment::Density],
      Self::DensityMomentumEnergy => &Moment::ALL,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConservationReport {
  pub raw: MomentResiduals,
  pub corrected: MomentResiduals,
  /// The correction actually applied; a singular moment system falls back to `Density`.
  pub applied: Correction,
  pub warning: Option<ConvergenceWarning>,
}

fn moment_integral(
  ops: &FokkerPlanckOperators,
  moment: Moment,
  vec: &GalVec,
  absolute: bool,
) -> f64 {
  ops
    .integration_weights()
    .iter()
    .zip(vec.iter())
    .enumerate()
    .map(|(ic, (w, value))| {
      let (vpa, vperp) = ops.velocity(ic);
      let integrand = moment.weight(vpa, vperp) * value;
      w * if absolute { integrand.abs() } else { integrand }
    })
    .sum()
}

/// Moments of a compound-indexed collision rate.
pub fn moments(ops: &FokkerPlanckOperators, rate: &GalVec) -> MomentResiduals {
  MomentResiduals {
    density: moment_integral(ops, Moment::Density, rate, false),
    momentum: moment_integral(ops, Moment::ParallelMomentum, rate, false),
    energy: moment_integral(ops, Moment::Energy, rate, false),
  }
}

/// Subtracts `(a + b vpa + c v²) F` from `rate` so that the requested moments vanish.
pub fn correct(
  ops: &FokkerPlanckOperators,
  pdf: &GalVec,
  rate: &mut GalVec,
  correction: Correction,
) -> Result<ConservationReport> {
  ops.check_len(pdf)?;
  ops.check_len(rate)?;

  let raw = moments(ops, rate);
  let applied = if correction == Correction::DensityMomentumEnergy
    && subtract_moments(ops, pdf, rate, &raw)
  {
    Correction::DensityMomentumEnergy
  } else {
    subtract_density(ops, pdf, rate, raw.density);
    Correction::Density
  };
  let corrected = moments(ops, rate);

  let warning = correction.moments().iter().find_map(|&moment| {
    let scale = moment_integral(ops, moment, rate, true);
    let bound = CONSERVATION_TOLERANCE * scale;
    let residual = corrected.get(moment);
    (residual.abs() > bound).then_some(ConvergenceWarning {
      moment,
      residual,
      bound,
    })
  });
  if let Some(warning) = &warning {
    tracing::warn!(
      "conservation correction left {:?} residual {:e} above {:e}",
      warning.moment,
      warning.residual,
      warning.bound
    );
  }

  Ok(ConservationReport {
    raw,
    corrected,
    applied,
    warning,
  })
}

/// Three-moment correction; `false` if the moment system is singular.
fn subtract_moments(
  ops: &FokkerPlanckOperators,
  pdf: &GalVec,
  rate: &mut GalVec,
  raw: &MomentResiduals,
) -> bool {
  let mut system = na::Matrix3::<f64>::zeros();
  for (ic, (&w, &f)) in ops.integration_weights().iter().zip(pdf.iter()).enumerate() {
    let (vpa, vperp) = ops.velocity(ic);
    let phi = Moment::ALL.map(|m| m.weight(vpa, vperp));
    for r in 0..3 {
      for s in 0..3 {
        system[(r, s)] += w * phi[r] * phi[s] * f;
      }
    }
  }
  let rhs = na::Vector3::new(raw.density, raw.momentum, raw.energy);
  let coeffs = match system.lu().solve(&rhs) {
    Some(coeffs) if coeffs.iter().all(|c| c.is_finite()) => coeffs,
    _ => return false,
  };

  for (ic, (value, &f)) in rate.iter_mut().zip(pdf.iter()).enumerate() {
    let (vpa, vperp) = ops.velocity(ic);
    *value -= (coeffs[0] + coeffs[1] * vpa + coeffs[2] * (vpa * vpa + vperp * vperp)) * f;
  }
  true
}

fn subtract_density(
  ops: &FokkerPlanckOperators,
  pdf: &GalVec,
  rate: &mut GalVec,
  density_residual: f64,
) {
  let density = ops.integrate_raveled(pdf);
  if density == 0.0 || !density.is_finite() {
    return;
  }
  rate.axpy(-density_residual / density, pdf, 1.0);
}

/// `-∫ ln|f| C d³v`, non-negative for a collision operator obeying the H-theorem.
/// Nodes with `f = 0` do not contribute.
pub fn entropy_production(
  ops: &FokkerPlanckOperators,
  pdf: &na::DMatrix<f64>,
  rate: &na::DMatrix<f64>,
) -> Result<f64> {
  ops.check_shape(pdf)?;
  ops.check_shape(rate)?;
  let integrand = pdf.zip_map(rate, |f, c| if f == 0.0 { 0.0 } else { f.abs().ln() * c });
  Ok(-ops.integrate_raveled(&ravel(&integrand)))
}

/// `-∫ f C d³v`
pub fn l2_dissipation(
  ops: &FokkerPlanckOperators,
  pdf: &na::DMatrix<f64>,
  rate: &na::DMatrix<f64>,
) -> Result<f64> {
  ops.check_shape(pdf)?;
  ops.check_shape(rate)?;
  Ok(-ops.integrate_raveled(&ravel(&pdf.component_mul(rate))))
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::{coordinate::GridSpec, maxwellian::Maxwellian, parallel::ExecutionContext};

  fn operators() -> FokkerPlanckOperators {
    let ctx = ExecutionContext::serial().unwrap();
    FokkerPlanckOperators::new(&GridSpec::new(5, 4, 4.0), &GridSpec::new(5, 2, 4.0), &ctx).unwrap()
  }

  #[test]
  fn full_correction_removes_all_moments() {
    let ops = operators();
    let pdf = ravel(&Maxwellian::new(1.0, 0.3, 1.0).discretize(&ops));
    let mut rate = ravel(&ops.sample(|vpa, vperp| (vpa - vperp).sin() * (-vpa * vpa).exp()));
    let report = correct(&ops, &pdf, &mut rate, Correction::DensityMomentumEnergy).unwrap();
    assert_eq!(report.applied, Correction::DensityMomentumEnergy);
    assert!(report.raw.max_abs() > 1e-3);
    assert!(report.corrected.max_abs() < 1e-12);
    assert!(report.warning.is_none());
  }

  #[test]
  fn density_correction_leaves_other_moments() {
    let ops = operators();
    let pdf = ravel(&Maxwellian::new(1.0, 0.0, 1.0).discretize(&ops));
    let mut rate = ravel(&ops.sample(|vpa, _| (1.0 + vpa) * (-vpa * vpa).exp()));
    let report = correct(&ops, &pdf, &mut rate, Correction::Density).unwrap();
    assert!(report.corrected.density.abs() < 1e-12);
    assert!(report.corrected.momentum.abs() > 1e-3);
    assert!(report.warning.is_none());
  }

  #[test]
  fn vanishing_distribution_raises_warning() {
    let ops = operators();
    let pdf = GalVec::zeros(ops.ndofs());
    let mut rate = GalVec::from_element(ops.ndofs(), 1e-3);
    let report = correct(&ops, &pdf, &mut rate, Correction::DensityMomentumEnergy).unwrap();
    assert_eq!(report.applied, Correction::Density);
    let warning = report.warning.unwrap();
    assert_eq!(warning.moment, Moment::Density);
    assert_eq!(report.corrected, report.raw);
  }

  #[test]
  fn diagnostics_of_linear_relaxation() {
    let ops = operators();
    let m = Maxwellian::new(1.0, 0.0, 1.0);
    let pdf = ops.sample(|vpa, vperp| m.pdf(vpa, vperp) * (1.0 + 0.3 * vpa));
    // relaxation towards m
    let rate = ops.sample(|vpa, vperp| m.pdf(vpa, vperp)) - &pdf;
    assert!(l2_dissipation(&ops, &pdf, &rate).unwrap() > 0.0);
    assert!(entropy_production(&ops, &pdf.map(|f| f.abs()), &rate).unwrap() > 0.0);
  }
}
