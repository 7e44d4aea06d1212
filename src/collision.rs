//! Nonlinear Fokker–Planck collision operator in `(vpa, vperp)`.
//!
//! `C[Fs, Fs'] = ν ∇·(∇∇G' · ∇Fs - 2 (ms/ms') Fs ∇H')` with `H'`, `G'` the
//! Rosenbluth potentials of the field species `Fs'`. The divergence is taken
//! weakly against the test functions, so the flux leaving the grid vanishes
//! and density is conserved up to round-off before any correction.

use crate::{
  assemble::GalVec,
  boundary::{BoundaryData, PotentialField},
  conservation::{correct, ConservationReport, Correction},
  coordinate::CoordinateRole,
  elliptic::{solve_potentials, Potentials},
  index::{ravel_into, unravel_into},
  maxwellian::Maxwellian,
  operators::FokkerPlanckOperators,
  parallel::ExecutionContext,
  Result,
};

use nas::ops::{serial::spmm_csr_dense, Op};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionParams {
  /// Collision frequency prefactor.
  pub nu: f64,
  /// `ms / ms'`
  pub mass_ratio: f64,
}
impl CollisionParams {
  pub fn new(nu: f64, mass_ratio: f64) -> Self {
    Self { nu, mass_ratio }
  }
  pub fn self_collisions(nu: f64) -> Self {
    Self::new(nu, 1.0)
  }
}

/// Origin of the Dirichlet data of the potentials.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundarySource {
  /// Closed form of a Maxwellian field species.
  Analytic(Maxwellian),
  /// Green's function integrals of the actual field-species distribution.
  Numerical,
}

/// Fixed-shape scratch arrays of one collision evaluation.
#[derive(Debug, Clone)]
pub struct CollisionWorkspace {
  test_pdf: GalVec,
  field_pdf: GalVec,
  potentials: Potentials,
  dfdvpa: GalVec,
  dfdvperp: GalVec,
  flux_vpa: GalVec,
  flux_vperp: GalVec,
  rate: GalVec,
  rate_2d: na::DMatrix<f64>,
}
impl CollisionWorkspace {
  pub fn new(nvpa: usize, nvperp: usize) -> Self {
    let ndofs = nvpa * nvperp;
    Self {
      test_pdf: GalVec::zeros(ndofs),
      field_pdf: GalVec::zeros(ndofs),
      potentials: Potentials::zeros(ndofs),
      dfdvpa: GalVec::zeros(ndofs),
      dfdvperp: GalVec::zeros(ndofs),
      flux_vpa: GalVec::zeros(ndofs),
      flux_vperp: GalVec::zeros(ndofs),
      rate: GalVec::zeros(ndofs),
      rate_2d: na::DMatrix::zeros(nvpa, nvperp),
    }
  }

  pub fn potentials(&self) -> &Potentials {
    &self.potentials
  }
  /// Flux components `(Γ_vpa, Γ_vperp)`, compound-indexed.
  pub fn fluxes(&self) -> (&GalVec, &GalVec) {
    (&self.flux_vpa, &self.flux_vperp)
  }
  /// Corrected collision rate, compound-indexed.
  pub fn rate(&self) -> &GalVec {
    &self.rate
  }
  /// Corrected collision rate as a `(nvpa, nvperp)` array.
  pub fn rate_2d(&self) -> &na::DMatrix<f64> {
    &self.rate_2d
  }
}

pub struct CollisionOperator {
  ops: FokkerPlanckOperators,
  workspace: CollisionWorkspace,
}

impl CollisionOperator {
  pub fn new(ops: FokkerPlanckOperators) -> Self {
    let (nvpa, nvperp) = ops.shape();
    Self {
      ops,
      workspace: CollisionWorkspace::new(nvpa, nvperp),
    }
  }

  pub fn operators(&self) -> &FokkerPlanckOperators {
    &self.ops
  }
  pub fn workspace(&self) -> &CollisionWorkspace {
    &self.workspace
  }
  pub fn collision_rate(&self) -> &na::DMatrix<f64> {
    &self.workspace.rate_2d
  }

  /// Collisions of species `s` (`fs`) off species `s'` (`fsp`).
  ///
  /// Only density is restored by the corrector; momentum and energy are
  /// exchanged between different species.
  pub fn evaluate(
    &mut self,
    fs: &na::DMatrix<f64>,
    fsp: &na::DMatrix<f64>,
    params: CollisionParams,
    boundary: BoundarySource,
    ctx: &ExecutionContext,
  ) -> Result<ConservationReport> {
    self.evaluate_with(fs, fsp, params, boundary, Correction::Density, ctx)
  }

  /// Self-collisions, corrected to conserve density, parallel momentum and energy.
  pub fn evaluate_self(
    &mut self,
    f: &na::DMatrix<f64>,
    params: CollisionParams,
    boundary: BoundarySource,
    ctx: &ExecutionContext,
  ) -> Result<ConservationReport> {
    self.evaluate_with(f, f, params, boundary, Correction::DensityMomentumEnergy, ctx)
  }

  fn evaluate_with(
    &mut self,
    fs: &na::DMatrix<f64>,
    fsp: &na::DMatrix<f64>,
    params: CollisionParams,
    boundary: BoundarySource,
    correction: Correction,
    ctx: &ExecutionContext,
  ) -> Result<ConservationReport> {
    let ops = &self.ops;
    let ws = &mut self.workspace;
    ops.check_shape(fs)?;
    ops.check_shape(fsp)?;

    let boundary_data = match boundary {
      BoundarySource::Analytic(maxwellian) => {
        BoundaryData::analytic(&maxwellian, ops.vpa(), ops.vperp())
      }
      BoundarySource::Numerical => BoundaryData::numerical(fsp, ops.vpa(), ops.vperp(), ctx)?,
    };

    ravel_into(fs, &mut ws.test_pdf)?;
    ravel_into(fsp, &mut ws.field_pdf)?;
    solve_potentials(ops, &ws.field_pdf, &boundary_data, &mut ws.potentials)?;

    ops.project_derivative_into(CoordinateRole::Vpa, &ws.test_pdf, &mut ws.dfdvpa);
    ops.project_derivative_into(CoordinateRole::Vperp, &ws.test_pdf, &mut ws.dfdvperp);
    compute_fluxes(ws, params.mass_ratio, ctx);

    // M C = -ν (Q_vpaᵀ Γ_vpa + Q_vperpᵀ Γ_vperp)
    let tensor = ops.tensor();
    let (q_vpa, q_vperp) = (
      tensor.derivative(CoordinateRole::Vpa),
      tensor.derivative(CoordinateRole::Vperp),
    );
    let nu = params.nu;
    ws.rate.fill(0.0);
    spmm_csr_dense(1.0, &mut ws.rate, -nu, Op::Transpose(q_vpa), Op::NoOp(&ws.flux_vpa));
    spmm_csr_dense(1.0, &mut ws.rate, -nu, Op::Transpose(q_vperp), Op::NoOp(&ws.flux_vperp));
    ops.factorizations().solve_mass_in_place(&mut ws.rate);

    let report = correct(ops, &ws.test_pdf, &mut ws.rate, correction)?;
    unravel_into(&ws.rate, &mut ws.rate_2d)?;
    tracing::debug!(
      "collision rate: raw density moment {:e}, corrected {:e}",
      report.raw.density,
      report.corrected.density
    );
    Ok(report)
  }
}

/// Pointwise fluxes, each worker filling its own region of the compound index space.
fn compute_fluxes(ws: &mut CollisionWorkspace, mass_ratio: f64, ctx: &ExecutionContext) {
  use PotentialField as P;
  let pot = &ws.potentials;
  let (f, dfdvpa, dfdvperp) = (&ws.test_pdf, &ws.dfdvpa, &ws.dfdvperp);
  let (dhdvpa, dhdvperp) = (pot.field(P::DhDvpa), pot.field(P::DhDvperp));
  let (d2gdvpa2, d2gdvperp2, d2gdvperpdvpa) = (
    pot.field(P::D2gDvpa2),
    pot.field(P::D2gDvperp2),
    pot.field(P::D2gDvperpDvpa),
  );

  ctx.for_each_region(ws.flux_vpa.as_mut_slice(), |region, slice| {
    for (value, ic) in slice.iter_mut().zip(region.range.clone()) {
      *value = d2gdvpa2[ic] * dfdvpa[ic] + d2gdvperpdvpa[ic] * dfdvperp[ic]
        - 2.0 * mass_ratio * f[ic] * dhdvpa[ic];
    }
  });
  ctx.for_each_region(ws.flux_vperp.as_mut_slice(), |region, slice| {
    for (value, ic) in slice.iter_mut().zip(region.range.clone()) {
      *value = d2gdvperpdvpa[ic] * dfdvpa[ic] + d2gdvperp2[ic] * dfdvperp[ic]
        - 2.0 * mass_ratio * f[ic] * dhdvperp[ic];
    }
  });
}
