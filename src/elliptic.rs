//! Weak-form elliptic solves for the Rosenbluth potentials.

use crate::{
  assemble::{lift_dofs_coeff, GalVec},
  boundary::{BoundaryData, PotentialField},
  coordinate::CoordinateRole,
  error::check_shape,
  factorize::Factorization,
  index::unravel,
  operators::FokkerPlanckOperators,
  DofIdx, Result,
};

use common::linalg::nalgebra::CsrMatrix;
use std::f64::consts::PI;

/// Solves `operator · x = coeff · target · source` with Dirichlet values on
/// the given dofs.
///
/// `factorization` must factorize `operator` with the Dirichlet rows and
/// columns replaced by identity rows; `operator` itself lifts the boundary
/// values into the right-hand side.
pub fn solve_weak_elliptic(
  operator: &CsrMatrix,
  factorization: &Factorization,
  target: &CsrMatrix,
  source: &GalVec,
  coeff: f64,
  dirichlet: &[(DofIdx, f64)],
) -> GalVec {
  let mut rhs = coeff * (target * source);
  lift_dofs_coeff(dirichlet, operator, &mut rhs);
  factorization.solve(&rhs)
}

/// The eight potential fields in compound ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct Potentials {
  fields: [GalVec; 8],
}

impl Potentials {
  pub fn zeros(ndofs: usize) -> Self {
    Self {
      fields: std::array::from_fn(|_| GalVec::zeros(ndofs)),
    }
  }

  pub fn ndofs(&self) -> usize {
    self.fields[0].len()
  }

  pub fn field(&self, field: PotentialField) -> &GalVec {
    &self.fields[field.index()]
  }
  pub fn field_mut(&mut self, field: PotentialField) -> &mut GalVec {
    &mut self.fields[field.index()]
  }

  /// One field as a `(nvpa, nvperp)` array.
  pub fn field_2d(
    &self,
    field: PotentialField,
    ops: &FokkerPlanckOperators,
  ) -> Result<na::DMatrix<f64>> {
    let (nvpa, nvperp) = ops.shape();
    unravel(self.field(field), nvpa, nvperp)
  }

  pub(crate) fn check_len(&self, ops: &FokkerPlanckOperators) -> Result<()> {
    check_shape((ops.ndofs(), 1), (self.ndofs(), 1))
  }
}

/// Rosenbluth potentials of the field-species distribution `source`
/// (compound-indexed), written into `out`.
///
/// `∇²H = -4πF` and `∇²G = 2H` are solved with the given boundary data.
/// First derivatives use the weak projection `M⁻¹Q`, `∂²G/∂vpa²` uses
/// `M⁻¹K_vpa`, and the vperp second derivatives chain projections of
/// `∂G/∂vperp`. Boundary nodes of every derived field are overwritten with
/// the boundary data.
pub fn solve_potentials(
  ops: &FokkerPlanckOperators,
  source: &GalVec,
  boundary: &BoundaryData,
  out: &mut Potentials,
) -> Result<()> {
  use CoordinateRole::{Vpa, Vperp};
  use PotentialField as P;

  ops.check_len(source)?;
  check_shape(ops.shape(), boundary.shape())?;
  out.check_len(ops)?;

  let tensor = ops.tensor();
  let cache = ops.factorizations();
  let dofs = tensor.boundary_dofs();

  let h = solve_weak_elliptic(
    tensor.laplacian(),
    cache.laplacian(),
    tensor.mass(),
    source,
    -4.0 * PI,
    &boundary.dirichlet_values(P::H, dofs),
  );
  let g = solve_weak_elliptic(
    tensor.laplacian(),
    cache.laplacian(),
    tensor.mass(),
    &h,
    2.0,
    &boundary.dirichlet_values(P::G, dofs),
  );

  let dgdvperp = ops.project_derivative(Vperp, &g);
  let derived = [
    (P::DhDvpa, ops.project_derivative(Vpa, &h)),
    (P::DhDvperp, ops.project_derivative(Vperp, &h)),
    (P::D2gDvpa2, ops.project_stiffness(Vpa, &g)),
    (P::D2gDvperp2, ops.project_derivative(Vperp, &dgdvperp)),
    (P::D2gDvperpDvpa, ops.project_derivative(Vpa, &dgdvperp)),
    (P::DgDvperp, dgdvperp),
    (P::H, h),
    (P::G, g),
  ];
  for (field, mut values) in derived {
    boundary.inject(field, &mut values)?;
    *out.field_mut(field) = values;
  }
  tracing::debug!("solved Rosenbluth potentials on {} dofs", ops.ndofs());
  Ok(())
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::{
    assemble::boundary_dofs, coordinate::GridSpec, index::ravel, parallel::ExecutionContext,
  };
  use approx::assert_abs_diff_eq;

  #[test]
  fn recovers_quadratic_solution_of_poisson_problem() {
    let ctx = ExecutionContext::serial().unwrap();
    let ops =
      FokkerPlanckOperators::new(&GridSpec::new(4, 3, 2.0), &GridSpec::new(4, 2, 2.0), &ctx)
        .unwrap();
    // u = vpa² + vperp², ∇²u = 2 + 4 in cylindrical velocity coordinates
    let exact = ravel(&ops.sample(|vpa, vperp| vpa * vpa + vperp * vperp));
    let source = GalVec::from_element(ops.ndofs(), 6.0);
    let dirichlet: Vec<_> = boundary_dofs(ops.vpa(), ops.vperp())
      .into_iter()
      .map(|ic| (ic, exact[ic]))
      .collect();

    let tensor = ops.tensor();
    let sol = solve_weak_elliptic(
      tensor.laplacian(),
      ops.factorizations().laplacian(),
      tensor.mass(),
      &source,
      1.0,
      &dirichlet,
    );
    assert_abs_diff_eq!(sol, exact, epsilon = 1e-10);
  }

  #[test]
  fn potentials_must_match_grid() {
    let ctx = ExecutionContext::serial().unwrap();
    let ops =
      FokkerPlanckOperators::new(&GridSpec::new(3, 2, 2.0), &GridSpec::new(3, 2, 2.0), &ctx)
        .unwrap();
    let boundary = BoundaryData::analytic(
      &crate::maxwellian::Maxwellian::new(1.0, 0.0, 1.0),
      ops.vpa(),
      ops.vperp(),
    );
    let mut out = Potentials::zeros(ops.ndofs());
    let short = GalVec::zeros(ops.ndofs() - 1);
    assert!(solve_potentials(&ops, &short, &boundary, &mut out).is_err());
  }

  #[test]
  fn boundary_data_of_other_grid_is_rejected() {
    let ctx = ExecutionContext::serial().unwrap();
    let coarse =
      FokkerPlanckOperators::new(&GridSpec::new(5, 2, 4.0), &GridSpec::new(5, 1, 2.0), &ctx)
        .unwrap();
    let fine =
      FokkerPlanckOperators::new(&GridSpec::new(5, 4, 4.0), &GridSpec::new(5, 2, 2.0), &ctx)
        .unwrap();
    assert_eq!(coarse.shape(), (9, 5));
    assert_eq!(fine.shape(), (17, 9));

    let maxwellian = crate::maxwellian::Maxwellian::new(1.0, 0.0, 1.0);
    let boundary = BoundaryData::analytic(&maxwellian, coarse.vpa(), coarse.vperp());
    let source = ravel(&maxwellian.discretize(&fine));
    let mut out = Potentials::zeros(fine.ndofs());
    let result = solve_potentials(&fine, &source, &boundary, &mut out);
    assert!(matches!(
      result,
      Err(crate::Error::ShapeMismatch { expected: (17, 9), found: (9, 5) })
    ));
  }
}
