//! Global tensor-product operators on the 2D velocity grid.

use crate::{
  assemble::{assemble_tensor_galmat, boundary_dofs, constrain_dofs, GalVec},
  coordinate::{Coordinate, CoordinateRole, GridSpec},
  elmat::{ElMat, ElmatKind, LocalOperatorBuilder},
  error::check_shape,
  factorize::FactorizationCache,
  index::{ravel, split_compound_index, unravel},
  parallel::ExecutionContext,
  spectral::SpectralOperatorSet,
  DofIdx, Error, Result,
};

use common::linalg::nalgebra::{CooMatrixExt, CsrMatrix};
use nas::ops::{serial::spmm_csr_dense, Op};
use std::f64::consts::TAU;

/// Sparse operators `A_vpa ⊗ A_vperp` in compound ordering.
#[derive(Debug, Clone)]
pub struct TensorOperators {
  nvpa: usize,
  nvperp: usize,
  /// `M ⊗ M`
  mass: CsrMatrix,
  /// `K ⊗ M`
  stiffness_vpa: CsrMatrix,
  /// `M ⊗ K`
  stiffness_vperp: CsrMatrix,
  /// `Q ⊗ M`
  derivative_vpa: CsrMatrix,
  /// `M ⊗ Q`
  derivative_vperp: CsrMatrix,
  /// `K ⊗ M + M ⊗ K`
  laplacian: CsrMatrix,
  /// [`Self::laplacian`] with identity rows on the boundary dofs.
  laplacian_bc: CsrMatrix,
  boundary_dofs: Vec<DofIdx>,
}

impl TensorOperators {
  pub fn assemble(vpa: &Coordinate, vperp: &Coordinate, ctx: &ExecutionContext) -> Result<Self> {
    check_roles(vpa, vperp)?;
    let spectral_vpa = SpectralOperatorSet::new(vpa)?;
    let spectral_vperp = SpectralOperatorSet::new(vperp)?;
    let builder_vpa = LocalOperatorBuilder::new(vpa, &spectral_vpa);
    let builder_vperp = LocalOperatorBuilder::new(vperp, &spectral_vperp);

    let mass_vpa = builder_vpa.elmats(ElmatKind::Mass);
    let mass_vperp = builder_vperp.elmats(ElmatKind::Mass);
    let stiffness_vpa = builder_vpa.elmats(ElmatKind::Stiffness);
    let stiffness_vperp = builder_vperp.elmats(ElmatKind::Stiffness);
    let derivative_vpa = builder_vpa.elmats(ElmatKind::Derivative);
    let derivative_vperp = builder_vperp.elmats(ElmatKind::Derivative);

    let tensor = |a: &[ElMat], b: &[ElMat]| assemble_tensor_galmat(vpa, vperp, a, b, ctx);
    let mass = tensor(&mass_vpa, &mass_vperp);
    let stiffness_vpa = tensor(&stiffness_vpa, &mass_vperp);
    let stiffness_vperp = tensor(&mass_vpa, &stiffness_vperp);
    let derivative_vpa = tensor(&derivative_vpa, &mass_vperp);
    let derivative_vperp = tensor(&mass_vpa, &derivative_vperp);

    let boundary_dofs = boundary_dofs(vpa, vperp);
    let laplacian = stiffness_vpa.clone().add_triplets(&stiffness_vperp);
    let mut laplacian_bc = laplacian.clone();
    constrain_dofs(&boundary_dofs, &mut laplacian_bc);

    let this = Self {
      nvpa: vpa.n(),
      nvperp: vperp.n(),
      mass: CsrMatrix::from(&mass),
      stiffness_vpa: CsrMatrix::from(&stiffness_vpa),
      stiffness_vperp: CsrMatrix::from(&stiffness_vperp),
      derivative_vpa: CsrMatrix::from(&derivative_vpa),
      derivative_vperp: CsrMatrix::from(&derivative_vperp),
      laplacian: CsrMatrix::from(&laplacian),
      laplacian_bc: CsrMatrix::from(&laplacian_bc),
      boundary_dofs,
    };
    tracing::debug!(
      "assembled tensor operators: {} dofs, mass nnz={}, laplacian nnz={}",
      this.ndofs(),
      this.mass.nnz(),
      this.laplacian.nnz()
    );
    Ok(this)
  }

  pub fn shape(&self) -> (usize, usize) {
    (self.nvpa, self.nvperp)
  }
  pub fn ndofs(&self) -> usize {
    self.nvpa * self.nvperp
  }
  pub fn mass(&self) -> &CsrMatrix {
    &self.mass
  }
  pub fn stiffness(&self, dir: CoordinateRole) -> &CsrMatrix {
    match dir {
      CoordinateRole::Vpa => &self.stiffness_vpa,
      CoordinateRole::Vperp => &self.stiffness_vperp,
    }
  }
  pub fn derivative(&self, dir: CoordinateRole) -> &CsrMatrix {
    match dir {
      CoordinateRole::Vpa => &self.derivative_vpa,
      CoordinateRole::Vperp => &self.derivative_vperp,
    }
  }
  pub fn laplacian(&self) -> &CsrMatrix {
    &self.laplacian
  }
  pub fn laplacian_bc(&self) -> &CsrMatrix {
    &self.laplacian_bc
  }
  pub fn boundary_dofs(&self) -> &[DofIdx] {
    &self.boundary_dofs
  }
}

fn check_roles(vpa: &Coordinate, vperp: &Coordinate) -> Result<()> {
  if vpa.role() != CoordinateRole::Vpa || vperp.role() != CoordinateRole::Vperp {
    return Err(Error::Configuration(format!(
      "expected (vpa, vperp) coordinates, got ({}, {})",
      vpa.role().name(),
      vperp.role().name()
    )));
  }
  Ok(())
}

/// Everything fixed by the velocity grid: coordinates, tensor operators,
/// factorizations and the velocity-space integration weights.
#[derive(Debug)]
pub struct FokkerPlanckOperators {
  vpa: Coordinate,
  vperp: Coordinate,
  tensor: TensorOperators,
  factorizations: FactorizationCache,
  /// `2π wgts_vpa[i] wgts_vperp[j]` in compound order.
  integration_weights: GalVec,
}

impl FokkerPlanckOperators {
  pub fn new(vpa_spec: &GridSpec, vperp_spec: &GridSpec, ctx: &ExecutionContext) -> Result<Self> {
    let vpa = Coordinate::new(CoordinateRole::Vpa, vpa_spec)?;
    let vperp = Coordinate::new(CoordinateRole::Vperp, vperp_spec)?;
    Self::from_coordinates(vpa, vperp, ctx)
  }

  pub fn from_coordinates(
    vpa: Coordinate,
    vperp: Coordinate,
    ctx: &ExecutionContext,
  ) -> Result<Self> {
    let tensor = TensorOperators::assemble(&vpa, &vperp, ctx)?;
    let factorizations = FactorizationCache::new(&tensor)?;
    let nvpa = vpa.n();
    let integration_weights = GalVec::from_fn(tensor.ndofs(), |ic, _| {
      let (ivpa, ivperp) = split_compound_index(ic, nvpa);
      TAU * vpa.wgts()[ivpa] * vperp.wgts()[ivperp]
    });
    tracing::info!(
      "velocity grid ready: nvpa={}, nvperp={}, workers={}",
      vpa.n(),
      vperp.n(),
      ctx.nworkers()
    );
    Ok(Self {
      vpa,
      vperp,
      tensor,
      factorizations,
      integration_weights,
    })
  }

  pub fn vpa(&self) -> &Coordinate {
    &self.vpa
  }
  pub fn vperp(&self) -> &Coordinate {
    &self.vperp
  }
  pub fn tensor(&self) -> &TensorOperators {
    &self.tensor
  }
  pub fn factorizations(&self) -> &FactorizationCache {
    &self.factorizations
  }
  pub fn integration_weights(&self) -> &GalVec {
    &self.integration_weights
  }
  pub fn shape(&self) -> (usize, usize) {
    self.tensor.shape()
  }
  pub fn ndofs(&self) -> usize {
    self.tensor.ndofs()
  }

  pub fn check_shape(&self, field: &na::DMatrix<f64>) -> Result<()> {
    check_shape(self.shape(), field.shape())
  }
  pub(crate) fn check_len(&self, vec: &GalVec) -> Result<()> {
    check_shape((self.ndofs(), 1), (vec.len(), 1))
  }

  /// `(vpa, vperp)` at a compound index.
  pub fn velocity(&self, ic: DofIdx) -> (f64, f64) {
    let (ivpa, ivperp) = split_compound_index(ic, self.vpa.n());
    (self.vpa.grid()[ivpa], self.vperp.grid()[ivperp])
  }

  /// Discretizes `f(vpa, vperp)` onto the grid.
  pub fn sample<F>(&self, f: F) -> na::DMatrix<f64>
  where
    F: Fn(f64, f64) -> f64,
  {
    na::DMatrix::from_fn(self.vpa.n(), self.vperp.n(), |i, j| {
      f(self.vpa.grid()[i], self.vperp.grid()[j])
    })
  }

  /// `∫ f d³v` including the gyro-angle.
  pub fn integrate(&self, field: &na::DMatrix<f64>) -> Result<f64> {
    self.check_shape(field)?;
    Ok(self.integrate_raveled(&ravel(field)))
  }
  pub(crate) fn integrate_raveled(&self, vec: &GalVec) -> f64 {
    self.integration_weights.dot(vec)
  }

  /// `M⁻¹ Q_dir f`
  pub(crate) fn project_derivative(&self, dir: CoordinateRole, vec: &GalVec) -> GalVec {
    let mut out = GalVec::zeros(vec.len());
    self.project_derivative_into(dir, vec, &mut out);
    out
  }

  /// [`Self::project_derivative`] written into `out`.
  pub(crate) fn project_derivative_into(
    &self,
    dir: CoordinateRole,
    vec: &GalVec,
    out: &mut GalVec,
  ) {
    spmm_csr_dense(0.0, &mut *out, 1.0, Op::NoOp(self.tensor.derivative(dir)), Op::NoOp(vec));
    self.factorizations.solve_mass_in_place(out);
  }

  /// `M⁻¹ K_dir f`
  pub(crate) fn project_stiffness(&self, dir: CoordinateRole, vec: &GalVec) -> GalVec {
    self
      .factorizations
      .solve_mass(&(self.tensor.stiffness(dir) * vec))
  }

  /// Weak first derivative `∂f/∂vpa` or `∂f/∂vperp`.
  pub fn weak_derivative(
    &self,
    dir: CoordinateRole,
    field: &na::DMatrix<f64>,
  ) -> Result<na::DMatrix<f64>> {
    self.check_shape(field)?;
    let (nvpa, nvperp) = self.shape();
    unravel(&self.project_derivative(dir, &ravel(field)), nvpa, nvperp)
  }

  /// Weak second-order operator of one direction: `∂²f/∂vpa²` for vpa and
  /// the radial part of the cylindrical Laplacian
  /// `(1/vperp) ∂(vperp ∂f/∂vperp)/∂vperp` for vperp.
  ///
  /// Boundary fluxes at the outer ends are included, so the result is accurate
  /// up to the boundary.
  pub fn weak_second_derivative(
    &self,
    dir: CoordinateRole,
    field: &na::DMatrix<f64>,
  ) -> Result<na::DMatrix<f64>> {
    self.check_shape(field)?;
    let (nvpa, nvperp) = self.shape();
    unravel(&self.project_stiffness(dir, &ravel(field)), nvpa, nvperp)
  }
}
