//! Sparse factorizations reused across all solves on a fixed grid.

use crate::{operators::TensorOperators, Error, Result};

use common::linalg::{
  faer::{FaerCholesky, FaerLu},
  nalgebra::{CsrMatrix, Vector},
};

pub enum Factorization {
  Lu { operator: &'static str, raw: FaerLu },
  Cholesky { operator: &'static str, raw: FaerCholesky },
}
impl Factorization {
  pub fn lu(operator: &'static str, galmat: &CsrMatrix) -> Result<Self> {
    let raw = FaerLu::new(galmat.clone()).ok_or(Error::SingularOperator { operator })?;
    tracing::debug!("LU factorized `{operator}` ({} dofs)", galmat.nrows());
    Ok(Self::Lu { operator, raw })
  }

  pub fn cholesky(operator: &'static str, galmat: &CsrMatrix) -> Result<Self> {
    let raw = FaerCholesky::new(galmat.clone()).ok_or(Error::SingularOperator { operator })?;
    tracing::debug!("Cholesky factorized `{operator}` ({} dofs)", galmat.nrows());
    Ok(Self::Cholesky { operator, raw })
  }

  pub fn operator(&self) -> &'static str {
    match self {
      Self::Lu { operator, .. } | Self::Cholesky { operator, .. } => operator,
    }
  }

  pub fn solve(&self, rhs: &Vector) -> Vector {
    match self {
      Self::Lu { raw, .. } => raw.solve(rhs),
      Self::Cholesky { raw, .. } => raw.solve(rhs),
    }
  }

  /// Overwrites `rhs` with the solution.
  pub fn solve_in_place(&self, rhs: &mut Vector) {
    match self {
      Self::Lu { raw, .. } => raw.solve_in_place(rhs),
      Self::Cholesky { raw, .. } => raw.solve_in_place(rhs),
    }
  }
}

impl std::fmt::Debug for Factorization {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let kind = match self {
      Self::Lu { .. } => "Lu",
      Self::Cholesky { .. } => "Cholesky",
    };
    write!(f, "Factorization::{kind}({})", self.operator())
  }
}

/// Factorizations of the mass matrix and the constrained Laplacian.
///
/// Built once per grid and never mutated; a new grid needs a new cache.
#[derive(Debug)]
pub struct FactorizationCache {
  mass: Factorization,
  laplacian: Factorization,
}
impl FactorizationCache {
  pub fn new(ops: &TensorOperators) -> Result<Self> {
    let mass = Factorization::cholesky("mass", ops.mass())?;
    let laplacian = Factorization::lu("laplacian_bc", ops.laplacian_bc())?;
    Ok(Self { mass, laplacian })
  }

  pub fn mass(&self) -> &Factorization {
    &self.mass
  }
  pub fn laplacian(&self) -> &Factorization {
    &self.laplacian
  }

  pub fn solve_mass(&self, rhs: &Vector) -> Vector {
    self.mass.solve(rhs)
  }
  pub fn solve_mass_in_place(&self, rhs: &mut Vector) {
    self.mass.solve_in_place(rhs)
  }
  pub fn solve_laplacian(&self, rhs: &Vector) -> Vector {
    self.laplacian.solve(rhs)
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use common::linalg::nalgebra::CooMatrix;

  #[test]
  fn indefinite_operator_is_reported() {
    let mut coo = CooMatrix::new(3, 3);
    coo.push(0, 0, 1.0);
    coo.push(1, 1, 1.0);
    coo.push(2, 2, -1.0);
    let singular = CsrMatrix::from(&coo);
    match Factorization::cholesky("singular", &singular) {
      Err(Error::SingularOperator { operator }) => assert_eq!(operator, "singular"),
      other => panic!("expected singular operator, got {other:?}"),
    }
  }

  #[test]
  fn factorization_keeps_label() {
    let mut coo = CooMatrix::new(2, 2);
    coo.push(0, 0, 2.0);
    coo.push(1, 1, 4.0);
    let lu = Factorization::lu("diag", &CsrMatrix::from(&coo)).unwrap();
    assert_eq!(lu.operator(), "diag");
    let x = lu.solve(&Vector::from_vec(vec![2.0, 2.0]));
    approx::assert_relative_eq!(x, Vector::from_vec(vec![1.0, 0.5]), epsilon = 1e-15);
  }
}
