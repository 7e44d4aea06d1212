//! Sparse direct solvers backed by faer, operating on nalgebra data.

use faer::linalg::solvers::Solve;

use super::nalgebra::{CsrMatrix, Vector};

type SparseMatrixFaer = faer::sparse::SparseRowMat<usize, f64>;

/// Converts a CSR matrix without copying its index structure.
pub fn nalgebra2faer(m: CsrMatrix) -> SparseMatrixFaer {
  let nrows = m.nrows();
  let ncols = m.ncols();
  let (row_ptrs, col_indices, values) = m.disassemble();

  let symbolic =
    faer::sparse::SymbolicSparseRowMat::new_checked(nrows, ncols, row_ptrs, None, col_indices);
  faer::sparse::SparseRowMat::new(symbolic, values)
}

fn navec2faercol(b: &Vector) -> faer::Col<f64> {
  faer::Col::from_fn(b.nrows(), |i| b[i])
}

fn faercol2navec(x: &faer::Col<f64>) -> Vector {
  Vector::from_iterator(x.nrows(), x.iter().copied())
}

/// Sparse LU factorization with partial pivoting.
pub struct FaerLu {
  raw: faer::sparse::linalg::solvers::Lu<usize, f64>,
}
impl FaerLu {
  /// Factorizes `a`. `None` if the matrix is structurally or numerically singular.
  pub fn new(a: CsrMatrix) -> Option<Self> {
    let raw = nalgebra2faer(a).sp_lu().ok()?;
    Some(Self { raw })
  }
  pub fn solve(&self, b: &Vector) -> Vector {
    let x = self.raw.solve(navec2faercol(b));
    faercol2navec(&x)
  }
  /// Overwrites `b` with the solution.
  pub fn solve_in_place(&self, b: &mut Vector) {
    self.raw.solve_in_place(faer::ColMut::from_slice_mut(b.as_mut_slice()));
  }
}

/// Sparse Cholesky factorization of a symmetric positive definite matrix.
/// Only the upper triangle is read.
pub struct FaerCholesky {
  raw: faer::sparse::linalg::solvers::Llt<usize, f64>,
}
impl FaerCholesky {
  /// Factorizes `a`. `None` if the matrix is not positive definite.
  pub fn new(a: CsrMatrix) -> Option<Self> {
    let raw = nalgebra2faer(a).sp_cholesky(faer::Side::Upper).ok()?;
    Some(Self { raw })
  }

  pub fn solve(&self, b: &Vector) -> Vector {
    let x = self.raw.solve(navec2faercol(b));
    faercol2navec(&x)
  }
  /// Overwrites `b` with the solution.
  pub fn solve_in_place(&self, b: &mut Vector) {
    self.raw.solve_in_place(faer::ColMut::from_slice_mut(b.as_mut_slice()));
  }
}
