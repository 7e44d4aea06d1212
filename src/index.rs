//! Compound indexing of the 2D velocity grid.
//!
//! A pair `(i1, i2)` with `i1 < n1` maps to `i1 + n1 * i2`, so the first index
//! runs fastest. The same map serves element-local pairs (extent `ngrid`) and
//! global pairs (extent `nvpa`). Since nalgebra stores matrices column-major,
//! a `DMatrix` with rows indexed by vpa and columns by vperp is already laid
//! out in compound order.

use crate::{error::check_shape, Result};

pub fn compound_index(i1: usize, i2: usize, n1: usize) -> usize {
  debug_assert!(i1 < n1);
  i1 + n1 * i2
}

pub fn split_compound_index(ic: usize, n1: usize) -> (usize, usize) {
  (ic % n1, ic / n1)
}

/// Flattens a `(nvpa, nvperp)` array into a compound-indexed vector.
pub fn ravel(field: &na::DMatrix<f64>) -> na::DVector<f64> {
  na::DVector::from_column_slice(field.as_slice())
}

/// Inverse of [`ravel`].
pub fn unravel(vec: &na::DVector<f64>, nvpa: usize, nvperp: usize) -> Result<na::DMatrix<f64>> {
  check_shape((nvpa * nvperp, 1), (vec.len(), 1))?;
  Ok(na::DMatrix::from_column_slice(nvpa, nvperp, vec.as_slice()))
}

/// Copies a 2D array into an existing compound-indexed buffer.
pub fn ravel_into(field: &na::DMatrix<f64>, out: &mut na::DVector<f64>) -> Result<()> {
  check_shape((out.len(), 1), (field.len(), 1))?;
  out.as_mut_slice().copy_from_slice(field.as_slice());
  Ok(())
}

/// Copies a compound-indexed vector into an existing 2D array.
pub fn unravel_into(vec: &na::DVector<f64>, out: &mut na::DMatrix<f64>) -> Result<()> {
  check_shape((out.len(), 1), (vec.len(), 1))?;
  out.as_mut_slice().copy_from_slice(vec.as_slice());
  Ok(())
}
