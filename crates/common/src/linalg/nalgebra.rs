use std::mem;

pub type Vector<T = f64> = na::DVector<T>;
pub type Matrix<T = f64> = na::DMatrix<T>;
pub type CooMatrix<T = f64> = nas::CooMatrix<T>;
pub type CsrMatrix<T = f64> = nas::CsrMatrix<T>;

pub trait DMatrixExt {
  fn is_symmetric(&self, eps: f64) -> bool;
  fn is_spd(&self) -> bool;
}
impl DMatrixExt for Matrix {
  fn is_symmetric(&self, eps: f64) -> bool {
    self.is_square()
      && (0..self.nrows())
        .all(|i| (0..i).all(|j| (self[(i, j)] - self[(j, i)]).abs() <= eps))
  }
  fn is_spd(&self) -> bool {
    self.is_square() && *self == self.transpose() && na::Cholesky::new(self.clone()).is_some()
  }
}

pub trait CooMatrixExt {
  /// Removes all entries `(r, c)` for which `predicate` holds.
  fn set_zero<F>(&mut self, predicate: F)
  where
    F: Fn(usize, usize) -> bool;
  /// Entry-wise sum of two equally shaped matrices, duplicates kept.
  fn add_triplets(self, other: &Self) -> Self;
}

impl CooMatrixExt for CooMatrix {
  fn set_zero<F>(&mut self, predicate: F)
  where
    F: Fn(usize, usize) -> bool,
  {
    let nrows = self.nrows();
    let ncols = self.ncols();
    let (mut rows, mut cols, mut vals) = mem::replace(self, Self::new(0, 0)).disassemble();
    let mut i = 0;
    while i < rows.len() {
      if predicate(rows[i], cols[i]) {
        rows.swap_remove(i);
        cols.swap_remove(i);
        vals.swap_remove(i);
      } else {
        i += 1;
      }
    }
    *self = Self::try_from_triplets(nrows, ncols, rows, cols, vals)
      .expect("Removing entries keeps indices in bounds.")
  }

  fn add_triplets(mut self, other: &Self) -> Self {
    assert_eq!(self.nrows(), other.nrows());
    assert_eq!(self.ncols(), other.ncols());
    for (r, c, &v) in other.triplet_iter() {
      self.push(r, c, v);
    }
    self
  }
}
