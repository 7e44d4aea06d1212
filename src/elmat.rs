//! Element-local operators of one coordinate.

use crate::{
  coordinate::{Coordinate, CoordinateRole},
  spectral::{ElementTables, SpectralOperatorSet},
};

use itertools::izip;

pub type ElMat = na::DMatrix<f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElmatKind {
  /// `∫ ℓ_i ℓ_j J`
  Mass,
  /// `-∫ ℓ_i' ℓ_j' J + [J ℓ_i ℓ_j']` with the bracket taken at the domain ends.
  ///
  /// `M⁻¹K` is the weak second derivative in vpa and the weak radial
  /// Laplacian `(1/v)(v f')'` in vperp.
  Stiffness,
  /// `∫ ℓ_i ℓ_j' J`
  Derivative,
}

pub struct LocalOperatorBuilder<'a> {
  coord: &'a Coordinate,
  spectral: &'a SpectralOperatorSet,
}
impl<'a> LocalOperatorBuilder<'a> {
  pub fn new(coord: &'a Coordinate, spectral: &'a SpectralOperatorSet) -> Self {
    Self { coord, spectral }
  }

  pub fn elmats(&self, kind: ElmatKind) -> Vec<ElMat> {
    (0..self.coord.nelement())
      .map(|ielement| self.elmat(kind, ielement))
      .collect()
  }

  pub fn elmat(&self, kind: ElmatKind, ielement: usize) -> ElMat {
    let tables = self.spectral.tables(ielement);
    let ngrid = self.coord.ngrid();
    let [lower, upper] = self.coord.element_bounds(ielement);
    let half = 0.5 * (upper - lower);

    let mut elmat = ElMat::zeros(ngrid, ngrid);
    let rule = tables.rule();
    for (q, (&xi, &w)) in izip!(rule.nodes(), rule.weights()).enumerate() {
      let v = self.coord.map_to_element(ielement, xi);
      let jw = w * half * self.coord.jacobian(v);
      let phi = tables.values().row(q);
      let dphi = tables.derivs().row(q);
      for i in 0..ngrid {
        for j in 0..ngrid {
          elmat[(i, j)] += jw
            * match kind {
              ElmatKind::Mass => phi[i] * phi[j],
              ElmatKind::Stiffness => -dphi[i] * dphi[j] / (half * half),
              ElmatKind::Derivative => phi[i] * dphi[j] / half,
            };
        }
      }
    }

    if kind == ElmatKind::Stiffness {
      self.add_boundary_flux(&mut elmat, ielement, tables, half);
    }
    elmat
  }

  /// Surface term of the integration by parts at the outer domain ends.
  /// Vanishes on the vperp axis through the jacobian.
  fn add_boundary_flux(
    &self,
    elmat: &mut ElMat,
    ielement: usize,
    tables: &ElementTables,
    half: f64,
  ) {
    let [lower, upper] = self.coord.element_bounds(ielement);
    if ielement + 1 == self.coord.nelement() {
      let jac = self.coord.jacobian(upper);
      *elmat += jac / half * tables.upper_values() * tables.upper_derivs().transpose();
    }
    if ielement == 0 && self.coord.role() == CoordinateRole::Vpa {
      let jac = self.coord.jacobian(lower);
      *elmat -= jac / half * tables.lower_values() * tables.lower_derivs().transpose();
    }
  }
}
