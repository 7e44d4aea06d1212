//! Reference-element tables of the spectral discretization.

use crate::{
  coordinate::{Coordinate, ElementKind},
  quadrature::{gauss_legendre, LagrangeBasis, QuadRule},
  Error, Result,
};

/// Lagrange basis of one element kind, tabulated at the Gauss points and at
/// the reference end points `∓1`.
#[derive(Debug, Clone)]
pub struct ElementTables {
  kind: ElementKind,
  basis: LagrangeBasis,
  rule: QuadRule,
  /// `(q, j) -> ℓ_j(ξ_q)`
  values: na::DMatrix<f64>,
  /// `(q, j) -> ℓ_j'(ξ_q)`, the differentiation matrix from nodal values to Gauss points.
  derivs: na::DMatrix<f64>,
  lower_values: na::DVector<f64>,
  lower_derivs: na::DVector<f64>,
  upper_values: na::DVector<f64>,
  upper_derivs: na::DVector<f64>,
}
impl ElementTables {
  pub fn new(kind: ElementKind, nodes: Vec<f64>) -> Self {
    let basis = LagrangeBasis::new(nodes);
    let nbasis = basis.len();
    // degree 2(ngrid - 1) integrands, plus the vperp jacobian
    let rule = gauss_legendre(nbasis + 2);
    let values = na::DMatrix::from_fn(rule.npoints(), nbasis, |q, j| {
      basis.eval(j, rule.nodes()[q])
    });
    let derivs = na::DMatrix::from_fn(rule.npoints(), nbasis, |q, j| {
      basis.deriv(j, rule.nodes()[q])
    });
    let at = |x: f64, f: fn(&LagrangeBasis, usize, f64) -> f64| {
      na::DVector::from_fn(nbasis, |j, _| f(&basis, j, x))
    };
    let lower_values = at(-1.0, LagrangeBasis::eval);
    let lower_derivs = at(-1.0, LagrangeBasis::deriv);
    let upper_values = at(1.0, LagrangeBasis::eval);
    let upper_derivs = at(1.0, LagrangeBasis::deriv);

    Self {
      kind,
      basis,
      rule,
      values,
      derivs,
      lower_values,
      lower_derivs,
      upper_values,
      upper_derivs,
    }
  }

  pub fn kind(&self) -> ElementKind {
    self.kind
  }
  pub fn basis(&self) -> &LagrangeBasis {
    &self.basis
  }
  pub fn rule(&self) -> &QuadRule {
    &self.rule
  }
  pub fn values(&self) -> &na::DMatrix<f64> {
    &self.values
  }
  pub fn derivs(&self) -> &na::DMatrix<f64> {
    &self.derivs
  }
  pub fn lower_values(&self) -> &na::DVector<f64> {
    &self.lower_values
  }
  pub fn lower_derivs(&self) -> &na::DVector<f64> {
    &self.lower_derivs
  }
  pub fn upper_values(&self) -> &na::DVector<f64> {
    &self.upper_values
  }
  pub fn upper_derivs(&self) -> &na::DVector<f64> {
    &self.upper_derivs
  }
}

/// Per-coordinate spectral tables; one [`ElementTables`] per element kind in use.
#[derive(Debug, Clone)]
pub struct SpectralOperatorSet {
  lobatto: ElementTables,
  radau: Option<ElementTables>,
  element_kinds: Vec<ElementKind>,
}
impl SpectralOperatorSet {
  pub fn new(coord: &Coordinate) -> Result<Self> {
    if !coord.discretization().is_spectral() {
      return Err(Error::Configuration(format!(
        "{} coordinate uses finite differences, element operators need a spectral discretization",
        coord.role().name()
      )));
    }
    let element_kinds = coord.element_kinds().to_vec();
    let lobatto = ElementTables::new(
      ElementKind::Lobatto,
      coord.reference_nodes(ElementKind::Lobatto),
    );
    let radau = element_kinds
      .contains(&ElementKind::Radau)
      .then(|| ElementTables::new(ElementKind::Radau, coord.reference_nodes(ElementKind::Radau)));

    Ok(Self {
      lobatto,
      radau,
      element_kinds,
    })
  }

  pub fn element_kind(&self, ielement: usize) -> ElementKind {
    self.element_kinds[ielement]
  }

  pub fn tables(&self, ielement: usize) -> &ElementTables {
    match (self.element_kinds[ielement], &self.radau) {
      (ElementKind::Radau, Some(radau)) => radau,
      _ => &self.lobatto,
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::coordinate::{CoordinateRole, Discretization, GridSpec};
  use approx::assert_abs_diff_eq;

  #[test]
  fn vperp_uses_radau_tables_on_first_element() {
    let coord = Coordinate::new(CoordinateRole::Vperp, &GridSpec::new(4, 3, 1.0)).unwrap();
    let set = SpectralOperatorSet::new(&coord).unwrap();
    assert_eq!(set.tables(0).kind(), ElementKind::Radau);
    assert_eq!(set.tables(1).kind(), ElementKind::Lobatto);
    assert_eq!(set.tables(2).kind(), ElementKind::Lobatto);
  }

  #[test]
  fn endpoint_tables() {
    let coord = Coordinate::new(CoordinateRole::Vpa, &GridSpec::new(5, 2, 1.0)).unwrap();
    let tables = SpectralOperatorSet::new(&coord).unwrap().tables(0).clone();
    assert_abs_diff_eq!(tables.lower_values()[0], 1.0, epsilon = 1e-14);
    assert_abs_diff_eq!(tables.upper_values()[4], 1.0, epsilon = 1e-14);
    assert_abs_diff_eq!(tables.upper_derivs().sum(), 0.0, epsilon = 1e-12);
    assert_eq!(tables.values().shape(), (7, 5));
  }

  #[test]
  fn finite_difference_has_no_element_tables() {
    let spec = GridSpec::new(4, 2, 1.0).with_discretization(Discretization::FiniteDifference);
    let coord = Coordinate::new(CoordinateRole::Vpa, &spec).unwrap();
    assert!(matches!(
      SpectralOperatorSet::new(&coord),
      Err(Error::Configuration(_))
    ));
  }
}
