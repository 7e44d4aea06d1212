//! One velocity coordinate: grid points, element structure and integration weights.

use crate::{
  quadrature::{
    chebyshev_lobatto_nodes, chebyshev_radau_nodes, gauss_legendre, lobatto_nodes, radau_nodes,
    LagrangeBasis,
  },
  Error, Result,
};

use itertools::izip;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Discretization {
  FiniteDifference,
  GaussLegendreLobatto,
  Chebyshev,
}
impl Discretization {
  pub fn is_spectral(&self) -> bool {
    !matches!(self, Self::FiniteDifference)
  }
}

/// Which velocity direction a coordinate discretizes.
///
/// Also used to select the direction of derivative operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoordinateRole {
  /// Parallel velocity on `[-L, L]`, Cartesian measure.
  Vpa,
  /// Perpendicular speed on `[0, L]`, cylindrical measure `vperp dvperp`.
  Vperp,
}
impl CoordinateRole {
  pub fn name(&self) -> &'static str {
    match self {
      Self::Vpa => "vpa",
      Self::Vperp => "vperp",
    }
  }
  pub fn jacobian(&self, v: f64) -> f64 {
    match self {
      Self::Vpa => 1.0,
      Self::Vperp => v,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
  /// Nodes include both element endpoints.
  Lobatto,
  /// Nodes include the upper endpoint only.
  Radau,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridSpec {
  pub ngrid: usize,
  pub nelement: usize,
  pub domain_length: f64,
  pub discretization: Discretization,
}
impl GridSpec {
  pub fn new(ngrid: usize, nelement: usize, domain_length: f64) -> Self {
    Self {
      ngrid,
      nelement,
      domain_length,
      discretization: Discretization::GaussLegendreLobatto,
    }
  }
  pub fn with_discretization(mut self, discretization: Discretization) -> Self {
    self.discretization = discretization;
    self
  }

  fn validate(&self) -> Result<()> {
    if self.ngrid < 2 {
      return Err(Error::Configuration(format!(
        "ngrid must be at least 2, got {}",
        self.ngrid
      )));
    }
    if self.nelement < 1 {
      return Err(Error::Configuration(
        "nelement must be at least 1".into(),
      ));
    }
    if !(self.domain_length.is_finite() && self.domain_length > 0.0) {
      return Err(Error::Configuration(format!(
        "domain length must be positive and finite, got {}",
        self.domain_length
      )));
    }
    Ok(())
  }
}

#[derive(Debug, Clone)]
pub struct Coordinate {
  role: CoordinateRole,
  ngrid: usize,
  nelement: usize,
  domain_length: f64,
  discretization: Discretization,
  grid: na::DVector<f64>,
  wgts: na::DVector<f64>,
  /// `(ilocal, ielement) -> iglobal`
  igrid_full: na::DMatrix<usize>,
  element_bounds: Vec<[f64; 2]>,
  element_kinds: Vec<ElementKind>,
}

impl Coordinate {
  pub fn new(role: CoordinateRole, spec: &GridSpec) -> Result<Self> {
    spec.validate()?;
    let GridSpec {
      ngrid,
      nelement,
      domain_length,
      discretization,
    } = *spec;

    let n = (ngrid - 1) * nelement + 1;
    let igrid_full = na::DMatrix::from_fn(ngrid, nelement, |i, e| e * (ngrid - 1) + i);

    let lower = match role {
      CoordinateRole::Vpa => -domain_length,
      CoordinateRole::Vperp => 0.0,
    };
    let h = (domain_length - lower) / nelement as f64;
    let element_bounds: Vec<[f64; 2]> = (0..nelement)
      .map(|e| [lower + e as f64 * h, lower + (e + 1) as f64 * h])
      .collect();

    let element_kinds: Vec<ElementKind> = (0..nelement)
      .map(|e| {
        if discretization.is_spectral() && role == CoordinateRole::Vperp && e == 0 {
          ElementKind::Radau
        } else {
          ElementKind::Lobatto
        }
      })
      .collect();

    let mut this = Self {
      role,
      ngrid,
      nelement,
      domain_length,
      discretization,
      grid: na::DVector::zeros(n),
      wgts: na::DVector::zeros(n),
      igrid_full,
      element_bounds,
      element_kinds,
    };
    this.grid = this.compute_grid();
    this.wgts = this.compute_wgts();

    tracing::debug!(
      "built {} coordinate: n={n}, ngrid={ngrid}, nelement={nelement}, L={domain_length}",
      role.name()
    );
    Ok(this)
  }

  pub fn role(&self) -> CoordinateRole {
    self.role
  }
  pub fn ngrid(&self) -> usize {
    self.ngrid
  }
  pub fn nelement(&self) -> usize {
    self.nelement
  }
  pub fn n(&self) -> usize {
    self.grid.len()
  }
  pub fn domain_length(&self) -> f64 {
    self.domain_length
  }
  pub fn discretization(&self) -> Discretization {
    self.discretization
  }
  pub fn grid(&self) -> &na::DVector<f64> {
    &self.grid
  }
  pub fn wgts(&self) -> &na::DVector<f64> {
    &self.wgts
  }
  pub fn igrid_full(&self) -> &na::DMatrix<usize> {
    &self.igrid_full
  }
  pub fn global_index(&self, ilocal: usize, ielement: usize) -> usize {
    self.igrid_full[(ilocal, ielement)]
  }
  pub fn element_bounds(&self, ielement: usize) -> [f64; 2] {
    self.element_bounds[ielement]
  }
  pub fn element_kind(&self, ielement: usize) -> ElementKind {
    self.element_kinds[ielement]
  }
  pub fn element_kinds(&self) -> &[ElementKind] {
    &self.element_kinds
  }
  pub fn lower(&self) -> f64 {
    self.element_bounds[0][0]
  }
  pub fn upper(&self) -> f64 {
    self.element_bounds[self.nelement - 1][1]
  }
  pub fn jacobian(&self, v: f64) -> f64 {
    self.role.jacobian(v)
  }

  /// Reference nodes on `[-1, 1]` of an element of the given kind.
  pub fn reference_nodes(&self, kind: ElementKind) -> Vec<f64> {
    use Discretization as D;
    use ElementKind as K;
    match (self.discretization, kind) {
      (D::GaussLegendreLobatto, K::Lobatto) => lobatto_nodes(self.ngrid),
      (D::GaussLegendreLobatto, K::Radau) => radau_nodes(self.ngrid),
      (D::Chebyshev, K::Lobatto) => chebyshev_lobatto_nodes(self.ngrid),
      (D::Chebyshev, K::Radau) => chebyshev_radau_nodes(self.ngrid),
      (D::FiniteDifference, _) => {
        let n = (self.ngrid - 1) as f64;
        (0..self.ngrid).map(|i| -1.0 + 2.0 * i as f64 / n).collect()
      }
    }
  }

  /// Maps a reference point `xi ∈ [-1, 1]` into element `ielement`.
  pub fn map_to_element(&self, ielement: usize, xi: f64) -> f64 {
    let [lower, upper] = self.element_bounds[ielement];
    lower + 0.5 * (xi + 1.0) * (upper - lower)
  }

  fn compute_grid(&self) -> na::DVector<f64> {
    let mut grid = na::DVector::zeros(self.n());
    for ielement in 0..self.nelement {
      let nodes = self.reference_nodes(self.element_kinds[ielement]);
      for (ilocal, &xi) in nodes.iter().enumerate() {
        grid[self.global_index(ilocal, ielement)] = self.map_to_element(ielement, xi);
      }
    }
    // Exact end points, free of mapping round-off.
    let n = grid.len();
    grid[n - 1] = self.upper();
    if self.element_kinds[0] == ElementKind::Lobatto {
      grid[0] = self.lower();
    }
    grid
  }

  /// `wgts[i] = ∫ ℓ_i J dv` without the `2π` of the gyro-angle.
  fn compute_wgts(&self) -> na::DVector<f64> {
    if !self.discretization.is_spectral() {
      return self.trapezoid_wgts();
    }

    let rule = gauss_legendre(self.ngrid + 2);
    let mut wgts = na::DVector::zeros(self.n());
    for ielement in 0..self.nelement {
      let basis = LagrangeBasis::new(self.reference_nodes(self.element_kinds[ielement]));
      let [lower, upper] = self.element_bounds[ielement];
      let half = 0.5 * (upper - lower);
      for (&xi, &w) in izip!(rule.nodes(), rule.weights()) {
        let jw = w * half * self.jacobian(self.map_to_element(ielement, xi));
        for ilocal in 0..self.ngrid {
          wgts[self.global_index(ilocal, ielement)] += jw * basis.eval(ilocal, xi);
        }
      }
    }
    wgts
  }

  fn trapezoid_wgts(&self) -> na::DVector<f64> {
    let n = self.n();
    let dv = (self.upper() - self.lower()) / (n - 1) as f64;
    na::DVector::from_fn(n, |i, _| {
      let end_factor = if i == 0 || i == n - 1 { 0.5 } else { 1.0 };
      end_factor * dv * self.jacobian(self.grid[i])
    })
  }
}
