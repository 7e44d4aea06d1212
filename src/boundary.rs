//! Dirichlet data for the Rosenbluth potentials on the outer edges of the grid.
//!
//! The edges are `vpa = -L` (`lower_vpa`, indexed by vperp), `vpa = +L`
//! (`upper_vpa`, indexed by vperp) and `vperp = L` (`upper_vperp`, indexed by
//! vpa). The corners appear in two edges and carry the same value in both.

use crate::{
  assemble::boundary_dofs,
  coordinate::Coordinate,
  index::{compound_index, split_compound_index},
  error::check_shape,
  maxwellian::Maxwellian,
  parallel::ExecutionContext,
  special::ellipk_ellipe,
  DofIdx, Result,
};

use common::util::max_abs;
use itertools::izip;
use rayon::prelude::*;
use std::f64::consts::PI;

/// The potentials and derivatives the collision operator needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PotentialField {
  H,
  DhDvpa,
  DhDvperp,
  G,
  D2gDvpa2,
  DgDvperp,
  D2gDvperp2,
  D2gDvperpDvpa,
}
impl PotentialField {
  pub const ALL: [Self; 8] = [
    Self::H,
    Self::DhDvpa,
    Self::DhDvperp,
    Self::G,
    Self::D2gDvpa2,
    Self::DgDvperp,
    Self::D2gDvperp2,
    Self::D2gDvperpDvpa,
  ];
  pub fn index(self) -> usize {
    self as usize
  }
  pub fn name(self) -> &'static str {
    match self {
      Self::H => "H",
      Self::DhDvpa => "dH/dvpa",
      Self::DhDvperp => "dH/dvperp",
      Self::G => "G",
      Self::D2gDvpa2 => "d2G/dvpa2",
      Self::DgDvperp => "dG/dvperp",
      Self::D2gDvperp2 => "d2G/dvperp2",
      Self::D2gDvperpDvpa => "d2G/dvperpdvpa",
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeValues {
  lower_vpa: na::DVector<f64>,
  upper_vpa: na::DVector<f64>,
  upper_vperp: na::DVector<f64>,
}
impl EdgeValues {
  pub fn zeros(nvpa: usize, nvperp: usize) -> Self {
    Self {
      lower_vpa: na::DVector::zeros(nvperp),
      upper_vpa: na::DVector::zeros(nvperp),
      upper_vperp: na::DVector::zeros(nvpa),
    }
  }

  /// Values on `vpa = -L`, indexed by vperp.
  pub fn lower_vpa(&self) -> &na::DVector<f64> {
    &self.lower_vpa
  }
  /// Values on `vpa = +L`, indexed by vperp.
  pub fn upper_vpa(&self) -> &na::DVector<f64> {
    &self.upper_vpa
  }
  /// Values on `vperp = L`, indexed by vpa.
  pub fn upper_vperp(&self) -> &na::DVector<f64> {
    &self.upper_vperp
  }

  pub fn nvpa(&self) -> usize {
    self.upper_vperp.len()
  }
  pub fn nvperp(&self) -> usize {
    self.lower_vpa.len()
  }

  /// Value at a boundary node, `None` for interior nodes and nodes off the grid.
  pub fn get(&self, ivpa: usize, ivperp: usize) -> Option<f64> {
    if ivpa >= self.nvpa() || ivperp >= self.nvperp() {
      None
    } else if ivperp + 1 == self.nvperp() {
      Some(self.upper_vperp[ivpa])
    } else if ivpa == 0 {
      Some(self.lower_vpa[ivperp])
    } else if ivpa + 1 == self.nvpa() {
      Some(self.upper_vpa[ivperp])
    } else {
      None
    }
  }

  /// Writes `value` into every edge containing the node.
  fn set(&mut self, ivpa: usize, ivperp: usize, value: f64) {
    if ivpa == 0 {
      self.lower_vpa[ivperp] = value;
    }
    if ivpa + 1 == self.nvpa() {
      self.upper_vpa[ivperp] = value;
    }
    if ivperp + 1 == self.nvperp() {
      self.upper_vperp[ivpa] = value;
    }
  }

  pub fn max_abs_difference(&self, other: &Self) -> f64 {
    [
      (&self.lower_vpa, &other.lower_vpa),
      (&self.upper_vpa, &other.upper_vpa),
      (&self.upper_vperp, &other.upper_vperp),
    ]
    .into_iter()
    .map(|(a, b)| max_abs(&(a - b)))
    .fold(0.0, f64::max)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryData {
  nvpa: usize,
  nvperp: usize,
  fields: [EdgeValues; 8],
}

impl BoundaryData {
  /// Closed-form boundary data of a Maxwellian field species.
  pub fn analytic(maxwellian: &Maxwellian, vpa: &Coordinate, vperp: &Coordinate) -> Self {
    Self::from_point_values(vpa, vperp, |v, w| maxwellian.potentials_at(v, w))
  }

  /// Boundary data from the Green's function integrals of an arbitrary
  /// distribution, `H = ∫ F'/|v - v'|` and `G = ∫ F' |v - v'|`.
  ///
  /// The gyro-angle integrals are done in closed form, leaving a sum over all
  /// grid nodes per boundary node. Boundary nodes are distributed over the
  /// workers of `ctx`.
  pub fn numerical(
    pdf: &na::DMatrix<f64>,
    vpa: &Coordinate,
    vperp: &Coordinate,
    ctx: &ExecutionContext,
  ) -> Result<Self> {
    let nvpa = vpa.n();
    check_shape((nvpa, vperp.n()), pdf.shape())?;
    let dofs = boundary_dofs(vpa, vperp);

    let sources: Vec<(f64, f64, f64)> = (0..nvpa * vperp.n())
      .filter_map(|ic| {
        let (ivpa, ivperp) = split_compound_index(ic, nvpa);
        let weight = vpa.wgts()[ivpa] * vperp.wgts()[ivperp] * pdf[(ivpa, ivperp)];
        (weight != 0.0).then_some((vpa.grid()[ivpa], vperp.grid()[ivperp], weight))
      })
      .collect();

    let values: Vec<[f64; 8]> = ctx.install(|| {
      dofs
        .par_iter()
        .map(|&ic| {
          let (ivpa, ivperp) = split_compound_index(ic, nvpa);
          greens_integrals(vpa.grid()[ivpa], vperp.grid()[ivperp], &sources)
        })
        .collect()
    });

    let mut this = Self::empty(vpa.n(), vperp.n());
    for (&ic, point_values) in izip!(&dofs, &values) {
      let (ivpa, ivperp) = split_compound_index(ic, nvpa);
      this.set_point(ivpa, ivperp, point_values);
    }
    Ok(this)
  }

  fn empty(nvpa: usize, nvperp: usize) -> Self {
    Self {
      nvpa,
      nvperp,
      fields: std::array::from_fn(|_| EdgeValues::zeros(nvpa, nvperp)),
    }
  }

  fn from_point_values<F>(vpa: &Coordinate, vperp: &Coordinate, f: F) -> Self
  where
    F: Fn(f64, f64) -> [f64; 8],
  {
    let mut this = Self::empty(vpa.n(), vperp.n());
    for ic in boundary_dofs(vpa, vperp) {
      let (ivpa, ivperp) = split_compound_index(ic, vpa.n());
      this.set_point(ivpa, ivperp, &f(vpa.grid()[ivpa], vperp.grid()[ivperp]));
    }
    this
  }

  fn set_point(&mut self, ivpa: usize, ivperp: usize, values: &[f64; 8]) {
    for field in PotentialField::ALL {
      self.fields[field.index()].set(ivpa, ivperp, values[field.index()]);
    }
  }

  /// `(nvpa, nvperp)` of the grid the data was built for.
  pub fn shape(&self) -> (usize, usize) {
    (self.nvpa, self.nvperp)
  }

  pub fn field(&self, field: PotentialField) -> &EdgeValues {
    &self.fields[field.index()]
  }

  /// `(dof, value)` pairs of one field on the given boundary dofs.
  pub fn dirichlet_values(&self, field: PotentialField, dofs: &[DofIdx]) -> Vec<(DofIdx, f64)> {
    let edges = self.field(field);
    dofs
      .iter()
      .filter_map(|&ic| {
        let (ivpa, ivperp) = split_compound_index(ic, self.nvpa);
        edges.get(ivpa, ivperp).map(|value| (ic, value))
      })
      .collect()
  }

  /// Overwrites the boundary nodes of a compound-indexed field.
  pub fn inject(&self, field: PotentialField, galvec: &mut na::DVector<f64>) -> Result<()> {
    check_shape((self.nvpa * self.nvperp, 1), (galvec.len(), 1))?;
    let edges = self.field(field);
    let (nvpa, nvperp) = self.shape();
    for ivperp in 0..nvperp {
      galvec[compound_index(0, ivperp, nvpa)] = edges.lower_vpa[ivperp];
      galvec[compound_index(nvpa - 1, ivperp, nvpa)] = edges.upper_vpa[ivperp];
    }
    for ivpa in 0..nvpa {
      galvec[compound_index(ivpa, nvperp - 1, nvpa)] = edges.upper_vperp[ivpa];
    }
    Ok(())
  }

  pub fn max_abs_difference(&self, other: &Self) -> f64 {
    izip!(&self.fields, &other.fields)
      .map(|(a, b)| a.max_abs_difference(b))
      .fold(0.0, f64::max)
  }

  pub fn max_abs_difference_field(&self, other: &Self, field: PotentialField) -> f64 {
    self.field(field).max_abs_difference(other.field(field))
  }
}

/// Green's function integrals at `(vpa, vperp)` over weighted point sources
/// `(vpa', vperp', w' F')`, in the field order of [`PotentialField`].
fn greens_integrals(vpa: f64, vperp: f64, sources: &[(f64, f64, f64)]) -> [f64; 8] {
  let mut sums = [0.0; 8];
  for &(vpa_src, vperp_src, weight) in sources {
    if let Some(kernels) = GyroKernels::new(vpa - vpa_src, vperp, vperp_src) {
      let values = kernels.potentials(vpa - vpa_src, vperp, vperp_src);
      for (sum, value) in izip!(&mut sums, values) {
        *sum += weight * value;
      }
    }
  }
  sums
}

/// Gyro-angle integrals `∫_0^{2π} X^p cos^q φ dφ` with
/// `X = A - B cos φ`, `A = d² + vperp² + vperp'²`, `B = 2 vperp vperp'`.
#[derive(Debug, Clone, Copy)]
struct GyroKernels {
  /// `∫ X^{-1/2}`
  i1: f64,
  /// `∫ X^{-3/2}`
  i3: f64,
  /// `∫ X^{1/2}`
  ie: f64,
  /// `∫ X^{-1/2} cos`
  j1: f64,
  /// `∫ X^{-3/2} cos`
  j3: f64,
  /// `∫ X^{-3/2} cos²`
  c3: f64,
}
impl GyroKernels {
  /// Relative size of `B / A` below which the source sits on the axis.
  const AXIS_TOL: f64 = 1e-12;
  /// Squared distance below which source and target coincide.
  const COINCIDENT_TOL: f64 = 1e-28;

  fn new(d: f64, vperp: f64, vperp_src: f64) -> Option<Self> {
    let a = d * d + vperp * vperp + vperp_src * vperp_src;
    let b = 2.0 * vperp * vperp_src;
    let a_minus_b = d * d + (vperp - vperp_src).powi(2);
    if a_minus_b < Self::COINCIDENT_TOL {
      return None;
    }

    if b < Self::AXIS_TOL * a {
      let sqrt_a = a.sqrt();
      return Some(Self {
        i1: 2.0 * PI / sqrt_a,
        i3: 2.0 * PI / (a * sqrt_a),
        ie: 2.0 * PI * sqrt_a,
        j1: 0.0,
        j3: 0.0,
        c3: PI / (a * sqrt_a),
      });
    }

    let s = a + b;
    let sqrt_s = s.sqrt();
    let m = 2.0 * b / s;
    let (ellipk, ellipe) = ellipk_ellipe(m);
    let i1 = 4.0 * ellipk / sqrt_s;
    let i3 = 4.0 * ellipe / (a_minus_b * sqrt_s);
    let ie = 4.0 * sqrt_s * ellipe;
    Some(Self {
      i1,
      i3,
      ie,
      j1: (a * i1 - ie) / b,
      j3: (a * i3 - i1) / b,
      c3: (a * a * i3 - 2.0 * a * i1 + ie) / (b * b),
    })
  }

  fn potentials(&self, d: f64, vperp: f64, vperp_src: f64) -> [f64; 8] {
    let Self {
      i1,
      i3,
      ie,
      j1,
      j3,
      c3,
    } = *self;
    let perp_i3 = vperp * i3 - vperp_src * j3;
    [
      i1,
      -d * i3,
      -perp_i3,
      ie,
      i1 - d * d * i3,
      vperp * i1 - vperp_src * j1,
      i1 - (vperp * vperp * i3 - 2.0 * vperp * vperp_src * j3 + vperp_src * vperp_src * c3),
      -d * perp_i3,
    ]
  }
}
