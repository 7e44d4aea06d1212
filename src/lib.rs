//! Velocity-space spectral-element operators for the nonlinear
//! Fokker–Planck collision operator in gyrotropic `(vpa, vperp)` coordinates.
//!
//! Pipeline: [`coordinate::Coordinate`]s define the grid,
//! [`operators::FokkerPlanckOperators`] assembles and factorizes the tensor
//! product operators once, and [`collision::CollisionOperator`] evaluates the
//! collision rate from the Rosenbluth potentials of the field species.

extern crate nalgebra as na;
extern crate nalgebra_sparse as nas;

pub mod assemble;
pub mod boundary;
pub mod collision;
pub mod conservation;
pub mod coordinate;
pub mod elliptic;
pub mod elmat;
pub mod error;
pub mod factorize;
pub mod index;
pub mod maxwellian;
pub mod operators;
pub mod parallel;
pub mod quadrature;
pub mod special;
pub mod spectral;

pub use error::{Error, Result};

/// Compound index of a node of the 2D velocity grid.
pub type DofIdx = usize;
