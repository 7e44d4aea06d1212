use crate::{
  coordinate::Coordinate,
  elmat::ElMat,
  index::{compound_index, split_compound_index},
  parallel::ExecutionContext,
  DofIdx,
};

use common::{
  linalg::nalgebra::{CooMatrixExt, CsrMatrix},
  util,
};
use itertools::{iproduct, Itertools};
use rayon::prelude::*;

pub type GalMat = nas::CooMatrix<f64>;
pub type GalVec = na::DVector<f64>;

/// Assembly of the tensor product `A_vpa ⊗ A_vperp` on the compound index space.
///
/// Element pairs are processed in parallel; the triplets keep the sequential
/// element order, so the summed matrix does not depend on the worker count.
pub fn assemble_tensor_galmat(
  vpa: &Coordinate,
  vperp: &Coordinate,
  elmats_vpa: &[ElMat],
  elmats_vperp: &[ElMat],
  ctx: &ExecutionContext,
) -> GalMat {
  assert_eq!(elmats_vpa.len(), vpa.nelement());
  assert_eq!(elmats_vperp.len(), vperp.nelement());

  let nvpa = vpa.n();
  let ndofs = nvpa * vperp.n();
  let ngrid_vpa = vpa.ngrid();
  let nlocal = ngrid_vpa * vperp.ngrid();

  let element_pairs: Vec<(usize, usize)> = iproduct!(0..vperp.nelement(), 0..vpa.nelement())
    .map(|(ielement_vperp, ielement_vpa)| (ielement_vpa, ielement_vperp))
    .collect();

  let triplets: Vec<(usize, usize, f64)> = ctx.install(|| {
    element_pairs
      .par_iter()
      .flat_map_iter(|&(ielement_vpa, ielement_vperp)| {
        let elmat_vpa = &elmats_vpa[ielement_vpa];
        let elmat_vperp = &elmats_vperp[ielement_vperp];
        let global = |ilocal: usize| {
          let (ia, ib) = split_compound_index(ilocal, ngrid_vpa);
          compound_index(
            vpa.global_index(ia, ielement_vpa),
            vperp.global_index(ib, ielement_vperp),
            nvpa,
          )
        };

        let mut local_triplets = Vec::with_capacity(nlocal * nlocal);
        for ilocal in 0..nlocal {
          let (ia, ib) = split_compound_index(ilocal, ngrid_vpa);
          let iglobal = global(ilocal);
          for jlocal in 0..nlocal {
            let (ja, jb) = split_compound_index(jlocal, ngrid_vpa);
            let val = elmat_vpa[(ia, ja)] * elmat_vperp[(ib, jb)];
            if val != 0.0 {
              local_triplets.push((iglobal, global(jlocal), val));
            }
          }
        }
        local_triplets
      })
      .collect()
  });

  let (rows, cols, values) = triplets.into_iter().multiunzip();
  GalMat::try_from_triplets(ndofs, ndofs, rows, cols, values)
    .expect("Compound indices lie within the velocity grid.")
}

/// Compound indices of the Dirichlet boundary: `vpa = ±L` and `vperp = L`.
pub fn boundary_dofs(vpa: &Coordinate, vperp: &Coordinate) -> Vec<DofIdx> {
  let nvpa = vpa.n();
  let nvperp = vperp.n();
  iproduct!(0..nvperp, 0..nvpa)
    .filter(|&(ivperp, ivpa)| ivpa == 0 || ivpa == nvpa - 1 || ivperp == nvperp - 1)
    .map(|(ivperp, ivpa)| compound_index(ivpa, ivperp, nvpa))
    .collect()
}

/// Replaces the rows and columns of `dofs` by identity rows.
pub fn constrain_dofs(dofs: &[DofIdx], galmat: &mut GalMat) {
  let ndofs = galmat.nrows();
  let dof_flags = util::indicies_to_flags(dofs, ndofs);
  galmat.set_zero(|i, j| dof_flags[i] || dof_flags[j]);
  for &idof in dofs {
    galmat.push(idof, idof, 1.0);
  }
}

/// Right-hand side counterpart of [`constrain_dofs`].
///
/// Lifts the prescribed coefficients using the unconstrained operator,
/// $vec(phi - A_(0 diff) gamma, gamma)$, so that solving with the constrained
/// operator gives a solution with the prescribed values on the fixed dofs.
pub fn lift_dofs_coeff(dof_coeffs: &[(DofIdx, f64)], galmat: &CsrMatrix, galvec: &mut GalVec) {
  let ndofs = galmat.nrows();
  let dof_coeffs_opt = util::sparse_to_dense_data(dof_coeffs.to_vec(), ndofs);
  let dof_coeffs_zeroed =
    na::DVector::from_iterator(ndofs, dof_coeffs_opt.iter().map(|v| v.unwrap_or(0.0)));

  *galvec -= galmat * dof_coeffs_zeroed;
  dof_coeffs.iter().for_each(|&(i, v)| galvec[i] = v);
}
