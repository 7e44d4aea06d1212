//! Full collision operator: equilibrium, conservation, H-theorem and
//! independence of the worker count.

extern crate nalgebra as na;

use fpcollide::{
  collision::{BoundarySource, CollisionOperator, CollisionParams},
  conservation::{entropy_production, l2_dissipation, Correction, Moment},
  coordinate::{Discretization, GridSpec},
  maxwellian::Maxwellian,
  operators::FokkerPlanckOperators,
  parallel::ExecutionContext,
  Error,
};

fn collision_operator(ngrid: usize, ctx: &ExecutionContext) -> CollisionOperator {
  let _ = tracing_subscriber::fmt().with_test_writer().try_init();
  let ops = FokkerPlanckOperators::new(
    &GridSpec::new(ngrid, 8, 6.0),
    &GridSpec::new(ngrid, 4, 6.0),
    ctx,
  )
  .unwrap();
  CollisionOperator::new(ops)
}

fn two_maxwellians(ops: &FokkerPlanckOperators) -> na::DMatrix<f64> {
  let a = Maxwellian::new(0.5, 1.0, 1.0);
  let b = Maxwellian::new(0.6, -1.2, 0.8);
  ops.sample(|vpa, vperp| a.pdf(vpa, vperp) + b.pdf(vpa, vperp))
}

#[test]
fn maxwellian_is_stationary() {
  let ctx = ExecutionContext::new(4).unwrap();
  let mut collisions = collision_operator(9, &ctx);
  let f = Maxwellian::new(1.0, 1.0, 1.0).discretize(collisions.operators());

  let report = collisions
    .evaluate_self(&f, CollisionParams::self_collisions(1.0), BoundarySource::Numerical, &ctx)
    .unwrap();
  let rate = collisions.collision_rate();
  assert!(rate.amax() < 1e-3, "max |C| = {:e}", rate.amax());
  assert!(report.raw.density.abs() < 1e-12);
  assert!(report.corrected.max_abs() < 1e-12);
  assert_eq!(report.applied, Correction::DensityMomentumEnergy);
  assert!(report.warning.is_none());
}

#[test]
fn analytic_and_numerical_boundary_sources_agree() {
  let ctx = ExecutionContext::new(2).unwrap();
  let mut collisions = collision_operator(9, &ctx);
  let maxwellian = Maxwellian::new(1.0, 0.3, 1.1);
  let f = maxwellian.discretize(collisions.operators());
  let params = CollisionParams::self_collisions(1.0);

  collisions
    .evaluate_self(&f, params, BoundarySource::Analytic(maxwellian), &ctx)
    .unwrap();
  let analytic = collisions.collision_rate().clone();
  collisions
    .evaluate_self(&f, params, BoundarySource::Numerical, &ctx)
    .unwrap();
  let numerical = collisions.collision_rate();
  assert!((numerical - &analytic).amax() < 1e-7);
}

#[test]
fn relaxation_conserves_and_produces_entropy() {
  let ctx = ExecutionContext::new(4).unwrap();
  let mut collisions = collision_operator(5, &ctx);
  let f = two_maxwellians(collisions.operators());

  let report = collisions
    .evaluate_self(&f, CollisionParams::self_collisions(1.0), BoundarySource::Numerical, &ctx)
    .unwrap();
  for moment in Moment::ALL {
    let residual = report.corrected.get(moment);
    assert!(residual.abs() < 1e-12, "{moment:?}: {residual:e}");
  }
  assert!(report.warning.is_none());

  let ops = collisions.operators();
  let rate = collisions.collision_rate();
  assert!(rate.amax() > 1e-3, "non-equilibrium state must relax");
  let entropy = entropy_production(ops, &f, rate).unwrap();
  let dissipation = l2_dissipation(ops, &f, rate).unwrap();
  tracing::info!("entropy production {entropy:.4e}, l2 dissipation {dissipation:.4e}");
  assert!(entropy > 0.5, "entropy production = {entropy}");
  assert!(dissipation > 1e-2, "l2 dissipation = {dissipation}");
}

#[test]
fn collision_rate_scales_with_frequency() {
  let ctx = ExecutionContext::new(2).unwrap();
  let mut collisions = collision_operator(5, &ctx);
  let f = two_maxwellians(collisions.operators());

  collisions
    .evaluate_self(&f, CollisionParams::self_collisions(1.0), BoundarySource::Numerical, &ctx)
    .unwrap();
  let unit = collisions.collision_rate().clone();
  collisions
    .evaluate_self(&f, CollisionParams::self_collisions(2.5), BoundarySource::Numerical, &ctx)
    .unwrap();
  let scaled = collisions.collision_rate();
  assert!((scaled - 2.5 * &unit).amax() < 1e-11 * unit.amax().max(1.0));
}

#[test]
fn interspecies_collisions_conserve_density() {
  let ctx = ExecutionContext::new(3).unwrap();
  let mut collisions = collision_operator(5, &ctx);
  let ops = collisions.operators();
  let fs = Maxwellian::new(1.0, 0.5, 1.0).discretize(ops);
  let fsp = Maxwellian::new(1.0, -0.5, 0.8).discretize(ops);

  let report = collisions
    .evaluate(&fs, &fsp, CollisionParams::new(1.0, 0.5), BoundarySource::Numerical, &ctx)
    .unwrap();
  assert_eq!(report.applied, Correction::Density);
  assert!(report.corrected.density.abs() < 1e-12);
  assert!(report.warning.is_none());
  // drifting species exchange momentum
  assert!(report.corrected.momentum.abs() > 1e-6);
}

#[test]
fn result_does_not_depend_on_worker_count() {
  let serial = ExecutionContext::serial().unwrap();
  let parallel = ExecutionContext::new(3).unwrap();
  let params = CollisionParams::self_collisions(1.0);

  let mut collisions_serial = collision_operator(5, &serial);
  let f = two_maxwellians(collisions_serial.operators());
  collisions_serial
    .evaluate_self(&f, params, BoundarySource::Numerical, &serial)
    .unwrap();

  let mut collisions_parallel = collision_operator(5, &parallel);
  collisions_parallel
    .evaluate_self(&f, params, BoundarySource::Numerical, &parallel)
    .unwrap();

  let a = collisions_serial.collision_rate();
  let b = collisions_parallel.collision_rate();
  assert!((a - b).amax() <= 1e-14 * a.amax());
}

#[test]
fn repeated_evaluation_reuses_workspace() {
  let ctx = ExecutionContext::new(2).unwrap();
  let params = CollisionParams::self_collisions(1.0);
  let mut collisions = collision_operator(5, &ctx);
  let f = two_maxwellians(collisions.operators());
  let g = Maxwellian::new(1.0, 0.5, 0.9).discretize(collisions.operators());

  collisions
    .evaluate_self(&f, params, BoundarySource::Numerical, &ctx)
    .unwrap();
  let first = collisions.collision_rate().clone();
  let rate_ptr = collisions.workspace().rate().as_ptr();
  let (flux_vpa, flux_vperp) = collisions.workspace().fluxes();
  let flux_ptrs = (flux_vpa.as_ptr(), flux_vperp.as_ptr());

  // a different distribution in between must not leak into the next result
  collisions
    .evaluate_self(&g, params, BoundarySource::Numerical, &ctx)
    .unwrap();
  collisions
    .evaluate_self(&f, params, BoundarySource::Numerical, &ctx)
    .unwrap();

  assert!((collisions.collision_rate() - &first).amax() <= 1e-14 * first.amax());
  assert_eq!(collisions.workspace().rate().as_ptr(), rate_ptr);
  let (flux_vpa, flux_vperp) = collisions.workspace().fluxes();
  assert_eq!((flux_vpa.as_ptr(), flux_vperp.as_ptr()), flux_ptrs);
}

#[test]
fn mismatched_shape_is_rejected() {
  let ctx = ExecutionContext::serial().unwrap();
  let mut collisions = collision_operator(3, &ctx);
  let (nvpa, nvperp) = collisions.operators().shape();
  let f = na::DMatrix::from_element(nvpa + 1, nvperp, 1.0);
  let result = collisions.evaluate_self(
    &f,
    CollisionParams::self_collisions(1.0),
    BoundarySource::Numerical,
    &ctx,
  );
  assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
}

#[test]
fn finite_difference_grids_are_rejected() {
  let ctx = ExecutionContext::serial().unwrap();
  let spec = GridSpec::new(5, 4, 6.0).with_discretization(Discretization::FiniteDifference);
  let result = FokkerPlanckOperators::new(&spec, &GridSpec::new(5, 2, 6.0), &ctx);
  assert!(matches!(result, Err(Error::Configuration(_))));
}
