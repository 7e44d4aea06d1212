//! Shared-memory execution context.
//!
//! Work on compound-indexed arrays is split into [`Region`]s: worker `k` of `N`
//! owns a contiguous block of the compound index space. Returning from
//! [`ExecutionContext::for_each_region`] acts as the barrier after which all
//! regions are visible to every worker.

use crate::{Error, Result};

use rayon::prelude::*;
use std::{ops::Range, sync::Arc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
  pub worker: usize,
  pub nworkers: usize,
  pub range: Range<usize>,
}
impl Region {
  pub fn len(&self) -> usize {
    self.range.len()
  }
  pub fn is_empty(&self) -> bool {
    self.range.is_empty()
  }
}

#[derive(Debug, Clone)]
pub struct ExecutionContext {
  pool: Arc<rayon::ThreadPool>,
  nworkers: usize,
}
impl ExecutionContext {
  pub fn new(nworkers: usize) -> Result<Self> {
    if nworkers == 0 {
      return Err(Error::Configuration(
        "execution context needs at least one worker".into(),
      ));
    }
    let pool = rayon::ThreadPoolBuilder::new()
      .num_threads(nworkers)
      .thread_name(|i| format!("fpcollide-{i}"))
      .build()
      .map_err(|e| Error::Configuration(format!("failed to build thread pool: {e}")))?;
    Ok(Self {
      pool: Arc::new(pool),
      nworkers,
    })
  }

  pub fn serial() -> Result<Self> {
    Self::new(1)
  }

  pub fn nworkers(&self) -> usize {
    self.nworkers
  }

  /// Runs `op` inside the pool, so nested rayon iterators use its workers.
  pub fn install<R, OP>(&self, op: OP) -> R
  where
    OP: FnOnce() -> R + Send,
    R: Send,
  {
    self.pool.install(op)
  }

  /// Block partition of `0..len`; the first `len % nworkers` regions get one extra index.
  pub fn regions(&self, len: usize) -> Vec<Region> {
    let nworkers = self.nworkers;
    let base = len / nworkers;
    let extra = len % nworkers;
    let mut start = 0;
    (0..nworkers)
      .map(|worker| {
        let size = base + usize::from(worker < extra);
        let range = start..start + size;
        start += size;
        Region {
          worker,
          nworkers,
          range,
        }
      })
      .collect()
  }

  /// Hands each worker the disjoint slice of `data` belonging to its region.
  pub fn for_each_region<T, F>(&self, data: &mut [T], f: F)
  where
    T: Send,
    F: Fn(&Region, &mut [T]) + Sync,
  {
    let regions = self.regions(data.len());
    let mut slices = Vec::with_capacity(regions.len());
    let mut rest = data;
    for region in &regions {
      let (head, tail) = std::mem::take(&mut rest).split_at_mut(region.len());
      slices.push(head);
      rest = tail;
    }
    self.pool.install(|| {
      regions
        .par_iter()
        .zip(slices.into_par_iter())
        .for_each(|(region, slice)| f(region, slice));
    });
  }
}
