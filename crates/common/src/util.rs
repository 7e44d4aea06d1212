pub fn algebraic_convergence_rate(next: f64, prev: f64) -> f64 {
  let quot: f64 = next / prev;
  -quot.log2()
}

pub fn indicies_to_flags(indicies: &[usize], len: usize) -> Vec<bool> {
  let mut flags = vec![false; len];
  indicies.iter().for_each(|&i| flags[i] = true);
  flags
}

pub fn sparse_to_dense_data<T>(sparse: Vec<(usize, T)>, len: usize) -> Vec<Option<T>> {
  let mut dense = Vec::from_iter((0..len).map(|_| None));
  sparse.into_iter().for_each(|(i, t)| dense[i] = Some(t));
  dense
}

/// Maximum absolute entry, `0` for empty input.
pub fn max_abs<'a>(values: impl IntoIterator<Item = &'a f64>) -> f64 {
  values.into_iter().fold(0.0, |acc: f64, v| acc.max(v.abs()))
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn convergence_rate_of_halving() {
    approx::assert_relative_eq!(algebraic_convergence_rate(0.25, 1.0), 2.0);
  }

  #[test]
  fn flags_and_dense_data() {
    assert_eq!(indicies_to_flags(&[0, 2], 3), vec![true, false, true]);
    assert_eq!(
      sparse_to_dense_data(vec![(1, 'a')], 3),
      vec![None, Some('a'), None]
    );
  }

  #[test]
  fn max_abs_of_mixed_signs() {
    assert_eq!(max_abs(&[1.0, -3.0, 2.0]), 3.0);
    assert_eq!(max_abs(&[]), 0.0);
  }
}
