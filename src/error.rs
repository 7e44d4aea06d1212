use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid configuration: {0}")]
  Configuration(String),
  #[error("factorization of `{operator}` failed: operator is singular or not positive definite")]
  SingularOperator { operator: &'static str },
  #[error("array of shape {found:?} does not match velocity grid of shape {expected:?}")]
  ShapeMismatch {
    expected: (usize, usize),
    found: (usize, usize),
  },
}

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn check_shape(expected: (usize, usize), found: (usize, usize)) -> Result<()> {
  if expected == found {
    Ok(())
  } else {
    Err(Error::ShapeMismatch { expected, found })
  }
}
