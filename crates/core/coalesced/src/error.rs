use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
/// Value cache error.
pub enum Error<E> {
    /// The producer itself failed, its error is kept as-is
    Production(E),
    /// The producer succeeded but the value it just returned did not pass the validity check
    InvalidFreshValue,
}

impl<E> Error<E> {
    /// Whether this error came from the producer
    pub fn is_production(&self) -> bool {
        matches!(self, Error::Production(_))
    }

    /// Get the producer error, if that is what this is
    pub fn into_production(self) -> Option<E> {
        match self {
            Error::Production(error) => Some(error),
            Error::InvalidFreshValue => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Production(error) => error.fmt(f),
            Error::InvalidFreshValue => write!(f, "Fresh value is invalid"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for Error<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Production(error) => error.source(),
            Error::InvalidFreshValue => None,
        }
    }
}
