use std::fmt;

#[derive(Clone, PartialEq, Eq, Debug)]
/// Failure of one or more handlers during an emit.
pub enum EmitError<E> {
    /// Exactly one handler failed, this is its error as it was returned
    Handler(E),
    /// More than one handler failed, errors are in the order the handlers were called
    Aggregate(Vec<E>),
}

impl<E> EmitError<E> {
    /// Collapse the errors of a single emit into its result
    pub(crate) fn from_errors(mut errors: Vec<E>) -> Result<(), EmitError<E>> {
        if errors.len() > 1 {
            return Err(EmitError::Aggregate(errors));
        }

        match errors.pop() {
            Some(error) => Err(EmitError::Handler(error)),
            None => Ok(()),
        }
    }

    /// Every handler error, in call order
    pub fn errors(&self) -> &[E] {
        match self {
            EmitError::Handler(error) => std::slice::from_ref(error),
            EmitError::Aggregate(errors) => errors,
        }
    }

    pub fn into_errors(self) -> Vec<E> {
        match self {
            EmitError::Handler(error) => vec![error],
            EmitError::Aggregate(errors) => errors,
        }
    }
}

impl<E: fmt::Display> fmt::Display for EmitError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmitError::Handler(error) => error.fmt(f),
            EmitError::Aggregate(_) => write!(f, "Some handlers failed"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for EmitError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EmitError::Handler(error) => error.source(),
            EmitError::Aggregate(errors) => errors
                .first()
                .map(|error| error as &(dyn std::error::Error + 'static)),
        }
    }
}
