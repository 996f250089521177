use miette::Diagnostic;
use thiserror::Error;

use crate::{atoms::errors::AtomicLookupError, parsers::errors::CompositionError};

pub type Result<T, E = Box<LipochemError>> = std::result::Result<T, E>;

#[derive(Debug, Diagnostic, Clone, Eq, PartialEq, Error)]
pub enum LipochemError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Composition {
        #[from]
        error: CompositionError,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Lookup {
        #[from]
        error: AtomicLookupError,
    },
}

impl From<AtomicLookupError> for Box<LipochemError> {
    fn from(error: AtomicLookupError) -> Self {
        Box::new(error.into())
    }
}

impl From<CompositionError> for Box<LipochemError> {
    fn from(error: CompositionError) -> Self {
        Box::new(error.into())
    }
}
