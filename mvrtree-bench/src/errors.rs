use std::io;
use std::num::ParseIntError;

use mvrtree::IndexError;
use thiserror::Error;

use crate::data_gen::WorkloadError;

/// Failures that end a harness run
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("{program} expects 2 or 4 arguments, got {given}")]
    Usage { program: String, given: usize },

    #[error("{0}")]
    Engine(#[from] IndexError),

    #[error("invalid {name} {value:?}: {source}")]
    InvalidArgument {
        name: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("{0}")]
    Workload(#[from] WorkloadError),

    #[error("output error: {0}")]
    Io(#[from] io::Error),
}

pub type HarnessResult<T> = Result<T, HarnessError>;
