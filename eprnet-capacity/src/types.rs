use std::io;

use thiserror::Error;

/// Slack applied to residual-capacity comparisons so repeated subtraction
/// cannot livelock an admission loop on a residual that is zero up to
/// floating error.
pub const CAPACITY_EPSILON: f64 = 1e-12;

pub type CapacityResult<T> = Result<T, CapacityError>;

/// Error surface for capacity-network construction and admission.
///
/// Unreachable destinations and infeasible paths are *not* errors: they are
/// recovered per descriptor (an empty path list marks rejection) so that one
/// bad demand never aborts a batch that already passed validation.
#[derive(Debug, Error)]
pub enum CapacityError {
    /// Measurement probability outside `[0, 1]`, negative edge weight, or an
    /// unknown policy label.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A flow batch failed pre-validation; the network is untouched.
    #[error("invalid flow descriptor: {0}")]
    InvalidFlow(String),
    /// An app batch failed pre-validation; the network is untouched.
    #[error("invalid app descriptor: {0}")]
    InvalidApp(String),
    /// Dot export could not write its target file.
    #[error("dot export failed: {0}")]
    Io(#[from] io::Error),
}
