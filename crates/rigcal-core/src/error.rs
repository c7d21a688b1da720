use thiserror::Error;

/// Errors raised by table construction, indexing and parameter unpacking.
///
/// Geometric invalidity (an invalid pose, a point behind the camera) is not
/// an error: it travels through validity masks instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A field or operand does not share the expected leading shape.
    #[error("shape mismatch in `{field}`: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        field: &'static str,
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    /// A coordinate exceeds its axis bound.
    #[error("index {index:?} out of range for shape {shape:?}")]
    IndexOutOfRange { index: Vec<usize>, shape: Vec<usize> },
    /// An axis number exceeds the table rank.
    #[error("axis {axis} out of range for a table of rank {rank}")]
    AxisOutOfRange { axis: usize, rank: usize },
    /// A flat parameter vector does not match the model's unknown count.
    #[error("parameter vector has length {got}, expected {expected}")]
    ParameterLengthMismatch { expected: usize, got: usize },
    /// A reduction slice contains no valid entries.
    #[error("no valid data in the reduced slice")]
    NoValidData,
}

/// Result alias using the workspace [`enum@Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Shorthand for [`Error::ShapeMismatch`].
    pub fn shape_mismatch(field: &'static str, expected: &[usize], got: &[usize]) -> Self {
        Error::ShapeMismatch {
            field,
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }
}
