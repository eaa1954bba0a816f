/// Errors raised when mutating parameter storage.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParamError {
    /// The number of provided elements doesn't match the parameter dimension.
    #[error("Expected {expected} elements, got {found}")]
    LengthMismatch {
        /// Number of elements required by the dimension.
        expected: usize,
        /// Number of elements provided.
        found: usize,
    },

    /// A lookup table row is out of range.
    #[error("Row {index} is out of range for a table of {rows} rows")]
    RowOutOfRange {
        /// Requested row.
        index: usize,
        /// Number of rows in the table.
        rows: usize,
    },

    /// A parameter with this name is already registered in the collection.
    #[error("A parameter named {0} is already registered")]
    DuplicateName(String),
}

pub(crate) fn check_len(expected: usize, found: usize) -> Result<(), ParamError> {
    if expected != found {
        return Err(ParamError::LengthMismatch { expected, found });
    }

    Ok(())
}
