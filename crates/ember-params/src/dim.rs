use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Shape of a parameter, with an optional batch size.
///
/// The textual form is `{d0,d1,...}`, with an `X<batch>` suffix inside the braces when the
/// batch size differs from one. A scalar is written `{}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dim {
    /// The dimensions of the parameter.
    pub dims: Vec<usize>,
    /// The batch size.
    pub batch: usize,
}

/// Error returned when parsing a [`Dim`] from its textual form.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid dimension '{text}': {reason}")]
pub struct DimParseError {
    text: String,
    reason: &'static str,
}

impl Dim {
    /// Constructs a new `Dim` with a batch size of one.
    pub fn new<const D: usize>(dims: [usize; D]) -> Self {
        Self {
            dims: dims.to_vec(),
            batch: 1,
        }
    }

    /// Set the batch size.
    pub fn with_batch(mut self, batch: usize) -> Self {
        self.batch = batch;
        self
    }

    /// Returns the total number of elements, batch included.
    pub fn num_elements(&self) -> usize {
        self.dims.iter().product::<usize>() * self.batch
    }

    /// Returns the total number of elements, or `None` when it overflows `usize`.
    pub fn checked_num_elements(&self) -> Option<usize> {
        self.dims
            .iter()
            .try_fold(self.batch, |acc, d| acc.checked_mul(*d))
    }

    /// Returns the number of dimensions.
    pub fn num_dims(&self) -> usize {
        self.dims.len()
    }

    /// Size of the last axis, which is the number of rows of a lookup table.
    ///
    /// A scalar has a single row.
    pub fn rows(&self) -> usize {
        self.dims.last().copied().unwrap_or(1)
    }

    /// Returns a new `Dim` with `size` appended as the last axis.
    pub fn push(&self, size: usize) -> Self {
        let mut dims = self.dims.clone();
        dims.push(size);

        Self {
            dims,
            batch: self.batch,
        }
    }

    /// Returns a new `Dim` without its last axis.
    pub fn pop(&self) -> Self {
        let mut dims = self.dims.clone();
        dims.pop();

        Self {
            dims,
            batch: self.batch,
        }
    }
}

impl From<Vec<usize>> for Dim {
    fn from(dims: Vec<usize>) -> Self {
        Self { dims, batch: 1 }
    }
}

impl From<&[usize]> for Dim {
    fn from(dims: &[usize]) -> Self {
        Self {
            dims: dims.into(),
            batch: 1,
        }
    }
}

impl<const D: usize> From<[usize; D]> for Dim {
    fn from(dims: [usize; D]) -> Self {
        Dim::new(dims)
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{d}")?;
        }
        if self.batch != 1 {
            write!(f, "X{}", self.batch)?;
        }
        f.write_str("}")
    }
}

impl FromStr for Dim {
    type Err = DimParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let error = |reason| DimParseError {
            text: text.to_string(),
            reason,
        };

        let inner = text
            .trim()
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
            .ok_or_else(|| error("expected a braced list"))?;

        let (dims, batch) = match inner.split_once('X') {
            Some((dims, batch)) => {
                let batch = batch
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| error("batch size is not an integer"))?;
                (dims, batch)
            }
            None => (inner, 1),
        };

        if batch == 0 {
            return Err(error("batch size must be positive"));
        }

        let dims = if dims.trim().is_empty() {
            Vec::new()
        } else {
            dims.split(',')
                .map(|d| d.trim().parse::<usize>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| error("dimension is not an integer"))?
        };

        let dim = Self { dims, batch };
        if dim.checked_num_elements().is_none() {
            return Err(error("element count overflows"));
        }

        Ok(dim)
    }
}
