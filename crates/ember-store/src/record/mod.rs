mod reader;
mod writer;

pub use reader::*;
pub use writer::*;

use ember_params::{LookupParameterStorage, ParameterStorage};

/// Line starting every block of the data file.
pub const SENTINEL: &str = "#";
/// Tag line preceding a dense parameter record.
pub const PARAMETER_TAG: &str = "#Parameter#";
/// Tag line preceding a lookup table record.
pub const LOOKUP_PARAMETER_TAG: &str = "#LookupParameter#";

/// Kind of a record, given by its tag line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// A dense parameter.
    Parameter,
    /// A lookup table.
    LookupParameter,
}

impl RecordKind {
    /// Tag line of the kind.
    pub fn tag(&self) -> &'static str {
        match self {
            RecordKind::Parameter => PARAMETER_TAG,
            RecordKind::LookupParameter => LOOKUP_PARAMETER_TAG,
        }
    }

    /// Kind of a tag line, if it is one.
    pub fn from_tag(line: &str) -> Option<Self> {
        match line {
            PARAMETER_TAG => Some(RecordKind::Parameter),
            LOOKUP_PARAMETER_TAG => Some(RecordKind::LookupParameter),
            _ => None,
        }
    }
}

/// A record parsed from the data file.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// A dense parameter.
    Parameter(ParameterStorage),
    /// A lookup table.
    LookupParameter(LookupParameterStorage),
}

impl Record {
    /// Name stored in the record.
    pub fn name(&self) -> &str {
        match self {
            Record::Parameter(storage) => &storage.name,
            Record::LookupParameter(storage) => &storage.name,
        }
    }

    /// Kind of the record.
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Parameter(_) => RecordKind::Parameter,
            Record::LookupParameter(_) => RecordKind::LookupParameter,
        }
    }
}
