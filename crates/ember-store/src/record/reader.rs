use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

use ember_params::{LookupParameterStorage, ParameterStorage};

use super::{Record, RecordKind, SENTINEL};
use crate::PackerError;
use crate::codec::{parse_dim, parse_values};

/// Reads records line by line from a position of the data file.
///
/// Records have no length prefix: the reader must be told, or read from a tag line, which
/// kind of record comes next to know how many lines to consume.
pub struct RecordReader<R> {
    reader: R,
    line: String,
}

impl RecordReader<BufReader<File>> {
    /// Open the data file at `path` and position the reader at `offset`.
    pub fn open(path: &Path, offset: u64) -> Result<Self, PackerError> {
        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(offset))?;

        log::debug!("Reading {} at offset {offset}", path.display());

        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> RecordReader<R> {
    /// Read records from `reader`.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
        }
    }

    /// Read a whole block: the sentinel, then every record until the end of the block.
    pub fn read_block(&mut self) -> Result<Vec<Record>, PackerError> {
        self.expect_sentinel()?;

        let mut records = Vec::new();
        while let Some(kind) = self.next_kind()? {
            records.push(self.read_body(kind)?);
        }

        Ok(records)
    }

    /// Read a block holding a single record of the given kind.
    pub fn read_single(&mut self, kind: RecordKind) -> Result<Record, PackerError> {
        self.expect_sentinel()?;

        match self.next_kind()? {
            Some(found) if found == kind => self.read_body(kind),
            Some(found) => Err(PackerError::InvalidFormat(format!(
                "Expected a {} record, found {}",
                kind.tag(),
                found.tag()
            ))),
            None => Err(PackerError::InvalidFormat(format!(
                "Expected a {} record, found an empty block",
                kind.tag()
            ))),
        }
    }

    /// Consume the sentinel line starting a block.
    pub fn expect_sentinel(&mut self) -> Result<(), PackerError> {
        let line = self.expect_line("the block sentinel")?;
        if line != SENTINEL {
            return Err(PackerError::InvalidFormat(format!(
                "Check this line: {line}"
            )));
        }

        Ok(())
    }

    /// Read the next tag line.
    ///
    /// Returns `None` at the end of the block, which is the sentinel of the next block, an
    /// empty line or the end of the file.
    pub fn next_kind(&mut self) -> Result<Option<RecordKind>, PackerError> {
        let Some(line) = self.next_line()? else {
            return Ok(None);
        };

        if line.is_empty() || line == SENTINEL {
            return Ok(None);
        }

        RecordKind::from_tag(line)
            .map(Some)
            .ok_or_else(|| PackerError::InvalidFormat(format!("Check this line: {line}")))
    }

    /// Read the body of a record of the given kind, starting at its name line.
    pub fn read_body(&mut self, kind: RecordKind) -> Result<Record, PackerError> {
        match kind {
            RecordKind::Parameter => self.read_parameter().map(Record::Parameter),
            RecordKind::LookupParameter => {
                self.read_lookup_parameter().map(Record::LookupParameter)
            }
        }
    }

    /// Read the body of a dense parameter record.
    pub fn read_parameter(&mut self) -> Result<ParameterStorage, PackerError> {
        let name = self.expect_line("a parameter name")?.to_string();
        let dim = parse_dim(self.expect_line("a parameter dimension")?)?;
        let size = dim.num_elements();
        let values = parse_values(self.expect_line("parameter values")?, size)?;
        let grads = parse_values(self.expect_line("parameter gradients")?, size)?;

        Ok(ParameterStorage::new(name, dim, values, grads))
    }

    /// Read the body of a lookup table record.
    pub fn read_lookup_parameter(&mut self) -> Result<LookupParameterStorage, PackerError> {
        let name = self.expect_line("a lookup parameter name")?.to_string();
        let all_dim = parse_dim(self.expect_line("a lookup parameter dimension")?)?;
        let dim = parse_dim(self.expect_line("a lookup parameter row dimension")?)?;

        if all_dim.num_dims() == 0 || all_dim.pop() != dim {
            return Err(PackerError::InvalidFormat(format!(
                "Lookup parameter {name} has a table dimension {all_dim} inconsistent with its row dimension {dim}"
            )));
        }

        let size = all_dim.num_elements();
        let all_values = parse_values(self.expect_line("lookup parameter values")?, size)?;
        let all_grads = parse_values(self.expect_line("lookup parameter gradients")?, size)?;

        Ok(LookupParameterStorage::new(
            name, all_dim, dim, all_values, all_grads,
        ))
    }

    fn next_line(&mut self) -> Result<Option<&str>, PackerError> {
        self.line.clear();
        if self.reader.read_line(&mut self.line)? == 0 {
            return Ok(None);
        }

        Ok(Some(self.line.trim_end_matches(['\n', '\r'])))
    }

    fn expect_line(&mut self, what: &str) -> Result<&str, PackerError> {
        match self.next_line()? {
            Some(line) => Ok(line),
            None => Err(PackerError::InvalidFormat(format!(
                "Unexpected end of file while reading {what}"
            ))),
        }
    }
}
