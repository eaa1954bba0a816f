use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use ember_params::{LookupParameterStorage, ParameterCollection, ParameterStorage, Storage};

use super::{RecordKind, SENTINEL};
use crate::PackerError;
use crate::codec::{write_dim, write_values};

/// A framed block ready to be appended to the data file.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Text of the block, starting with the sentinel line.
    pub text: String,
    /// Absolute offset of every record of the block, pointing to the line holding its name.
    pub children: Vec<(String, u64)>,
}

/// Builds a block in memory, computing the absolute offset of each record.
///
/// The offsets assume the block will be written at `base_offset` in the data file.
pub struct BlockWriter {
    base_offset: u64,
    precision: Option<usize>,
    text: String,
    children: Vec<(String, u64)>,
}

impl BlockWriter {
    /// Start a block at `base_offset`, writing its sentinel line.
    pub fn new(base_offset: u64, precision: Option<usize>) -> Self {
        let mut text = String::new();
        text.push_str(SENTINEL);
        text.push('\n');

        Self {
            base_offset,
            precision,
            text,
            children: Vec::new(),
        }
    }

    /// Write every parameter of the collection, in registration order.
    pub fn write_collection(&mut self, model: &ParameterCollection) {
        for storage in model.all_storages() {
            match storage {
                Storage::Parameter(param) => self.write_parameter(&param.storage()),
                Storage::LookupParameter(param) => self.write_lookup_parameter(&param.storage()),
            }
        }
    }

    /// Write a dense parameter record.
    pub fn write_parameter(&mut self, storage: &ParameterStorage) {
        self.write_tag(RecordKind::Parameter, &storage.name);

        self.text.push_str(&storage.name);
        self.text.push('\n');
        write_dim(&mut self.text, &storage.dim);
        write_values(&mut self.text, &storage.values, self.precision);
        write_values(&mut self.text, &storage.grads, self.precision);
    }

    /// Write a lookup table record.
    pub fn write_lookup_parameter(&mut self, storage: &LookupParameterStorage) {
        self.write_tag(RecordKind::LookupParameter, &storage.name);

        self.text.push_str(&storage.name);
        self.text.push('\n');
        write_dim(&mut self.text, &storage.all_dim);
        write_dim(&mut self.text, &storage.dim);
        write_values(&mut self.text, &storage.all_values, self.precision);
        write_values(&mut self.text, &storage.all_grads, self.precision);
    }

    /// Finish the block.
    pub fn finish(self) -> Block {
        Block {
            text: self.text,
            children: self.children,
        }
    }

    fn write_tag(&mut self, kind: RecordKind, name: &str) {
        self.text.push_str(kind.tag());
        self.text.push('\n');

        let offset = self.base_offset + self.text.len() as u64;
        self.children.push((name.to_string(), offset));
    }
}

/// The data file holding every block.
#[derive(Debug, Clone)]
pub struct DataFile {
    path: PathBuf,
}

impl DataFile {
    /// Data file stored at `path`. The file is created on the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the data file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the file in bytes, zero when it doesn't exist yet.
    pub fn len(&self) -> Result<u64, PackerError> {
        match std::fs::metadata(&self.path) {
            Ok(metadata) => Ok(metadata.len()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(0),
            Err(err) => Err(err.into()),
        }
    }

    /// Whether the file is empty or doesn't exist.
    pub fn is_empty(&self) -> Result<bool, PackerError> {
        Ok(self.len()? == 0)
    }

    /// Remove every block.
    pub fn truncate(&self) -> Result<(), PackerError> {
        File::create(&self.path)?;
        Ok(())
    }

    /// Append a block at the end of the file and return the new size of the file.
    pub fn append(&self, block: &Block) -> Result<u64, PackerError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(block.text.as_bytes())?;
        file.flush()?;

        Ok(file.metadata()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_params::Dim;

    #[test]
    fn should_frame_parameter_record() {
        let storage = ParameterStorage::new(
            "/w".into(),
            Dim::new([2]),
            vec![1.5, -2.0],
            vec![0.0, 0.25],
        );
        let mut writer = BlockWriter::new(0, None);

        writer.write_parameter(&storage);
        let block = writer.finish();

        assert_eq!(block.text, "#\n#Parameter#\n/w\n{2}\n1.5 -2\n0 0.25\n");
        assert_eq!(block.children, vec![("/w".to_string(), 14)]);
    }

    #[test]
    fn should_frame_lookup_record_with_base_offset() {
        let storage = LookupParameterStorage::new(
            "/emb".into(),
            Dim::new([1, 2]),
            Dim::new([1]),
            vec![3.0, 4.0],
            vec![0.0, 0.0],
        );
        let mut writer = BlockWriter::new(100, None);

        writer.write_lookup_parameter(&storage);
        let block = writer.finish();

        assert_eq!(
            block.text,
            "#\n#LookupParameter#\n/emb\n{1,2}\n{1}\n3 4\n0 0\n"
        );
        assert_eq!(block.children, vec![("/emb".to_string(), 120)]);
    }

    #[test]
    fn should_write_collection_in_registration_order() {
        let mut pc = ParameterCollection::new();
        pc.add_lookup_parameters(2, [1], "emb");
        pc.add_parameters([1], "w");
        let mut writer = BlockWriter::new(0, None);

        writer.write_collection(&pc);
        let block = writer.finish();

        let names: Vec<_> = block.children.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["/emb", "/w"]);
        for (name, offset) in block.children.iter() {
            let line = block.text[*offset as usize..].lines().next().unwrap();
            assert_eq!(line, name);
        }
    }

    #[test]
    fn should_append_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let data = DataFile::new(dir.path().join("model"));
        let block = BlockWriter::new(0, None).finish();

        assert!(data.is_empty().unwrap());
        assert_eq!(data.append(&block).unwrap(), 2);
        assert_eq!(data.append(&block).unwrap(), 4);

        data.truncate().unwrap();
        assert_eq!(data.len().unwrap(), 0);
    }
}
