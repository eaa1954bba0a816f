use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::PackerError;

/// One line of the metadata file.
///
/// Written as `key:offset`, followed by `|child:offset` for every record nested in the block
/// when the entry describes a whole collection.
#[derive(new, Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Key of the saved entity.
    pub key: String,
    /// Offset of the block in the data file.
    pub offset: u64,
    /// Offsets of the nested records, in the order they were written.
    pub children: Vec<(String, u64)>,
}

impl IndexEntry {
    /// Offset of the nested record named `key`.
    pub fn child(&self, key: &str) -> Option<u64> {
        self.children
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, offset)| *offset)
    }

    /// Render the entry as a metadata line, line break included.
    pub fn to_line(&self) -> String {
        let mut line = format!("{}:{}", self.key, self.offset);
        for (key, offset) in self.children.iter() {
            line += format!("|{key}:{offset}").as_str();
        }
        line.push('\n');

        line
    }

    /// Parse a metadata line.
    pub fn parse(line: &str) -> Result<Self, PackerError> {
        let mut segments = line.split('|');
        // `split` always yields at least one segment.
        let (key, offset) = parse_pair(segments.next().unwrap_or_default(), line)?;
        let children = segments
            .map(|segment| parse_pair(segment, line))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(key, offset, children))
    }
}

fn parse_pair(segment: &str, line: &str) -> Result<(String, u64), PackerError> {
    let (key, offset) = segment.split_once(':').ok_or_else(|| {
        PackerError::InvalidFormat(format!("Missing offset in metadata line: {line}"))
    })?;
    let offset = offset.trim().parse::<u64>().map_err(|_| {
        PackerError::InvalidFormat(format!("Invalid offset in metadata line: {line}"))
    })?;

    Ok((key.to_string(), offset))
}

/// Top level key of a metadata line: the text before the first `:` of the first segment.
fn top_level_key(line: &str) -> &str {
    let head = line.split('|').next().unwrap_or_default();
    head.split(':').next().unwrap_or_default()
}

/// Check that a key can be stored in the metadata file.
pub fn validate_key(key: &str) -> Result<(), PackerError> {
    if key.contains([':', '|', '\n', '\r']) {
        return Err(PackerError::InvalidKey(key.to_string()));
    }

    Ok(())
}

/// Append-only metadata file mapping keys to data file offsets.
///
/// Lookups scan the file from the start on every call; nothing is cached between calls so
/// that several packers can share the same files sequentially.
#[derive(Debug, Clone)]
pub struct IndexFile {
    path: PathBuf,
}

impl IndexFile {
    /// Index stored at `path`. The file is created on the first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the metadata file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fail with [DuplicateKey](PackerError::DuplicateKey) if `key` is already a top level key.
    pub fn duplicate_key_check(&self, key: &str) -> Result<(), PackerError> {
        let Some(reader) = self.open()? else {
            return Ok(());
        };

        for line in reader.lines() {
            if top_level_key(&line?) == key {
                return Err(PackerError::DuplicateKey {
                    key: key.to_string(),
                    path: self.path.display().to_string(),
                });
            }
        }

        Ok(())
    }

    /// Append an entry at the end of the file.
    pub fn record_offset(
        &self,
        key: &str,
        offset: u64,
        children: Vec<(String, u64)>,
    ) -> Result<(), PackerError> {
        let entry = IndexEntry::new(key.to_string(), offset, children);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(entry.to_line().as_bytes())?;

        log::debug!(
            "Indexed key '{key}' at offset {offset} in {}",
            self.path.display()
        );

        Ok(())
    }

    /// Offset of the block saved under `key`.
    ///
    /// An empty key refers to the first block of the data file, at offset 0.
    pub fn lookup_offset(&self, key: &str) -> Result<u64, PackerError> {
        if key.is_empty() {
            return Ok(0);
        }

        let reader = self
            .open()?
            .ok_or_else(|| PackerError::KeyNotFound(key.to_string()))?;

        for line in reader.lines() {
            let line = line?;
            if top_level_key(&line) == key {
                return Ok(IndexEntry::parse(&line)?.offset);
            }
        }

        Err(PackerError::KeyNotFound(key.to_string()))
    }

    /// Offset of the record `key` nested in the block saved under `model`.
    ///
    /// Fails with [ModelNotFound](PackerError::ModelNotFound) when no entry has the model key,
    /// and returns `None` when the model exists but none of its entries lists `key`.
    pub fn lookup_nested_offset(&self, model: &str, key: &str) -> Result<Option<u64>, PackerError> {
        let not_found = || PackerError::ModelNotFound {
            model: model.to_string(),
            key: key.to_string(),
        };
        let reader = self.open()?.ok_or_else(not_found)?;
        let mut model_exists = false;

        for line in reader.lines() {
            let line = line?;
            if top_level_key(&line) != model {
                continue;
            }

            model_exists = true;
            if let Some(offset) = IndexEntry::parse(&line)?.child(key) {
                return Ok(Some(offset));
            }
        }

        match model_exists {
            true => Ok(None),
            false => Err(not_found()),
        }
    }

    /// Every entry of the file, in the order they were written.
    pub fn entries(&self) -> Result<Vec<IndexEntry>, PackerError> {
        let Some(reader) = self.open()? else {
            return Ok(Vec::new());
        };

        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            entries.push(IndexEntry::parse(&line)?);
        }

        Ok(entries)
    }

    /// Remove every entry.
    pub fn truncate(&self) -> Result<(), PackerError> {
        File::create(&self.path)?;
        Ok(())
    }

    fn open(&self) -> Result<Option<BufReader<File>>, PackerError> {
        match File::open(&self.path) {
            Ok(file) => Ok(Some(BufReader::new(file))),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn index() -> (tempfile::TempDir, IndexFile) {
        let dir = tempfile::tempdir().unwrap();
        let index = IndexFile::new(dir.path().join("model.meta"));

        (dir, index)
    }

    #[test]
    fn should_write_children_in_order() {
        let entry = IndexEntry::new(
            "/model/".into(),
            0,
            vec![("/model/b".into(), 14), ("/model/a".into(), 60)],
        );

        assert_eq!(entry.to_line(), "/model/:0|/model/b:14|/model/a:60\n");
        assert_eq!(
            IndexEntry::parse("/model/:0|/model/b:14|/model/a:60").unwrap(),
            entry
        );
    }

    #[rstest]
    #[case("no-offset")]
    #[case("key:abc")]
    #[case("key:0|child")]
    #[case("key:0|child:-1")]
    fn should_reject_malformed_lines(#[case] line: &str) {
        assert!(matches!(
            IndexEntry::parse(line),
            Err(PackerError::InvalidFormat(_))
        ));
    }

    #[rstest]
    #[case("a:b")]
    #[case("a|b")]
    #[case("a\nb")]
    fn should_reject_keys_breaking_the_layout(#[case] key: &str) {
        assert!(matches!(validate_key(key), Err(PackerError::InvalidKey(_))));
    }

    #[test]
    fn should_treat_missing_file_as_empty_index() {
        let (_dir, index) = index();

        index.duplicate_key_check("anything").unwrap();
        assert!(index.entries().unwrap().is_empty());
        assert!(matches!(
            index.lookup_offset("anything"),
            Err(PackerError::KeyNotFound(_))
        ));
        assert!(matches!(
            index.lookup_nested_offset("model", "w"),
            Err(PackerError::ModelNotFound { .. })
        ));
    }

    #[test]
    fn should_detect_duplicate_top_level_keys_only() {
        let (_dir, index) = index();
        index
            .record_offset("/model/", 0, vec![("/model/w".into(), 14)])
            .unwrap();

        assert!(matches!(
            index.duplicate_key_check("/model/"),
            Err(PackerError::DuplicateKey { .. })
        ));
        // Nested keys may be saved again as standalone entries.
        index.duplicate_key_check("/model/w").unwrap();
    }

    #[test]
    fn should_lookup_offsets() {
        let (_dir, index) = index();
        index
            .record_offset("/model/", 0, vec![("/model/w".into(), 14)])
            .unwrap();
        index.record_offset("/emb", 120, vec![]).unwrap();

        assert_eq!(index.lookup_offset("/emb").unwrap(), 120);
        assert_eq!(index.lookup_offset("/model/").unwrap(), 0);
        assert_eq!(index.lookup_offset("").unwrap(), 0);
        assert_eq!(
            index.lookup_nested_offset("/model/", "/model/w").unwrap(),
            Some(14)
        );
        assert_eq!(
            index.lookup_nested_offset("/model/", "/model/b").unwrap(),
            None
        );
        assert!(matches!(
            index.lookup_offset("/model/w"),
            Err(PackerError::KeyNotFound(_))
        ));
    }

    #[test]
    fn should_list_and_truncate_entries() {
        let (_dir, index) = index();
        index.record_offset("a", 0, vec![]).unwrap();
        index.record_offset("b", 40, vec![("c".into(), 54)]).unwrap();

        let entries = index.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].child("c"), Some(54));

        index.truncate().unwrap();
        assert!(index.entries().unwrap().is_empty());
    }
}
