use std::collections::HashSet;
use std::path::Path;

use ember_params::{LookupParameter, ParamError, Parameter, ParameterCollection};

use crate::PackerError;
use crate::config::{PackerConfig, default_meta_path};
use crate::index::{IndexFile, validate_key};
use crate::record::{BlockWriter, DataFile, Record, RecordKind, RecordReader};

/// Saves and loads parameters to and from a data file indexed by a metadata file.
///
/// Every save appends one block to the data file and one line to the metadata file. The
/// packer keeps a write cursor: the offset where the next block starts.
///
/// # Keys
///
/// Saved entities are found again by key. An empty key at save time stands for the namespace
/// of a collection or the name of a parameter; an empty key at load time stands for the block
/// at offset 0. Parameters saved as part of a collection can also be loaded on their own,
/// by combining the key of the collection with the name of the parameter.
///
/// # Append
///
/// Saving with `append` set to `false` starts both files over. With `append` set to `true`,
/// the block is written after every block already in the data file, even those written by
/// another packer.
///
/// # Example
///
/// ```no_run
/// use ember_params::ParameterCollection;
/// use ember_store::Packer;
///
/// let mut pc = ParameterCollection::new();
/// let mut model = pc.add_subcollection("model");
/// model.add_parameters([3, 4], "w");
///
/// let mut packer = Packer::new("/tmp/model.ember");
/// packer.save_collection(&model, "", false)?;
///
/// let mut restored = ParameterCollection::new().add_subcollection("model");
/// packer.populate_collection(&mut restored, "/model/")?;
/// # Ok::<(), ember_store::PackerError>(())
/// ```
#[derive(Debug)]
pub struct Packer {
    data: DataFile,
    index: IndexFile,
    offset: u64,
    float_precision: Option<usize>,
}

impl Packer {
    /// Packer writing to `path`, with its metadata file at `<path>.meta`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        Self {
            data: DataFile::new(path),
            index: IndexFile::new(default_meta_path(path)),
            offset: 0,
            float_precision: None,
        }
    }

    /// Packer using the files and formatting of the given configuration.
    pub fn from_config(config: &PackerConfig) -> Self {
        Self {
            data: DataFile::new(config.data_path.clone()),
            index: IndexFile::new(config.resolved_meta_path()),
            offset: 0,
            float_precision: config.float_precision,
        }
    }

    /// Offset where the next block starts.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Path of the data file.
    pub fn data_path(&self) -> &Path {
        self.data.path()
    }

    /// Path of the metadata file.
    pub fn meta_path(&self) -> &Path {
        self.index.path()
    }

    /// The metadata file.
    pub fn index(&self) -> &IndexFile {
        &self.index
    }

    /// Save every parameter of a collection as one block.
    ///
    /// The key defaults to the namespace of the collection. The metadata line also records the
    /// offset of every parameter of the block, so they can be loaded one by one.
    pub fn save_collection(
        &mut self,
        model: &ParameterCollection,
        key: &str,
        append: bool,
    ) -> Result<(), PackerError> {
        let key = default_key(key, model.namespace());
        if model.is_empty() {
            log::warn!("Saving collection '{}' without any parameter", model.namespace());
        }
        for storage in model.all_storages() {
            validate_key(&storage.name())?;
        }
        let base_offset = self.prepare_save(&key, append)?;

        let mut writer = BlockWriter::new(base_offset, self.float_precision);
        writer.write_collection(model);

        self.commit(&key, base_offset, writer, true)
    }

    /// Save a filtered subset of a collection.
    pub fn save_collection_filtered(
        &mut self,
        _model: &ParameterCollection,
        _filter: &[String],
        _key: &str,
        _append: bool,
    ) -> Result<(), PackerError> {
        Err(PackerError::NotImplemented(
            "saving a filtered parameter collection",
        ))
    }

    /// Save a single dense parameter as one block. The key defaults to its name.
    pub fn save_parameter(
        &mut self,
        param: &Parameter,
        key: &str,
        append: bool,
    ) -> Result<(), PackerError> {
        let name = param.name();
        validate_key(&name)?;
        let key = default_key(key, &name);
        let base_offset = self.prepare_save(&key, append)?;

        let mut writer = BlockWriter::new(base_offset, self.float_precision);
        writer.write_parameter(&param.storage());

        self.commit(&key, base_offset, writer, false)
    }

    /// Save a single lookup table as one block. The key defaults to its name.
    pub fn save_lookup_parameter(
        &mut self,
        param: &LookupParameter,
        key: &str,
        append: bool,
    ) -> Result<(), PackerError> {
        let name = param.name();
        validate_key(&name)?;
        let key = default_key(key, &name);
        let base_offset = self.prepare_save(&key, append)?;

        let mut writer = BlockWriter::new(base_offset, self.float_precision);
        writer.write_lookup_parameter(&param.storage());

        self.commit(&key, base_offset, writer, false)
    }

    /// Add every parameter of a saved block to the collection.
    ///
    /// Every record name must start with the namespace of the collection and must not be
    /// registered in it yet. The whole block is parsed and checked before the first parameter
    /// is added.
    pub fn populate_collection(
        &self,
        model: &mut ParameterCollection,
        key: &str,
    ) -> Result<(), PackerError> {
        let offset = self.seek_offset(key)?;
        let records = RecordReader::open(self.data.path(), offset)?.read_block()?;

        let mut names = HashSet::new();
        for record in records.iter() {
            check_namespace(record.name(), model.namespace())?;
            if model.contains(record.name()) || !names.insert(record.name()) {
                return Err(ParamError::DuplicateName(record.name().to_string()).into());
            }
        }

        let count = records.len();
        for record in records {
            match record {
                Record::Parameter(storage) => {
                    model.insert_parameter(storage)?;
                }
                Record::LookupParameter(storage) => {
                    model.insert_lookup_parameter(storage)?;
                }
            }
        }

        log::debug!(
            "Populated {count} parameters into '{}' from offset {offset}",
            model.namespace()
        );

        Ok(())
    }

    /// Populate a filtered subset of a collection.
    pub fn populate_collection_filtered(
        &self,
        _model: &mut ParameterCollection,
        _filter: &[String],
        _key: &str,
    ) -> Result<(), PackerError> {
        Err(PackerError::NotImplemented(
            "populating a filtered parameter collection",
        ))
    }

    /// Overwrite an existing parameter with a block saved on its own.
    ///
    /// The dimensions must match; on mismatch the parameter is left untouched.
    pub fn populate_parameter(&self, param: &Parameter, key: &str) -> Result<(), PackerError> {
        let record = self.read_single(key, RecordKind::Parameter)?;
        overwrite_parameter(param, record)
    }

    /// Overwrite an existing parameter with a record saved as part of the collection `model`.
    pub fn populate_parameter_nested(
        &self,
        param: &Parameter,
        model: &str,
        key: &str,
    ) -> Result<(), PackerError> {
        let record = self.read_nested(model, key, RecordKind::Parameter)?;
        overwrite_parameter(param, record)
    }

    /// Overwrite an existing lookup table with a block saved on its own.
    pub fn populate_lookup_parameter(
        &self,
        param: &LookupParameter,
        key: &str,
    ) -> Result<(), PackerError> {
        let record = self.read_single(key, RecordKind::LookupParameter)?;
        overwrite_lookup_parameter(param, record)
    }

    /// Overwrite an existing lookup table with a record saved as part of the collection `model`.
    pub fn populate_lookup_parameter_nested(
        &self,
        param: &LookupParameter,
        model: &str,
        key: &str,
    ) -> Result<(), PackerError> {
        let record = self.read_nested(model, key, RecordKind::LookupParameter)?;
        overwrite_lookup_parameter(param, record)
    }

    /// Add a dense parameter saved on its own to the collection.
    pub fn load_parameter(
        &self,
        model: &mut ParameterCollection,
        key: &str,
    ) -> Result<Parameter, PackerError> {
        let record = self.read_single(key, RecordKind::Parameter)?;
        insert_parameter(model, record)
    }

    /// Add a dense parameter saved as part of the collection `model_key` to the collection.
    pub fn load_parameter_nested(
        &self,
        model: &mut ParameterCollection,
        model_key: &str,
        key: &str,
    ) -> Result<Parameter, PackerError> {
        let record = self.read_nested(model_key, key, RecordKind::Parameter)?;
        insert_parameter(model, record)
    }

    /// Add a lookup table saved on its own to the collection.
    ///
    /// The number of rows is the last axis of the saved table dimension.
    pub fn load_lookup_parameter(
        &self,
        model: &mut ParameterCollection,
        key: &str,
    ) -> Result<LookupParameter, PackerError> {
        let record = self.read_single(key, RecordKind::LookupParameter)?;
        insert_lookup_parameter(model, record)
    }

    /// Add a lookup table saved as part of the collection `model_key` to the collection.
    pub fn load_lookup_parameter_nested(
        &self,
        model: &mut ParameterCollection,
        model_key: &str,
        key: &str,
    ) -> Result<LookupParameter, PackerError> {
        let record = self.read_nested(model_key, key, RecordKind::LookupParameter)?;
        insert_lookup_parameter(model, record)
    }

    /// Offset of the block saved under `key`, 0 for an empty key.
    pub fn seek_offset(&self, key: &str) -> Result<u64, PackerError> {
        self.index.lookup_offset(key)
    }

    /// Offset of the record `key` saved as part of the collection `model`.
    pub fn seek_nested_offset(&self, model: &str, key: &str) -> Result<u64, PackerError> {
        self.index
            .lookup_nested_offset(model, key)?
            .ok_or_else(|| PackerError::KeyNotFound(format!("{key} under model: {model}")))
    }

    fn prepare_save(&mut self, key: &str, append: bool) -> Result<u64, PackerError> {
        validate_key(key)?;
        self.index.duplicate_key_check(key)?;

        if append {
            self.offset = self.data.len()?;
        } else {
            if !self.data.is_empty()? {
                log::info!("File {} exists, replacing", self.data.path().display());
            }
            self.data.truncate()?;
            self.index.truncate()?;
            self.offset = 0;
        }

        Ok(self.offset)
    }

    // Only collections record the offsets of their nested records.
    fn commit(
        &mut self,
        key: &str,
        base_offset: u64,
        writer: BlockWriter,
        nested: bool,
    ) -> Result<(), PackerError> {
        let block = writer.finish();
        let children = match nested {
            true => block.children.clone(),
            false => Vec::new(),
        };

        let end = self.data.append(&block)?;
        self.index.record_offset(key, base_offset, children)?;
        self.offset = end;

        log::debug!("Saved '{key}' at offset {base_offset}, next block at {end}");

        Ok(())
    }

    fn read_single(&self, key: &str, kind: RecordKind) -> Result<Record, PackerError> {
        let offset = self.seek_offset(key)?;
        RecordReader::open(self.data.path(), offset)?.read_single(kind)
    }

    fn read_nested(
        &self,
        model: &str,
        key: &str,
        kind: RecordKind,
    ) -> Result<Record, PackerError> {
        let offset = self.seek_nested_offset(model, key)?;
        RecordReader::open(self.data.path(), offset)?.read_body(kind)
    }
}

fn default_key(key: &str, default: &str) -> String {
    match key.is_empty() {
        true => default.to_string(),
        false => key.to_string(),
    }
}

fn check_namespace(name: &str, namespace: &str) -> Result<(), PackerError> {
    if !name.starts_with(namespace) {
        return Err(PackerError::NamespaceMismatch {
            name: name.to_string(),
            namespace: namespace.to_string(),
        });
    }

    Ok(())
}

fn overwrite_parameter(param: &Parameter, record: Record) -> Result<(), PackerError> {
    let loaded = match record {
        Record::Parameter(loaded) => loaded,
        other => return Err(unexpected_kind(RecordKind::Parameter, &other)),
    };

    let mut storage = param.storage_mut();
    if storage.dim != loaded.dim {
        return Err(PackerError::DimensionMismatch {
            expected: storage.dim.clone(),
            found: loaded.dim,
        });
    }
    *storage = loaded;

    Ok(())
}

fn overwrite_lookup_parameter(param: &LookupParameter, record: Record) -> Result<(), PackerError> {
    let loaded = match record {
        Record::LookupParameter(loaded) => loaded,
        other => return Err(unexpected_kind(RecordKind::LookupParameter, &other)),
    };

    let mut storage = param.storage_mut();
    if storage.all_dim != loaded.all_dim {
        return Err(PackerError::DimensionMismatch {
            expected: storage.all_dim.clone(),
            found: loaded.all_dim,
        });
    }
    *storage = loaded;

    Ok(())
}

fn insert_parameter(
    model: &mut ParameterCollection,
    record: Record,
) -> Result<Parameter, PackerError> {
    let loaded = match record {
        Record::Parameter(loaded) => loaded,
        other => return Err(unexpected_kind(RecordKind::Parameter, &other)),
    };
    check_namespace(&loaded.name, model.namespace())?;

    Ok(model.insert_parameter(loaded)?)
}

fn insert_lookup_parameter(
    model: &mut ParameterCollection,
    record: Record,
) -> Result<LookupParameter, PackerError> {
    let loaded = match record {
        Record::LookupParameter(loaded) => loaded,
        other => return Err(unexpected_kind(RecordKind::LookupParameter, &other)),
    };
    check_namespace(&loaded.name, model.namespace())?;

    Ok(model.insert_lookup_parameter(loaded)?)
}

fn unexpected_kind(expected: RecordKind, record: &Record) -> PackerError {
    PackerError::InvalidFormat(format!(
        "Expected a {} record, found {} {}",
        expected.tag(),
        record.kind().tag(),
        record.name()
    ))
}
