use core::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use crate::{Dim, ParamError, error::check_len};

/// Values and gradients of a lookup table.
///
/// Every row has the dimension `dim`; `all_dim` is `dim` with the number of rows appended as
/// its last axis.
#[derive(new, Debug, Clone, PartialEq)]
pub struct LookupParameterStorage {
    /// Fully qualified name, prefixed by the namespace of the owning collection.
    pub name: String,
    /// Shape of the whole table.
    pub all_dim: Dim,
    /// Shape of a single row.
    pub dim: Dim,
    /// Flattened values of every row.
    pub all_values: Vec<f32>,
    /// Flattened gradients of every row.
    pub all_grads: Vec<f32>,
}

impl LookupParameterStorage {
    /// Table of `rows` rows of dimension `dim`, set to zero.
    pub fn zeros(name: String, rows: usize, dim: Dim) -> Self {
        let all_dim = dim.push(rows);
        let size = all_dim.num_elements();

        Self::new(name, all_dim, dim, vec![0.0; size], vec![0.0; size])
    }

    /// Number of rows in the table.
    pub fn rows(&self) -> usize {
        self.all_dim.rows()
    }
}

/// Handle to a lookup table registered in a [collection](crate::ParameterCollection).
#[derive(Debug, Clone)]
pub struct LookupParameter {
    storage: Rc<RefCell<LookupParameterStorage>>,
}

impl LookupParameter {
    pub(crate) fn from_storage(storage: LookupParameterStorage) -> Self {
        Self {
            storage: Rc::new(RefCell::new(storage)),
        }
    }

    /// Fully qualified name of the table.
    pub fn name(&self) -> String {
        self.storage.borrow().name.clone()
    }

    /// Shape of the whole table.
    pub fn all_dim(&self) -> Dim {
        self.storage.borrow().all_dim.clone()
    }

    /// Shape of a single row.
    pub fn dim(&self) -> Dim {
        self.storage.borrow().dim.clone()
    }

    /// Number of rows in the table.
    pub fn rows(&self) -> usize {
        self.storage.borrow().rows()
    }

    /// Copy of the flattened values of every row.
    pub fn all_values(&self) -> Vec<f32> {
        self.storage.borrow().all_values.clone()
    }

    /// Copy of the flattened gradients of every row.
    pub fn all_grads(&self) -> Vec<f32> {
        self.storage.borrow().all_grads.clone()
    }

    /// Overwrite the values of every row.
    pub fn set_all_values(&self, values: &[f32]) -> Result<(), ParamError> {
        let mut storage = self.storage.borrow_mut();
        check_len(storage.all_values.len(), values.len())?;
        storage.all_values.copy_from_slice(values);

        Ok(())
    }

    /// Overwrite the gradients of every row.
    pub fn set_all_grads(&self, grads: &[f32]) -> Result<(), ParamError> {
        let mut storage = self.storage.borrow_mut();
        check_len(storage.all_grads.len(), grads.len())?;
        storage.all_grads.copy_from_slice(grads);

        Ok(())
    }

    /// Copy of the values of a single row.
    pub fn row(&self, index: usize) -> Result<Vec<f32>, ParamError> {
        let storage = self.storage.borrow();
        let range = row_range(&storage, index)?;

        Ok(storage.all_values[range].to_vec())
    }

    /// Overwrite the values of a single row.
    pub fn initialize_row(&self, index: usize, values: &[f32]) -> Result<(), ParamError> {
        let mut storage = self.storage.borrow_mut();
        let range = row_range(&storage, index)?;
        check_len(range.len(), values.len())?;
        storage.all_values[range].copy_from_slice(values);

        Ok(())
    }

    /// Borrow the underlying storage.
    pub fn storage(&self) -> Ref<'_, LookupParameterStorage> {
        self.storage.borrow()
    }

    /// Mutably borrow the underlying storage.
    pub fn storage_mut(&self) -> RefMut<'_, LookupParameterStorage> {
        self.storage.borrow_mut()
    }

    /// Whether both handles point to the same storage.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.storage, &other.storage)
    }
}

fn row_range(
    storage: &LookupParameterStorage,
    index: usize,
) -> Result<core::ops::Range<usize>, ParamError> {
    let rows = storage.rows();
    if index >= rows {
        return Err(ParamError::RowOutOfRange { index, rows });
    }

    let row_size = storage.dim.num_elements();
    let start = index * row_size;

    Ok(start..start + row_size)
}
