use core::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use crate::{Dim, ParamError, error::check_len};

/// Values and gradients of a dense parameter.
#[derive(new, Debug, Clone, PartialEq)]
pub struct ParameterStorage {
    /// Fully qualified name, prefixed by the namespace of the owning collection.
    pub name: String,
    /// Shape of the parameter.
    pub dim: Dim,
    /// Flattened values.
    pub values: Vec<f32>,
    /// Flattened gradients.
    pub grads: Vec<f32>,
}

impl ParameterStorage {
    /// Storage of the given dimension with values and gradients set to zero.
    pub fn zeros(name: String, dim: Dim) -> Self {
        let size = dim.num_elements();

        Self::new(name, dim, vec![0.0; size], vec![0.0; size])
    }
}

/// Handle to a dense parameter registered in a [collection](crate::ParameterCollection).
///
/// Cloning the handle doesn't copy the storage, every clone points to the same values.
#[derive(Debug, Clone)]
pub struct Parameter {
    storage: Rc<RefCell<ParameterStorage>>,
}

impl Parameter {
    pub(crate) fn from_storage(storage: ParameterStorage) -> Self {
        Self {
            storage: Rc::new(RefCell::new(storage)),
        }
    }

    /// Fully qualified name of the parameter.
    pub fn name(&self) -> String {
        self.storage.borrow().name.clone()
    }

    /// Shape of the parameter.
    pub fn dim(&self) -> Dim {
        self.storage.borrow().dim.clone()
    }

    /// Copy of the flattened values.
    pub fn values(&self) -> Vec<f32> {
        self.storage.borrow().values.clone()
    }

    /// Copy of the flattened gradients.
    pub fn grads(&self) -> Vec<f32> {
        self.storage.borrow().grads.clone()
    }

    /// Overwrite every value.
    pub fn set_values(&self, values: &[f32]) -> Result<(), ParamError> {
        let mut storage = self.storage.borrow_mut();
        check_len(storage.values.len(), values.len())?;
        storage.values.copy_from_slice(values);

        Ok(())
    }

    /// Overwrite every gradient.
    pub fn set_grads(&self, grads: &[f32]) -> Result<(), ParamError> {
        let mut storage = self.storage.borrow_mut();
        check_len(storage.grads.len(), grads.len())?;
        storage.grads.copy_from_slice(grads);

        Ok(())
    }

    /// Set every value to `value`.
    pub fn fill(&self, value: f32) {
        self.storage.borrow_mut().values.fill(value);
    }

    /// Borrow the underlying storage.
    pub fn storage(&self) -> Ref<'_, ParameterStorage> {
        self.storage.borrow()
    }

    /// Mutably borrow the underlying storage.
    pub fn storage_mut(&self) -> RefMut<'_, ParameterStorage> {
        self.storage.borrow_mut()
    }

    /// Whether both handles point to the same storage.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.storage, &other.storage)
    }
}
