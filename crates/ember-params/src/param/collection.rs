use core::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::{LookupParameter, LookupParameterStorage, Parameter, ParameterStorage};
use crate::{Dim, ParamError};

/// A parameter registered in a collection, of either kind.
#[derive(Debug, Clone)]
pub enum Storage {
    /// A dense parameter.
    Parameter(Parameter),
    /// A lookup table.
    LookupParameter(LookupParameter),
}

impl Storage {
    /// Fully qualified name of the parameter.
    pub fn name(&self) -> String {
        match self {
            Storage::Parameter(param) => param.name(),
            Storage::LookupParameter(param) => param.name(),
        }
    }

    /// Number of values held by the parameter.
    pub fn num_elements(&self) -> usize {
        match self {
            Storage::Parameter(param) => param.dim().num_elements(),
            Storage::LookupParameter(param) => param.all_dim().num_elements(),
        }
    }
}

#[derive(Debug, Default)]
struct Registry {
    storages: Vec<Storage>,
    name_counts: HashMap<String, usize>,
    subcollection_counts: HashMap<String, usize>,
}

impl Registry {
    fn unique_name(counts: &mut HashMap<String, usize>, name: &str) -> String {
        let count = counts.entry(name.to_string()).or_insert(0);
        let unique = match *count {
            0 => name.to_string(),
            n => format!("{name}_{n}"),
        };
        *count += 1;

        unique
    }
}

/// Collection of parameters and lookup tables sharing a namespace.
///
/// The root collection has the namespace `/`. A sub-collection created with
/// [add_subcollection](ParameterCollection::add_subcollection) gets the namespace
/// `<parent namespace><name>/` and registers every parameter it creates with all of its
/// ancestors as well, so saving a parent also saves the parameters of its children.
#[derive(Debug, Clone)]
pub struct ParameterCollection {
    namespace: String,
    // Own registry first, followed by the registries of every ancestor.
    registries: Vec<Rc<RefCell<Registry>>>,
}

impl Default for ParameterCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterCollection {
    /// Create a root collection.
    pub fn new() -> Self {
        Self {
            namespace: "/".to_string(),
            registries: vec![Rc::default()],
        }
    }

    /// Namespace prefixing the name of every parameter of the collection.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Create a child collection named `name` inside this collection's namespace.
    ///
    /// Reusing a name yields `name_1`, `name_2` and so on.
    pub fn add_subcollection(&mut self, name: &str) -> ParameterCollection {
        let base = if name.is_empty() { "_" } else { name };
        let unique = Registry::unique_name(
            &mut self.registries[0].borrow_mut().subcollection_counts,
            base,
        );

        let mut registries = Vec::with_capacity(self.registries.len() + 1);
        registries.push(Rc::default());
        registries.extend(self.registries.iter().cloned());

        ParameterCollection {
            namespace: format!("{}{unique}/", self.namespace),
            registries,
        }
    }

    /// Register a new dense parameter of the given dimension, initialized to zero.
    ///
    /// An empty name gives the parameter a generated name (`_0`, `_1`, ...).
    pub fn add_parameters(&mut self, dim: impl Into<Dim>, name: &str) -> Parameter {
        let name = self.full_name(name);
        let param = Parameter::from_storage(ParameterStorage::zeros(name, dim.into()));
        self.register(Storage::Parameter(param.clone()));

        param
    }

    /// Register a new lookup table of `rows` rows of dimension `dim`, initialized to zero.
    pub fn add_lookup_parameters(
        &mut self,
        rows: usize,
        dim: impl Into<Dim>,
        name: &str,
    ) -> LookupParameter {
        let name = self.full_name(name);
        let param =
            LookupParameter::from_storage(LookupParameterStorage::zeros(name, rows, dim.into()));
        self.register(Storage::LookupParameter(param.clone()));

        param
    }

    /// Register an existing dense parameter storage, keeping its name.
    ///
    /// Used when loading a saved parameter: the name stored with the values is kept as is, and
    /// must not be registered already.
    pub fn insert_parameter(
        &mut self,
        storage: ParameterStorage,
    ) -> Result<Parameter, ParamError> {
        self.reserve_name(&storage.name)?;
        let param = Parameter::from_storage(storage);
        self.register(Storage::Parameter(param.clone()));

        Ok(param)
    }

    /// Register an existing lookup table storage, keeping its name.
    pub fn insert_lookup_parameter(
        &mut self,
        storage: LookupParameterStorage,
    ) -> Result<LookupParameter, ParamError> {
        self.reserve_name(&storage.name)?;
        let param = LookupParameter::from_storage(storage);
        self.register(Storage::LookupParameter(param.clone()));

        Ok(param)
    }

    /// Whether a parameter of either kind is registered under this fully qualified name.
    pub fn contains(&self, name: &str) -> bool {
        self.registries[0]
            .borrow()
            .storages
            .iter()
            .any(|storage| storage.name() == name)
    }

    /// Every registered parameter of both kinds, in registration order.
    pub fn all_storages(&self) -> Vec<Storage> {
        self.registries[0].borrow().storages.clone()
    }

    /// Dense parameters, in registration order.
    pub fn parameter_storages(&self) -> Vec<Parameter> {
        self.registries[0]
            .borrow()
            .storages
            .iter()
            .filter_map(|storage| match storage {
                Storage::Parameter(param) => Some(param.clone()),
                Storage::LookupParameter(_) => None,
            })
            .collect()
    }

    /// Lookup tables, in registration order.
    pub fn lookup_parameter_storages(&self) -> Vec<LookupParameter> {
        self.registries[0]
            .borrow()
            .storages
            .iter()
            .filter_map(|storage| match storage {
                Storage::LookupParameter(param) => Some(param.clone()),
                Storage::Parameter(_) => None,
            })
            .collect()
    }

    /// Find a dense parameter by its fully qualified name.
    pub fn parameter(&self, name: &str) -> Option<Parameter> {
        self.parameter_storages()
            .into_iter()
            .find(|param| param.name() == name)
    }

    /// Find a lookup table by its fully qualified name.
    pub fn lookup_parameter(&self, name: &str) -> Option<LookupParameter> {
        self.lookup_parameter_storages()
            .into_iter()
            .find(|param| param.name() == name)
    }

    /// Number of registered parameters of both kinds.
    pub fn len(&self) -> usize {
        self.registries[0].borrow().storages.len()
    }

    /// Whether the collection has no parameter.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of values held by the collection.
    pub fn num_params(&self) -> usize {
        self.registries[0]
            .borrow()
            .storages
            .iter()
            .map(Storage::num_elements)
            .sum()
    }

    fn full_name(&mut self, name: &str) -> String {
        let mut registry = self.registries[0].borrow_mut();
        let name = if name.is_empty() {
            let index = registry.storages.len();
            Registry::unique_name(&mut registry.name_counts, &format!("_{index}"))
        } else {
            Registry::unique_name(&mut registry.name_counts, name)
        };

        format!("{}{name}", self.namespace)
    }

    // Count a full name so that later generated names don't collide with it.
    fn reserve_name(&mut self, full_name: &str) -> Result<(), ParamError> {
        if self.contains(full_name) {
            return Err(ParamError::DuplicateName(full_name.to_string()));
        }

        let local = full_name
            .strip_prefix(self.namespace.as_str())
            .unwrap_or(full_name);
        let mut registry = self.registries[0].borrow_mut();
        Registry::unique_name(&mut registry.name_counts, local);

        Ok(())
    }

    fn register(&mut self, storage: Storage) {
        for registry in self.registries.iter() {
            registry.borrow_mut().storages.push(storage.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_prefix_names_with_namespace() {
        let mut pc = ParameterCollection::new();
        let mut sub = pc.add_subcollection("model");

        let w = sub.add_parameters([3, 4], "w");
        let b = sub.add_parameters([3], "");

        assert_eq!(sub.namespace(), "/model/");
        assert_eq!(w.name(), "/model/w");
        assert_eq!(b.name(), "/model/_1");
    }

    #[test]
    fn should_deduplicate_names() {
        let mut pc = ParameterCollection::new();

        let first = pc.add_parameters([2], "w");
        let second = pc.add_parameters([2], "w");
        let sub_a = pc.add_subcollection("layer");
        let sub_b = pc.add_subcollection("layer");

        assert_eq!(first.name(), "/w");
        assert_eq!(second.name(), "/w_1");
        assert_eq!(sub_a.namespace(), "/layer/");
        assert_eq!(sub_b.namespace(), "/layer_1/");
    }

    #[test]
    fn should_keep_registration_order_across_kinds() {
        let mut pc = ParameterCollection::new();
        pc.add_parameters([2], "a");
        pc.add_lookup_parameters(4, [3], "b");
        pc.add_parameters([1], "c");

        let names: Vec<_> = pc.all_storages().iter().map(Storage::name).collect();

        assert_eq!(names, vec!["/a", "/b", "/c"]);
        assert_eq!(pc.parameter_storages().len(), 2);
        assert_eq!(pc.lookup_parameter_storages().len(), 1);
        assert_eq!(pc.num_params(), 2 + 12 + 1);
    }

    #[test]
    fn should_keep_name_of_inserted_storage() {
        let mut pc = ParameterCollection::new();

        let inserted = pc
            .insert_parameter(ParameterStorage::new(
                "/w".into(),
                Dim::new([1]),
                vec![2.0],
                vec![0.0],
            ))
            .unwrap();
        let added = pc.add_parameters([1], "w");

        assert_eq!(inserted.name(), "/w");
        assert_eq!(inserted.values(), vec![2.0]);
        assert_eq!(added.name(), "/w_1");
        assert_eq!(pc.len(), 2);
    }

    #[test]
    fn should_reject_inserting_registered_name() {
        let mut pc = ParameterCollection::new();
        pc.add_lookup_parameters(2, [1], "emb");

        let result = pc.insert_parameter(ParameterStorage::zeros("/emb".into(), Dim::new([1])));

        assert_eq!(result.err(), Some(ParamError::DuplicateName("/emb".into())));
        assert_eq!(pc.len(), 1);
        assert!(pc.contains("/emb"));
        assert!(!pc.contains("/w"));
    }

    #[test]
    fn should_register_subcollection_parameters_with_ancestors() {
        let mut pc = ParameterCollection::new();
        pc.add_parameters([2], "root");
        let mut sub = pc.add_subcollection("child");
        let mut nested = sub.add_subcollection("leaf");
        nested.add_lookup_parameters(2, [2], "table");

        assert_eq!(pc.len(), 2);
        assert_eq!(sub.len(), 1);
        assert!(pc.lookup_parameter("/child/leaf/table").is_some());
        assert!(sub.parameter("/root").is_none());
    }
}
