//! Type Manifests
//!
//! A manifest is a mergeable batch of type registrations, the unit a library
//! or application hands to the registry so every wire name it defines
//! becomes resolvable. Applying the same manifest twice is a no-op.

use crate::table::TypeTable;
use serde::de::DeserializeOwned;
use serde::Serialize;

type InstallFn = Box<dyn Fn(&TypeTable) -> bool + Send + Sync>;

/// A batch of wire-type registrations.
#[derive(Default)]
pub struct TypeManifest {
    entries: Vec<(String, InstallFn)>,
}

impl TypeManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a registration for `T` under `name`.
    pub fn register<T>(&mut self, name: &str)
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let owned = name.to_string();
        self.entries.push((
            owned.clone(),
            Box::new(move |table| table.register::<T>(&owned)),
        ));
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_type<T>(mut self, name: &str) -> Self
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        self.register::<T>(name);
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge into `table`; returns how many names were newly added.
    pub(crate) fn apply(&self, table: &TypeTable) -> usize {
        self.entries
            .iter()
            .filter(|(_, install)| install(table))
            .count()
    }
}
