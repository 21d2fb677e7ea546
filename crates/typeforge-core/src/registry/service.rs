//! The in-process registry of published record types.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::catalog::{CatalogStore, TypeDefinition};
use crate::compile::ValidatedDefinition;
use crate::error::{Error, Result};
use crate::schema::module_stem;

/// When a published type becomes visible through [`TypeRegistry::lookup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    /// Visible after the registry is reopened.
    #[default]
    OnRestart,
    /// Visible as soon as it is durably written.
    Immediate,
}

/// Result of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReceipt {
    pub type_name: String,
    pub module_name: String,
    pub path: PathBuf,
    /// Whether the type is already visible to lookups.
    pub active: bool,
}

#[derive(Debug, Default)]
struct RegistryState {
    /// Types loaded at startup (plus immediate publishes).
    active: FxHashMap<String, TypeDefinition>,
    /// Names held by in-flight submissions, with their file stems.
    reserved: FxHashMap<String, String>,
    /// Published since startup and waiting for a restart.
    pending: FxHashMap<String, TypeDefinition>,
}

impl RegistryState {
    fn is_taken(&self, type_name: &str, stem: &str) -> bool {
        self.active.contains_key(type_name)
            || self.pending.contains_key(type_name)
            || self.reserved.contains_key(type_name)
            || self.active.values().any(|d| d.module_name == stem)
            || self.pending.values().any(|d| d.module_name == stem)
            || self.reserved.values().any(|s| s == stem)
    }
}

/// Catalog of published types, backed by a [`CatalogStore`].
///
/// Shared between submissions behind an `Arc`; all state changes happen
/// under one lock.
pub struct TypeRegistry {
    store: CatalogStore,
    activation: Activation,
    state: Mutex<RegistryState>,
}

impl TypeRegistry {
    /// Load every durable entry into the active catalog.
    ///
    /// # Errors
    /// Fails with `Error::Catalog` if an entry cannot be read back.
    pub fn open(store: CatalogStore, activation: Activation) -> Result<Self> {
        let definitions = store.load()?;
        tracing::info!(
            "Loaded {} type(s) from {}",
            definitions.len(),
            store.root().display()
        );

        let active = definitions
            .into_iter()
            .map(|def| (def.name.clone(), def))
            .collect();

        Ok(Self {
            store,
            activation,
            state: Mutex::new(RegistryState {
                active,
                ..Default::default()
            }),
        })
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    /// Find an active type by canonical name.
    pub fn lookup(&self, type_name: &str) -> Option<TypeDefinition> {
        self.lock().active.get(type_name).cloned()
    }

    /// Whether the name is active, pending, or held by a submission.
    pub fn is_taken(&self, type_name: &str) -> bool {
        self.lock().is_taken(type_name, &module_stem(type_name))
    }

    /// Names of all active types, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.lock().active.keys().cloned().collect();
        names.sort();
        names
    }

    /// Types published since startup that are not yet active.
    pub fn pending_activation(&self) -> Vec<TypeDefinition> {
        let mut pending: Vec<_> = self.lock().pending.values().cloned().collect();
        pending.sort_by(|a, b| a.name.cmp(&b.name));
        pending
    }

    /// Hold `type_name` for one submission.
    ///
    /// # Errors
    /// `InvalidName` if the name or its file stem is already in use.
    pub fn reserve(&self, type_name: &str) -> Result<Reservation<'_>> {
        let stem = module_stem(type_name);
        let mut state = self.lock();

        if state.is_taken(type_name, &stem) || self.store.contains(&stem) {
            return Err(Error::InvalidName {
                name: type_name.to_string(),
                reason: "type name is already taken".to_string(),
            });
        }

        state.reserved.insert(type_name.to_string(), stem.clone());
        tracing::debug!("Reserved {}", type_name);

        Ok(Reservation {
            registry: self,
            type_name: type_name.to_string(),
            module_name: stem,
        })
    }

    /// Durably publish a validated definition under its reservation.
    ///
    /// # Errors
    /// - `InvalidName` if the reservation does not match the definition,
    ///   or the name was published by another process in the meantime.
    /// - `PublishError` if the catalog cannot be written. Nothing is
    ///   left behind in that case.
    pub fn publish(
        &self,
        reservation: Reservation<'_>,
        validated: ValidatedDefinition,
    ) -> Result<PublishReceipt> {
        let def = validated.into_definition();

        if !std::ptr::eq(reservation.registry, self)
            || reservation.type_name != def.type_name
            || reservation.module_name != def.module_name
        {
            return Err(Error::InvalidName {
                name: def.type_name,
                reason: format!("not reserved (reservation is for `{}`)", reservation.type_name),
            });
        }

        let mut state = self.lock();

        if self.store.contains(&def.module_name) {
            return Err(Error::InvalidName {
                name: def.type_name,
                reason: "type name is already taken".to_string(),
            });
        }

        let path = self
            .store
            .write_entry(&def)
            .map_err(|source| Error::Publish {
                name: def.type_name.clone(),
                source,
            })?;

        let entry = TypeDefinition::from(&def);
        state.reserved.remove(&def.type_name);
        let active = match self.activation {
            Activation::Immediate => {
                state.active.insert(def.type_name.clone(), entry);
                true
            }
            Activation::OnRestart => {
                state.pending.insert(def.type_name.clone(), entry);
                false
            }
        };

        tracing::info!("Published {} to {}", def.type_name, path.display());

        Ok(PublishReceipt {
            type_name: def.type_name,
            module_name: def.module_name,
            path,
            active,
        })
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A name held for one in-flight submission.
///
/// Dropping it without publishing releases the name.
#[must_use = "dropping a reservation releases the name"]
pub struct Reservation<'a> {
    registry: &'a TypeRegistry,
    type_name: String,
    module_name: String,
}

impl Reservation<'_> {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if self
            .registry
            .lock()
            .reserved
            .remove(&self.type_name)
            .is_some()
        {
            tracing::debug!("Released {}", self.type_name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::{CompileValidator, Validator, ValidatorConfig};
    use crate::generate::{GeneratedDefinition, TypeSourceGenerator};
    use crate::ident::Canonicalizer;
    use crate::schema::{ReservedNames, SchemaModel, SchemaSubmission};
    use tempfile::TempDir;

    fn validated(store: &CatalogStore, name: &str) -> ValidatedDefinition {
        let schema = SchemaModel::new(
            SchemaSubmission::new(name, [("qty", "int")]),
            &Canonicalizer::default(),
            &ReservedNames::default(),
        )
        .unwrap();
        let def: GeneratedDefinition = TypeSourceGenerator::default().generate(&schema).unwrap();
        CompileValidator::new(ValidatorConfig::embedded())
            .unwrap()
            .validate(&def, store)
            .unwrap()
    }

    fn open(temp: &TempDir, activation: Activation) -> TypeRegistry {
        let store = CatalogStore::open(temp.path()).unwrap();
        TypeRegistry::open(store, activation).unwrap()
    }

    #[test]
    fn test_reserve_is_exclusive() {
        let temp = TempDir::new().unwrap();
        let registry = open(&temp, Activation::OnRestart);

        let held = registry.reserve("Order").unwrap();
        assert!(registry.is_taken("Order"));
        assert!(matches!(
            registry.reserve("Order"),
            Err(Error::InvalidName { .. })
        ));

        drop(held);
        assert!(!registry.is_taken("Order"));
        let _again = registry.reserve("Order").unwrap();
    }

    #[test]
    fn test_publish_on_restart() {
        let temp = TempDir::new().unwrap();
        let registry = open(&temp, Activation::OnRestart);

        let reservation = registry.reserve("Order").unwrap();
        let def = validated(registry.store(), "order");
        let receipt = registry.publish(reservation, def).unwrap();

        assert!(!receipt.active);
        assert!(receipt.path.exists());
        assert!(registry.lookup("Order").is_none());
        assert!(registry.is_taken("Order"));
        assert_eq!(registry.pending_activation().len(), 1);

        let reopened = open(&temp, Activation::OnRestart);
        let def = reopened.lookup("Order").unwrap();
        assert_eq!(def.fields[0].tag, "qty");
        assert_eq!(reopened.names(), vec!["Order".to_string()]);
    }

    #[test]
    fn test_publish_immediate() {
        let temp = TempDir::new().unwrap();
        let registry = open(&temp, Activation::Immediate);

        let reservation = registry.reserve("Order").unwrap();
        let receipt = registry
            .publish(reservation, validated(registry.store(), "order"))
            .unwrap();

        assert!(receipt.active);
        assert!(registry.lookup("Order").is_some());
        assert!(registry.pending_activation().is_empty());
    }

    #[test]
    fn test_publish_requires_matching_reservation() {
        let temp = TempDir::new().unwrap();
        let registry = open(&temp, Activation::OnRestart);

        let reservation = registry.reserve("Invoice").unwrap();
        let err = registry
            .publish(reservation, validated(registry.store(), "order"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidName { .. }));
        assert!(!registry.store().contains("order"));
        assert!(!registry.is_taken("Invoice"));
    }

    #[test]
    fn test_publish_rechecks_durable_store() {
        let temp = TempDir::new().unwrap();
        let registry = open(&temp, Activation::OnRestart);
        let other = open(&temp, Activation::OnRestart);

        let reservation = registry.reserve("Order").unwrap();
        let other_reservation = other.reserve("Order").unwrap();
        other
            .publish(other_reservation, validated(other.store(), "order"))
            .unwrap();

        let err = registry
            .publish(reservation, validated(registry.store(), "order"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidName { .. }));
    }
}
