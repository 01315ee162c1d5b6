// SPDX-License-Identifier: MIT OR Apache-2.0
//! Table of custom permissions keyed by string.

use modgate_error::{ErrorCode, GateError};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

/// An application-defined capability.
///
/// Equality and hashing are by identity: two handles are equal only when
/// they came from the same registration.
#[derive(Clone)]
pub struct CustomPermission(Arc<str>);

impl CustomPermission {
    /// The key the permission was registered under.
    pub fn key(&self) -> &str {
        &self.0
    }
}

impl PartialEq for CustomPermission {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for CustomPermission {}

impl Hash for CustomPermission {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0).cast::<u8>(), state);
    }
}

impl fmt::Debug for CustomPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CustomPermission").field(&self.key()).finish()
    }
}

impl fmt::Display for CustomPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Lookup failure on the strict path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No permission was registered under `key`.
    #[error("custom permission `{key}` is not registered")]
    NotFound {
        /// The missing key.
        key: String,
    },
}

impl From<RegistryError> for GateError {
    fn from(err: RegistryError) -> Self {
        let RegistryError::NotFound { ref key } = err;
        GateError::new(ErrorCode::PermissionNotFound, err.to_string()).with_context("key", key)
    }
}

/// Registry of [`CustomPermission`]s.
///
/// Populated once by the embedding system at startup and then shared
/// read-mostly behind an `Arc`.
#[derive(Default)]
pub struct PermissionRegistry {
    permissions: RwLock<HashMap<String, CustomPermission>>,
}

impl PermissionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `key`, returning the existing object if it is already known.
    pub fn register(&self, key: &str) -> CustomPermission {
        if let Some(p) = self.try_resolve(key) {
            return p;
        }
        let mut map = self
            .permissions
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        map.entry(key.to_string())
            .or_insert_with(|| CustomPermission(Arc::from(key)))
            .clone()
    }

    /// Register every key in `keys`.
    pub fn register_all<'k>(&self, keys: impl IntoIterator<Item = &'k str>) {
        for key in keys {
            self.register(key);
        }
    }

    /// Look up `key`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] if the key was never registered.
    pub fn resolve(&self, key: &str) -> Result<CustomPermission, RegistryError> {
        self.try_resolve(key).ok_or_else(|| RegistryError::NotFound {
            key: key.to_string(),
        })
    }

    /// Look up `key`, returning `None` when it is unknown.
    pub fn try_resolve(&self, key: &str) -> Option<CustomPermission> {
        self.permissions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Whether `key` is registered.
    pub fn contains(&self, key: &str) -> bool {
        self.permissions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// Sorted list of registered keys.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .permissions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// Number of registered permissions.
    pub fn len(&self) -> usize {
        self.permissions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for PermissionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermissionRegistry")
            .field("keys", &self.keys())
            .finish()
    }
}
