//! Typed key/value store backing a backend's runtime options.
//!
//! Keys are declared up front with the [`OptionKind`] they accept and an optional value check.
//! Undeclared keys are rejected, values of the wrong kind are rejected, and a declared key
//! without a default reads as [`OptionError::Unset`] until it is set.
use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use qd_model::{HostPool, OptionKind, OptionValue};
use tracing::trace;

use crate::{backend::Configurable, error::OptionError};

type Check = Box<dyn Fn(&OptionValue) -> Result<(), String> + Send + Sync>;

struct Declared {
    kind: OptionKind,
    check: Option<Check>,
}

/// Declared option keys plus their current values.
pub struct OptionRegistry {
    declared: HashMap<&'static str, Declared>,
    values: RwLock<HashMap<&'static str, OptionValue>>,
}

impl OptionRegistry {
    pub fn new() -> Self {
        Self {
            declared: HashMap::new(),
            values: RwLock::new(HashMap::new()),
        }
    }

    /// Accept `key` with values of `kind`.
    pub fn declare(mut self, key: &'static str, kind: OptionKind) -> Self {
        self.declared.insert(key, Declared { kind, check: None });
        self
    }

    /// Accept `key` with values of `kind` that also pass `check`.
    pub fn declare_checked<F>(mut self, key: &'static str, kind: OptionKind, check: F) -> Self
    where
        F: Fn(&OptionValue) -> Result<(), String> + Send + Sync + 'static,
    {
        self.declared.insert(
            key,
            Declared {
                kind,
                check: Some(Box::new(check)),
            },
        );
        self
    }

    /// Seed a value for an already declared key. Undeclared keys are ignored.
    pub fn with_default(self, key: &'static str, value: impl Into<OptionValue>) -> Self {
        if self.declared.contains_key(key) {
            self.write().insert(key, value.into());
        }
        self
    }

    pub fn has(&self, key: &str) -> bool {
        self.declared.contains_key(key)
    }

    /// Declared keys, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.declared.keys().copied()
    }

    pub fn set(&self, key: &str, value: OptionValue) -> Result<(), OptionError> {
        let (&key, declared) = self
            .declared
            .get_key_value(key)
            .ok_or_else(|| OptionError::UnknownKey(key.to_string()))?;

        if value.kind() != declared.kind {
            return Err(OptionError::TypeMismatch {
                key: key.to_string(),
                expected: declared.kind,
                found: value.kind(),
            });
        }
        if let Some(check) = &declared.check {
            check(&value).map_err(|reason| OptionError::InvalidValue {
                key: key.to_string(),
                reason,
            })?;
        }

        trace!(target: "qd.core.options", key, ?value, "option set");
        self.write().insert(key, value);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<OptionValue, OptionError> {
        if !self.has(key) {
            return Err(OptionError::UnknownKey(key.to_string()));
        }
        self.read()
            .get(key)
            .cloned()
            .ok_or_else(|| OptionError::Unset(key.to_string()))
    }

    /// Remove the stored value of a declared key.
    pub fn unset(&self, key: &str) {
        self.write().remove(key);
    }

    /// Current string value, if set.
    pub fn string(&self, key: &str) -> Option<String> {
        self.read()
            .get(key)
            .and_then(|v| v.as_str().map(str::to_string))
    }

    /// Current integer value, if set.
    pub fn int(&self, key: &str) -> Option<i64> {
        self.read().get(key).and_then(OptionValue::as_int)
    }

    /// Current host pool value, if set.
    pub fn host_pool(&self, key: &str) -> Option<HostPool> {
        self.read()
            .get(key)
            .and_then(|v| v.as_host_pool().cloned())
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<&'static str, OptionValue>> {
        self.values.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<&'static str, OptionValue>> {
        self.values.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for OptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionRegistry")
            .field("values", &*self.read())
            .finish_non_exhaustive()
    }
}

impl Configurable for OptionRegistry {
    fn set_option(&self, key: &str, value: OptionValue) -> Result<(), OptionError> {
        self.set(key, value)
    }

    fn get_option(&self, key: &str) -> Result<OptionValue, OptionError> {
        self.get(key)
    }

    fn has_option(&self, key: &str) -> bool {
        self.has(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> OptionRegistry {
        OptionRegistry::new()
            .declare("QUEUE", OptionKind::Str)
            .declare_checked("NUM_CPU", OptionKind::Int, |v| match v.as_int() {
                Some(n) if n >= 1 => Ok(()),
                _ => Err("must be at least 1".into()),
            })
            .declare("HOSTS", OptionKind::HostPool)
            .with_default("NUM_CPU", 1_i64)
    }

    #[test]
    fn set_and_get_declared_key() {
        let reg = registry();
        reg.set("QUEUE", "normal".into()).unwrap();

        assert_eq!(reg.get("QUEUE").unwrap(), OptionValue::from("normal"));
        assert_eq!(reg.string("QUEUE").as_deref(), Some("normal"));
    }

    #[test]
    fn default_is_visible_before_set() {
        let reg = registry();
        assert_eq!(reg.int("NUM_CPU"), Some(1));
    }

    #[test]
    fn unknown_key_is_rejected() {
        let reg = registry();
        assert!(!reg.has("LSF_MEMORY"));
        assert_eq!(
            reg.set("LSF_MEMORY", 1_i64.into()),
            Err(OptionError::UnknownKey("LSF_MEMORY".into()))
        );
        assert_eq!(
            reg.get("LSF_MEMORY"),
            Err(OptionError::UnknownKey("LSF_MEMORY".into()))
        );
    }

    #[test]
    fn wrong_kind_is_rejected() {
        let reg = registry();
        let err = reg.set("QUEUE", 3_i64.into()).unwrap_err();
        assert_eq!(
            err,
            OptionError::TypeMismatch {
                key: "QUEUE".into(),
                expected: OptionKind::Str,
                found: OptionKind::Int,
            }
        );
        assert!(matches!(reg.get("QUEUE"), Err(OptionError::Unset(_))));
    }

    #[test]
    fn check_rejects_invalid_value_and_keeps_old_one() {
        let reg = registry();
        let err = reg.set("NUM_CPU", 0_i64.into()).unwrap_err();
        assert!(matches!(err, OptionError::InvalidValue { .. }));
        assert_eq!(reg.int("NUM_CPU"), Some(1));
    }

    #[test]
    fn unset_clears_value() {
        let reg = registry();
        reg.set("HOSTS", HostPool::new().with_host("a", 1).into())
            .unwrap();
        assert!(reg.host_pool("HOSTS").is_some());

        reg.unset("HOSTS");
        assert!(reg.host_pool("HOSTS").is_none());
    }
}
