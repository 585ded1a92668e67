//! Pre-write validation layers.
//!
//! A validator runs before anything is cached or written; a rejection
//! leaves both the cache and the file untouched.

use crate::{McsmError, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Accepts or rejects a value before it is written.
pub trait Validator<T>: Send + Sync {
    fn validate(&self, value: &T) -> Result<()>;
}

impl<T, F> Validator<T> for F
where
    F: Fn(&T) -> Result<()> + Send + Sync,
{
    fn validate(&self, value: &T) -> Result<()> {
        self(value)
    }
}

/// Accepts every value.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl<T> Validator<T> for AcceptAll {
    fn validate(&self, _value: &T) -> Result<()> {
        Ok(())
    }
}

/// Values that can be "absent" at the top level.
pub trait Presence {
    fn is_present(&self) -> bool;
}

impl Presence for bool {
    fn is_present(&self) -> bool {
        *self
    }
}

impl Presence for String {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

impl Presence for Vec<u8> {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

impl<T> Presence for Option<T> {
    fn is_present(&self) -> bool {
        self.is_some()
    }
}

impl<K, V> Presence for BTreeMap<K, V> {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

impl<K, V, S> Presence for HashMap<K, V, S> {
    fn is_present(&self) -> bool {
        !self.is_empty()
    }
}

impl Presence for serde_json::Value {
    fn is_present(&self) -> bool {
        match self {
            serde_json::Value::Null => false,
            serde_json::Value::Bool(b) => *b,
            serde_json::Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }
}

/// Default validator: rejects empty or falsy top-level values.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequirePresent;

impl<T: Presence> Validator<T> for RequirePresent {
    fn validate(&self, value: &T) -> Result<()> {
        if value.is_present() {
            Ok(())
        } else {
            Err(McsmError::validation("value", "a value is required"))
        }
    }
}

/// Rejects collections where two records share a value on any declared key.
///
/// Records are looked up through their serialized JSON form, so any
/// `Serialize` record works without extra trait impls. A record that lacks
/// the key is skipped for that key.
#[derive(Debug, Clone)]
pub struct UniqueKeys {
    collection: String,
    keys: Vec<String>,
}

impl UniqueKeys {
    pub fn new<I, S>(collection: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            collection: collection.into(),
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

impl<T: Serialize> Validator<Vec<T>> for UniqueKeys {
    fn validate(&self, collection: &Vec<T>) -> Result<()> {
        if self.keys.is_empty() {
            return Ok(());
        }

        let mut seen: Vec<Vec<serde_json::Value>> = vec![Vec::new(); self.keys.len()];
        for item in collection {
            let item = serde_json::to_value(item)?;
            for (key, seen_values) in self.keys.iter().zip(seen.iter_mut()) {
                let Some(value) = item.get(key) else {
                    continue;
                };
                if seen_values.contains(value) {
                    return Err(McsmError::Duplicate {
                        collection: self.collection.clone(),
                        key: key.clone(),
                        value: match value {
                            serde_json::Value::String(s) => s.clone(),
                            other => other.to_string(),
                        },
                    });
                }
                seen_values.push(value.clone());
            }
        }
        Ok(())
    }
}

/// Runs validators in order, stopping at the first rejection.
pub struct AllOf<T> {
    validators: Vec<Box<dyn Validator<T>>>,
}

impl<T> AllOf<T> {
    pub fn new() -> Self {
        Self {
            validators: Vec::new(),
        }
    }

    pub fn with(mut self, validator: impl Validator<T> + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }
}

impl<T> Default for AllOf<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Validator<T> for AllOf<T> {
    fn validate(&self, value: &T) -> Result<()> {
        self.validators.iter().try_for_each(|v| v.validate(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Player {
        uuid: String,
        name: String,
    }

    fn player(uuid: &str, name: &str) -> Player {
        Player {
            uuid: uuid.into(),
            name: name.into(),
        }
    }

    #[test]
    fn test_require_present() {
        assert!(RequirePresent.validate(&true).is_ok());
        assert!(RequirePresent.validate(&false).is_err());
        assert!(RequirePresent.validate(&String::new()).is_err());
        assert!(RequirePresent.validate(&None::<u32>).is_err());
        assert!(RequirePresent.validate(&serde_json::Value::Null).is_err());
        assert!(RequirePresent.validate(&serde_json::json!([])).is_ok());
    }

    #[test]
    fn test_unique_keys_reports_first_repeat() {
        let validator = UniqueKeys::new("whitelist.json", ["uuid", "name"]);
        let players = vec![player("1", "alice"), player("2", "bob"), player("3", "alice")];
        match validator.validate(&players).unwrap_err() {
            McsmError::Duplicate {
                collection,
                key,
                value,
            } => {
                assert_eq!(collection, "whitelist.json");
                assert_eq!(key, "name");
                assert_eq!(value, "alice");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unique_keys_allows_empty_and_distinct() {
        let validator = UniqueKeys::new("ops.json", ["uuid"]);
        assert!(validator.validate(&Vec::<Player>::new()).is_ok());
        assert!(validator
            .validate(&vec![player("1", "a"), player("2", "a")])
            .is_ok());
    }

    #[test]
    fn test_closure_and_all_of() {
        let validator = AllOf::new()
            .with(RequirePresent)
            .with(|s: &String| {
                if s.len() > 3 {
                    Err(McsmError::validation("name", "too long"))
                } else {
                    Ok(())
                }
            });
        assert!(validator.validate(&"abc".to_string()).is_ok());
        assert!(validator.validate(&"abcd".to_string()).is_err());
        assert!(validator.validate(&String::new()).is_err());
    }
}
