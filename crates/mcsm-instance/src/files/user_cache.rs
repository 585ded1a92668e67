//! `usercache.json`: the server's name/uuid cache. Only the server writes it.

use chrono::{DateTime, FixedOffset};
use mcsm_core::{CollectionDocument, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedUser {
    pub name: String,
    pub uuid: String,
    #[serde(with = "expires_format")]
    pub expires_on: DateTime<FixedOffset>,
}

impl CachedUser {
    pub fn is_expired_at(&self, now: DateTime<FixedOffset>) -> bool {
        self.expires_on <= now
    }
}

/// `2018-10-01 12:00:00 +0000`, as the server writes it.
mod expires_format {
    use chrono::{DateTime, FixedOffset};
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

    pub fn serialize<S>(value: &DateTime<FixedOffset>, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(d: D) -> Result<DateTime<FixedOffset>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

pub struct UserCacheFile {
    users: CollectionDocument<CachedUser>,
}

impl UserCacheFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            users: CollectionDocument::json(path, ["uuid", "name"])
                .empty_when_missing()
                .read_only(),
        }
    }

    pub fn path(&self) -> &Path {
        self.users.path()
    }

    pub async fn read(&self) -> Result<Vec<CachedUser>> {
        self.users.reload().await
    }

    pub async fn find_by_uuid(&self, uuid: &str) -> Result<Option<CachedUser>> {
        Ok(self.read().await?.into_iter().find(|user| user.uuid == uuid))
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<CachedUser>> {
        Ok(self
            .read()
            .await?
            .into_iter()
            .find(|user| user.name.eq_ignore_ascii_case(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcsm_core::McsmError;
    use tempfile::TempDir;

    const CACHE: &str = r#"[
  {"name":"Notch","uuid":"069a79f4-44e9-4726-a5be-fca90e38aaf5","expiresOn":"2018-10-01 12:00:00 +0000"}
]"#;

    #[tokio::test]
    async fn test_lookup_and_expiry() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("usercache.json");
        std::fs::write(&path, CACHE).unwrap();

        let cache = UserCacheFile::new(&path);
        let notch = cache.find_by_name("notch").await.unwrap().unwrap();
        assert_eq!(notch.uuid, "069a79f4-44e9-4726-a5be-fca90e38aaf5");
        assert!(cache.find_by_uuid("nope").await.unwrap().is_none());

        let later = DateTime::parse_from_rfc3339("2019-01-01T00:00:00+00:00").unwrap();
        assert!(notch.is_expired_at(later));
    }

    #[tokio::test]
    async fn test_cache_is_read_only() {
        let temp_dir = TempDir::new().unwrap();
        let cache = UserCacheFile::new(temp_dir.path().join("usercache.json"));
        assert!(cache.read().await.unwrap().is_empty());

        let err = cache.users.write(Vec::new()).await.unwrap_err();
        assert!(matches!(err, McsmError::ReadOnly(_)));
    }

    #[test]
    fn test_cache_is_keyed_by_uuid_and_name() {
        let cache = UserCacheFile::new("usercache.json");
        assert_eq!(cache.users.unique_keys(), ["uuid", "name"]);
    }
}
