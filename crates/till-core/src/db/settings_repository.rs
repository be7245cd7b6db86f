//! Settings repository implementation

use libsql::Connection;

use crate::error::Result;
use crate::models::StoreProfile;

const STORE_PROFILE_KEY: &str = "store_profile";

/// Trait for settings storage operations (async)
#[allow(async_fn_in_trait)]
pub trait SettingsRepository {
    /// Load a raw setting value
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Persist a raw setting value
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Load the persisted store profile, if the device is signed in
    async fn load_store_profile(&self) -> Result<Option<StoreProfile>>;

    /// Persist the active store profile
    async fn save_store_profile(&self, profile: &StoreProfile) -> Result<()>;
}

/// libSQL implementation of `SettingsRepository`
pub struct LibSqlSettingsRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlSettingsRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl SettingsRepository for LibSqlSettingsRepository<'_> {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM settings WHERE key = ?", [key])
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)",
                [key, value],
            )
            .await?;
        Ok(())
    }

    async fn load_store_profile(&self) -> Result<Option<StoreProfile>> {
        match self.get(STORE_PROFILE_KEY).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn save_store_profile(&self, profile: &StoreProfile) -> Result<()> {
        self.set(STORE_PROFILE_KEY, &serde_json::to_string(profile)?)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use pretty_assertions::assert_eq;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_get_missing_key() {
        let db = setup().await;
        let repo = LibSqlSettingsRepository::new(db.connection());
        assert_eq!(repo.get("nope").await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_store_profile_round_trip() {
        let db = setup().await;
        let repo = LibSqlSettingsRepository::new(db.connection());

        assert!(repo.load_store_profile().await.unwrap().is_none());

        let profile = StoreProfile::new("store-1", "Warung Sinar", 11.0);
        repo.save_store_profile(&profile).await.unwrap();

        let loaded = repo.load_store_profile().await.unwrap().unwrap();
        assert_eq!(loaded, profile);
    }
}
