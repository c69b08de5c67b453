//! Local draft store: migrations, the key-value table, and draft
//! save / load / clear.
//!
//! Each in-progress registration occupies up to four keys, namespaced per
//! client and registrant type so that switching type never touches another
//! type's draft:
//!
//! | Key                              | Value                          |
//! |----------------------------------|--------------------------------|
//! | `{client}:{type}-registration`   | draft JSON                     |
//! | `…-step`                         | current step index             |
//! | `…-token`                        | verification token from OTP    |
//! | `…-id`                           | backend registration id        |
//!
//! Writes are last-write-wins; there is no merge.

use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use reunion_wizard::{RegistrantType, RegistrationDraft};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tracing::{info, warn};

use crate::errors::Result;

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };
    let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);

    // An in-memory database lives and dies with its single connection.
    let pool = if url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?
    };

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

/// Storage namespace of one wizard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DraftKey(String);

impl DraftKey {
    pub fn new(client: &str, kind: RegistrantType) -> Self {
        Self(format!("{client}:{}-registration", kind.as_str()))
    }

    pub fn draft(&self) -> &str {
        &self.0
    }

    pub fn step(&self) -> String {
        format!("{}-step", self.0)
    }

    pub fn token(&self) -> String {
        format!("{}-token", self.0)
    }

    pub fn id(&self) -> String {
        format!("{}-id", self.0)
    }

    /// Every key belonging to this draft.
    pub fn all(&self) -> [String; 4] {
        [self.0.clone(), self.step(), self.token(), self.id()]
    }
}

/// A draft as found in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedDraft {
    pub draft: RegistrationDraft,
    pub step: usize,
    pub verification_token: Option<String>,
    pub registration_id: Option<String>,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DraftStore {
    pool: SqlitePool,
}

impl DraftStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ─────────────────────────────────────────────────────────
    // Raw key-value access
    // ─────────────────────────────────────────────────────────

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv_store WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(v,)| v))
    }

    async fn get_with_time(&self, key: &str) -> Result<Option<(String, i64)>> {
        let row: Option<(String, i64)> =
            sqlx::query_as("SELECT value, updated_at FROM kv_store WHERE key = ?1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row)
    }

    pub async fn put(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete(&self, keys: &[String]) -> Result<()> {
        for key in keys {
            sqlx::query("DELETE FROM kv_store WHERE key = ?1")
                .bind(key)
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────
    // Drafts
    // ─────────────────────────────────────────────────────────

    /// Persist the draft and its step index in one transaction.
    pub async fn save(&self, key: &DraftKey, draft: &RegistrationDraft, step: usize) -> Result<()> {
        let json = serde_json::to_string(draft)?;
        let now = Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;
        for (k, v) in [(key.draft().to_string(), json), (key.step(), step.to_string())] {
            sqlx::query(
                r#"
                INSERT INTO kv_store (key, value, updated_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                "#,
            )
            .bind(k)
            .bind(v)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Persist only the step index (backward navigation).
    pub async fn save_step(&self, key: &DraftKey, step: usize) -> Result<()> {
        self.put(&key.step(), &step.to_string()).await
    }

    /// Cache the server-issued token and id used to resume progressive saves.
    pub async fn save_credentials(
        &self,
        key: &DraftKey,
        verification_token: Option<&str>,
        registration_id: Option<&str>,
    ) -> Result<()> {
        if let Some(token) = verification_token {
            self.put(&key.token(), token).await?;
        }
        if let Some(id) = registration_id {
            self.put(&key.id(), id).await?;
        }
        Ok(())
    }

    /// Load a saved draft.
    ///
    /// A draft that no longer parses counts as no draft: the corrupt
    /// entries are removed and `None` is returned. A bad step index falls
    /// back to the first step.
    pub async fn load(&self, key: &DraftKey) -> Result<Option<SavedDraft>> {
        let Some((raw, updated_at)) = self.get_with_time(key.draft()).await? else {
            return Ok(None);
        };

        let draft: RegistrationDraft = match serde_json::from_str(&raw) {
            Ok(draft) => draft,
            Err(e) => {
                warn!("Discarding corrupt draft `{}`: {e}", key.draft());
                self.delete(&[key.draft().to_string(), key.step()]).await?;
                return Ok(None);
            }
        };

        let step = match self.get(&key.step()).await? {
            None => 0,
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!("Ignoring corrupt step index `{raw}` for `{}`", key.draft());
                0
            }),
        };

        Ok(Some(SavedDraft {
            draft,
            step,
            verification_token: self.get(&key.token()).await?,
            registration_id: self.get(&key.id()).await?,
            saved_at: Utc
                .timestamp_opt(updated_at, 0)
                .single()
                .unwrap_or_else(Utc::now),
        }))
    }

    /// Remove the draft, its step and any cached server credentials.
    pub async fn clear(&self, key: &DraftKey) -> Result<()> {
        self.delete(&key.all()).await
    }
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
