//! Persisted user settings.

use crate::error::DatabaseError;
use crate::types::{Quality, UserSettings};
use crate::{Error, Result};
use std::collections::HashMap;

use super::Database;

const KEY_DEFAULT_QUALITY: &str = "default_quality";
const KEY_EMBED_THUMBNAIL: &str = "embed_thumbnail";
const KEY_AUTO_ZIP: &str = "auto_zip";
const KEY_MAX_HISTORY: &str = "max_history";

impl Database {
    /// Load user settings, falling back to defaults for missing keys
    ///
    /// Unparseable values are treated as absent rather than failing the
    /// load, so a hand-edited database cannot brick startup.
    pub async fn load_settings(&self) -> Result<UserSettings> {
        let rows: Vec<(String, String)> = sqlx::query_as("SELECT key, value FROM settings")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to load settings: {}",
                    e
                )))
            })?;

        let values: HashMap<String, String> = rows.into_iter().collect();
        let mut settings = UserSettings::default();

        if let Some(quality) = values
            .get(KEY_DEFAULT_QUALITY)
            .and_then(|v| v.parse::<Quality>().ok())
        {
            settings.default_quality = quality;
        }
        if let Some(embed) = values.get(KEY_EMBED_THUMBNAIL) {
            settings.embed_thumbnail = embed == "true";
        }
        if let Some(auto_zip) = values.get(KEY_AUTO_ZIP) {
            settings.auto_zip = auto_zip == "true";
        }
        if let Some(max_history) = values
            .get(KEY_MAX_HISTORY)
            .and_then(|v| v.parse::<usize>().ok())
        {
            settings.max_history = max_history;
        }

        Ok(settings)
    }

    /// Persist the full settings snapshot
    pub async fn store_settings(&self, settings: &UserSettings) -> Result<()> {
        self.set_setting(KEY_DEFAULT_QUALITY, &settings.default_quality.to_string())
            .await?;
        self.set_setting(KEY_EMBED_THUMBNAIL, bool_str(settings.embed_thumbnail))
            .await?;
        self.set_setting(KEY_AUTO_ZIP, bool_str(settings.auto_zip))
            .await?;
        self.set_setting(KEY_MAX_HISTORY, &settings.max_history.to_string())
            .await?;

        Ok(())
    }

    /// Upsert one settings key
    async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = ?, updated_at = ?
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(now)
        .bind(value)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to store setting {}: {}",
                key, e
            )))
        })?;

        Ok(())
    }
}

fn bool_str(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}
