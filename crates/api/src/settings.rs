//! The live monitor settings value and its backing file.
//!
//! Each cycle and request works on a cloned snapshot from
//! [`SettingsHandle::current`]. Updates are validated as a whole and
//! installed at once; [`SettingsHandle::merge`] applies a partial update over
//! the current value.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use diskwarden_core::error::CoreError;
use diskwarden_core::settings::MonitorSettings;
use serde_json::{Map, Value};
use tokio::sync::{RwLock, RwLockWriteGuard};

#[derive(Clone)]
pub struct SettingsHandle {
    inner: Arc<RwLock<MonitorSettings>>,
    /// `None` keeps settings in memory only.
    path: Option<PathBuf>,
}

impl SettingsHandle {
    /// Load from `path`. A missing or invalid file yields the defaults.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = read_file(&path).await;
        Self {
            inner: Arc::new(RwLock::new(settings)),
            path: Some(path),
        }
    }

    pub fn in_memory(settings: MonitorSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
            path: None,
        }
    }

    pub async fn current(&self) -> MonitorSettings {
        self.inner.read().await.clone()
    }

    /// Validate and install `settings`, then write the file best-effort.
    pub async fn replace(&self, settings: MonitorSettings) -> Result<MonitorSettings, CoreError> {
        settings.validate()?;
        let guard = self.inner.write().await;
        Ok(self.install(guard, settings).await)
    }

    /// Overlay the top-level fields of `patch` on the current settings.
    ///
    /// Fields absent from `patch` keep their current value; an explicit
    /// `null` clears an optional field.
    pub async fn merge(&self, patch: Map<String, Value>) -> Result<MonitorSettings, CoreError> {
        let guard = self.inner.write().await;
        let Value::Object(mut fields) =
            serde_json::to_value(&*guard).map_err(|e| CoreError::Internal(e.to_string()))?
        else {
            return Err(CoreError::Internal("settings did not serialize to an object".to_string()));
        };
        fields.extend(patch);

        let settings: MonitorSettings = serde_json::from_value(Value::Object(fields))
            .map_err(|e| CoreError::Validation(format!("invalid settings: {e}")))?;
        settings.validate()?;
        Ok(self.install(guard, settings).await)
    }

    /// The write guard is held until the file is written so concurrent
    /// updates reach the file in the order they were applied.
    async fn install(
        &self,
        mut guard: RwLockWriteGuard<'_, MonitorSettings>,
        settings: MonitorSettings,
    ) -> MonitorSettings {
        *guard = settings.clone();

        if let Some(path) = &self.path {
            if let Err(e) = write_file(path, &settings).await {
                tracing::error!(path = %path.display(), error = %e, "Failed to save settings file");
            }
        }
        drop(guard);

        tracing::info!(
            threshold = settings.health_threshold,
            cooldown_minutes = settings.alert_cooldown_minutes,
            interval_secs = settings.scan_interval_seconds,
            "Monitor settings updated"
        );
        settings
    }
}

async fn read_file(path: &Path) -> MonitorSettings {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "No settings file, using defaults");
            return MonitorSettings::default();
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Unreadable settings file, using defaults");
            return MonitorSettings::default();
        }
    };

    let parsed = serde_json::from_str::<MonitorSettings>(&raw)
        .map_err(|e| e.to_string())
        .and_then(|s| s.validate().map(|()| s).map_err(|e| e.to_string()));
    match parsed {
        Ok(settings) => {
            tracing::info!(path = %path.display(), "Loaded monitor settings");
            settings
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Invalid settings file, using defaults");
            MonitorSettings::default()
        }
    }
}

async fn write_file(path: &Path, settings: &MonitorSettings) -> std::io::Result<()> {
    let json = serde_json::to_vec_pretty(settings)?;
    tokio::fs::write(path, json).await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
