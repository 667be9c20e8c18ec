//! Light/dark theme preference.
//!
//! Persisted under the `theme-storage` key in the same envelope the web
//! storefront uses: `{"state":{"theme":"dark"},"version":0}`.

use core::fmt;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::storage::{KeyValueStore, keys};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(format!("unknown theme '{other}' (expected light or dark)")),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct Persisted {
    state: PersistedState,
    #[serde(default)]
    version: u32,
}

#[derive(Serialize, Deserialize)]
struct PersistedState {
    theme: Theme,
}

/// Current theme, restored from storage at startup.
pub struct ThemeStore {
    theme: RwLock<Theme>,
    storage: Arc<dyn KeyValueStore>,
}

impl ThemeStore {
    /// Read the persisted preference. Missing or unreadable values mean light.
    #[must_use]
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let theme = match storage.get(keys::THEME) {
            Ok(Some(raw)) => serde_json::from_str::<Persisted>(&raw)
                .map(|p| p.state.theme)
                .unwrap_or_else(|e| {
                    warn!(error = %e, "ignoring unreadable theme preference");
                    Theme::default()
                }),
            Ok(None) => Theme::default(),
            Err(e) => {
                warn!(error = %e, "failed to read theme preference");
                Theme::default()
            }
        };
        debug!(%theme, "theme loaded");
        Self {
            theme: RwLock::new(theme),
            storage,
        }
    }

    #[must_use]
    pub fn current(&self) -> Theme {
        *self.theme.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Switch between light and dark, returning the new theme.
    pub fn toggle(&self) -> Theme {
        let next = {
            let mut theme = self.theme.write().unwrap_or_else(PoisonError::into_inner);
            *theme = theme.toggled();
            *theme
        };
        self.persist(next);
        next
    }

    pub fn set(&self, theme: Theme) {
        *self.theme.write().unwrap_or_else(PoisonError::into_inner) = theme;
        self.persist(theme);
    }

    fn persist(&self, theme: Theme) {
        let persisted = Persisted {
            state: PersistedState { theme },
            version: 0,
        };
        let result = serde_json::to_string(&persisted)
            .map_err(|e| e.to_string())
            .and_then(|raw| {
                self.storage
                    .set(keys::THEME, &raw)
                    .map_err(|e| e.to_string())
            });
        if let Err(e) = result {
            warn!(error = %e, "failed to persist theme preference");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_defaults_to_light() {
        let store = ThemeStore::load(Arc::new(MemoryStore::new()));
        assert_eq!(store.current(), Theme::Light);
    }

    #[test]
    fn test_toggle_persists_across_loads() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let store = ThemeStore::load(Arc::clone(&storage));
        assert_eq!(store.toggle(), Theme::Dark);

        assert_eq!(
            storage.get(keys::THEME).unwrap().as_deref(),
            Some(r#"{"state":{"theme":"dark"},"version":0}"#)
        );
        assert_eq!(ThemeStore::load(storage).current(), Theme::Dark);
    }

    #[test]
    fn test_garbage_preference_reads_as_light() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        storage.set(keys::THEME, "purple").unwrap();
        assert_eq!(ThemeStore::load(storage).current(), Theme::Light);
    }

    #[test]
    fn test_parse_theme() {
        assert_eq!("Dark".parse::<Theme>().unwrap(), Theme::Dark);
        assert!("sepia".parse::<Theme>().is_err());
    }
}
