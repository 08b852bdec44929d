//! Theme preference
//!
//! `mode` is what the user picked; `resolved` is what gets rendered. In
//! `Auto` mode the resolved theme follows the last observed system theme.
//! The mode survives restarts under the `theme-mode` key.

use std::fmt;
use std::str::FromStr;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::storage::LocalStore;

pub const THEME_STORAGE_KEY: &str = "theme-mode";
pub const THEME_ATTRIBUTE: &str = "data-theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    Dark,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolvedTheme {
    Light,
    Dark,
}

impl ResolvedTheme {
    pub fn as_str(self) -> &'static str {
        match self {
            ResolvedTheme::Light => "light",
            ResolvedTheme::Dark => "dark",
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            ResolvedTheme::Light => ResolvedTheme::Dark,
            ResolvedTheme::Dark => ResolvedTheme::Light,
        }
    }
}

impl From<ResolvedTheme> for ThemeMode {
    fn from(theme: ResolvedTheme) -> Self {
        match theme {
            ResolvedTheme::Light => ThemeMode::Light,
            ResolvedTheme::Dark => ThemeMode::Dark,
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
            ThemeMode::Auto => "auto",
        };
        f.write_str(s)
    }
}

impl FromStr for ThemeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(ThemeMode::Light),
            "dark" => Ok(ThemeMode::Dark),
            "auto" | "system" => Ok(ThemeMode::Auto),
            other => Err(format!("unknown theme mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeState {
    pub mode: ThemeMode,
    pub resolved: ResolvedTheme,
    pub system: ResolvedTheme,
}

impl Default for ThemeState {
    fn default() -> Self {
        Self {
            mode: ThemeMode::Auto,
            resolved: ResolvedTheme::Light,
            system: ResolvedTheme::Light,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeAction {
    SetMode(ThemeMode),
    SetSystemTheme(ResolvedTheme),
    Resolve,
}

fn resolve(mode: ThemeMode, system: ResolvedTheme) -> ResolvedTheme {
    match mode {
        ThemeMode::Light => ResolvedTheme::Light,
        ThemeMode::Dark => ResolvedTheme::Dark,
        ThemeMode::Auto => system,
    }
}

/// Pure transition function
pub fn reduce(state: ThemeState, action: ThemeAction) -> ThemeState {
    match action {
        ThemeAction::SetMode(mode) => ThemeState {
            mode,
            resolved: resolve(mode, state.system),
            ..state
        },
        ThemeAction::SetSystemTheme(system) => ThemeState {
            system,
            resolved: resolve(state.mode, system),
            ..state
        },
        ThemeAction::Resolve => ThemeState {
            resolved: resolve(state.mode, state.system),
            ..state
        },
    }
}

/// Theme state with persistence and change notification
#[derive(Debug)]
pub struct ThemeStore {
    store: LocalStore,
    state: RwLock<ThemeState>,
    tx: watch::Sender<ThemeState>,
}

impl ThemeStore {
    /// Restore the saved mode on top of the current system theme
    pub fn load(store: LocalStore, system: ResolvedTheme) -> Self {
        let mut state = reduce(ThemeState::default(), ThemeAction::SetSystemTheme(system));

        match store.get::<String>(THEME_STORAGE_KEY) {
            Ok(Some(saved)) => match saved.parse::<ThemeMode>() {
                Ok(mode) => state = reduce(state, ThemeAction::SetMode(mode)),
                Err(e) => tracing::warn!(value = %saved, error = %e, "Ignoring saved theme"),
            },
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to read saved theme"),
        }

        let (tx, _) = watch::channel(state);
        Self {
            store,
            state: RwLock::new(state),
            tx,
        }
    }

    pub fn state(&self) -> ThemeState {
        *self.state.read()
    }

    pub fn subscribe(&self) -> watch::Receiver<ThemeState> {
        self.tx.subscribe()
    }

    /// Apply an action; mode changes are persisted
    pub fn dispatch(&self, action: ThemeAction) -> ThemeState {
        let next = {
            let mut state = self.state.write();
            *state = reduce(*state, action);
            self.tx.send_replace(*state);
            *state
        };

        if let ThemeAction::SetMode(mode) = action
            && let Err(e) = self.store.set(THEME_STORAGE_KEY, &mode.to_string())
        {
            // the in-memory preference still applies for this run
            tracing::warn!(error = %e, "Failed to save theme mode");
        }

        tracing::debug!(mode = %next.mode, resolved = next.resolved.as_str(), "Theme updated");
        next
    }

    pub fn set_mode(&self, mode: ThemeMode) -> ThemeState {
        self.dispatch(ThemeAction::SetMode(mode))
    }

    /// Called when the OS preference changes
    pub fn set_system_theme(&self, theme: ResolvedTheme) -> ThemeState {
        self.dispatch(ThemeAction::SetSystemTheme(theme))
    }

    /// Switch to the opposite of what is rendered now (leaves auto mode)
    pub fn toggle(&self) -> ThemeState {
        let target = self.state().resolved.flipped();
        self.set_mode(target.into())
    }

    /// Attribute to set on the document root
    pub fn document_attribute(&self) -> (&'static str, &'static str) {
        (THEME_ATTRIBUTE, self.state().resolved.as_str())
    }

    pub fn is_dark(&self) -> bool {
        self.state().resolved == ResolvedTheme::Dark
    }

    pub fn is_auto(&self) -> bool {
        self.state().mode == ThemeMode::Auto
    }
}
