use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::{domain::Tab, form::DebounceDelays};

#[derive(Debug, Clone, PartialEq)]
pub struct FormOptions {
    pub delays: DebounceDelays,
    /// Re-run validators after every commit, not only on blur and submit.
    pub validate_on_commit: bool,
    pub tabs: Vec<Tab>,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            delays: DebounceDelays::default(),
            validate_on_commit: true,
            tabs: Vec::new(),
        }
    }
}

impl FormOptions {
    /// Build options from a parsed JSON/YAML/TOML document; missing keys keep
    /// their defaults.
    pub fn from_document(value: &Value) -> Result<Self> {
        let file: OptionsFile =
            serde_json::from_value(value.clone()).context("invalid form options document")?;
        Ok(file.into_options())
    }

    pub fn with_delays(mut self, delays: DebounceDelays) -> Self {
        self.delays = delays;
        self
    }

    pub fn with_text_delay(mut self, delay: Duration) -> Self {
        self.delays.text = delay;
        self
    }

    pub fn with_complex_delay(mut self, delay: Duration) -> Self {
        self.delays.complex = delay;
        self
    }

    pub fn with_array_delay(mut self, delay: Duration) -> Self {
        self.delays.array = delay;
        self
    }

    pub fn with_validate_on_commit(mut self, enabled: bool) -> Self {
        self.validate_on_commit = enabled;
        self
    }

    pub fn with_tab(mut self, tab: Tab) -> Self {
        self.tabs.push(tab);
        self
    }

    pub fn with_tabs(mut self, tabs: Vec<Tab>) -> Self {
        self.tabs = tabs;
        self
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct OptionsFile {
    debounce: DebounceFile,
    validate_on_commit: Option<bool>,
    tabs: Vec<Tab>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DebounceFile {
    text_ms: Option<u64>,
    complex_ms: Option<u64>,
    array_ms: Option<u64>,
}

impl OptionsFile {
    fn into_options(self) -> FormOptions {
        let mut options = FormOptions::default().with_tabs(self.tabs);
        if let Some(ms) = self.debounce.text_ms {
            options = options.with_text_delay(Duration::from_millis(ms));
        }
        if let Some(ms) = self.debounce.complex_ms {
            options = options.with_complex_delay(Duration::from_millis(ms));
        }
        if let Some(ms) = self.debounce.array_ms {
            options = options.with_array_delay(Duration::from_millis(ms));
        }
        if let Some(enabled) = self.validate_on_commit {
            options = options.with_validate_on_commit(enabled);
        }
        options
    }
}
