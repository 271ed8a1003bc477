// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Runtime settings for the `settle` binary.

use std::env;

/// Color override derived from NO_COLOR / FORCE_COLOR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// `tracing` filter directive.
    pub log_filter: String,
    pub color: ColorMode,
    /// Pipeline runs for `bench` when no count is given.
    pub bench_iterations: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: "warn".to_string(),
            color: ColorMode::Auto,
            bench_iterations: 10_000,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// NO_COLOR wins over FORCE_COLOR when both are set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(filter) = lookup("SETTLE_LOG").filter(|f| !f.trim().is_empty()) {
            config.log_filter = filter;
        }
        if lookup("NO_COLOR").is_some() {
            config.color = ColorMode::Never;
        } else if lookup("FORCE_COLOR").is_some() {
            config.color = ColorMode::Always;
        }
        config
    }
}
