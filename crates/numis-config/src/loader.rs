// SPDX-FileCopyrightText: 2026 Numis Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `./numis.toml` > `~/.config/numis/numis.toml` > `/etc/numis/numis.toml`,
//! with `NUMIS_*` environment variables on top.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::NumisConfig;

/// Sections addressable through `NUMIS_<SECTION>_<KEY>` variables.
const ENV_SECTIONS: &[&str] = &[
    "service", "storage", "session", "bus", "archive", "retry", "payment", "gateway",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/numis/numis.toml`
/// 3. `~/.config/numis/numis.toml`
/// 4. `./numis.toml`
/// 5. `NUMIS_*` environment variables
pub fn load_config() -> Result<NumisConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<NumisConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(NumisConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<NumisConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(NumisConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the layered Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(NumisConfig::default()))
        .merge(Toml::file("/etc/numis/numis.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("numis/numis.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("numis.toml"))
        .merge(env_provider())
}

/// Env provider with explicit section mapping.
///
/// `Env::split("_")` would turn `NUMIS_SESSION_DURATION_SECS` into
/// `session.duration.secs`; only the first segment names the section.
/// The mapping sees keys in their original case.
fn env_provider() -> Env {
    Env::prefixed("NUMIS_").map(|key| map_env_key(&key.as_str().to_ascii_lowercase()).into())
}

/// Map a lowercased, prefix-stripped env key to its dotted config path.
pub fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key.strip_prefix(section) {
            if let Some(field) = rest.strip_prefix('_') {
                return format!("{section}.{field}");
            }
        }
    }
    key.to_string()
}
