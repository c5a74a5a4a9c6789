//! Profile configuration loading.
//!
//! The default configuration is a TOML file embedded at compile time.
//! Callers may supply their own TOML text instead; both go through the
//! same validation.

use census_profile_models::config::ProfileConfig;

use crate::ProfileError;

/// Embedded default configuration.
const BUILTIN_TOML: &str = include_str!("../profiles/default.toml");

/// Parses and validates a TOML profile configuration.
///
/// # Errors
///
/// * [`ProfileError::Toml`] if the text is not valid TOML or does not
///   match the schema (including unknown category names)
/// * [`ProfileError::Config`] if the configuration fails validation
pub fn parse_config(toml_str: &str) -> Result<ProfileConfig, ProfileError> {
    let config: ProfileConfig = toml::from_str(toml_str)?;
    Ok(config.validate()?)
}

/// Returns the embedded default configuration.
///
/// # Panics
///
/// Panics if the embedded TOML fails to parse or validate. Since it is a
/// compile-time constant, a failure indicates a development error and is
/// caught by the tests below.
#[must_use]
pub fn builtin_config() -> ProfileConfig {
    parse_config(BUILTIN_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse built-in profile config: {e}"))
}
