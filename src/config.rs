//! Runtime configuration
//!
//! Read once from the environment at startup. A local `.env` file is
//! honored; real environment variables always win over it.

use chrono::{FixedOffset, Offset, Utc};
use std::env;

const DEFAULT_DB_PATH: &str = "vibecheck.db";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("Missing configuration: {0}")]
  MissingConfig(String),

  #[error("Invalid configuration for {0}: {1}")]
  InvalidConfig(String, String),
}

#[derive(Debug, Clone)]
pub struct Config {
  pub backend_url: String,
  pub api_token: String,
  pub db_path: String,
  /// Viewer's offset from UTC, in minutes. Calendar bucketing uses this.
  pub utc_offset_minutes: i32,
}

impl Config {
  pub fn from_env() -> Result<Self, ConfigError> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let utc_offset_minutes = match env::var("VIBECHECK_UTC_OFFSET_MINUTES") {
      Ok(raw) => raw.parse::<i32>().map_err(|e| {
        ConfigError::InvalidConfig("VIBECHECK_UTC_OFFSET_MINUTES".into(), e.to_string())
      })?,
      Err(_) => 0,
    };
    if FixedOffset::east_opt(utc_offset_minutes.saturating_mul(60)).is_none() {
      return Err(ConfigError::InvalidConfig(
        "VIBECHECK_UTC_OFFSET_MINUTES".into(),
        format!("{} minutes is not a valid UTC offset", utc_offset_minutes),
      ));
    }

    Ok(Self {
      backend_url: env::var("VIBECHECK_BACKEND_URL")
        .map_err(|_| ConfigError::MissingConfig("VIBECHECK_BACKEND_URL".into()))?,
      api_token: env::var("VIBECHECK_API_TOKEN")
        .map_err(|_| ConfigError::MissingConfig("VIBECHECK_API_TOKEN".into()))?,
      db_path: env::var("VIBECHECK_DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string()),
      utc_offset_minutes,
    })
  }

  pub fn local_offset(&self) -> FixedOffset {
    FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60)).unwrap_or_else(|| Utc.fix())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serial_test::serial;

  #[test]
  #[serial]
  fn test_from_env_reads_all_vars() {
    temp_env::with_vars(
      [
        ("VIBECHECK_BACKEND_URL", Some("https://api.vibecheck.app")),
        ("VIBECHECK_API_TOKEN", Some("token-123")),
        ("VIBECHECK_DB_PATH", Some("/tmp/vibe.db")),
        ("VIBECHECK_UTC_OFFSET_MINUTES", Some("-300")),
      ],
      || {
        let config = Config::from_env().unwrap();
        assert_eq!(config.backend_url, "https://api.vibecheck.app");
        assert_eq!(config.api_token, "token-123");
        assert_eq!(config.db_path, "/tmp/vibe.db");
        assert_eq!(config.utc_offset_minutes, -300);
        assert_eq!(config.local_offset().local_minus_utc(), -300 * 60);
      },
    );
  }

  #[test]
  #[serial]
  fn test_optional_vars_fall_back_to_defaults() {
    temp_env::with_vars(
      [
        ("VIBECHECK_BACKEND_URL", Some("https://api.vibecheck.app")),
        ("VIBECHECK_API_TOKEN", Some("token-123")),
        ("VIBECHECK_DB_PATH", None),
        ("VIBECHECK_UTC_OFFSET_MINUTES", None),
      ],
      || {
        let config = Config::from_env().unwrap();
        assert_eq!(config.db_path, DEFAULT_DB_PATH);
        assert_eq!(config.utc_offset_minutes, 0);
        assert_eq!(config.local_offset().local_minus_utc(), 0);
      },
    );
  }

  #[test]
  #[serial]
  fn test_missing_required_var_errors() {
    temp_env::with_vars(
      [
        ("VIBECHECK_BACKEND_URL", None::<&str>),
        ("VIBECHECK_API_TOKEN", None),
        ("VIBECHECK_DB_PATH", None),
        ("VIBECHECK_UTC_OFFSET_MINUTES", None),
      ],
      || {
        let err = Config::from_env().unwrap_err();
        assert!(
          matches!(err, ConfigError::MissingConfig(ref name) if name == "VIBECHECK_BACKEND_URL")
        );
      },
    );
  }

  #[test]
  #[serial]
  fn test_unparseable_offset_errors() {
    temp_env::with_vars(
      [
        ("VIBECHECK_BACKEND_URL", Some("https://api.vibecheck.app")),
        ("VIBECHECK_API_TOKEN", Some("token-123")),
        ("VIBECHECK_UTC_OFFSET_MINUTES", Some("eastish")),
      ],
      || {
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfig(ref name, _)
          if name == "VIBECHECK_UTC_OFFSET_MINUTES"));
      },
    );
  }

  #[test]
  #[serial]
  fn test_out_of_range_offset_errors() {
    temp_env::with_vars(
      [
        ("VIBECHECK_BACKEND_URL", Some("https://api.vibecheck.app")),
        ("VIBECHECK_API_TOKEN", Some("token-123")),
        ("VIBECHECK_UTC_OFFSET_MINUTES", Some("100000")),
      ],
      || {
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfig(..)));
      },
    );
  }
}
