//! Tests for tiered configuration resolution
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate CLANWATCH_* variables are marked with #[serial]
//! so they run sequentially, not in parallel.

use clanwatch_common::config::{
    load_toml_config, locate_config_file, CliOverrides, TomlConfig, ENV_AGGREGATION_TIMEOUT_SECS,
    ENV_API_KEY, ENV_CACHE_TTL_SECS, ENV_CONFIG_PATH,
};
use clanwatch_common::Error;
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

fn clear_env() {
    env::remove_var(ENV_API_KEY);
    env::remove_var(ENV_CACHE_TTL_SECS);
    env::remove_var(ENV_AGGREGATION_TIMEOUT_SECS);
    env::remove_var(ENV_CONFIG_PATH);
}

fn write_config(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
#[serial]
fn test_missing_file_falls_back_to_defaults() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let cli = CliOverrides {
        config_path: Some(dir.path().join("absent.toml")),
        ..Default::default()
    };

    let config = TomlConfig::resolve(&cli).unwrap();
    assert_eq!(config, TomlConfig::default());
}

#[test]
#[serial]
fn test_malformed_file_is_an_error() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[cache\nttl_secs = ");

    let cli = CliOverrides {
        config_path: Some(path),
        ..Default::default()
    };
    assert!(matches!(TomlConfig::resolve(&cli), Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_priority_cli_over_env_over_toml() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
        [upstream]
        base_url = "http://toml.example"
        api_key = "toml-key"

        [cache]
        ttl_secs = 120

        [server]
        bind = "127.0.0.1:7000"
        "#,
    );

    env::set_var(ENV_API_KEY, "env-key");
    env::set_var(ENV_CACHE_TTL_SECS, "45");

    let cli = CliOverrides {
        config_path: Some(path),
        bind: Some("127.0.0.1:7001".to_string()),
        ..Default::default()
    };
    let config = TomlConfig::resolve(&cli).unwrap();

    // CLI beats TOML
    assert_eq!(config.server.bind, "127.0.0.1:7001");
    // ENV beats TOML
    assert_eq!(config.upstream.api_key.as_deref(), Some("env-key"));
    assert_eq!(config.cache.ttl_secs, 45);
    // TOML beats default
    assert_eq!(config.upstream.base_url, "http://toml.example");

    clear_env();
}

#[test]
#[serial]
fn test_blank_env_key_does_not_override_toml() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
        [upstream]
        api_key = "toml-key"
        "#,
    );
    env::set_var(ENV_API_KEY, "   ");

    let config = TomlConfig::resolve(&CliOverrides {
        config_path: Some(path),
        ..Default::default()
    })
    .unwrap();
    assert_eq!(config.upstream.api_key.as_deref(), Some("toml-key"));

    clear_env();
}

#[test]
#[serial]
fn test_non_numeric_env_timeout_is_rejected() {
    clear_env();
    env::set_var(ENV_AGGREGATION_TIMEOUT_SECS, "soon");

    let mut config = TomlConfig::default();
    assert!(matches!(
        config.apply_env_overrides(),
        Err(Error::Config(_))
    ));

    clear_env();
}

#[test]
#[serial]
fn test_locate_prefers_cli_then_env() {
    clear_env();
    let cli_path = PathBuf::from("/tmp/clanwatch-cli.toml");
    assert_eq!(locate_config_file(Some(&cli_path)), Some(cli_path));

    env::set_var(ENV_CONFIG_PATH, "/tmp/clanwatch-env.toml");
    assert_eq!(
        locate_config_file(None),
        Some(PathBuf::from("/tmp/clanwatch-env.toml"))
    );

    clear_env();
}

#[test]
fn test_load_scoring_weights() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
        [scoring]
        reward_weight = 0.5
        trend_weight = 2.0
        "#,
    );
    let config = load_toml_config(&path).unwrap();
    assert_eq!(config.scoring.reward_weight, 0.5);
    assert_eq!(config.scoring.trend_weight, 2.0);
    assert_eq!(config.scoring.commitment_weight, 1.0);
}
