//! Unit tests for configuration loading and root folder resolution
//!
//! Tests that touch WLMS_ROOT_FOLDER are marked #[serial] so they do not race
//! on the process environment.

use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;
use wlms_common::config::{
    load_toml_config, write_toml_config, LoggingConfig, RootFolderInitializer,
    RootFolderResolver, TomlConfig, ROOT_FOLDER_ENV,
};

#[test]
fn test_missing_toml_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config = load_toml_config(Some(&temp_dir.path().join("absent.toml"))).unwrap();

    assert_eq!(config.port, 5731);
    assert_eq!(config.bind_address, "127.0.0.1");
    assert_eq!(config.logging.level, "info");
    assert!(config.root_folder.is_none());
}

#[test]
fn test_toml_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("wlms-sv.toml");

    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/srv/wlms")),
        port: 6000,
        bind_address: "0.0.0.0".to_string(),
        max_lock_wait_ms: 1500,
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
    };
    write_toml_config(&config, &path).unwrap();

    let loaded = load_toml_config(Some(&path)).unwrap();
    assert_eq!(loaded.root_folder, Some(PathBuf::from("/srv/wlms")));
    assert_eq!(loaded.port, 6000);
    assert_eq!(loaded.max_lock_wait_ms, 1500);
    assert_eq!(loaded.logging.level, "debug");
}

#[test]
fn test_partial_toml_fills_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("wlms-sv.toml");
    std::fs::write(&path, "port = 7000\n").unwrap();

    let loaded = load_toml_config(Some(&path)).unwrap();
    assert_eq!(loaded.port, 7000);
    assert_eq!(loaded.max_lock_wait_ms, 5000);
}

#[test]
fn test_malformed_toml_is_config_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("wlms-sv.toml");
    std::fs::write(&path, "port = \"not a number\"\n").unwrap();

    let result = load_toml_config(Some(&path));
    assert!(matches!(result, Err(wlms_common::Error::Config(_))));
}

#[test]
#[serial]
fn test_cli_arg_has_highest_priority() {
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };

    let resolved = RootFolderResolver::new("test")
        .with_cli_arg(Some(PathBuf::from("/from/cli")))
        .with_toml(&toml)
        .resolve();

    env::remove_var(ROOT_FOLDER_ENV);
    assert_eq!(resolved, PathBuf::from("/from/cli"));
}

#[test]
#[serial]
fn test_env_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };

    let resolved = RootFolderResolver::new("test").with_toml(&toml).resolve();

    env::remove_var(ROOT_FOLDER_ENV);
    assert_eq!(resolved, PathBuf::from("/from/env"));
}

#[test]
#[serial]
fn test_toml_used_without_cli_or_env() {
    env::remove_var(ROOT_FOLDER_ENV);
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };

    let resolved = RootFolderResolver::new("test").with_toml(&toml).resolve();
    assert_eq!(resolved, PathBuf::from("/from/toml"));
}

#[test]
fn test_initializer_creates_folder_and_names_database() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("root");

    let initializer = RootFolderInitializer::new(root.clone());
    initializer.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
    assert_eq!(initializer.database_path(), root.join("wlms.db"));
}
