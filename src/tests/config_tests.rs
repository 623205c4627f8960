//! Tests for the configuration module.
//!
//! This module contains tests for configuration loading, validation, and usage.

use crate::config::{
    get_global_config, init_global_config, ConfigLoader, SketchConfig, StoreConfig, Validate,
};
use crate::error::config::ConfigError;
use crate::store::{CreatePolicy, SketchStore};
use crate::tests::TestFixture;

/// Test that default configuration can be created and is valid.
#[test]
fn test_default_config_is_valid() {
    let config = SketchConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.store.create_policy, CreatePolicy::Fail);
    assert_eq!(config.defaults.bloom.error_rate, 0.01);
    assert_eq!(config.defaults.hyperloglog.precision, 14);
    assert_eq!(config.defaults.top_k.k, 10);
}

/// Test that configuration validation catches invalid values.
#[test]
fn test_config_validation() {
    let mut config = SketchConfig::default();

    config.server.max_line_bytes = 0;
    assert!(config.validate().is_err());

    config.server.max_line_bytes = 1024;
    config.log.level = "loud".to_string();
    assert!(config.validate().is_err());

    config.log.level = "debug".to_string();
    config.defaults.hyperloglog.precision = 19;
    assert!(config.validate().is_err());

    config.defaults.hyperloglog.precision = 12;
    config.store.shard_amount = 3;
    assert!(config.validate().is_err());

    config.store.shard_amount = 8;
    assert!(config.validate().is_ok());
}

/// Test loading configuration from a file.
#[test]
fn test_load_config_from_file() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture
        .create_file(
            "file_test.toml",
            r#"
            [server]
            name = "test-store"

            [store]
            create_policy = "replace"
            max_instance_bytes = 65536

            [defaults.bloom]
            error_rate = 0.001
            capacity = 5000
            "#,
        )
        .unwrap();

    let config = ConfigLoader::new(Some(&path), "TEST_FILE").load().unwrap();

    assert_eq!(config.server.name, "test-store");
    assert_eq!(config.store.create_policy, CreatePolicy::Replace);
    assert_eq!(config.store.max_instance_bytes, 65536);
    assert_eq!(config.defaults.bloom.error_rate, 0.001);
    assert_eq!(config.defaults.bloom.capacity, 5000);

    // Other values should be defaults
    assert_eq!(config.defaults.bloom.expansion, 2);
    assert_eq!(config.server.max_line_bytes, 1024 * 1024);
}

/// Test loading configuration from JSON.
#[test]
fn test_load_config_from_json() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture
        .create_file("json_test.json", r#"{"defaults": {"top_k": {"k": 25}}}"#)
        .unwrap();

    let config = ConfigLoader::new(Some(&path), "TEST_JSON").load().unwrap();
    assert_eq!(config.defaults.top_k.k, 25);
    assert_eq!(config.defaults.top_k.width, 8);
}

/// Test loading configuration with environment variable overrides.
#[test]
fn test_env_var_override() {
    let mut fixture = TestFixture::new().unwrap();
    let path = fixture
        .create_file("env_test.toml", "[server]\nname = \"file-store\"\n")
        .unwrap();

    fixture.set_env("TEST_ENV__SERVER__NAME", "env-store");
    fixture.set_env("TEST_ENV__DEFAULTS__HYPERLOGLOG__PRECISION", "10");

    let config = ConfigLoader::new(Some(&path), "TEST_ENV").load().unwrap();

    assert_eq!(config.server.name, "env-store");
    assert_eq!(config.defaults.hyperloglog.precision, 10);
}

/// Test that loading an invalid configuration file returns an error.
#[test]
fn test_load_invalid_config() {
    let fixture = TestFixture::new().unwrap();

    let broken = fixture
        .create_file("invalid.toml", "[server\nname = test-store\"\n")
        .unwrap();
    assert!(ConfigLoader::new(Some(&broken), "TEST_INVALID").load().is_err());

    let out_of_range = fixture
        .create_file("range.toml", "[defaults.count_min]\nerror_rate = 2.0\n")
        .unwrap();
    assert!(matches!(
        ConfigLoader::new(Some(&out_of_range), "TEST_RANGE").load(),
        Err(ConfigError::ValidationError(_))
    ));

    let unsupported = fixture.create_file("config.ini", "").unwrap();
    assert!(matches!(
        ConfigLoader::new(Some(&unsupported), "TEST_EXT").load(),
        Err(ConfigError::ParseError(_))
    ));
}

/// Test that a missing file is reported as such.
#[test]
fn test_missing_config_file() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture.temp_dir.path().join("absent.toml");
    assert!(matches!(
        ConfigLoader::new(Some(&path), "TEST_MISSING").load(),
        Err(ConfigError::FileNotFound(_))
    ));
}

/// Test that generated TOML loads back to the same settings.
#[test]
fn test_generated_config_loads_back() {
    let fixture = TestFixture::new().unwrap();
    let generated = SketchConfig::default().to_toml().unwrap();
    let path = fixture.create_file("generated.toml", &generated).unwrap();

    let config = ConfigLoader::new(Some(&path), "TEST_GENERATED").load().unwrap();
    assert_eq!(config.to_toml().unwrap(), generated);
}

/// Test that the store honors the configured create policy.
#[test]
fn test_store_uses_configured_policy() {
    let mut config = SketchConfig::default();
    config.store = StoreConfig {
        create_policy: CreatePolicy::Replace,
        shard_amount: 4,
        max_instance_bytes: 1 << 20,
    };

    let store = SketchStore::from_config(&config);
    store.pf_create("visitors", None, None).unwrap();
    assert!(store.pf_create("visitors", None, None).is_ok());
    assert_eq!(store.max_instance_bytes(), 1 << 20);
    assert!(store.cms_init_by_dim("wide", 1 << 20, 1, None).is_err());
}

/// Test that the global configuration is set once.
#[test]
fn test_global_config_is_set_once() {
    let mut first = SketchConfig::default();
    first.server.name = "global-store".to_string();
    init_global_config(first);

    let mut second = SketchConfig::default();
    second.server.name = "ignored".to_string();
    init_global_config(second);

    let global = get_global_config().unwrap();
    assert_eq!(global.get().server.name, "global-store");
}
