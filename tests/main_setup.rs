use newsdesk::{
    AppConfig,
    config::{ConfigError, DEFAULT_TOKEN_TTL_SECS, DEFAULT_UPLOAD_MAX_BYTES, Env},
};
use serial_test::serial;
use std::{collections::HashMap, env, panic, path::PathBuf};

// --- Setup/Teardown Utilities ---

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name| vars.get(name).cloned()
}

/// Runs `test` and restores the listed environment variables afterwards.
fn run_with_env<T, R>(test: T, cleanup_vars: &[&'static str]) -> R
where
    T: FnOnce() -> R + panic::UnwindSafe,
{
    let originals: Vec<(String, Option<String>)> = cleanup_vars
        .iter()
        .map(|&var| (var.to_string(), env::var(var).ok()))
        .collect();

    let result = panic::catch_unwind(test);

    for (key, original_value) in originals.into_iter().rev() {
        unsafe {
            if let Some(val) = original_value {
                env::set_var(&key, val);
            } else {
                env::remove_var(&key);
            }
        }
    }

    match result {
        Ok(value) => value,
        Err(e) => panic::resume_unwind(e),
    }
}

// --- Tests ---

#[test]
fn test_local_defaults() {
    let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();

    assert_eq!(config.env, Env::Local);
    assert_eq!(config.bind_address(), "0.0.0.0:8080");
    assert_eq!(config.db_url, None);
    assert_eq!(config.upload_dir, PathBuf::from("uploads"));
    assert_eq!(config.upload_max_bytes, DEFAULT_UPLOAD_MAX_BYTES);
    assert_eq!(config.admin_username, "admin");
    assert_eq!(config.admin_password, "admin123");
    assert_eq!(config.jwt_secret, None);
    assert_eq!(config.token_ttl_secs, DEFAULT_TOKEN_TTL_SECS);
    assert_eq!(config.cors_allowed_origins, vec!["http://localhost:3000"]);
}

#[test]
fn test_overrides_are_applied() {
    let config = AppConfig::from_lookup(lookup_from(&[
        ("APP_HOST", "127.0.0.1"),
        ("APP_PORT", "9090"),
        ("DATABASE_URL", "postgres://u:p@db/news"),
        ("UPLOAD_PATH", "/var/lib/newsdesk/uploads"),
        ("ADMIN_USERNAME", "editor"),
        ("ADMIN_PASSWORD", "s3cret"),
        ("JWT_SECRET", "persisted"),
        ("TOKEN_TTL_SECONDS", "60"),
        ("CORS_ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
    ]))
    .unwrap();

    assert_eq!(config.bind_address(), "127.0.0.1:9090");
    assert_eq!(config.db_url.as_deref(), Some("postgres://u:p@db/news"));
    assert_eq!(config.upload_dir, PathBuf::from("/var/lib/newsdesk/uploads"));
    assert_eq!(config.admin_username, "editor");
    assert_eq!(config.admin_password, "s3cret");
    assert_eq!(config.jwt_secret.as_deref(), Some("persisted"));
    assert_eq!(config.token_ttl_secs, 60);
    assert_eq!(
        config.cors_allowed_origins,
        vec!["https://a.example", "https://b.example"]
    );
}

#[test]
fn test_blank_values_count_as_unset() {
    let config =
        AppConfig::from_lookup(lookup_from(&[("DATABASE_URL", "  "), ("JWT_SECRET", "")]))
            .unwrap();

    assert_eq!(config.db_url, None);
    assert_eq!(config.jwt_secret, None);
}

#[test]
fn test_invalid_port_is_rejected() {
    let result = AppConfig::from_lookup(lookup_from(&[("APP_PORT", "eighty")]));

    assert!(matches!(
        result,
        Err(ConfigError::Invalid { name: "APP_PORT", .. })
    ));
}

#[test]
fn test_production_requires_database_and_password() {
    let result = AppConfig::from_lookup(lookup_from(&[("APP_ENV", "production")]));
    assert!(matches!(result, Err(ConfigError::Missing("DATABASE_URL"))));

    let result = AppConfig::from_lookup(lookup_from(&[
        ("APP_ENV", "production"),
        ("DATABASE_URL", "postgres://u:p@db/news"),
    ]));
    assert!(matches!(result, Err(ConfigError::Missing("ADMIN_PASSWORD"))));

    let config = AppConfig::from_lookup(lookup_from(&[
        ("APP_ENV", "production"),
        ("DATABASE_URL", "postgres://u:p@db/news"),
        ("ADMIN_PASSWORD", "strong"),
    ]))
    .unwrap();
    assert_eq!(config.env, Env::Production);
}

#[test]
#[serial]
fn test_load_reads_process_environment() {
    let vars = ["APP_ENV", "APP_PORT", "ADMIN_USERNAME", "DATABASE_URL"];

    let config = run_with_env(
        || {
            unsafe {
                env::remove_var("APP_ENV");
                env::remove_var("DATABASE_URL");
                env::set_var("APP_PORT", "8181");
                env::set_var("ADMIN_USERNAME", "desk");
            }
            AppConfig::load()
        },
        &vars,
    )
    .unwrap();

    assert_eq!(config.port, 8181);
    assert_eq!(config.admin_username, "desk");
    assert_eq!(config.db_url, None);
}

#[test]
#[serial]
fn test_load_fails_fast_in_production() {
    let vars = ["APP_ENV", "DATABASE_URL", "ADMIN_PASSWORD"];

    let result = run_with_env(
        || {
            unsafe {
                env::set_var("APP_ENV", "production");
                env::set_var("DATABASE_URL", "postgres://u:p@db/news");
                env::remove_var("ADMIN_PASSWORD");
            }
            AppConfig::load()
        },
        &vars,
    );

    assert!(matches!(result, Err(ConfigError::Missing("ADMIN_PASSWORD"))));
}
