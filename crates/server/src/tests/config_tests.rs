use super::*;

use std::{
    env,
    time::{SystemTime, UNIX_EPOCH},
};

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
}

#[test]
fn keeps_in_memory_url_untouched() {
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
    assert_eq!(sqlite_path("sqlite::memory:"), None);
}

#[test]
fn blank_database_url_falls_back_to_default() {
    assert_eq!(normalize_database_url("  "), Settings::default().database_url);
}

#[test]
fn creates_parent_dir_for_sqlite_url() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();

    let temp_root = env::temp_dir().join(format!("posts_server_test_{suffix}"));
    let db_path = temp_root.join("data").join("test.db");

    prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare db url");
    assert!(temp_root.join("data").exists());

    fs::remove_dir_all(temp_root).expect("cleanup");
}

#[test]
fn file_config_overrides_defaults() {
    let mut settings = Settings::default();
    apply_file_config(
        &mut settings,
        r#"
        bind_addr = "0.0.0.0:4000"
        database_url = "sqlite://./other.db"
        max_body_bytes = 1024
        "#,
    );
    assert_eq!(settings.server_bind, "0.0.0.0:4000");
    assert_eq!(settings.database_url, "sqlite://./other.db");
    assert_eq!(settings.max_body_bytes, 1024);
}

#[test]
fn malformed_file_config_is_ignored() {
    let mut settings = Settings::default();
    apply_file_config(&mut settings, "bind_addr = ");
    assert_eq!(settings, Settings::default());
}

#[test]
fn prefixed_env_wins_over_plain_env() {
    let mut settings = Settings::default();
    apply_env_config(&mut settings, |key| match key {
        "SERVER_BIND" => Some("127.0.0.1:5000".to_string()),
        "APP__BIND_ADDR" => Some("127.0.0.1:6000".to_string()),
        "APP__MAX_BODY_BYTES" => Some("not-a-number".to_string()),
        _ => None,
    });
    assert_eq!(settings.server_bind, "127.0.0.1:6000");
    assert_eq!(settings.max_body_bytes, Settings::default().max_body_bytes);
}
