use std::io::Write;

use labprep::persist::PersistenceMode;
use labprep::settings::{ServerSettings, Settings};
use labprep::LabprepError;
use tempfile::NamedTempFile;

fn toml_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp file");
    file.write_all(contents.as_bytes()).expect("write");
    file
}

#[test]
fn an_empty_file_yields_the_defaults() {
    let file = toml_file("");
    let settings = Settings::load_from(Some(file.path()), false).expect("settings");
    assert_eq!(settings.server, ServerSettings::default());
    assert_eq!(settings.server.address(), "127.0.0.1:3000");
    assert_eq!(settings.database.path, "indicaciones.db");
    assert_eq!(
        settings.database.mode(),
        PersistenceMode::File("indicaciones.db".into())
    );
    assert_eq!(settings.selection.max_practices, 50);
    assert_eq!(settings.log.level, "info");
}

#[test]
fn file_values_override_the_defaults() {
    let file = toml_file(
        r#"
        [server]
        host = "0.0.0.0"
        port = 8080
        cors_origin = "http://localhost:5173"
        request_timeout_ms = 2500

        [database]
        path = ":memory:"

        [selection]
        max_practices = 10

        [log]
        level = "debug"
        "#,
    );
    let settings = Settings::load_from(Some(file.path()), false).expect("settings");
    assert_eq!(settings.server.address(), "0.0.0.0:8080");
    assert_eq!(settings.server.cors_origin.as_deref(), Some("http://localhost:5173"));
    assert_eq!(settings.server.request_timeout().as_millis(), 2500);
    assert_eq!(settings.database.mode(), PersistenceMode::InMemory);
    assert_eq!(settings.selection.max_practices, 10);
    assert_eq!(settings.log.level, "debug");
}

#[test]
fn zero_max_practices_is_rejected() {
    let file = toml_file("[selection]\nmax_practices = 0\n");
    let err = Settings::load_from(Some(file.path()), false).unwrap_err();
    assert!(matches!(err, LabprepError::Config(_)));
}

#[test]
fn zero_timeout_is_rejected() {
    let file = toml_file("[server]\nrequest_timeout_ms = 0\n");
    let err = Settings::load_from(Some(file.path()), false).unwrap_err();
    assert!(matches!(err, LabprepError::Config(_)));
}

#[test]
fn blank_database_path_is_rejected() {
    let file = toml_file("[database]\npath = \"  \"\n");
    let err = Settings::load_from(Some(file.path()), false).unwrap_err();
    assert!(matches!(err, LabprepError::Config(_)));
}

#[test]
fn out_of_range_port_is_rejected() {
    let file = toml_file("[server]\nport = 70000\n");
    let err = Settings::load_from(Some(file.path()), false).unwrap_err();
    assert!(matches!(err, LabprepError::Config(_)));
}

#[test]
fn a_missing_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let missing = dir.path().join("nowhere.toml");
    let err = Settings::load_from(Some(&missing), false).unwrap_err();
    assert!(matches!(err, LabprepError::Config(_)));
}
