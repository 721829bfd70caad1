//! Configuration files feed the session.

use std::sync::Arc;
use tempfile::TempDir;
use treeglass::bridge::MemoryTransport;
use treeglass::clock::ManualClock;
use treeglass::config::ConfigLoader;
use treeglass::session::{MemoryPreferences, Session, SessionOptions};

#[test]
fn configured_batch_duration_drives_the_bridge() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("treeglass.toml");
    std::fs::write(
        &config_file,
        r#"
[bridge]
batch_duration_ms = 30

[registry]
untrack_delay_ms = 500

[[filters]]
type = "element_type"
value = "host"

[[filters]]
type = "location"
value = "node_modules"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_file(&config_file).unwrap();
    config.validate().unwrap();
    let options = SessionOptions::from(&config);
    assert_eq!(options.walker.untrack_delay_ms, 500);
    assert_eq!(options.filters.len(), 2);

    let mut session = Session::new(
        MemoryTransport::new(),
        Arc::new(ManualClock::new(0)),
        MemoryPreferences::new(),
        options,
    );
    session.connect(2).unwrap();
    session.tick(0);
    assert_eq!(session.next_deadline(), Some(30));
}

#[test]
fn invalid_file_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("broken.toml");
    std::fs::write(&config_file, "[bridge]\nbatch_duration_ms = \"soon\"\n").unwrap();
    assert!(ConfigLoader::load_from_file(&config_file).is_err());
}

#[test]
fn invalid_values_fail_validation() {
    let temp_dir = TempDir::new().unwrap();
    let config_file = temp_dir.path().join("zero.toml");
    std::fs::write(
        &config_file,
        "[errors]\naggregation_delay_ms = 0\n\n[logging]\noutput = \"syslog\"\n",
    )
    .unwrap();
    let config = ConfigLoader::load_from_file(&config_file).unwrap();
    let errors = config.validate().unwrap_err();
    assert_eq!(errors.len(), 2);
}
