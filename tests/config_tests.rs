//! Tests for configuration loading.

use std::io::Write;
use std::sync::{Mutex, OnceLock};

use agent_runloop::config::RunLoopConfig;
use agent_runloop::error::RuntimeError;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const CONFIG_ENV_VARS: [&str; 3] = [
    "AGENT_RUNLOOP_EXCLUDED_STATE_KEYS",
    "AGENT_RUNLOOP_SNAPSHOT_ROLE",
    "AGENT_RUNLOOP_YIELD_AFTER_EVENT",
];

struct EnvGuard {
    saved: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    fn capture(keys: &[&str]) -> Self {
        let saved = keys
            .iter()
            .map(|key| ((*key).to_string(), std::env::var(key).ok()))
            .collect();
        Self { saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.saved {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }
}

fn env_lock_guard() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn clear_config_env() {
    for key in CONFIG_ENV_VARS {
        std::env::remove_var(key);
    }
}

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn from_env_reads_overrides() {
    let _lock = env_lock_guard();
    let _guard = EnvGuard::capture(&CONFIG_ENV_VARS);
    clear_config_env();
    std::env::set_var("AGENT_RUNLOOP_EXCLUDED_STATE_KEYS", "messages, id ,secret,");
    std::env::set_var("AGENT_RUNLOOP_SNAPSHOT_ROLE", "observer");
    std::env::set_var("AGENT_RUNLOOP_YIELD_AFTER_EVENT", "false");

    let config = RunLoopConfig::from_env();
    assert_eq!(
        config.excluded_state_keys,
        vec!["messages".to_string(), "id".to_string(), "secret".to_string()]
    );
    assert_eq!(config.snapshot_role, "observer");
    assert!(!config.yield_after_event);
}

#[test]
fn invalid_yield_flag_keeps_default() {
    let _lock = env_lock_guard();
    let _guard = EnvGuard::capture(&CONFIG_ENV_VARS);
    clear_config_env();
    std::env::set_var("AGENT_RUNLOOP_YIELD_AFTER_EVENT", "sometimes");

    assert!(RunLoopConfig::from_env().yield_after_event);
}

#[test]
fn load_reads_toml_file() {
    let _lock = env_lock_guard();
    let _guard = EnvGuard::capture(&CONFIG_ENV_VARS);
    clear_config_env();
    let file = write_config(
        "excluded_state_keys = [\"messages\", \"scratchpad\"]\nsnapshot_role = \"planner\"\n",
    );

    let config = RunLoopConfig::load(file.path()).unwrap();
    assert_eq!(
        config.excluded_state_keys,
        vec!["messages".to_string(), "scratchpad".to_string()]
    );
    assert_eq!(config.snapshot_role, "planner");
    assert!(config.yield_after_event);
}

#[test]
fn env_overrides_file_values() {
    let _lock = env_lock_guard();
    let _guard = EnvGuard::capture(&CONFIG_ENV_VARS);
    clear_config_env();
    std::env::set_var("AGENT_RUNLOOP_SNAPSHOT_ROLE", "from-env");
    let file = write_config("snapshot_role = \"from-file\"\n");

    let config = RunLoopConfig::load(file.path()).unwrap();
    assert_eq!(config.snapshot_role, "from-env");
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = RunLoopConfig::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, RuntimeError::Io(_)));
}

#[test]
fn unknown_value_types_are_configuration_errors() {
    let file = write_config("yield_after_event = \"yes\"\n");
    let err = RunLoopConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, RuntimeError::Configuration(_)));
}
