//! `.env` → `Config` tests.
//!
//! Each test feeds a `.env` body through dotenvy, exports the pairs into the
//! process environment and resolves `Config` from it.

use std::sync::Mutex;

use swarmgate::config::{Config, LogFormat};

static ENV_MUTEX: Mutex<()> = Mutex::new(());

const VARS: &[&str] = &[
    "GATEWAY_HOST",
    "GATEWAY_PORT",
    "ENGINE_TIMEOUT_SECS",
    "ENGINE_PING_ON_START",
    "LOG_FORMAT",
];

/// Export the pairs of a `.env` body, clearing every variable `Config` reads first.
fn load_env(contents: &str) {
    // SAFETY: Callers hold ENV_MUTEX.
    unsafe {
        for var in VARS {
            std::env::remove_var(var);
        }
        for item in dotenvy::from_read_iter(contents.as_bytes()) {
            let (key, value) = item.expect("dotenvy should parse the .env body");
            std::env::set_var(key, value);
        }
    }
}

#[test]
fn env_file_values_reach_config() {
    let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");
    load_env(
        "# gateway\n\
         GATEWAY_HOST=0.0.0.0\n\
         GATEWAY_PORT=8080\n\
         ENGINE_TIMEOUT_SECS=30\n\
         ENGINE_PING_ON_START=no\n\
         LOG_FORMAT=json\n",
    );

    let config = Config::from_env().unwrap();
    assert_eq!(config.gateway.listen_addr(), "0.0.0.0:8080");
    assert_eq!(config.engine.timeout.as_secs(), 30);
    assert!(!config.engine.ping_on_start);
    assert_eq!(config.log.format, LogFormat::Json);
}

#[test]
fn empty_env_file_gives_defaults() {
    let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");
    load_env("");

    let config = Config::from_env().unwrap();
    assert_eq!(config.gateway.listen_addr(), "127.0.0.1:5000");
    assert_eq!(config.engine.timeout.as_secs(), 120);
    assert!(config.engine.ping_on_start);
    assert_eq!(config.log.format, LogFormat::Text);
}

#[test]
fn quoted_values_are_unquoted() {
    let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");
    load_env("GATEWAY_HOST=\"::1\"\nGATEWAY_PORT='5001'\n");

    let config = Config::from_env().unwrap();
    assert_eq!(config.gateway.listen_addr(), "[::1]:5001");
}

#[test]
fn invalid_port_is_reported_with_its_key() {
    let _guard = ENV_MUTEX.lock().expect("env mutex poisoned");
    load_env("GATEWAY_PORT=http\n");

    let err = Config::from_env().unwrap_err();
    assert!(err.to_string().contains("GATEWAY_PORT"), "{err}");
    load_env("");
}
