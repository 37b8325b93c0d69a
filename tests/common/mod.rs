//! Shared test infrastructure for aegis-agent's integration tests.
//!
//! Provides `resolve_bin_path()` (locate the built `agent` binary) and
//! `write_config()` (a minimal valid config file for a temp dir), used by
//! every test that spawns the real agent process.

use std::fs;
use std::path::PathBuf;

pub fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_agent") {
        let p = PathBuf::from(path);
        if p.exists() {
            return p;
        }
    }

    let exe_name = if cfg!(windows) { "agent.exe" } else { "agent" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!(
            "unable to resolve agent binary path for integration test (checked CARGO_BIN_EXE_agent and debug sibling path)"
        ),
    }
}

/// Write a minimal valid agent config file under `dir` and return its path.
pub fn write_config(dir: &std::path::Path, mode: &str, interval_ms: u64) -> PathBuf {
    let telemetry_root = dir.join("watched");
    fs::create_dir_all(&telemetry_root).expect("create watched dir");
    let config_path = dir.join("agent.conf");
    fs::write(
        &config_path,
        format!(
            "sampling_interval_ms={interval_ms}\n\
             telemetry_root_path={}\n\
             cloud_endpoint_url=https://example.invalid/ingest\n\
             baseline_db_path={}\n\
             mode={mode}\n",
            telemetry_root.display(),
            dir.join("baseline.db").display(),
        ),
    )
    .expect("write test config");
    config_path
}
