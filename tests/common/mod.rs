use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// A token with the right prefix and length
#[allow(dead_code)]
pub fn valid_token() -> String {
    format!("r8_{}", "a".repeat(37))
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Builds an SSE body with one `output` event per fragment and a final `done`
#[allow(dead_code)]
pub fn sse_body(fragments: &[&str]) -> String {
    let mut body = String::new();
    for fragment in fragments {
        body.push_str("event: output\n");
        body.push_str(&format!("data: {}\n\n", fragment));
    }
    body.push_str("event: done\ndata: {}\n\n");
    body
}
