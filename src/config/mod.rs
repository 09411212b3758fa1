use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use directories::BaseDirs;
use tracing::warn;

use crate::execution::TextEncoding;

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        Self::load_from(&default_config_path())
    }

    /// Defaults, then `KEY=VALUE` lines from `config_path`, then environment overlay.
    pub fn load_from(config_path: &Path) -> Self {
        let mut map = default_map();

        if config_path.exists() {
            if let Ok(file) = fs::File::open(config_path) {
                let reader = BufReader::new(file);
                for line in reader.lines().map_while(Result::ok) {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    if let Some((k, v)) = line.split_once('=') {
                        map.insert(k.trim().to_string(), v.trim().to_string());
                    }
                }
            }
        }

        // Environment variables take precedence
        for (k, v) in env::vars() {
            if is_config_key(&k) {
                map.insert(k, v);
            }
        }

        Self {
            inner: map,
            config_path: config_path.to_path_buf(),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        if let Ok(v) = env::var(key) {
            return Some(v);
        }
        self.inner.get(key).cloned()
    }

    pub fn get_path(&self, key: &str) -> Option<PathBuf> {
        self.get(key).filter(|v| !v.is_empty()).map(PathBuf::from)
    }

    /// Explicit interpreter path; when unset, discovery picks one.
    pub fn interpreter_path(&self) -> Option<PathBuf> {
        self.get_path("PYTHON_INTERPRETER")
    }

    pub fn stream_encoding(&self) -> TextEncoding {
        let raw = self.get("STREAM_ENCODING").unwrap_or_default();
        raw.parse().unwrap_or_else(|e| {
            warn!(value = %raw, error = %e, "ignoring STREAM_ENCODING");
            TextEncoding::default()
        })
    }

    pub fn log_level(&self) -> String {
        self.get("LOG_LEVEL").unwrap_or_else(|| "warn".to_string())
    }
}

fn is_config_key(k: &str) -> bool {
    const KEYS: &[&str] = &["PYTHON_INTERPRETER", "STREAM_ENCODING", "LOG_LEVEL"];

    KEYS.contains(&k)
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("pyinterop").join(".pyinteroprc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();
    m.insert("PYTHON_INTERPRETER".into(), String::new());
    m.insert("STREAM_ENCODING".into(), TextEncoding::default().to_string());
    m.insert("LOG_LEVEL".into(), "warn".into());
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# pyinterop settings").unwrap();
        writeln!(file, "PYINTEROP_TEST_ONLY_KEY = from-file").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "not a pair").unwrap();

        let cfg = Config::load_from(file.path());
        assert_eq!(cfg.get("PYINTEROP_TEST_ONLY_KEY").as_deref(), Some("from-file"));
        assert_eq!(cfg.config_path, file.path());
        assert_eq!(cfg.get("not a pair"), None);
    }

    #[test]
    fn missing_file_keeps_defaults() {
        let cfg = Config::load_from(Path::new("/nonexistent/pyinterop/.pyinteroprc"));
        assert!(cfg.inner.contains_key("STREAM_ENCODING"));
        assert!(default_map().get("PYTHON_INTERPRETER").is_some_and(|v| v.is_empty()));
    }

    #[test]
    fn config_keys_are_filtered() {
        assert!(is_config_key("PYTHON_INTERPRETER"));
        assert!(is_config_key("STREAM_ENCODING"));
        assert!(!is_config_key("PYINTEROP_ANYTHING"));
        assert!(!is_config_key("HOME"));
    }
}
