//! Execution engine: result and stream decoding types.

use std::{fmt, str::FromStr};

use serde::Serialize;

pub mod python;

/// Outcome of one script run. Built once, after the child exited and both streams drained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    stdout: String,
    stderr: String,
    exit_code: i32,
}

impl ExecutionResult {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn into_parts(self) -> (String, String, i32) {
        (self.stdout, self.stderr, self.exit_code)
    }
}

/// Decoding applied to captured stdout/stderr bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextEncoding {
    /// Invalid sequences become U+FFFD.
    #[default]
    Utf8,
    /// ISO-8859-1: one byte, one char. Never fails.
    Latin1,
}

impl TextEncoding {
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            TextEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            TextEncoding::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextEncoding::Utf8 => f.write_str("utf-8"),
            TextEncoding::Latin1 => f.write_str("latin1"),
        }
    }
}

impl FromStr for TextEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            "latin1" | "latin-1" | "iso-8859-1" => Ok(TextEncoding::Latin1),
            other => Err(format!("unknown encoding '{}' (expected utf-8 or latin1)", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_keeps_text_and_replaces_garbage() {
        assert_eq!(TextEncoding::Utf8.decode("héllo\n".as_bytes()), "héllo\n");
        assert_eq!(TextEncoding::Utf8.decode(&[b'a', 0xff, b'b']), "a\u{fffd}b");
    }

    #[test]
    fn latin1_maps_bytes_to_chars() {
        assert_eq!(TextEncoding::Latin1.decode(&[b'c', 0xe9, b'\n']), "c\u{e9}\n");
    }

    #[test]
    fn encoding_names_parse() {
        assert_eq!("UTF-8".parse::<TextEncoding>(), Ok(TextEncoding::Utf8));
        assert_eq!("iso-8859-1".parse::<TextEncoding>(), Ok(TextEncoding::Latin1));
        assert!("cp1251".parse::<TextEncoding>().is_err());
        assert_eq!(TextEncoding::Latin1.to_string().parse(), Ok(TextEncoding::Latin1));
    }

    #[test]
    fn success_follows_exit_code() {
        assert!(ExecutionResult::new("", "", 0).success());
        assert!(!ExecutionResult::new("", "boom", 3).success());
    }
}
