//! Python interpreter discovery: platform search command plus `--version` probe.

use std::{
    env,
    ffi::{OsStr, OsString},
    fmt,
};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use super::{ProcessRunner, SystemRunner};
use crate::error::{InteropError, Result};

static PYTHON_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Python (\d+)\.(\d+)\.(\d+)$").expect("valid version regex"));

const VERSION_PREFIX: &str = "Python ";
const VERSION_FLAG: &str = "--version";

/// Placeholder in a discovery template; expands to one argument per `PATH` entry.
pub const PATH_TOKEN: &str = "$PATH";

/// A Python executable whose `--version` output has been checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Interpreter {
    path: String,
    version: String,
}

impl Interpreter {
    /// Builds an interpreter without probing it. Engines trust such values as-is.
    pub fn new(path: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            version: version.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// `MAJOR.MINOR.PATCH`, e.g. `3.8.2`.
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn version_parts(&self) -> Option<(u32, u32, u32)> {
        let mut it = self.version.split('.').map(|p| p.parse::<u32>().ok());
        match (it.next()??, it.next()??, it.next()??, it.next()) {
            (major, minor, patch, None) => Some((major, minor, patch)),
            _ => None,
        }
    }
}

impl fmt::Display for Interpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Python {} ({})", self.version, self.path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Windows,
    Linux,
    MacOs,
}

/// Search command and its argument template for one platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryCommand {
    pub program: &'static str,
    pub template: &'static [&'static str],
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Windows, Platform::Linux, Platform::MacOs];

    pub fn current() -> Result<Self> {
        if cfg!(target_os = "windows") {
            Ok(Platform::Windows)
        } else if cfg!(target_os = "linux") {
            Ok(Platform::Linux)
        } else if cfg!(target_os = "macos") {
            Ok(Platform::MacOs)
        } else {
            Err(InteropError::UnsupportedPlatform(env::consts::OS.to_string()))
        }
    }

    pub fn discovery(self) -> DiscoveryCommand {
        match self {
            Platform::Windows => DiscoveryCommand {
                program: "where",
                template: &["python*.exe"],
            },
            Platform::Linux => DiscoveryCommand {
                program: "find",
                template: &[
                    "-L", PATH_TOKEN, "-maxdepth", "1", "-type", "f", "-executable", "-name",
                    "python*",
                ],
            },
            // BSD find has no -executable.
            Platform::MacOs => DiscoveryCommand {
                program: "find",
                template: &[
                    "-L", PATH_TOKEN, "-maxdepth", "1", "-type", "f", "-perm", "-u+x", "-name",
                    "python*",
                ],
            },
        }
    }
}

impl DiscoveryCommand {
    /// Expands the template against a search-path value.
    ///
    /// Returns `None` when the template needs directories but the search path has none,
    /// so the caller never runs `find` with no start points.
    pub fn expand(&self, search_path: Option<&OsStr>) -> Option<Vec<String>> {
        if !self.template.contains(&PATH_TOKEN) {
            return Some(self.template.iter().map(|s| s.to_string()).collect());
        }

        let dirs: Vec<String> = search_path
            .map(|p| {
                env::split_paths(p)
                    .filter(|d| !d.as_os_str().is_empty())
                    .map(|d| start_point(&d.to_string_lossy()))
                    .collect()
            })
            .unwrap_or_default();
        if dirs.is_empty() {
            return None;
        }

        let mut args = Vec::with_capacity(self.template.len() + dirs.len());
        for part in self.template {
            if *part == PATH_TOKEN {
                args.extend(dirs.iter().cloned());
            } else {
                args.push(part.to_string());
            }
        }
        Some(args)
    }
}

/// `find` reads a start point beginning with `-`, `(`, `)` or `!` as part of its expression.
fn start_point(dir: &str) -> String {
    if dir.starts_with(['-', '(', ')', '!']) {
        format!("./{}", dir)
    } else {
        dir.to_string()
    }
}

/// Splits search-command output into candidate paths, dropping blank lines.
pub fn parse_candidates(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// Extracts `X.Y.Z` from a version probe. Stdout wins over stderr.
pub fn parse_version(stdout: &str, stderr: &str) -> Option<String> {
    match_version(stdout).or_else(|| match_version(stderr))
}

fn match_version(text: &str) -> Option<String> {
    let cleaned: String = text.chars().filter(|c| !matches!(c, '\r' | '\n')).collect();
    if PYTHON_VERSION.is_match(&cleaned) {
        Some(cleaned[VERSION_PREFIX.len()..].to_string())
    } else {
        None
    }
}

/// Finds Python interpreters on the search path.
///
/// Nothing is cached: every call to [`Locator::interpreters`] re-runs the search command
/// and re-probes every candidate, so results follow changes to the system.
#[derive(Debug, Clone)]
pub struct Locator<R = SystemRunner> {
    platform: Platform,
    runner: R,
    search_path: Option<OsString>,
}

impl Locator<SystemRunner> {
    pub fn new() -> Result<Self> {
        Ok(Self::with_runner(Platform::current()?, SystemRunner))
    }
}

impl<R: ProcessRunner + Clone> Locator<R> {
    pub fn with_runner(platform: Platform, runner: R) -> Self {
        Self {
            platform,
            runner,
            search_path: None,
        }
    }

    /// Pins the search path instead of reading `PATH` at each enumeration.
    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Runs the search command and returns a lazy iterator over validated interpreters.
    ///
    /// Candidates are probed one at a time as the iterator advances.
    pub fn interpreters(&self) -> Result<Interpreters<R>> {
        let candidates = self.candidates()?;
        Ok(Interpreters {
            locator: self.clone(),
            candidates: candidates.into_iter(),
        })
    }

    /// True iff at least one candidate validates. Stops probing at the first hit.
    pub fn has_interpreter(&self) -> Result<bool> {
        Ok(self.interpreters()?.next().is_some())
    }

    /// Runs `path --version` and returns an interpreter if the reply matches `Python X.Y.Z`.
    pub fn probe(&self, path: &str) -> Option<Interpreter> {
        probe(&self.runner, path)
    }

    fn candidates(&self) -> Result<Vec<String>> {
        let discovery = self.platform.discovery();
        let search_path = self.search_path.clone().or_else(|| env::var_os("PATH"));
        let Some(args) = discovery.expand(search_path.as_deref()) else {
            info!(platform = ?self.platform, "search path is empty, no candidates");
            return Ok(Vec::new());
        };

        debug!(program = discovery.program, ?args, "running discovery command");
        let out = self.runner.run(discovery.program, &args)?;
        let candidates = parse_candidates(&String::from_utf8_lossy(&out.stdout));
        debug!(count = candidates.len(), exit_code = out.exit_code, "discovery finished");
        Ok(candidates)
    }
}

/// Lazy, finite sequence of interpreters in discovery order.
pub struct Interpreters<R = SystemRunner> {
    locator: Locator<R>,
    candidates: std::vec::IntoIter<String>,
}

impl<R: ProcessRunner + Clone> Iterator for Interpreters<R> {
    type Item = Interpreter;

    fn next(&mut self) -> Option<Interpreter> {
        for candidate in self.candidates.by_ref() {
            if let Some(interpreter) = self.locator.probe(&candidate) {
                return Some(interpreter);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.candidates.len()))
    }
}

/// Validates one path with `--version`. Needs no platform, unlike discovery.
pub fn probe<R: ProcessRunner + ?Sized>(runner: &R, path: &str) -> Option<Interpreter> {
    let out = match runner.run(path, &[VERSION_FLAG.to_string()]) {
        Ok(out) => out,
        Err(e) => {
            debug!(candidate = path, error = %e, "skipping candidate");
            return None;
        }
    };
    let stdout = String::from_utf8_lossy(&out.stdout);
    let stderr = String::from_utf8_lossy(&out.stderr);
    match parse_version(&stdout, &stderr) {
        Some(version) => {
            debug!(candidate = path, %version, "validated interpreter");
            Some(Interpreter::new(path, version))
        }
        None => {
            debug!(candidate = path, "no python version in probe output");
            None
        }
    }
}

/// Interpreters visible to the system locator.
pub fn interpreters() -> Result<Interpreters> {
    Locator::new()?.interpreters()
}

pub fn has_interpreter() -> Result<bool> {
    Locator::new()?.has_interpreter()
}
