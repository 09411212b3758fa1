//! Child process management (spawn/IO/exit status).

use std::{
    process::{Command, ExitStatus, Stdio},
    sync::Arc,
};

use tracing::debug;

use crate::error::{InteropError, Result};

pub mod python;

/// Everything a finished child left behind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: i32,
}

/// Starts a program with redirected streams and blocks until it exits.
///
/// Implementations must not route the command through a shell.
pub trait ProcessRunner: Send + Sync {
    fn run(&self, program: &str, args: &[String]) -> Result<ProcessOutput>;
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for &R {
    fn run(&self, program: &str, args: &[String]) -> Result<ProcessOutput> {
        (**self).run(program, args)
    }
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for Arc<R> {
    fn run(&self, program: &str, args: &[String]) -> Result<ProcessOutput> {
        (**self).run(program, args)
    }
}

/// `ProcessRunner` backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<ProcessOutput> {
        debug!(program, ?args, "spawning process");
        let spawn_err = |source| InteropError::Spawn {
            program: program.to_string(),
            source,
        };

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;

        // wait_with_output closes stdin first and drains both pipes while waiting.
        let out = child.wait_with_output().map_err(spawn_err)?;
        let exit_code = exit_code(out.status);
        debug!(program, exit_code, "process exited");

        Ok(ProcessOutput {
            stdout: out.stdout,
            stderr: out.stderr,
            exit_code,
        })
    }
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}
