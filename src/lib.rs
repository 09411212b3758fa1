//! Discover installed Python interpreters and run scripts as child processes.
//!
//! ```no_run
//! use pyinterop::PythonEngine;
//!
//! let engine = PythonEngine::new()?;
//! let result = engine.execute("script.py", &["--flag"])?;
//! println!("{} exited with {}", engine.interpreter(), result.exit_code());
//! # Ok::<(), pyinterop::InteropError>(())
//! ```

pub mod config;
pub mod error;
pub mod execution;
pub mod logging;
pub mod process;

pub use error::{InteropError, Result};
pub use execution::{
    python::{PendingExecution, PythonEngine},
    ExecutionResult, TextEncoding,
};
pub use process::{
    python::{
        has_interpreter, interpreters, probe, Interpreter, Interpreters, Locator, Platform,
    },
    ProcessOutput, ProcessRunner, SystemRunner,
};
