//! Runs Python scripts under one bound interpreter.

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{debug, info};

use super::{ExecutionResult, TextEncoding};
use crate::{
    error::{InteropError, Result},
    process::{
        python::{Interpreter, Locator, Platform},
        ProcessRunner, SystemRunner,
    },
};

/// Binds one interpreter for its whole lifetime and runs scripts with it.
///
/// `execute` mutates nothing, so an engine can be shared across threads.
#[derive(Debug)]
pub struct PythonEngine<R = SystemRunner> {
    interpreter: Interpreter,
    runner: Arc<R>,
    encoding: TextEncoding,
}

impl<R> Clone for PythonEngine<R> {
    fn clone(&self) -> Self {
        Self {
            interpreter: self.interpreter.clone(),
            runner: Arc::clone(&self.runner),
            encoding: self.encoding,
        }
    }
}

impl PythonEngine<SystemRunner> {
    /// Binds the first interpreter found on the search path.
    pub fn new() -> Result<Self> {
        Self::new_with_runner(Platform::current()?, Arc::new(SystemRunner))
    }

    /// Binds `interpreter` without probing it.
    pub fn with_interpreter(interpreter: Interpreter) -> Self {
        Self::with_interpreter_and_runner(interpreter, Arc::new(SystemRunner))
    }
}

impl<R: ProcessRunner + 'static> PythonEngine<R> {
    pub fn new_with_runner(platform: Platform, runner: Arc<R>) -> Result<Self> {
        let locator = Locator::with_runner(platform, Arc::clone(&runner));
        let interpreter = locator.interpreters()?.next().ok_or_else(|| {
            InteropError::InterpreterNotFound(format!(
                "no executable answering `--version` with `Python X.Y.Z` was found ({:?})",
                platform
            ))
        })?;
        info!(%interpreter, "bound default interpreter");
        Ok(Self::with_interpreter_and_runner(interpreter, runner))
    }

    pub fn with_interpreter_and_runner(interpreter: Interpreter, runner: Arc<R>) -> Self {
        Self {
            interpreter,
            runner,
            encoding: TextEncoding::default(),
        }
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Runs `script_path` with `args` and blocks until the child exits.
    ///
    /// A failing script is not an error: inspect [`ExecutionResult::exit_code`].
    /// Arguments are space-joined without quoting, so an argument containing
    /// whitespace reaches the script as several arguments. See [`command_line`].
    pub fn execute<S: AsRef<str>>(&self, script_path: &str, args: &[S]) -> Result<ExecutionResult> {
        let argv = argv(script_path, args);
        run_script(&*self.runner, self.interpreter.path(), &argv, self.encoding)
    }

    /// Same as [`execute`](Self::execute), but the blocking wait runs on tokio's blocking pool.
    ///
    /// The child starts right away. Dropping the returned handle does not stop it.
    /// Outside a tokio runtime this fails with [`InteropError::Background`] and spawns nothing.
    pub fn execute_async<S: AsRef<str>>(
        &self,
        script_path: &str,
        args: &[S],
    ) -> Result<PendingExecution> {
        let runtime = Handle::try_current().map_err(|e| InteropError::Background(e.to_string()))?;
        let argv = argv(script_path, args);
        let runner = Arc::clone(&self.runner);
        let program = self.interpreter.path().to_string();
        let encoding = self.encoding;
        Ok(PendingExecution {
            handle: runtime.spawn_blocking(move || run_script(&*runner, &program, &argv, encoding)),
        })
    }
}

/// Handle to a script running in the background. Resolves to the same result `execute` gives.
#[derive(Debug)]
pub struct PendingExecution {
    handle: JoinHandle<Result<ExecutionResult>>,
}

impl Future for PendingExecution {
    type Output = Result<ExecutionResult>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.handle).poll(cx).map(|joined| {
            joined.map_err(|e| InteropError::Background(e.to_string()))?
        })
    }
}

/// The combined argument string: script path, a space, then the space-joined args.
///
/// The string is later split on whitespace only. Quotes are not special, so `"b c"`
/// arrives as `"b` and `c"`, where a Windows command-line parser would keep it grouped.
pub fn command_line<S: AsRef<str>>(script_path: &str, args: &[S]) -> String {
    let joined = args.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(" ");
    format!("{} {}", script_path, joined)
}

fn argv<S: AsRef<str>>(script_path: &str, args: &[S]) -> Vec<String> {
    command_line(script_path, args)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn run_script<R: ProcessRunner + ?Sized>(
    runner: &R,
    program: &str,
    argv: &[String],
    encoding: TextEncoding,
) -> Result<ExecutionResult> {
    debug!(program, ?argv, %encoding, "executing script");
    let out = runner.run(program, argv)?;
    let result = ExecutionResult::new(
        encoding.decode(&out.stdout),
        encoding.decode(&out.stderr),
        out.exit_code,
    );
    debug!(program, exit_code = result.exit_code(), "script finished");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::fake::ScriptedRunner;

    fn engine(runner: ScriptedRunner) -> PythonEngine<ScriptedRunner> {
        PythonEngine::with_interpreter_and_runner(
            Interpreter::new("py", "3.8.2"),
            Arc::new(runner),
        )
    }

    #[test]
    fn captures_streams_and_exit_code() {
        let engine = engine(ScriptedRunner::new().reply("py hello.py", "hello\n", "", 0));
        let result = engine.execute::<&str>("hello.py", &[]).unwrap();
        assert_eq!(result, ExecutionResult::new("hello\n", "", 0));
    }

    #[test]
    fn failing_script_is_not_an_error() {
        let engine = engine(ScriptedRunner::new().reply(
            "py boom.py --fast",
            "",
            "Traceback (most recent call last):\nValueError\n",
            3,
        ));
        let result = engine.execute("boom.py", &["--fast"]).unwrap();
        assert_eq!(result.exit_code(), 3);
        assert_eq!(result.stderr(), "Traceback (most recent call last):\nValueError\n");
        assert!(!result.success());
    }

    #[test]
    fn missing_interpreter_binary_is_a_spawn_error() {
        let engine = engine(ScriptedRunner::new());
        let err = engine.execute("x.py", &["a"]).unwrap_err();
        assert!(matches!(err, InteropError::Spawn { ref program, .. } if program == "py"));
    }

    #[test]
    fn arguments_are_space_joined_without_quoting() {
        assert_eq!(command_line("run.py", &["a", "b c"]), "run.py a b c");
        assert_eq!(command_line::<&str>("run.py", &[]), "run.py ");
        assert_eq!(argv("run.py", &["a", "b c"]), vec!["run.py", "a", "b", "c"]);
        assert_eq!(argv::<&str>("run.py", &[]), vec!["run.py"]);
    }

    #[test]
    fn default_construction_without_interpreters_fails() {
        let runner = Arc::new(ScriptedRunner::new().reply("where python*.exe", "", "", 1));
        let err = PythonEngine::new_with_runner(Platform::Windows, runner).unwrap_err();
        assert!(matches!(err, InteropError::InterpreterNotFound(_)));
    }

    #[test]
    fn default_construction_binds_first_interpreter() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .reply(
                    "where python*.exe",
                    "bad.exe\r\nC:\\Py\\python.exe\r\nC:\\Py2\\python.exe\r\n",
                    "",
                    0,
                )
                .reply("bad.exe --version", "nope", "", 1)
                .reply("C:\\Py\\python.exe --version", "Python 3.12.0\r\n", "", 0)
                .reply("C:\\Py\\python.exe job.py 1", "done\r\n", "", 0),
        );
        let engine = PythonEngine::new_with_runner(Platform::Windows, Arc::clone(&runner)).unwrap();
        assert_eq!(engine.interpreter(), &Interpreter::new("C:\\Py\\python.exe", "3.12.0"));
        assert!(!runner.calls().iter().any(|c| c.starts_with("C:\\Py2")));

        let result = engine.execute("job.py", &["1"]).unwrap();
        assert_eq!(result.stdout(), "done\r\n");
    }

    #[test]
    fn latin1_engine_decodes_single_bytes() {
        let engine = engine(ScriptedRunner::new().reply_bytes("py enc.py", &[0x63, 0xe9, 0x0a], 0))
            .with_encoding(TextEncoding::Latin1);
        assert_eq!(engine.execute::<&str>("enc.py", &[]).unwrap().stdout(), "c\u{e9}\n");
    }

    #[tokio::test]
    async fn background_result_matches_blocking_result() {
        let engine = engine(ScriptedRunner::new().reply("py job.py x y", "out\n", "warn\n", 7));
        let blocking = engine.execute("job.py", &["x", "y"]).unwrap();
        let background = engine.execute_async("job.py", &["x", "y"]).unwrap().await.unwrap();
        assert_eq!(blocking, background);
    }

    #[test]
    fn background_execution_needs_a_runtime() {
        let runner = ScriptedRunner::new().reply("py job.py", "out\n", "", 0);
        let engine = engine(runner);
        let err = engine.execute_async::<&str>("job.py", &[]).unwrap_err();
        assert!(matches!(err, InteropError::Background(_)));
        assert!(engine.runner.calls().is_empty());
    }

    #[test]
    fn quotes_are_not_grouping_characters() {
        assert_eq!(argv("run.py", &["\"b c\""]), vec!["run.py", "\"b", "c\""]);
    }
}
