use clap::{Parser, Subcommand};
use pyinterop::TextEncoding;

#[derive(Parser, Debug, Clone)]
#[command(name = "pyinterop", about = "Find Python interpreters and run scripts", version)]
pub struct Cli {
    /// Log discovery and process activity to stderr.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List every Python interpreter found on the search path.
    List {
        /// Print a JSON array instead of one line per interpreter.
        #[arg(long)]
        json: bool,
    },
    /// Exit 0 if at least one interpreter is installed, 1 otherwise.
    Check,
    /// Run a script and exit with its exit code.
    ///
    /// Arguments are space-joined without quoting: an argument containing
    /// spaces reaches the script as several arguments.
    Run {
        /// Interpreter to use instead of the first one discovered.
        #[arg(long, value_name = "PATH")]
        python: Option<String>,

        /// Decoding for captured output (utf-8 | latin1).
        #[arg(long)]
        encoding: Option<TextEncoding>,

        /// Wait for the script on a background worker.
        #[arg(long)]
        background: bool,

        /// Script to run.
        #[arg(value_name = "SCRIPT")]
        script: String,

        /// Arguments passed to the script.
        #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
