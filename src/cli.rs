use crate::console::ConsoleEncoding;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Run a command and turn any failure into a logged diagnostic report."
)]
pub struct Cli {
    /// Directory that holds the error log.
    /// Defaults to $FAILGUARD_HOME, then the user cache directory.
    #[arg(long, value_name = "DIR")]
    pub home: Option<PathBuf>,

    /// How to render reports on the console.
    /// Defaults to what the locale (LC_ALL, LC_CTYPE, LANG) supports.
    #[arg(long, value_enum)]
    pub console_encoding: Option<ConsoleEncoding>,

    /// Print debug logging to stderr
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// The command to run, followed by its arguments.
    #[arg(
        required = true,
        value_name = "COMMAND",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}
