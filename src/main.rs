use clap::Parser;
use failguard::cli::Cli;
use failguard::console::{ConsoleEncoding, StderrConsole};
use failguard::error::CommandError;
use failguard::interrupt;
use failguard::logging::{init_logging, LogConfig};
use failguard::store::Store;
use failguard::{ErrorHandler, Reporter, ToolInfo};

fn main() {
    // Ctrl-C from here on is reported, not fatal
    let handler = interrupt::install();

    // Parse command-line arguments
    let cli = Cli::parse();

    let tool = ToolInfo::current();
    let store = Store::for_tool(&tool.name, cli.home.clone());
    let console = StderrConsole::new(cli.console_encoding.unwrap_or_else(ConsoleEncoding::detect));

    // Everything from here on runs inside the guarded region
    ErrorHandler::new(Reporter::new(tool, store, console)).run(|| {
        handler.map_err(CommandError::from)?;
        init_logging(LogConfig::from_verbosity(cli.verbose))?;
        failguard::run(&cli)
    });
}
