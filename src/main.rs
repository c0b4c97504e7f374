use vinfra::commands::{create_cli_commands, PARAMETER_DEBUG};
use vinfra::error::VinfraError;
use vinfra::exit_codes::VinfraExitCode;
use vinfra::logging::LoggingConfig;

mod cli;
use cli::execute_command;

/// Main entry point for the program
#[tokio::main]
async fn main() {
    let matches = create_cli_commands();

    // Initialize the logging subsystem
    let logging = LoggingConfig::from_environment(matches.get_flag(PARAMETER_DEBUG));
    if let Err(e) = logging.init() {
        eprintln!("Error: {}", e.user_message());
        std::process::exit(e.exit_code().code());
    }

    let outcome = tokio::select! {
        result = execute_command(&matches) => result,
        _ = tokio::signal::ctrl_c() => Err(VinfraError::Interrupted),
    };

    match outcome {
        Ok(()) => {}
        Err(VinfraError::BrokenPipe) => std::process::exit(VinfraExitCode::BrokenPipe.code()),
        Err(e) => {
            tracing::debug!("Command failed: {:?}", e);
            eprintln!("Error: {}", e.user_message());
            std::process::exit(e.exit_code().code());
        }
    }
}
