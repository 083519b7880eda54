mod check;
mod cli;
mod runtime;
mod utils;

use clap::Parser;
use std::io::IsTerminal;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use check::Settings;
use cli::{Cli, Commands};
use runtime::DockerCli;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // usage errors exit 1; --help / --version exit 0
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    init_tracing(cli.verbose);

    let runner = DockerCli::new(cli.runtime);
    let settings = Settings {
        dockerfile: cli.dockerfile,
        timeout: Duration::from_secs(cli.timeout),
        color: std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    };

    let result = match cli.command {
        Commands::SecurityCheck { image, binary_path } => {
            check::run_security_check(&runner, &settings, &image, binary_path.as_deref())
                .map(|report| report.exit_code())
        }
        Commands::CertificateCheck { container, strict } => {
            check::run_certificate_check(&runner, &settings, &container)
                .map(|report| if strict { report.exit_code() } else { 0 })
        }
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
