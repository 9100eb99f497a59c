//! Binary entry point for the `verge-ip` CLI.

use std::io::{self, IsTerminal, Write};
use std::process;

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use verge_ip::{
    ApiClient, ApiError, ConfigError, CredentialError, CredentialResolver, Credentials,
    LookupError, MachineId, MachineSelector, Poller, VergeConfig, wait_budget,
};

mod cli;

use cli::Cli;

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("credential error: {0}")]
    Credentials(#[from] CredentialError),
    #[error("failed to initialise HTTP client: {0}")]
    Client(ApiError),
    #[error("invalid machine selector: {0}")]
    Selector(String),
    #[error("{0}")]
    Lookup(#[from] LookupError),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let exit_code = match run(&cli).await {
        Ok(addresses) => {
            write_addresses(io::stdout().lock(), &addresses);
            0
        }
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("verge_ip={level}"))),
        )
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .without_time()
        .init();
}

async fn run(cli: &Cli) -> Result<Vec<String>, CliError> {
    let selector = selector_from(cli)?;
    let wait = wait_budget(cli.timeout);

    let config = VergeConfig::load_without_cli_args()?;
    config.validate()?;
    let credentials = Credentials::from_config(&config)?;
    let client = ApiClient::from_config(&config).map_err(CliError::Client)?;

    let poller = Poller::new(client, CredentialResolver::new(credentials))
        .with_poll_interval(config.poll_interval());
    let outcome = poller.run(&selector, wait).await?;
    outcome.into_addresses().map_err(CliError::from)
}

fn selector_from(cli: &Cli) -> Result<MachineSelector, CliError> {
    match (cli.machine_id, cli.machine_name.as_deref()) {
        (Some(id), None) => Ok(MachineSelector::Id(MachineId(id))),
        (None, Some(name)) if !name.trim().is_empty() => {
            Ok(MachineSelector::Name(name.trim().to_owned()))
        }
        (None, Some(_)) => Err(CliError::Selector(String::from(
            "--machine-name must not be empty",
        ))),
        _ => Err(CliError::Selector(String::from(
            "exactly one of --machine-id or --machine-name is required",
        ))),
    }
}

fn write_addresses(mut target: impl Write, addresses: &[String]) {
    for address in addresses {
        writeln!(target, "{address}").ok();
    }
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
