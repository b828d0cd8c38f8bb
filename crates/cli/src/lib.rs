pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use billed_core::config::{AppConfig, LoadOptions, LogFormat};
use billed_core::domain::form::NewBillForm;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::bills::BillsArgs;
use crate::commands::new_bill::NewBillArgs;
use crate::commands::{exit, CommandResult};

#[derive(Debug, Parser)]
#[command(
    name = "billed",
    about = "Billed expense report CLI",
    long_about = "List expense reports, submit a new one against the in-memory store, and inspect configuration.",
    after_help = "Examples:\n  billed bills --html\n  billed new-bill --receipt ./test.png --date 2004-04-04 --amount 400\n  billed config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a billed.toml file (must exist)")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "List bills most recent first, as the bills page shows them")]
    Bills {
        #[arg(long, help = "JSON array of bills to list instead of the sample bills")]
        file: Option<PathBuf>,
        #[arg(long, help = "Email of the connected employee")]
        email: Option<String>,
        #[arg(long, help = "Include the rendered HTML page in the output")]
        html: bool,
        #[arg(long, value_name = "STATUS", help = "Make the store reject the listing")]
        simulate_status: Option<u16>,
    },
    #[command(about = "Select a receipt and submit a new bill")]
    NewBill(NewBillCommand),
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

#[derive(Debug, Args)]
struct NewBillCommand {
    #[arg(long, help = "Receipt image to upload")]
    receipt: PathBuf,
    #[arg(long, help = "Declared media type of the receipt (guessed from the extension)")]
    media_type: Option<String>,
    #[arg(long, help = "Email of the connected employee")]
    email: Option<String>,
    #[arg(long = "type", default_value = "", help = "Expense type, e.g. \"Transports\"")]
    expense_type: String,
    #[arg(long, default_value = "")]
    name: String,
    #[arg(long, default_value = "")]
    amount: String,
    #[arg(long, default_value = "", help = "Expense date, YYYY-MM-DD")]
    date: String,
    #[arg(long, default_value = "")]
    vat: String,
    #[arg(long, default_value = "")]
    pct: String,
    #[arg(long, default_value = "")]
    commentary: String,
    #[arg(long, value_name = "STATUS", help = "Make the store reject the creation")]
    simulate_status: Option<u16>,
}

impl From<NewBillCommand> for NewBillArgs {
    fn from(command: NewBillCommand) -> Self {
        Self {
            receipt: command.receipt,
            media_type: command.media_type,
            email: command.email,
            form: NewBillForm {
                expense_type: command.expense_type,
                name: command.name,
                amount: command.amount,
                date: command.date,
                vat: command.vat,
                pct: command.pct,
                commentary: command.commentary,
            },
            simulate_status: command.simulate_status,
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => commands::config::run(cli.config.as_deref()),
        Command::Bills { file, email, html, simulate_status } => {
            with_config(cli.config, |config| {
                commands::bills::run(config, &BillsArgs { file, email, html, simulate_status })
            })
        }
        Command::NewBill(args) => {
            with_config(cli.config, |config| commands::new_bill::run(config, &args.into()))
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn with_config(
    path: Option<PathBuf>,
    command: impl FnOnce(&AppConfig) -> CommandResult,
) -> CommandResult {
    match load_config(path) {
        Ok(config) => {
            init_logging(&config);
            let result = command(&config);
            tracing::info!(
                event_name = "cli.command.finished",
                exit_code = result.exit_code,
                "command finished"
            );
            result
        }
        Err(error) => CommandResult::failure(
            "config",
            "config_validation",
            format!("{error:#}"),
            exit::INPUT,
        ),
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<AppConfig> {
    let require_file = path.is_some();
    let options = LoadOptions { config_path: path, require_file, ..LoadOptions::default() };
    Ok(AppConfig::load(options)?)
}

/// Logs go to stderr so that stdout stays a single JSON document.
pub fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
