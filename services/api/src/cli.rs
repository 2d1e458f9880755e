use crate::report::{run_import, run_report, ImportArgs, ReportArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use loyalty_ledger::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Gold Loyalty Ledger",
    about = "Serve, import, and report on the gold jewelry loyalty points ledger",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Import a sales export, recompute points, apply claims, and print the ledger
    Import(ImportArgs),
    /// Print the points report for a sales export without applying claims
    Report(ReportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Import(args) => run_import(args),
        Command::Report(args) => run_report(args),
    }
}
