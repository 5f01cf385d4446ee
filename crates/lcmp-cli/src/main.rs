mod commands;
mod opts;
mod output;
mod report;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::compare::CompareArgs;
use commands::explain::ExplainArgs;
use commands::render::RenderArgs;
use opts::GlobalOpts;

#[derive(Parser, Debug)]
#[command(
    name = "lcmp",
    version,
    about = "Compare Lambda functions between two AWS accounts after a migration"
)]
struct Cli {
    #[command(flatten)]
    opts: GlobalOpts,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch both accounts, match functions and diff every pair
    Compare(CompareArgs),

    /// Render an HTML report from a saved JSON result
    Render(RenderArgs),

    /// Show how naming rules reduce function names to core names
    Explain(ExplainArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let opts = &cli.opts;
    setup_logging(opts);

    match cli.command {
        Command::Compare(args) => commands::compare::cmd_compare(opts, &args).await,
        Command::Render(args) => commands::render::cmd_render(opts, &args),
        Command::Explain(args) => commands::explain::cmd_explain(opts, &args),
    }
}

fn setup_logging(opts: &GlobalOpts) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(opts.default_log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .init();
}
