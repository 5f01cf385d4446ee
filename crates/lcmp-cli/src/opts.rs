//! Global CLI options.

use clap::Args;

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// JSON output envelope
    #[arg(long, global = true)]
    pub json: bool,

    /// Pretty-print JSON output (implies --json)
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Only log warnings and errors; suppress the narrative report
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

impl GlobalOpts {
    pub fn wants_json(&self) -> bool {
        self.json || self.pretty
    }

    /// Log filter used when `RUST_LOG` is unset.
    pub fn default_log_filter(&self) -> &'static str {
        if self.quiet { "warn" } else { "info" }
    }
}
