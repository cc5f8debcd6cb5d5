use analysis_core::Exchange;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about = "Market beta and peer comparison for listed stocks", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute beta for a ticker against its exchange index, with ranked peers.
    Analyze {
        /// Ticker with or without an exchange suffix, e.g. TCS or TCS.NS
        ticker: String,

        /// Listing exchange: nse, bse or us
        #[arg(long, short, default_value = "nse")]
        exchange: Exchange,

        /// First date of the window (YYYY-MM-DD); defaults to one year before --to
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last date of the window (YYYY-MM-DD); defaults to today
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Do not record the result in the search history
        #[arg(long)]
        no_history: bool,
    },

    /// Print recently stored analyses (requires DATABASE_URL).
    History {
        #[arg(long, short, default_value_t = 10)]
        limit: usize,
    },
}
