use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about = "Per-hour quality scores from a day of probe results")]
pub struct Opts {
    /// Day to score as YYYY-MM-DD, today when omitted
    #[arg(long)]
    pub date: Option<NaiveDate>,
    /// JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
}
