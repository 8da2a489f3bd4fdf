use anyhow::Result;
use chrono::Local;
use clap::Parser;
use common::AppConfig;
use quality::score_day;

mod args;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();
    let opts = args::Opts::parse();
    let config = AppConfig::load(opts.config.as_deref())?;
    let date = opts.date.unwrap_or_else(|| Local::now().date_naive());

    let records = score_day(&config, date).await?;
    if records.is_empty() {
        println!("No complete hour to score on {}", date);
    }
    for record in &records {
        println!("{} {} {:.3}", record.date, record.hour_label, record.score);
    }
    Ok(())
}
