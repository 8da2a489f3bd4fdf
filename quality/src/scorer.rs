use anyhow::Result;
use chrono::NaiveDate;
use common::{read_records, AppConfig, Logger, QualityScoreRecord, SessionResult};
use log::{debug, info, warn};

/// Where a new hour starts in a day's rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketStart {
    pub index: usize,
    /// Two-digit hour taken from the row timestamp.
    pub hour: String,
}

/// Mean score of the rows of one hour.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyAggregate {
    pub hour: String,
    pub rows: usize,
    pub score: f64,
}

/// `avg_rtt / 2 + bandwidth * 1000 + loss + jitter * 100`
pub fn row_score(row: &SessionResult) -> f64 {
    row.avg_rtt_ms / 2.0 + row.bandwidth * 1000.0 + row.loss_rate_pct + row.jitter * 100.0
}

/// `"00:00"` .. `"23:00"`
pub fn hour_label(hour: u32) -> String {
    format!("{:02}:00", hour)
}

/// Records the index of the first row of every hour not seen before. Rows are
/// expected in file order.
pub fn bucket_by_hour(rows: &[SessionResult]) -> Vec<BucketStart> {
    let mut starts: Vec<BucketStart> = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        let hour = row.hour().unwrap_or_default();
        if starts.iter().all(|start| start.hour != hour) {
            starts.push(BucketStart {
                index,
                hour: hour.to_string(),
            });
        }
    }
    starts
}

/// Averages the row scores between consecutive bucket starts. A bucket covers
/// rows `[start, next_start - 1)`, so the last row before the next hour and
/// the final bucket are left out. Buckets left without rows are skipped.
pub fn aggregate(rows: &[SessionResult], starts: &[BucketStart]) -> Vec<HourlyAggregate> {
    starts
        .windows(2)
        .filter_map(|pair| {
            let (start, next) = (&pair[0], &pair[1]);
            let stop = next.index.saturating_sub(1).min(rows.len());
            let bucket = rows.get(start.index..stop).unwrap_or_default();
            if bucket.is_empty() {
                debug!("hour {:?} has no rows to score", start.hour);
                return None;
            }
            let total: f64 = bucket.iter().map(row_score).sum();
            Some(HourlyAggregate {
                hour: start.hour.clone(),
                rows: bucket.len(),
                score: total / bucket.len() as f64,
            })
        })
        .collect()
}

/// Turns aggregates into score records for `date`, labelled by the hour they
/// were measured in.
pub fn prepare_output(date: NaiveDate, aggregates: &[HourlyAggregate]) -> Vec<QualityScoreRecord> {
    aggregates
        .iter()
        .filter_map(|aggregate| match aggregate.hour.parse::<u32>() {
            Ok(hour) if hour < 24 => Some(QualityScoreRecord {
                date,
                hour_label: hour_label(hour),
                score: aggregate.score,
            }),
            _ => {
                warn!("skipping rows with unusable hour {:?}", aggregate.hour);
                None
            }
        })
        .collect()
}

pub fn score_rows(date: NaiveDate, rows: &[SessionResult]) -> Vec<QualityScoreRecord> {
    let starts = bucket_by_hour(rows);
    prepare_output(date, &aggregate(rows, &starts))
}

/// Scores the daily file of `date` and appends the result to the score store.
/// A missing or unreadable daily file is an error.
pub async fn score_day(config: &AppConfig, date: NaiveDate) -> Result<Vec<QualityScoreRecord>> {
    let daily = config.daily_file(date);
    let rows = read_records::<SessionResult>(&daily).await?;
    info!("read {} session results from {}", rows.len(), daily.display());

    let records = score_rows(date, &rows);
    let mut logger = Logger::<QualityScoreRecord>::new(config.score_path()).await?;
    for record in &records {
        logger.log(record).await?;
    }
    info!(
        "appended {} quality scores to {}",
        records.len(),
        logger.path().display()
    );
    Ok(records)
}
