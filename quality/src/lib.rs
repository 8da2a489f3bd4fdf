pub mod scorer;

pub use scorer::{
    aggregate, bucket_by_hour, hour_label, prepare_output, row_score, score_day, score_rows,
    BucketStart, HourlyAggregate,
};
