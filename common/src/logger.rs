use std::{fmt::Display, marker::PhantomData, path::{Path, PathBuf}};

use anyhow::{Context, Result};
use tokio::{fs::OpenOptions, io::AsyncWriteExt};

/// A flat record that can be stored as one CSV row.
///
/// Usually derived with `#[derive(Logging)]`, which also provides the
/// `Display` impl used to render the row.
pub trait Logging: Sized {
    /// Column names, comma separated and newline terminated.
    fn header() -> String;
    /// Parses one row as rendered by `Display`.
    fn from_record(line: &str) -> Result<Self>;
}

/// Append-only CSV sink. The header is written once, when the file is new or
/// empty.
pub struct Logger<T> {
    path: PathBuf,
    file: tokio::fs::File,
    _record: PhantomData<T>,
}

impl<T: Logging + Display> Logger<T> {
    pub async fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("opening {}", path.display()))?;
        if file.metadata().await?.len() == 0 {
            file.write_all(T::header().as_bytes()).await?;
        }
        Ok(Self {
            path,
            file,
            _record: PhantomData,
        })
    }

    pub async fn log(&mut self, record: &T) -> Result<()> {
        self.file
            .write_all(record.to_string().as_bytes())
            .await
            .with_context(|| format!("appending to {}", self.path.display()))?;
        self.file.flush().await?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Reads every record of a CSV file written by [`Logger`]. The header line and
/// blank lines are skipped.
pub async fn read_records<T: Logging>(path: impl AsRef<Path>) -> Result<Vec<T>> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let header = T::header();
    let header = header.trim_end();

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty() && line.trim_end() != header)
        .map(|(number, line)| {
            T::from_record(line).with_context(|| {
                format!("{}:{}", path.display(), number + 1)
            })
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Logging;

    #[derive(Debug, Clone, PartialEq, Logging)]
    struct Sample {
        name: String,
        value: f64,
        count: u32,
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "common-logger-{}-{}.csv",
            name,
            std::process::id()
        ))
    }

    #[test]
    fn derived_row_shape() {
        let sample = Sample {
            name: "a".to_string(),
            value: 1.5,
            count: 3,
        };
        assert_eq!(Sample::header(), "name,value,count\n");
        assert_eq!(sample.to_string(), "a,1.5,3\n");
        assert_eq!(Sample::from_record("a,1.5,3\n").unwrap(), sample);
    }

    #[test]
    fn malformed_rows_are_rejected() {
        assert!(Sample::from_record("a,1.5").is_err());
        assert!(Sample::from_record("a,abc,3").is_err());
        assert!(Sample::from_record("a,1.5,3,4").is_err());
    }

    #[tokio::test]
    async fn header_written_once() {
        let path = temp_path("header");
        let _ = std::fs::remove_file(&path);

        let first = Sample {
            name: "x".to_string(),
            value: 2.0,
            count: 1,
        };
        let second = Sample {
            name: "y".to_string(),
            value: 0.25,
            count: 2,
        };
        {
            let mut logger = Logger::<Sample>::new(&path).await.unwrap();
            logger.log(&first).await.unwrap();
        }
        {
            let mut logger = Logger::<Sample>::new(&path).await.unwrap();
            logger.log(&second).await.unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "name,value,count\nx,2,1\ny,0.25,2\n");
        let records = read_records::<Sample>(&path).await.unwrap();
        assert_eq!(records, vec![first, second]);
        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let path = temp_path("missing");
        let _ = std::fs::remove_file(&path);
        let err = read_records::<Sample>(&path).await.unwrap_err();
        assert!(err.to_string().contains("reading"));
    }
}
