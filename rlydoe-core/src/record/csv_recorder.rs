use super::{Record, Recorder};
use anyhow::{Context, Result};
use log::info;
use std::{
    fs::{File, OpenOptions},
    path::{Path, PathBuf},
};

/// Appends records as rows of a CSV file.
///
/// Columns are fixed when the recorder is created. Keys of a record that are
/// not columns are dropped and missing keys are left empty. The header row is
/// written only when the file is new or empty, so one ledger can collect the
/// rows of several sessions.
pub struct CsvRecorder {
    writer: csv::Writer<File>,
    columns: Vec<String>,
    path: PathBuf,
}

impl CsvRecorder {
    /// Opens `path` for appending.
    pub fn new<S: AsRef<str>>(path: impl AsRef<Path>, columns: &[S]) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open run ledger {:?}", path))?;
        let is_new = file.metadata()?.len() == 0;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        let columns: Vec<String> = columns.iter().map(|c| c.as_ref().to_string()).collect();

        if is_new {
            writer.write_record(&columns)?;
            writer.flush()?;
            info!("Created run ledger {:?}", path);
        }

        Ok(Self {
            writer,
            columns,
            path,
        })
    }

    /// Path of the CSV file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Recorder for CsvRecorder {
    fn write(&mut self, record: Record) -> Result<()> {
        let row: Vec<String> = self
            .columns
            .iter()
            .map(|c| record.get(c).map(ToString::to_string).unwrap_or_default())
            .collect();
        self.writer
            .write_record(&row)
            .with_context(|| format!("Failed to write to {:?}", self.path))?;
        // rows must survive an interrupted session
        self.writer.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordValue;
    use tempdir::TempDir;

    #[test]
    fn test_append_rows() -> Result<()> {
        let dir = TempDir::new("csv_recorder")?;
        let path = dir.path().join("ledger.csv");
        let columns = ["index", "command", "exit_code"];

        {
            let mut recorder = CsvRecorder::new(&path, &columns)?;
            let mut record = Record::from_scalar("index", 0.0);
            record.insert(
                "command",
                RecordValue::String("python trainer-sb3.py learner=sac".into()),
            );
            record.insert("exit_code", RecordValue::Scalar(1.0));
            record.insert("ignored", RecordValue::Scalar(9.0));
            recorder.write(record)?;
        }
        {
            // header is not repeated when reopening
            let mut recorder = CsvRecorder::new(&path, &columns)?;
            recorder.write(Record::from_scalar("index", 1.0))?;
        }

        let content = std::fs::read_to_string(&path)?;
        assert_eq!(
            content,
            "index,command,exit_code\n\
             0,python trainer-sb3.py learner=sac,1\n\
             1,,\n"
        );
        Ok(())
    }
}
