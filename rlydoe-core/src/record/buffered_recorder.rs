use super::{Record, Recorder};
use anyhow::Result;

/// Keeps records in memory, in the order they were written.
#[derive(Debug, Default)]
pub struct BufferedRecorder {
    buf: Vec<Record>,
}

impl BufferedRecorder {
    /// Construct the recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an iterator over the records.
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.buf.iter()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether no record has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl Recorder for BufferedRecorder {
    fn write(&mut self, record: Record) -> Result<()> {
        self.buf.push(record);
        Ok(())
    }
}
