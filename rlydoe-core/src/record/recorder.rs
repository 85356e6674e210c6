use super::Record;
use anyhow::Result;

/// Writes records to an output destination.
pub trait Recorder {
    /// Writes a record.
    fn write(&mut self, record: Record) -> Result<()>;

    /// Makes written records durable.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
