//! Records of launched runs and the recorders that keep them.
//!
//! A [`Record`] is a flat map from keys to [`RecordValue`]s. The sequencer
//! creates one record per invocation (command, status, exit code, timing) and
//! hands it to a [`Recorder`]:
//!
//! * [`BufferedRecorder`] keeps records in memory,
//! * [`NullRecorder`] discards them,
//! * [`CsvRecorder`] appends them to a CSV run ledger.
//!
//! ```rust
//! use rlydoe_core::record::{Record, RecordValue};
//!
//! let mut record = Record::empty();
//! record.insert("index", RecordValue::Scalar(0.0));
//! record.insert("status", RecordValue::String("succeeded".to_string()));
//! assert_eq!(record.get_string("status").unwrap(), "succeeded");
//! ```
mod base;
mod buffered_recorder;
mod csv_recorder;
mod null_recorder;
mod recorder;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use csv_recorder::CsvRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::Recorder;
