//! Errors in the library.
use thiserror::Error;

/// Errors raised while assembling a training configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The token has no `=` or nothing after it.
    #[error("Override `{0}` has no value, expected <key>=<value>")]
    MissingValue(String),

    /// A key path with an empty or invalid segment.
    #[error("Malformed key path `{0}`")]
    MalformedKey(String),

    /// The key path does not name a field of the configuration.
    #[error("Unknown key `{0}`")]
    UnknownKey(String),

    /// A preset group was selected with a name the catalog does not know.
    #[error("Unknown preset `{name}` for group `{group}`")]
    UnknownPreset {
        /// Preset group, e.g. `learner`.
        group: String,
        /// Requested preset name.
        name: String,
    },

    /// The value does not fit the type of the field.
    #[error("Invalid value `{value}` for `{key}`: {reason}")]
    InvalidValue {
        /// Dotted key path.
        key: String,
        /// Raw value token.
        value: String,
        /// Message from the deserializer.
        reason: String,
    },

    /// The configuration could not be turned into a tree of values.
    #[error("Failed to serialize configuration: {0}")]
    Serialize(String),

    /// A preset file could not be read or parsed.
    #[error("Failed to load preset {path}: {reason}")]
    PresetFile {
        /// Path of the preset file.
        path: String,
        /// Underlying error.
        reason: String,
    },
}

/// Errors when accessing values of a [`Record`](crate::record::Record).
#[derive(Error, Debug)]
pub enum RecordError {
    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),
}
