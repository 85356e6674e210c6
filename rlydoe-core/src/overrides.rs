//! Dotted key/value overrides and their application to typed configurations.
//!
//! An override is a command-line token such as `learner.total_timesteps=40000000`.
//! It is applied to a configuration by serializing the configuration into a tree
//! of [`serde_yaml::Value`]s, replacing the leaf named by the key path, and
//! deserializing the tree back. A key path that does not name an existing leaf
//! is rejected, as is a value the field type cannot hold.
use crate::error::ConfigError;
use serde::{de::DeserializeOwned, Serialize};
use serde_yaml::Value;
use std::{fmt, str::FromStr};

/// A dotted path into a configuration, e.g. `learner.policy_type`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyPath(Vec<String>);

impl KeyPath {
    /// Segments of the path.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`, a parsed path has at least one segment.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The first segment.
    pub fn first(&self) -> &str {
        &self.0[0]
    }
}

fn is_valid_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        }
        _ => false,
    }
}

impl FromStr for KeyPath {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Vec<String> = s.split('.').map(str::to_string).collect();
        if segments.iter().all(|seg| is_valid_segment(seg)) {
            Ok(Self(segments))
        } else {
            Err(ConfigError::MalformedKey(s.to_string()))
        }
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// Scalar value of an override.
#[derive(Debug, Clone, PartialEq)]
pub enum OverrideValue {
    /// `null`, `None` or `~`: turns an optional feature off.
    Disabled,

    /// `true` or `false`, in any case.
    Bool(bool),

    /// Integer literal.
    Int(i64),

    /// Floating point literal.
    Float(f64),

    /// Any other token.
    Str(String),
}

impl OverrideValue {
    /// Interprets a bare value token.
    pub fn parse(token: &str) -> Self {
        match token {
            "null" | "None" | "~" => return Self::Disabled,
            _ => {}
        }
        if token.eq_ignore_ascii_case("true") {
            return Self::Bool(true);
        }
        if token.eq_ignore_ascii_case("false") {
            return Self::Bool(false);
        }
        if let Ok(v) = token.parse::<i64>() {
            return Self::Int(v);
        }
        // `inf` and `nan` parse as floats but are environment-ish names here
        if token.chars().any(|c| c.is_ascii_digit()) {
            if let Ok(v) = token.parse::<f64>() {
                return Self::Float(v);
            }
        }
        Self::Str(token.to_string())
    }

    fn to_yaml(&self) -> Value {
        match self {
            Self::Disabled => Value::Null,
            Self::Bool(v) => Value::Bool(*v),
            Self::Int(v) => Value::Number((*v).into()),
            Self::Float(v) => Value::Number((*v).into()),
            Self::Str(v) => Value::String(v.clone()),
        }
    }
}

/// A single `<key>=<value>` override.
#[derive(Debug, Clone, PartialEq)]
pub struct Override {
    /// Key path of the field to replace.
    pub key: KeyPath,

    /// Interpreted value.
    pub value: OverrideValue,

    raw: String,
}

impl Override {
    /// Constructs an override from a key path and a raw value token.
    pub fn new(key: KeyPath, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        Self {
            key,
            value: OverrideValue::parse(&raw),
            raw,
        }
    }

    /// Parses a Hydra-style token, `learner.total_timesteps=1000`.
    pub fn parse(token: &str) -> Result<Self, ConfigError> {
        let (key, raw) = token
            .split_once('=')
            .ok_or_else(|| ConfigError::MissingValue(token.to_string()))?;
        if raw.is_empty() {
            return Err(ConfigError::MissingValue(token.to_string()));
        }
        Ok(Self::new(key.parse()?, raw))
    }

    /// Parses a flag token, `--lr=0.001`. A bare `--render` means `true`.
    pub fn parse_flag(token: &str) -> Result<Self, ConfigError> {
        let body = token
            .strip_prefix("--")
            .ok_or_else(|| ConfigError::MalformedKey(token.to_string()))?;
        match body.split_once('=') {
            Some((_, "")) => Err(ConfigError::MissingValue(token.to_string())),
            Some((key, raw)) => Ok(Self::new(key.parse()?, raw)),
            None => Ok(Self::new(body.parse()?, "true")),
        }
    }

    /// The value token as written on the command line.
    pub fn raw_value(&self) -> &str {
        &self.raw
    }
}

impl FromStr for Override {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Override {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.raw)
    }
}

/// `(0.9, 0.999)` or `[0.9, 0.999]`.
fn parse_sequence(raw: &str) -> Option<Value> {
    let inner = raw
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .or_else(|| raw.strip_prefix('[').and_then(|s| s.strip_suffix(']')))?;
    let items = inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| OverrideValue::parse(s).to_yaml())
        .collect();
    Some(Value::Sequence(items))
}

/// Converts the override to a node shaped like the one it replaces.
fn coerce(existing: &Value, o: &Override) -> Value {
    match (existing, &o.value) {
        (Value::Bool(_), OverrideValue::Disabled) => Value::Bool(false),
        (_, OverrideValue::Disabled) => Value::Null,
        (Value::String(_), _) => Value::String(o.raw.clone()),
        (Value::Sequence(_), v) => parse_sequence(&o.raw).unwrap_or_else(|| v.to_yaml()),
        (_, v) => v.to_yaml(),
    }
}

fn set_leaf(tree: &mut Value, o: &Override) -> Result<(), ConfigError> {
    let unknown = || ConfigError::UnknownKey(o.key.to_string());
    let mut node = tree;
    for segment in o.key.segments() {
        node = match node {
            Value::Mapping(map) => map
                .get_mut(&Value::String(segment.clone()))
                .ok_or_else(unknown)?,
            _ => return Err(unknown()),
        };
    }
    if let Value::Mapping(_) = node {
        // a whole section, not a value
        return Err(unknown());
    }
    *node = coerce(node, o);
    Ok(())
}

/// Applies `overrides` on top of `base`, left to right, so later keys win.
///
/// Each override is checked against the field type as soon as it is applied,
/// so the error names the offending key.
pub fn apply_overrides<T>(base: &T, overrides: &[Override]) -> Result<T, ConfigError>
where
    T: Serialize + DeserializeOwned,
{
    let mut tree =
        serde_yaml::to_value(base).map_err(|e| ConfigError::Serialize(e.to_string()))?;

    for o in overrides {
        set_leaf(&mut tree, o)?;
        serde_yaml::from_value::<T>(tree.clone()).map_err(|e| ConfigError::InvalidValue {
            key: o.key.to_string(),
            value: o.raw.clone(),
            reason: e.to_string(),
        })?;
    }

    serde_yaml::from_value(tree).map_err(|e| ConfigError::Serialize(e.to_string()))
}
