use super::Group;
use crate::overrides::Override;

/// A configuration together with how it was assembled.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig<T> {
    /// The final configuration.
    pub config: T,

    /// Presets selected on the command line, in order.
    pub presets: Vec<(Group, String)>,

    /// Overrides applied on top of the presets, in order.
    pub overrides: Vec<Override>,

    keys: Vec<String>,
}

impl<T> ResolvedConfig<T> {
    pub(crate) fn new(
        config: T,
        presets: Vec<(Group, String)>,
        overrides: Vec<Override>,
        keys: Vec<String>,
    ) -> Self {
        Self {
            config,
            presets,
            overrides,
            keys,
        }
    }

    /// Keys set on the command line, preset groups included, without repeats.
    pub fn keys(&self) -> Vec<&str> {
        self.keys.iter().map(String::as_str).collect()
    }

    /// Whether the key was set on the command line.
    pub fn is_overridden(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }
}

/// Appends `key` unless it is already present.
pub(crate) fn push_key(keys: &mut Vec<String>, key: String) {
    if !keys.contains(&key) {
        keys.push(key);
    }
}
