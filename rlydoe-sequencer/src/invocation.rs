use chrono::{DateTime, Local};
use rlydoe_core::{
    experiment_name, ConfigError, PpgConfig, PresetCatalog, ResolvedConfig, TrainConfig,
};
use std::{fmt, path::Path};

/// Trainer entry points recognised in a run script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerKind {
    /// `trainer-sb3.py`, configured by presets and dotted overrides.
    Sb3,

    /// `ppg.py`, configured by `--key=value` flags.
    Ppg,
}

impl TrainerKind {
    /// File name of the entry point.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Sb3 => "trainer-sb3.py",
            Self::Ppg => "ppg.py",
        }
    }

    /// Recognises a word of a command line by its file name.
    pub fn from_word(word: &str) -> Option<Self> {
        let file_name = Path::new(word).file_name()?.to_str()?;
        [Self::Sb3, Self::Ppg]
            .into_iter()
            .find(|kind| kind.file_name() == file_name)
    }
}

impl fmt::Display for TrainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// One logical command of a run script.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// Position among the invocations of the script, from 0.
    pub index: usize,

    /// First physical line of the command, from 1.
    pub line: usize,

    /// Assignments written in front of the command.
    pub env: Vec<(String, String)>,

    /// Program and arguments after expansion.
    pub argv: Vec<String>,

    /// Whether `set -e` is in effect when the command runs.
    pub stop_on_error: bool,
}

impl Invocation {
    /// The program, i.e. the first word.
    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }

    /// The command as it can be pasted into a shell.
    pub fn command_line(&self) -> String {
        self.env
            .iter()
            .map(|(k, v)| format!("{}={}", k, quote(v)))
            .chain(self.argv.iter().map(|w| quote(w)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The trainer entry point and its arguments, if the command runs one.
    ///
    /// The entry point is either the program itself, as in `./trainer-sb3.py ...`,
    /// or the script given to a Python interpreter, as in
    /// `python -u trainer-sb3.py ...`. Other commands that merely mention a
    /// trainer file are not trainer runs.
    pub fn trainer(&self) -> Option<(TrainerKind, &[String])> {
        if let Some(kind) = TrainerKind::from_word(self.program()) {
            return Some((kind, &self.argv[1..]));
        }
        if !is_python(self.program()) {
            return None;
        }
        let i = 1 + self.argv[1..]
            .iter()
            .position(|w| !w.starts_with('-') || w == "-m" || w == "-c")?;
        let kind = TrainerKind::from_word(&self.argv[i])?;
        Some((kind, &self.argv[i + 1..]))
    }

    /// Resolves the trainer arguments into a typed configuration.
    pub fn resolve(&self, catalog: &PresetCatalog) -> Result<Resolution, ConfigError> {
        Ok(match self.trainer() {
            Some((TrainerKind::Sb3, args)) => Resolution::Sb3(catalog.resolve(args)?),
            Some((TrainerKind::Ppg, args)) => Resolution::Ppg(PpgConfig::resolve(args)?),
            None => Resolution::Opaque,
        })
    }
}

fn is_python(program: &str) -> bool {
    Path::new(program)
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_prefix("python"))
        .map_or(false, |version| {
            version.chars().all(|c| c.is_ascii_digit() || c == '.')
        })
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

fn quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// Configuration an invocation resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A `trainer-sb3.py` run.
    Sb3(ResolvedConfig<TrainConfig>),

    /// A `ppg.py` run.
    Ppg(ResolvedConfig<PpgConfig>),

    /// Any other command; nothing to resolve.
    Opaque,
}

impl Resolution {
    /// Keys set on the command line.
    pub fn keys(&self) -> Vec<&str> {
        match self {
            Self::Sb3(r) => r.keys(),
            Self::Ppg(r) => r.keys(),
            Self::Opaque => vec![],
        }
    }

    /// Name the trainer will give the run when started at `now`.
    pub fn experiment_name(&self, now: &DateTime<Local>) -> Option<String> {
        match self {
            Self::Sb3(r) => Some(experiment_name(&r.config, now)),
            Self::Ppg(r) => Some(r.config.experiment_name(now)),
            Self::Opaque => None,
        }
    }
}
