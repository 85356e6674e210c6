//! Provisioning steps.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Archive formats an [`Step::Extract`] understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveFormat {
    /// `.zip`
    #[serde(rename = "zip")]
    Zip,

    /// `.rar`
    #[serde(rename = "rar")]
    Rar,

    /// `.tar.gz` or `.tgz`
    #[serde(rename = "tar.gz")]
    TarGz,
}

impl ArchiveFormat {
    /// Guesses the format from the file name.
    pub fn from_path(path: &str) -> Option<Self> {
        let lower = path.to_lowercase();
        if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else if lower.ends_with(".rar") {
            Some(Self::Rar)
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(Self::TarGz)
        } else {
            None
        }
    }

    /// Program extracting archives of this format.
    pub fn tool(&self) -> &'static str {
        match self {
            Self::Zip => "unzip",
            Self::Rar => "unrar",
            Self::TarGz => "tar",
        }
    }
}

/// One step of a provisioning plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case", deny_unknown_fields)]
pub enum Step {
    /// Installs OS packages.
    Apt {
        /// Package names.
        packages: Vec<String>,
    },

    /// Fetches a file.
    Download {
        /// Source.
        url: String,
        /// Destination file.
        dest: String,
        /// Expected `xxh3:<hex>` checksum of the file.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        checksum: Option<String>,
    },

    /// Unpacks an archive.
    Extract {
        /// Archive file.
        archive: String,
        /// Destination directory.
        dest: String,
        /// Archive format.
        format: ArchiveFormat,
    },

    /// Runs a conda installer script in batch mode.
    InstallConda {
        /// Installer script.
        installer: String,
        /// Installation prefix.
        prefix: String,
    },

    /// Creates a conda environment from a dependency file.
    CondaCreate {
        /// `environment.yml` or similar.
        file: String,
    },

    /// Imports Atari ROMs from a directory.
    ImportRoms {
        /// Directory of the ROMs.
        dir: String,
    },

    /// Copies a file from the build context.
    Copy {
        /// Path relative to the build context.
        src: String,
        /// Destination.
        dest: String,
    },

    /// Sets an environment variable for the following steps.
    Env {
        /// Variable name.
        key: String,
        /// Value.
        value: String,
    },

    /// Changes the working directory of the following steps.
    Workdir {
        /// Directory.
        path: String,
    },

    /// Any other shell command.
    Run {
        /// Command line.
        command: String,
    },
}

impl Step {
    /// Short name of the step kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Apt { .. } => "apt",
            Self::Download { .. } => "download",
            Self::Extract { .. } => "extract",
            Self::InstallConda { .. } => "install_conda",
            Self::CondaCreate { .. } => "conda_create",
            Self::ImportRoms { .. } => "import_roms",
            Self::Copy { .. } => "copy",
            Self::Env { .. } => "env",
            Self::Workdir { .. } => "workdir",
            Self::Run { .. } => "run",
        }
    }

    /// Programs the step runs, which must exist before it.
    ///
    /// Downloads are rendered as `wget` commands and therefore need it.
    pub fn required_tools(&self) -> Vec<&str> {
        match self {
            Self::Apt { .. } => vec!["apt-get"],
            Self::Download { .. } => vec!["wget"],
            Self::Extract { format, .. } => vec![format.tool()],
            Self::InstallConda { .. } => vec!["bash"],
            Self::CondaCreate { .. } => vec!["conda"],
            Self::ImportRoms { .. } => vec!["python"],
            Self::Copy { .. } | Self::Env { .. } | Self::Workdir { .. } | Self::Run { .. } => {
                vec![]
            }
        }
    }

    /// Programs available after the step.
    pub fn provided_tools(&self) -> Vec<&str> {
        match self {
            Self::Apt { packages } => packages.iter().map(String::as_str).collect(),
            Self::InstallConda { .. } => vec!["conda", "python", "pip"],
            _ => vec![],
        }
    }

    /// The shell command equivalent to the step, for shell steps.
    pub fn shell_command(&self) -> Option<String> {
        let cmd = match self {
            Self::Apt { packages } => format!(
                "apt-get update && apt-get install -y {}",
                join_quoted(packages.iter().map(String::as_str))
            ),
            Self::Download { url, dest, .. } => format!("wget -O {} {}", quote(dest), quote(url)),
            Self::Extract {
                archive,
                dest,
                format,
            } => match format {
                ArchiveFormat::Zip => format!("unzip -o {} -d {}", quote(archive), quote(dest)),
                ArchiveFormat::Rar => {
                    let dest = if dest.ends_with('/') {
                        dest.clone()
                    } else {
                        format!("{}/", dest)
                    };
                    format!("unrar x -o+ {} {}", quote(archive), quote(&dest))
                }
                ArchiveFormat::TarGz => {
                    format!("tar -xzf {} -C {}", quote(archive), quote(dest))
                }
            },
            Self::InstallConda { installer, prefix } => {
                format!("bash {} -b -p {}", quote(installer), quote(prefix))
            }
            Self::CondaCreate { file } => format!("conda env create -f {}", quote(file)),
            Self::ImportRoms { dir } => format!("python -m atari_py.import_roms {}", quote(dir)),
            Self::Run { command } => command.clone(),
            Self::Copy { .. } | Self::Env { .. } | Self::Workdir { .. } => return None,
        };
        Some(cmd)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copy { src, dest } => write!(f, "COPY {} {}", src, dest),
            Self::Env { key, value } => write!(f, "ENV {}={}", key, value),
            Self::Workdir { path } => write!(f, "WORKDIR {}", path),
            _ => f.write_str(&self.shell_command().unwrap_or_default()),
        }
    }
}

/// Quotes a word for `sh` when needed.
pub(crate) fn quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%~".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("\"{}\"", word.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

fn join_quoted<'a>(words: impl Iterator<Item = &'a str>) -> String {
    words.map(quote).collect::<Vec<_>>().join(" ")
}
