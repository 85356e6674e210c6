//! Running steps on the current machine.
use crate::{
    error::ProvisionError,
    executor::StepRunner,
    step::{ArchiveFormat, Step},
};
use anyhow::{bail, Context, Result};
use log::{info, warn};
use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    process::Command,
};
use xxhash_rust::xxh3::xxh3_64;

/// `xxh3:<hex>` checksum of `bytes`.
pub fn checksum(bytes: &[u8]) -> String {
    format!("xxh3:{:016x}", xxh3_64(bytes))
}

/// Compares `bytes` downloaded from `url` with the expected checksum.
pub fn verify_checksum(url: &str, bytes: &[u8], expected: &str) -> Result<(), ProvisionError> {
    let actual = checksum(bytes);
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(ProvisionError::Checksum {
            url: url.to_string(),
            expected: expected.to_string(),
            actual,
        })
    }
}

/// Performs steps on this machine.
///
/// Downloads go through `reqwest`, zip archives are unpacked in process and
/// every other step runs as `sh -c <command>` in the current working
/// directory. `ENV` and `WORKDIR` steps change the state used by the
/// following steps. Paths starting with `~/` are relative to the home
/// directory.
pub struct NativeRunner {
    context: PathBuf,
    workdir: PathBuf,
    env: BTreeMap<String, String>,
    client: reqwest::blocking::Client,
}

impl NativeRunner {
    /// Creates a runner copying files from the build `context` directory.
    pub fn new(context: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            context: context.as_ref().to_path_buf(),
            workdir: std::env::current_dir()?,
            env: BTreeMap::new(),
            client: reqwest::blocking::Client::new(),
        })
    }

    /// Sets the initial working directory.
    pub fn workdir(mut self, v: impl AsRef<Path>) -> Self {
        self.workdir = v.as_ref().to_path_buf();
        self
    }

    fn path(&self, p: &str) -> Result<PathBuf> {
        if let Some(rest) = p.strip_prefix("~/") {
            let mut home = dirs::home_dir().context("Couldn't find home directory")?;
            home.push(rest);
            Ok(home)
        } else if p == "~" {
            dirs::home_dir().context("Couldn't find home directory")
        } else {
            Ok(self.workdir.join(p))
        }
    }

    /// Expands `$NAME` and `${NAME}` from earlier `ENV` steps or the process.
    fn expand(&self, value: &str) -> String {
        let mut out = String::new();
        let mut rest = value;
        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];
            let (name, len) = match after.strip_prefix('{') {
                Some(braced) => match braced.find('}') {
                    Some(end) => (&braced[..end], end + 2),
                    None => ("", 0),
                },
                None => {
                    let end = after
                        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                        .unwrap_or(after.len());
                    (&after[..end], end)
                }
            };
            if name.is_empty() {
                out.push('$');
                rest = after;
                continue;
            }
            let value = self
                .env
                .get(name)
                .cloned()
                .or_else(|| std::env::var(name).ok())
                .unwrap_or_default();
            out.push_str(&value);
            rest = &after[len..];
        }
        out.push_str(rest);
        out
    }

    fn shell(&self, command: &str) -> Result<()> {
        info!("sh -c {:?}", command);
        let status = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(&self.workdir)
            .envs(&self.env)
            .status()
            .with_context(|| format!("Failed to start sh for {:?}", command))?;
        if !status.success() {
            bail!("`{}` exited with {}", command, status);
        }
        Ok(())
    }

    fn download(&self, url: &str, dest: &str, expected: Option<&str>) -> Result<()> {
        info!("Download file from {:?}", url);
        let bytes = self.client.get(url).send()?.error_for_status()?.bytes()?;

        match expected {
            Some(expected) => verify_checksum(url, &bytes, expected)?,
            None => warn!("No checksum for {}, got {}", url, checksum(&bytes)),
        }

        let path = self.path(dest)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file =
            File::create(&path).with_context(|| format!("Failed to create file {:?}", path))?;
        file.write_all(&bytes)?;
        file.flush()?;
        info!("Downloaded file as {:?}", path);
        Ok(())
    }

    fn extract_zip(&self, archive: &str, dest: &str) -> Result<()> {
        let archive = self.path(archive)?;
        let dest = self.path(dest)?;
        info!("Unzip {:?} into {:?}", archive, dest);
        let file = File::open(&archive).with_context(|| format!("Failed to open {:?}", archive))?;
        let mut zip = zip::ZipArchive::new(file)?;
        fs::create_dir_all(&dest)?;
        zip.extract(&dest)?;
        Ok(())
    }

    fn copy(&self, src: &str, dest: &str) -> Result<()> {
        let from = self.context.join(src);
        let mut to = self.path(dest)?;
        if dest.ends_with('/') || to.is_dir() {
            let name = from
                .file_name()
                .with_context(|| format!("No file name in {:?}", from))?;
            to.push(name);
        }
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&from, &to).with_context(|| format!("Failed to copy {:?} to {:?}", from, to))?;
        Ok(())
    }
}

impl StepRunner for NativeRunner {
    fn run(&mut self, step: &Step) -> Result<()> {
        match step {
            Step::Download {
                url,
                dest,
                checksum,
            } => self.download(url, dest, checksum.as_deref()),
            Step::Extract {
                archive,
                dest,
                format: ArchiveFormat::Zip,
            } => self.extract_zip(archive, dest),
            Step::Copy { src, dest } => self.copy(src, dest),
            Step::Env { key, value } => {
                let value = self.expand(value);
                info!("{}={}", key, value);
                self.env.insert(key.clone(), value);
                Ok(())
            }
            Step::Workdir { path } => {
                let dir = self.path(path)?;
                fs::create_dir_all(&dir)?;
                self.workdir = dir;
                Ok(())
            }
            _ => match step.shell_command() {
                Some(command) => self.shell(&command),
                None => bail!("Nothing to run for {}", step),
            },
        }
    }
}
