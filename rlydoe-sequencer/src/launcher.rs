//! Starting the programs of a run script.
use crate::invocation::Invocation;
use anyhow::{bail, Result};
use log::{info, warn};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    process::Command,
};

/// How a launched program ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exit {
    code: Option<i32>,
}

impl Exit {
    /// Code reported when the program could not be started, as a shell does.
    pub const SPAWN_FAILURE: i32 = 127;

    /// A program that returned `code`.
    pub fn from_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    /// A program killed by a signal.
    pub fn signaled() -> Self {
        Self { code: None }
    }

    /// Exit code, if the program returned one.
    pub fn code(&self) -> Option<i32> {
        self.code
    }

    /// Whether the program returned 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Starts one invocation and waits for it.
pub trait Launcher {
    /// Runs the invocation to completion.
    ///
    /// A program that runs and fails is an [`Exit`] with a non-zero code, not
    /// an error.
    fn launch(&mut self, invocation: &Invocation) -> Result<Exit>;
}

/// Runs invocations as child processes with inherited stdio.
#[derive(Debug, Clone, Default)]
pub struct ProcessLauncher {
    workdir: Option<PathBuf>,
    env: BTreeMap<String, String>,
}

impl ProcessLauncher {
    /// Sets the working directory of the child processes.
    pub fn workdir(mut self, v: impl AsRef<Path>) -> Self {
        self.workdir = Some(v.as_ref().to_path_buf());
        self
    }

    /// Adds environment variables to every child process.
    pub fn env(mut self, v: BTreeMap<String, String>) -> Self {
        self.env.extend(v);
        self
    }
}

impl Launcher for ProcessLauncher {
    fn launch(&mut self, invocation: &Invocation) -> Result<Exit> {
        let Some((program, args)) = invocation.argv.split_first() else {
            bail!("line {}: empty command", invocation.line);
        };

        let mut command = Command::new(program);
        command
            .args(args)
            .envs(&self.env)
            .envs(invocation.env.iter().map(|(k, v)| (k, v)));
        if let Some(dir) = &self.workdir {
            command.current_dir(dir);
        }

        info!("Launching [{}] {}", invocation.index, invocation);
        match command.status() {
            Ok(status) => Ok(match status.code() {
                Some(code) => Exit::from_code(code),
                None => Exit::signaled(),
            }),
            Err(e) => {
                warn!("Failed to start {:?}: {}", program, e);
                Ok(Exit::from_code(Exit::SPAWN_FAILURE))
            }
        }
    }
}

/// Logs invocations instead of running them.
#[derive(Debug, Default)]
pub struct DryRunLauncher {
    launched: Vec<String>,
}

impl DryRunLauncher {
    /// Command lines seen so far.
    pub fn launched(&self) -> &[String] {
        &self.launched
    }
}

impl Launcher for DryRunLauncher {
    fn launch(&mut self, invocation: &Invocation) -> Result<Exit> {
        info!("(dry run) [{}] {}", invocation.index, invocation);
        self.launched.push(invocation.command_line());
        Ok(Exit::from_code(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    fn invocation(argv: &[&str]) -> Invocation {
        Invocation {
            index: 0,
            line: 1,
            env: vec![],
            argv: argv.iter().map(|s| s.to_string()).collect(),
            stop_on_error: false,
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_process_exit_codes() -> Result<()> {
        let mut launcher = ProcessLauncher::default();
        assert!(launcher.launch(&invocation(&["true"]))?.success());
        assert_eq!(
            launcher.launch(&invocation(&["sh", "-c", "exit 3"]))?.code(),
            Some(3)
        );
        Ok(())
    }

    #[test]
    fn test_spawn_failure() -> Result<()> {
        let mut launcher = ProcessLauncher::default();
        let exit = launcher.launch(&invocation(&["./no-such-trainer-binary"]))?;
        assert_eq!(exit.code(), Some(Exit::SPAWN_FAILURE));
        assert!(launcher.launch(&invocation(&[])).is_err());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_workdir_and_env() -> Result<()> {
        let dir = TempDir::new("launcher")?;
        let mut launcher = ProcessLauncher::default()
            .workdir(dir.path())
            .env(BTreeMap::from([("A".to_string(), "1".to_string())]));
        let mut inv = invocation(&["sh", "-c", "echo $A$B > out.txt"]);
        inv.env.push(("B".to_string(), "2".to_string()));
        assert!(launcher.launch(&inv)?.success());
        assert_eq!(std::fs::read_to_string(dir.path().join("out.txt"))?, "12\n");
        Ok(())
    }

    #[test]
    fn test_dry_run() -> Result<()> {
        let mut launcher = DryRunLauncher::default();
        let exit = launcher.launch(&invocation(&["python", "trainer-sb3.py", "learner=sac"]))?;
        assert!(exit.success());
        assert_eq!(launcher.launched(), ["python trainer-sb3.py learner=sac"]);
        Ok(())
    }
}
