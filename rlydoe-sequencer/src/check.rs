//! Static check of a run script before anything is launched.
use crate::{
    invocation::TrainerKind,
    script::{RunScript, ScriptIssue},
};
use rlydoe_core::{ConfigError, PresetCatalog};
use std::{fmt, path::PathBuf};

/// Result of resolving one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationReport {
    /// Index of the invocation.
    pub index: usize,

    /// Line of the invocation.
    pub line: usize,

    /// Command line.
    pub command: String,

    /// Trainer entry point, `None` for other commands.
    pub trainer: Option<TrainerKind>,

    /// Keys set on the command line, or why the arguments do not resolve.
    pub keys: Result<Vec<String>, ConfigError>,
}

/// Findings on a whole run script.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptReport {
    /// File of the script.
    pub path: Option<PathBuf>,

    /// Suspicious continuation lines.
    pub issues: Vec<ScriptIssue>,

    /// One report per invocation.
    pub invocations: Vec<InvocationReport>,

    /// Whether the script sets `set -e`.
    pub stop_on_error: bool,
}

impl ScriptReport {
    /// Resolves every trainer invocation of `script` against `catalog`.
    pub fn check(script: &RunScript, catalog: &PresetCatalog) -> Self {
        let invocations = script
            .invocations()
            .iter()
            .map(|inv| InvocationReport {
                index: inv.index,
                line: inv.line,
                command: inv.command_line(),
                trainer: inv.trainer().map(|(kind, _)| kind),
                keys: inv
                    .resolve(catalog)
                    .map(|r| r.keys().into_iter().map(String::from).collect()),
            })
            .collect();

        Self {
            path: script.path().map(|p| p.to_path_buf()),
            issues: script.issues().to_vec(),
            invocations,
            stop_on_error: script.stop_on_error(),
        }
    }

    /// Invocations whose arguments do not resolve.
    pub fn errors(&self) -> impl Iterator<Item = (&InvocationReport, &ConfigError)> {
        self.invocations
            .iter()
            .filter_map(|r| r.keys.as_ref().err().map(|e| (r, e)))
    }

    /// No continuation issue and every invocation resolves.
    pub fn is_ok(&self) -> bool {
        self.issues.is_empty() && self.errors().next().is_none()
    }
}

impl fmt::Display for ScriptReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<script>".to_string());
        writeln!(
            f,
            "{}: {} invocation(s), {} issue(s), {} error(s){}",
            name,
            self.invocations.len(),
            self.issues.len(),
            self.errors().count(),
            if self.stop_on_error { ", set -e" } else { "" }
        )?;
        for issue in &self.issues {
            writeln!(f, "  warning: {}", issue)?;
        }
        for r in &self.invocations {
            let program = r.trainer.map(|k| k.file_name()).unwrap_or("command");
            let detail = match &r.keys {
                Ok(keys) if r.trainer.is_some() => keys.join(", "),
                Ok(_) => r.command.clone(),
                Err(e) => format!("error: {}", e),
            };
            writeln!(f, "  [{}] line {} {}: {}", r.index, r.line, program, detail)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report() {
        let script = RunScript::parse(
            "python trainer-sb3.py learner=ppo environment=fetchpickplace \\\n\
             \x20   learner.policy_type=MultiInputPolicy learner.total_timesteps=$((40 * 1000000))\n\
             python trainer-sb3.py learner=sac \\ \n\
             \x20   environment=fetchreach learner.replay_buffer_class=her\n\
             python trainer-sb3.py learner.n_steps=2048\n",
        )
        .unwrap();
        let report = ScriptReport::check(&script, &PresetCatalog::default());

        assert_eq!(report.invocations.len(), 3);
        assert_eq!(
            report.invocations[0].keys.as_ref().unwrap(),
            &vec![
                "learner",
                "environment",
                "learner.policy_type",
                "learner.total_timesteps"
            ]
        );
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].line, 3);

        let errors: Vec<_> = report.errors().map(|(r, _)| r.line).collect();
        assert_eq!(errors, vec![5]);
        assert!(!report.is_ok());

        let text = report.to_string();
        assert!(text.starts_with("<script>: 3 invocation(s), 1 issue(s), 1 error(s)\n"));
        assert!(text.contains("error: Unknown key `learner.n_steps`"));
    }

    #[test]
    fn test_clean_script() {
        let script = RunScript::parse("set -e\npython ppg.py --lr=0.001\necho done\n").unwrap();
        let report = ScriptReport::check(&script, &PresetCatalog::default());
        assert!(report.is_ok());
        assert!(report.stop_on_error);
        assert_eq!(report.invocations[1].trainer, None);
    }
}
