//! Run scripts: the shell files of the diary that launch training runs.
mod words;

use crate::{error::ScriptError, invocation::Invocation};
use anyhow::{Context, Result};
use log::{debug, warn};
use std::{
    collections::BTreeMap,
    fmt, fs,
    path::{Path, PathBuf},
};
use words::Word;

/// Kinds of suspicious continuation lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    /// `\` followed by whitespace. A shell ends the command at this line and
    /// runs the next line as a separate command.
    StrayContinuation,

    /// `\` on the last line of the script.
    DanglingContinuation,
}

/// A suspicious line found while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptIssue {
    /// Physical line, from 1.
    pub line: usize,

    /// What was found.
    pub kind: IssueKind,
}

impl fmt::Display for ScriptIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            IssueKind::StrayContinuation => write!(
                f,
                "line {}: `\\` is followed by whitespace; a shell would split the command here",
                self.line
            ),
            IssueKind::DanglingContinuation => {
                write!(f, "line {}: `\\` at the end of the script", self.line)
            }
        }
    }
}

/// Parser of run scripts.
///
/// ```rust
/// use rlydoe_sequencer::ScriptParser;
///
/// let script = ScriptParser::default()
///     .parse("N=$((2 * 1000))\npython trainer-sb3.py learner.total_timesteps=$N\n")
///     .unwrap();
/// assert_eq!(script.invocations()[0].argv[2], "learner.total_timesteps=2000");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScriptParser {
    strict: bool,
    variables: BTreeMap<String, String>,
}

impl ScriptParser {
    /// Rejects stray continuations instead of joining the lines.
    pub fn strict(mut self, v: bool) -> Self {
        self.strict = v;
        self
    }

    /// Defines a variable visible from the first line of the script.
    pub fn variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Defines variables visible from the first line of the script.
    pub fn variables<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.variables
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Reads and parses the script at `path`.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<RunScript> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read run script {:?}", path))?;
        let mut script = self
            .parse(&text)
            .with_context(|| format!("Failed to parse run script {:?}", path))?;
        script.path = Some(path.to_path_buf());
        Ok(script)
    }

    /// Parses the text of a script.
    pub fn parse(&self, text: &str) -> Result<RunScript, ScriptError> {
        let mut script = RunScript {
            path: None,
            invocations: vec![],
            variables: self.variables.clone(),
            stop_on_error: false,
            issues: vec![],
        };

        for (line, command) in self.logical_lines(text, &mut script.issues)? {
            let trimmed = command.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let words = words::split(trimmed, line, &script.variables)?;
            script.statement(line, words);
        }

        Ok(script)
    }

    /// Joins continued physical lines, returning `(first line, command)`.
    fn logical_lines(
        &self,
        text: &str,
        issues: &mut Vec<ScriptIssue>,
    ) -> Result<Vec<(usize, String)>, ScriptError> {
        let mut lines = Vec::new();
        let mut current: Option<(usize, String)> = None;
        let mut last = 0;

        for (i, physical) in text.lines().enumerate() {
            let line = i + 1;
            last = line;
            let (start, mut buf) = current.take().unwrap_or((line, String::new()));

            // a comment does not continue onto the next line
            if buf.is_empty() && physical.trim_start().starts_with('#') {
                lines.push((start, physical.to_string()));
                continue;
            }

            let trimmed = physical.trim_end();
            if !ends_with_continuation(trimmed) {
                buf.push_str(physical);
                lines.push((start, buf));
                continue;
            }

            if trimmed.len() != physical.len() {
                if self.strict {
                    return Err(ScriptError::StrayContinuation { line });
                }
                warn!(
                    "line {}: `\\` is followed by whitespace, joining with the next line",
                    line
                );
                issues.push(ScriptIssue {
                    line,
                    kind: IssueKind::StrayContinuation,
                });
            }
            buf.push_str(&trimmed[..trimmed.len() - 1]);
            current = Some((start, buf));
        }

        if let Some((start, buf)) = current {
            warn!("line {}: `\\` at the end of the script", last);
            issues.push(ScriptIssue {
                line: last,
                kind: IssueKind::DanglingContinuation,
            });
            lines.push((start, buf));
        }

        Ok(lines)
    }
}

/// An odd number of trailing backslashes.
fn ends_with_continuation(s: &str) -> bool {
    s.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

/// A parsed run script.
#[derive(Debug, Clone, PartialEq)]
pub struct RunScript {
    path: Option<PathBuf>,
    invocations: Vec<Invocation>,
    variables: BTreeMap<String, String>,
    stop_on_error: bool,
    issues: Vec<ScriptIssue>,
}

impl RunScript {
    /// Parses `text` with the default lenient parser.
    pub fn parse(text: &str) -> Result<Self, ScriptError> {
        ScriptParser::default().parse(text)
    }

    /// Loads a script with the default lenient parser.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        ScriptParser::default().load(path)
    }

    /// File the script was loaded from.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Commands in order of appearance.
    pub fn invocations(&self) -> &[Invocation] {
        &self.invocations
    }

    /// Variables defined once the whole script has been read.
    pub fn variables(&self) -> &BTreeMap<String, String> {
        &self.variables
    }

    /// Whether `set -e` is in effect for some command or at the end.
    ///
    /// Each [`Invocation`] carries the state at its own position.
    pub fn stop_on_error(&self) -> bool {
        self.stop_on_error || self.invocations.iter().any(|i| i.stop_on_error)
    }

    /// Suspicious continuation lines.
    pub fn issues(&self) -> &[ScriptIssue] {
        &self.issues
    }

    fn statement(&mut self, line: usize, words: Vec<Word>) {
        let Some(first) = words.first() else {
            return;
        };

        if first.assignment().is_none() {
            match first.text.as_str() {
                "set" => {
                    self.set_options(&words[1..]);
                    return;
                }
                "export" => {
                    for word in &words[1..] {
                        if let Some((name, value)) = word.assignment() {
                            self.define(line, name, value);
                        }
                    }
                    return;
                }
                _ => {}
            }
        }

        let n_assignments = words
            .iter()
            .take_while(|w| w.assignment().is_some())
            .count();
        if n_assignments == words.len() {
            for word in &words {
                if let Some((name, value)) = word.assignment() {
                    self.define(line, name, value);
                }
            }
            return;
        }

        let env = words[..n_assignments]
            .iter()
            .filter_map(Word::assignment)
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let argv = words[n_assignments..]
            .iter()
            .map(|w| w.text.clone())
            .collect();
        let invocation = Invocation {
            index: self.invocations.len(),
            line,
            env,
            argv,
            stop_on_error: self.stop_on_error,
        };
        debug!("line {}: {}", line, invocation);
        self.invocations.push(invocation);
    }

    fn define(&mut self, line: usize, name: &str, value: &str) {
        debug!("line {}: {}={}", line, name, value);
        self.variables.insert(name.to_string(), value.to_string());
    }

    fn set_options(&mut self, args: &[Word]) {
        let mut args = args.iter().map(|w| w.text.as_str());
        while let Some(arg) = args.next() {
            match arg {
                "--" => break,
                "-o" => {
                    if args.next() == Some("errexit") {
                        self.stop_on_error = true;
                    }
                }
                "+o" => {
                    if args.next() == Some("errexit") {
                        self.stop_on_error = false;
                    }
                }
                _ if is_option_cluster(arg, '-') && arg.contains('e') => {
                    self.stop_on_error = true
                }
                _ if is_option_cluster(arg, '+') && arg.contains('e') => {
                    self.stop_on_error = false
                }
                _ => {}
            }
        }
    }
}

/// `-eux` style short options, but not `--verbose` or a bare `-`.
fn is_option_cluster(arg: &str, sign: char) -> bool {
    arg.strip_prefix(sign)
        .map_or(false, |rest| {
            !rest.is_empty() && rest.chars().all(|c| c.is_ascii_alphabetic())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    const STRAY: &str = "python trainer-sb3.py learner=sac \\ \n    environment=fetchreach\n";

    #[test]
    fn test_continuation_joins() {
        let script = RunScript::parse(
            "#!/bin/bash\n\
             \n\
             # PPO on the robot arm\n\
             NUM_TIMESTEPS=$((40 * 1000000))\n\
             python trainer-sb3.py learner=ppo environment=fetchpickplace \\\n\
             \x20   learner.policy_type=MultiInputPolicy \\\n\
             \x20   learner.total_timesteps=$NUM_TIMESTEPS\n",
        )
        .unwrap();

        assert_eq!(script.invocations().len(), 1);
        let inv = &script.invocations()[0];
        assert_eq!(inv.line, 5);
        assert_eq!(
            inv.argv,
            vec![
                "python",
                "trainer-sb3.py",
                "learner=ppo",
                "environment=fetchpickplace",
                "learner.policy_type=MultiInputPolicy",
                "learner.total_timesteps=40000000",
            ]
        );
        assert!(script.issues().is_empty());
        assert_eq!(script.variables()["NUM_TIMESTEPS"], "40000000");
    }

    #[test]
    fn test_stray_continuation_lenient() {
        let script = RunScript::parse(STRAY).unwrap();
        assert_eq!(
            script.issues(),
            &[ScriptIssue {
                line: 1,
                kind: IssueKind::StrayContinuation
            }]
        );
        assert_eq!(script.invocations().len(), 1);
        assert_eq!(
            script.invocations()[0].argv.last().unwrap(),
            "environment=fetchreach"
        );
    }

    #[test]
    fn test_stray_continuation_strict() {
        let err = ScriptParser::default().strict(true).parse(STRAY);
        assert_eq!(err, Err(ScriptError::StrayContinuation { line: 1 }));
    }

    #[test]
    fn test_dangling_continuation() {
        let script = RunScript::parse("echo done \\").unwrap();
        assert_eq!(script.issues()[0].kind, IssueKind::DanglingContinuation);
        assert_eq!(script.invocations()[0].argv, vec!["echo", "done"]);
    }

    #[test]
    fn test_set_and_export() {
        let script = RunScript::parse(
            "set -euo pipefail\n\
             export SEED=3\n\
             CUDA_VISIBLE_DEVICES=1 python ppg.py --seed=$SEED\n",
        )
        .unwrap();
        assert!(script.stop_on_error());
        let inv = &script.invocations()[0];
        assert_eq!(
            inv.env,
            vec![("CUDA_VISIBLE_DEVICES".to_string(), "1".to_string())]
        );
        assert_eq!(inv.argv, vec!["python", "ppg.py", "--seed=3"]);
        assert!(!script.variables().contains_key("CUDA_VISIBLE_DEVICES"));

        assert!(RunScript::parse("set -o errexit\n").unwrap().stop_on_error());
        assert!(!RunScript::parse("set -e\nset +e\n").unwrap().stop_on_error());
        assert!(!RunScript::parse("set --verbose\n").unwrap().stop_on_error());
        assert!(!RunScript::parse("set -- -e\n").unwrap().stop_on_error());
    }

    #[test]
    fn test_set_e_applies_from_its_line() {
        let script = RunScript::parse("false\nset -e\ntrue\nset +e\nfalse\n").unwrap();
        let flags: Vec<bool> = script
            .invocations()
            .iter()
            .map(|i| i.stop_on_error)
            .collect();
        assert_eq!(flags, vec![false, true, false]);
        assert!(script.stop_on_error());
    }

    #[test]
    fn test_parser_variables() {
        let script = ScriptParser::default()
            .variable("HOME", "/home/rl")
            .parse("ls $HOME/models\n")
            .unwrap();
        assert_eq!(script.invocations()[0].argv, vec!["ls", "/home/rl/models"]);

        assert_eq!(
            RunScript::parse("\n\nls $HOME\n"),
            Err(ScriptError::UndefinedVariable {
                line: 3,
                name: "HOME".to_string()
            })
        );
    }
}
