//! `rlydoe check`
use super::catalog;
use anyhow::Result;
use clap::Args;
use rlydoe_sequencer::{ScriptParser, ScriptReport};
use std::{io::Write, path::PathBuf};

/// Arguments of `rlydoe check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Fails on `\` followed by whitespace instead of joining the lines
    #[arg(long)]
    pub strict: bool,

    /// Directory of preset files, `<dir>/<group>/<preset>.yaml`
    #[arg(long)]
    pub conf_dir: Option<PathBuf>,

    /// Run scripts
    #[arg(required = true)]
    pub scripts: Vec<PathBuf>,
}

pub(crate) fn check(args: &CheckArgs, out: &mut dyn Write) -> Result<bool> {
    let catalog = catalog(args.conf_dir.as_deref())?;
    let parser = ScriptParser::default().strict(args.strict);
    let mut ok = true;

    for path in &args.scripts {
        match parser.load(path) {
            Ok(script) => {
                let report = ScriptReport::check(&script, &catalog);
                write!(out, "{}", report)?;
                ok &= report.is_ok();
            }
            Err(e) => {
                writeln!(out, "{}: error: {:#}", path.display(), e)?;
                ok = false;
            }
        }
    }

    Ok(ok)
}
