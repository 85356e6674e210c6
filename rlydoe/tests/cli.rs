//! The `rlydoe` subcommands, driven through [`rlydoe::execute`].
use anyhow::Result;
use clap::Parser;
use rlydoe::Cli;
use rlydoe_provision::ProvisionPlan;
use std::{fs, path::PathBuf};
use tempdir::TempDir;
use test_log::test;

fn diary(rel: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("diary")
        .join(rel)
        .display()
        .to_string()
}

/// Runs `rlydoe <args>`, returning the success flag and the output.
fn rlydoe(args: &[&str]) -> Result<(bool, String)> {
    let cli = Cli::try_parse_from(std::iter::once("rlydoe").chain(args.iter().copied()))?;
    let mut out = Vec::new();
    let ok = rlydoe::execute(&cli, &mut out)?;
    Ok((ok, String::from_utf8(out)?))
}

#[test]
fn test_resolve_json() -> Result<()> {
    let (ok, out) = rlydoe(&[
        "resolve",
        "--format",
        "json",
        "learner=ppo",
        "environment=fetchpickplace",
        "learner.policy_type=MultiInputPolicy",
        "learner.total_timesteps=40000000",
    ])?;
    assert!(ok);

    let value: serde_json::Value = serde_json::from_str(&out)?;
    assert_eq!(
        value["keys"],
        serde_json::json!([
            "learner",
            "environment",
            "learner.policy_type",
            "learner.total_timesteps"
        ])
    );
    assert_eq!(value["config"]["learner"]["total_timesteps"], 40_000_000);
    assert_eq!(value["config"]["environment"]["name"], "FetchPickAndPlace-v1");
    assert!(value["experiment_name"]
        .as_str()
        .unwrap()
        .starts_with("FetchPickAndPlace-v1_"));
    assert!(value.get("plan").is_none());
    Ok(())
}

#[test]
fn test_resolve_yaml_with_plan() -> Result<()> {
    let conf = diary("conf");
    let (ok, out) = rlydoe(&[
        "resolve",
        "--conf-dir",
        &conf,
        "--plan",
        "learner=sac_her",
        "environment=fetchpush",
    ])?;
    assert!(ok);

    let value: serde_yaml::Value = serde_yaml::from_str(&out)?;
    assert_eq!(value["config"]["learner"]["replay_buffer_class"], "her");
    assert_eq!(value["plan"]["policy_type"], "MultiInputPolicy");
    assert_eq!(value["plan"]["environment"], "FetchPush-v1");
    Ok(())
}

#[test]
fn test_resolve_ppg() -> Result<()> {
    let (ok, out) = rlydoe(&["resolve", "--ppg", "--env_name=CartPole-v1", "--lr", "0.01"])?;
    assert!(ok);
    let value: serde_yaml::Value = serde_yaml::from_str(&out)?;
    assert_eq!(value["config"]["lr"], 0.01);
    assert_eq!(value["keys"], serde_yaml::from_str::<serde_yaml::Value>("[env_name, lr]")?);
    Ok(())
}

#[test]
fn test_resolve_unknown_key() {
    let err = rlydoe(&["resolve", "learner.learning_rate=0.1"]).unwrap_err();
    assert!(err.to_string().contains("learning_rate"), "{}", err);
}

#[test]
fn test_check() -> Result<()> {
    let (ok, out) = rlydoe(&["check", &diary("scripts/classic.sh"), &diary("scripts/ppg.sh")])?;
    assert!(ok, "{}", out);

    let (ok, out) = rlydoe(&["check", &diary("scripts/fetch.sh")])?;
    assert!(!ok);
    assert!(out.contains("fetch.sh: 3 invocation(s), 1 issue(s), 0 error(s)"), "{}", out);
    assert!(out.contains("line 5"));

    let (ok, out) = rlydoe(&["check", "--strict", &diary("scripts/fetch.sh")])?;
    assert!(!ok);
    assert!(out.contains("error:"), "{}", out);

    let (ok, _) = rlydoe(&["check", &diary("scripts/robotics.sh")])?;
    assert!(!ok);
    let (ok, _) = rlydoe(&[
        "check",
        "--conf-dir",
        &diary("conf"),
        &diary("scripts/robotics.sh"),
    ])?;
    assert!(ok);
    Ok(())
}

#[test]
fn test_dry_run_with_ledger() -> Result<()> {
    let dir = TempDir::new("rlydoe_run")?;
    let ledger = dir.path().join("runs.csv");
    let ledger_arg = ledger.display().to_string();

    for _ in 0..2 {
        let (ok, out) = rlydoe(&[
            "run",
            "--dry-run",
            "--ledger",
            &ledger_arg,
            &diary("scripts/classic.sh"),
        ])?;
        assert!(ok, "{}", out);
        assert!(out.ends_with("3 invocations: 3 succeeded, 0 failed, 0 rejected, 0 skipped\n"));
    }

    // the header is written once, rows are appended
    let mut reader = csv::Reader::from_path(&ledger)?;
    assert_eq!(reader.headers()?.get(4), Some("status"));
    let rows: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>()?;
    assert_eq!(rows.len(), 6);
    assert!(rows.iter().all(|r| r.get(4) == Some("succeeded")));
    assert!(rows[2].get(3).unwrap().starts_with("BreakoutNoFrameskip-v4_"));
    Ok(())
}

#[test]
fn test_run_rejects_bad_overrides() -> Result<()> {
    let dir = TempDir::new("rlydoe_run")?;
    let path = dir.path().join("bad.sh");
    fs::write(
        &path,
        "python trainer-sb3.py learner=a2c\npython trainer-sb3.py learner=ppo\n",
    )?;

    let (ok, out) = rlydoe(&["run", "--dry-run", &path.display().to_string()])?;
    assert!(!ok);
    assert!(out.contains("[0] line 1 rejected:"), "{}", out);
    assert!(out.contains("[1] line 2 succeeded"), "{}", out);
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_run_stop_on_error() -> Result<()> {
    let dir = TempDir::new("rlydoe_run")?;
    let path = dir.path().join("steps.sh");
    fs::write(&path, "true\nfalse\ntouch after.txt\n")?;
    let path = path.display().to_string();

    let (ok, out) = rlydoe(&["run", "--stop-on-error", &path])?;
    assert!(!ok);
    assert!(out.ends_with("3 invocations: 1 succeeded, 1 failed, 0 rejected, 1 skipped\n"));
    assert!(!dir.path().join("after.txt").exists());

    // without stop-on-error the last command runs in the script's directory
    let (ok, out) = rlydoe(&["run", &path])?;
    assert!(!ok);
    assert!(out.ends_with("3 invocations: 2 succeeded, 1 failed, 0 rejected, 0 skipped\n"));
    assert!(dir.path().join("after.txt").exists());
    Ok(())
}

#[test]
fn test_provision_check_and_render() -> Result<()> {
    let dockerfile = diary("docker/Dockerfile");
    let (ok, out) = rlydoe(&["provision", "check", &dockerfile])?;
    assert!(ok);
    assert!(out.contains("0 error(s), 4 warning(s)"), "{}", out);

    let (ok, yaml) = rlydoe(&["provision", "render", "--format", "yaml", &dockerfile])?;
    assert!(ok);
    let plan: ProvisionPlan = serde_yaml::from_str(&yaml)?;
    assert_eq!(plan, ProvisionPlan::from_path(&dockerfile)?);

    let (ok, text) = rlydoe(&["provision", "render", &dockerfile])?;
    assert!(ok);
    assert!(text.starts_with("FROM nvidia/cuda:10.1-cudnn7-runtime-ubuntu18.04\n"));
    Ok(())
}

#[test]
fn test_provision_apply() -> Result<()> {
    let (ok, out) = rlydoe(&["provision", "apply", "--dry-run", &diary("docker/Dockerfile")])?;
    assert!(ok);
    assert!(out.contains("conda env create -f environment.yml\n"), "{}", out);
    assert!(out.ends_with("step(s) done on top of nvidia/cuda:10.1-cudnn7-runtime-ubuntu18.04\n"));

    // extracting a rar archive before unrar is installed
    let dir = TempDir::new("rlydoe_plan")?;
    let path = dir.path().join("plan.yaml");
    fs::write(
        &path,
        "base_image: ubuntu:18.04\n\
         steps:\n\
         \x20 - step: extract\n\
         \x20   archive: Roms.rar\n\
         \x20   dest: .\n\
         \x20   format: rar\n",
    )?;
    let (ok, out) = rlydoe(&["provision", "apply", &path.display().to_string()])?;
    assert!(!ok);
    assert!(out.contains("2 error(s), 0 warning(s)"), "{}", out);
    assert!(out.ends_with("Nothing was run\n"));
    Ok(())
}
