//! The shipped diary: run scripts, presets and the provisioning Dockerfile.
use anyhow::Result;
use chrono::{Local, TimeZone};
use rlydoe_core::{Algorithm, PresetCatalog, ReplayBufferClass};
use rlydoe_provision::{ArchiveFormat, PlanReport, ProvisionPlan, Step};
use rlydoe_sequencer::{
    IssueKind, Resolution, RunScript, ScriptError, ScriptParser, ScriptReport, TrainerKind,
};
use std::path::PathBuf;
use tempdir::TempDir;
use test_log::test;

fn diary(rel: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("diary").join(rel)
}

fn script(name: &str) -> Result<RunScript> {
    ScriptParser::default().load(diary(&format!("scripts/{}", name)))
}

#[test]
fn test_fetch_script() -> Result<()> {
    let script = script("fetch.sh")?;
    let report = ScriptReport::check(&script, &PresetCatalog::default());

    assert_eq!(report.invocations.len(), 3);
    assert_eq!(report.errors().count(), 0);
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].line, 5);
    assert_eq!(report.issues[0].kind, IssueKind::StrayContinuation);
    assert!(!report.is_ok());

    // the 40M PickAndPlace run overrides exactly four keys
    let run = &script.invocations()[1];
    assert_eq!(run.line, 7);
    assert_eq!(
        run.argv[2..],
        [
            "learner=ppo",
            "environment=fetchpickplace",
            "learner.policy_type=MultiInputPolicy",
            "learner.total_timesteps=40000000",
        ]
    );
    match run.resolve(&PresetCatalog::default())? {
        Resolution::Sb3(resolved) => {
            assert_eq!(
                resolved.keys(),
                vec![
                    "learner",
                    "environment",
                    "learner.policy_type",
                    "learner.total_timesteps"
                ]
            );
            assert_eq!(resolved.config.learner.name, Algorithm::Ppo);
            assert_eq!(resolved.config.learner.total_timesteps, 40_000_000);
            assert_eq!(resolved.config.environment.name, "FetchPickAndPlace-v1");
            assert!(resolved.config.callbacks.wandb);
        }
        other => panic!("expected a trainer-sb3.py run, got {:?}", other),
    }

    // lenient parsing keeps the overrides after the stray `\`
    let reach = &report.invocations[0];
    assert_eq!(
        reach.keys.as_ref().unwrap().last().map(String::as_str),
        Some("learner.replay_buffer_class")
    );
    Ok(())
}

#[test]
fn test_fetch_script_strict() {
    let err = ScriptParser::default()
        .strict(true)
        .load(diary("scripts/fetch.sh"))
        .unwrap_err();
    assert_eq!(
        err.downcast_ref::<ScriptError>(),
        Some(&ScriptError::StrayContinuation { line: 5 })
    );
}

#[test]
fn test_classic_script() -> Result<()> {
    let script = script("classic.sh")?;
    assert!(script.stop_on_error());

    let report = ScriptReport::check(&script, &PresetCatalog::default());
    assert!(report.is_ok(), "{}", report);
    assert_eq!(report.invocations.len(), 3);

    match script.invocations()[2].resolve(&PresetCatalog::default())? {
        Resolution::Sb3(resolved) => {
            assert_eq!(resolved.config.learner.policy_type, "CnnPolicy");
            assert_eq!(resolved.config.learner.total_timesteps, 10_000_000);
            assert_eq!(resolved.config.environment.max_reward, None);
        }
        other => panic!("expected a trainer-sb3.py run, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_robotics_script_needs_conf_dir() -> Result<()> {
    let script = script("robotics.sh")?;

    let report = ScriptReport::check(&script, &PresetCatalog::default());
    assert_eq!(report.errors().count(), 2);

    let catalog = PresetCatalog::default().load_dir(diary("conf"))?;
    let report = ScriptReport::check(&script, &catalog);
    assert!(report.is_ok(), "{}", report);

    let now = Local.with_ymd_and_hms(2021, 7, 1, 9, 0, 0).unwrap();
    let first = script.invocations()[0].resolve(&catalog)?;
    let second = script.invocations()[1].resolve(&catalog)?;
    match &first {
        Resolution::Sb3(resolved) => {
            let config = &resolved.config;
            assert_eq!(config.learner.name, Algorithm::Sac);
            assert_eq!(config.learner.replay_buffer_class, Some(ReplayBufferClass::Her));
            assert_eq!(config.environment.name, "FetchPush-v1");
            assert!(!config.callbacks.wandb);
        }
        other => panic!("expected a trainer-sb3.py run, got {:?}", other),
    }
    assert_eq!(
        first.experiment_name(&now).as_deref(),
        Some("FetchPush-v1_2021-07-01-09:00:00_SAC")
    );
    assert_eq!(second.experiment_name(&now).as_deref(), Some("fetchpush-5M"));
    Ok(())
}

#[test]
fn test_ppg_script() -> Result<()> {
    let script = script("ppg.sh")?;
    let report = ScriptReport::check(&script, &PresetCatalog::default());
    assert!(report.is_ok(), "{}", report);
    assert!(report
        .invocations
        .iter()
        .all(|r| r.trainer == Some(TrainerKind::Ppg)));

    match script.invocations()[1].resolve(&PresetCatalog::default())? {
        Resolution::Ppg(resolved) => {
            assert_eq!(resolved.config.env_name, "CartPole-v1");
            assert_eq!(resolved.config.seed, Some(42));
            assert!(resolved.config.render);
        }
        other => panic!("expected a ppg.py run, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_dockerfile_order() -> Result<()> {
    let plan = ProvisionPlan::from_path(diary("docker/Dockerfile"))?;
    let report = PlanReport::check(&plan);
    assert!(report.is_ok(), "{}", report);
    // miniconda, mujoco, the key and the ROMs come without checksum
    assert_eq!(report.warnings().count(), 4);

    let installs_unrar = |s: &Step| match s {
        Step::Apt { packages } => packages.iter().any(|p| p == "unrar"),
        _ => false,
    };
    let apt = plan.steps.iter().position(installs_unrar).unwrap();
    let unrar = plan
        .steps
        .iter()
        .position(|s| {
            matches!(
                s,
                Step::Extract {
                    format: ArchiveFormat::Rar,
                    ..
                }
            )
        })
        .unwrap();
    let import = plan
        .steps
        .iter()
        .position(|s| matches!(s, Step::ImportRoms { .. }))
        .unwrap();
    assert!(apt < unrar && unrar < import);
    Ok(())
}

#[test]
fn test_dockerfile_context() -> Result<()> {
    let plan = ProvisionPlan::from_path(diary("docker/Dockerfile"))?;
    for step in &plan.steps {
        if let Step::Copy { src, .. } = step {
            assert!(diary("docker").join(src).is_file(), "{} is missing", src);
        }
    }

    let dir = TempDir::new("diary_plan")?;
    let path = dir.path().join("plan.yaml");
    plan.save(&path)?;
    assert_eq!(ProvisionPlan::from_path(&path)?, plan);
    Ok(())
}
