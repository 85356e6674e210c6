//! Fail-fast execution of a plan.
use crate::{error::ProvisionError, plan::ProvisionPlan, step::Step};
use anyhow::Result;
use log::info;

/// Performs single steps.
pub trait StepRunner {
    /// Performs `step`. An error aborts the plan.
    fn run(&mut self, step: &Step) -> Result<()>;
}

/// Logs the steps instead of performing them.
#[derive(Debug, Default)]
pub struct DryRunRunner {
    steps: Vec<String>,
}

impl DryRunRunner {
    /// Steps seen so far, as Dockerfile text.
    pub fn steps(&self) -> &[String] {
        &self.steps
    }
}

impl StepRunner for DryRunRunner {
    fn run(&mut self, step: &Step) -> Result<()> {
        info!("(dry run) {}", step);
        self.steps.push(step.to_string());
        Ok(())
    }
}

/// Runs the steps of `plan` in order and stops at the first failure.
///
/// Returns the number of steps performed. Files left by the steps before a
/// failure are not cleaned up.
pub fn execute(
    plan: &ProvisionPlan,
    runner: &mut dyn StepRunner,
) -> Result<usize, ProvisionError> {
    let n = plan.steps.len();
    for (index, step) in plan.steps.iter().enumerate() {
        info!("Step {}/{} [{}]: {}", index + 1, n, step.kind(), step);
        runner.run(step).map_err(|e| ProvisionError::StepFailed {
            index,
            step: step.to_string(),
            reason: format!("{:#}", e),
        })?;
    }
    info!("Provisioned {} steps on {}", n, plan.base_image);
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use test_log::test;

    struct FailAt {
        index: usize,
        seen: usize,
    }

    impl StepRunner for FailAt {
        fn run(&mut self, step: &Step) -> Result<()> {
            if self.seen == self.index {
                bail!("exit status 100 from `{}`", step);
            }
            self.seen += 1;
            Ok(())
        }
    }

    fn plan() -> ProvisionPlan {
        ProvisionPlan::new("ubuntu:18.04")
            .step(Step::Apt {
                packages: vec!["wget".to_string()],
            })
            .step(Step::Run {
                command: "false".to_string(),
            })
            .step(Step::CondaCreate {
                file: "environment.yml".to_string(),
            })
    }

    #[test]
    fn test_stops_at_first_failure() {
        let mut runner = FailAt { index: 1, seen: 0 };
        let err = execute(&plan(), &mut runner).unwrap_err();
        assert_eq!(
            err,
            ProvisionError::StepFailed {
                index: 1,
                step: "false".to_string(),
                reason: "exit status 100 from `false`".to_string(),
            }
        );
        assert_eq!(runner.seen, 1);
    }

    #[test]
    fn test_dry_run() {
        let mut runner = DryRunRunner::default();
        assert_eq!(execute(&plan(), &mut runner), Ok(3));
        assert_eq!(
            runner.steps(),
            [
                "apt-get update && apt-get install -y wget",
                "false",
                "conda env create -f environment.yml",
            ]
        );
    }
}
