//! Provisioning of the training environment of the diary.
//!
//! The environment is an ordered list of [`Step`]s on top of a base image:
//! OS packages, a conda installation, the MuJoCo binaries and key, the Atari
//! ROMs, and finally a conda environment built from `environment.yml`.
//!
//! A [`ProvisionPlan`] is read from a YAML file or from a Dockerfile and can
//! be rendered back to a Dockerfile. [`PlanReport`] checks that every step
//! finds the tools and files it needs, and [`execute`] performs the steps with
//! a [`StepRunner`], stopping at the first failure.
//!
//! ```rust
//! use rlydoe_provision::{dockerfile, PlanReport, Step};
//!
//! let plan = dockerfile::parse(
//!     "FROM ubuntu:18.04\n\
//!      RUN wget http://www.atarimania.com/roms/Roms.rar && \\\n\
//!          apt-get update && apt-get install -y unrar && \\\n\
//!          unrar x Roms.rar\n",
//! )
//! .unwrap();
//! assert!(matches!(plan.steps[1], Step::Apt { .. }));
//!
//! let report = PlanReport::check(&plan);
//! // wget is not in the base image, and the download has no checksum
//! assert_eq!(report.errors().count(), 1);
//! assert_eq!(report.warnings().count(), 1);
//! ```
mod check;
pub mod dockerfile;
mod error;
mod executor;
mod native;
mod plan;
mod step;

pub use check::{Finding, PlanReport, Severity};
pub use error::ProvisionError;
pub use executor::{execute, DryRunRunner, StepRunner};
pub use native::{checksum, verify_checksum, NativeRunner};
pub use plan::{ProvisionPlan, DEFAULT_BASE_TOOLS};
pub use step::{ArchiveFormat, Step};
