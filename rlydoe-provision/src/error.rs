use thiserror::Error;

/// Errors of the provisioner.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProvisionError {
    /// A Dockerfile line that cannot be parsed.
    #[error("line {line}: {reason}")]
    Syntax {
        /// First physical line of the instruction.
        line: usize,
        /// What went wrong.
        reason: String,
    },

    /// A Dockerfile instruction other than `FROM`, `ENV`, `WORKDIR`, `COPY` and `RUN`.
    #[error("line {line}: unsupported instruction `{instruction}`")]
    UnsupportedInstruction {
        /// First physical line of the instruction.
        line: usize,
        /// Instruction keyword.
        instruction: String,
    },

    /// A Dockerfile without `FROM`.
    #[error("no base image, expected a FROM instruction")]
    MissingBaseImage,

    /// Downloaded bytes do not match the expected checksum.
    #[error("checksum mismatch for {url}: expected {expected}, got {actual}")]
    Checksum {
        /// Source of the download.
        url: String,
        /// Checksum in the plan.
        expected: String,
        /// Checksum of the downloaded bytes.
        actual: String,
    },

    /// A step failed; the remaining steps were not run.
    #[error("step {index} ({step}) failed: {reason}")]
    StepFailed {
        /// Index of the step, from 0.
        index: usize,
        /// Description of the step.
        step: String,
        /// Underlying error.
        reason: String,
    },
}
