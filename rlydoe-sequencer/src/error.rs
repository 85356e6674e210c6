use thiserror::Error;

/// Errors while parsing a run script.
///
/// `line` is the first physical line of the offending command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// A `\` followed by whitespace, rejected in strict mode.
    #[error("line {line}: `\\` followed by whitespace does not continue the command")]
    StrayContinuation {
        /// Line number.
        line: usize,
    },

    /// A quote without its closing counterpart.
    #[error("line {line}: unterminated quote")]
    UnterminatedQuote {
        /// Line number.
        line: usize,
    },

    /// `$NAME` with no prior assignment.
    #[error("line {line}: undefined variable `{name}`")]
    UndefinedVariable {
        /// Line number.
        line: usize,
        /// Variable name.
        name: String,
    },

    /// `$(( ... ))` that cannot be evaluated.
    #[error("line {line}: cannot evaluate `$(({expr}))`: {reason}")]
    Arithmetic {
        /// Line number.
        line: usize,
        /// Expression between the parentheses.
        expr: String,
        /// What went wrong.
        reason: String,
    },

    /// Pipes, redirections, command substitution and the like.
    #[error("line {line}: unsupported shell syntax `{syntax}`")]
    Unsupported {
        /// Line number.
        line: usize,
        /// The construct.
        syntax: String,
    },
}
