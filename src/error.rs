/// ==============================================================================================
/// ======================================= Error Types ==========================================
/// ==============================================================================================

use thiserror::Error;

/// Branch-rule violations detected while binding the deck's branch structure.
///     Carried inside `CompileError::Topology` so callers see a single
///     compile-time error surface.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TopologyError {
    /// TOPBRANCH/ENDBRANCH with no prior block in the current branch,
    /// or a TOP anchor pair that does not exist.
    #[error("line {line}: branch call has no anchor block in the current branch")]
    AnchorMissing { line: usize },

    /// A `BRANCH` beyond the first with nothing queued to bind to.
    #[error("line {line}: BRANCH has no pending TOPBRANCH/ENDBRANCH call to bind")]
    NoPendingCall { line: usize },

    /// Pending attachment calls left unbound at end of input.
    #[error("{pending} branch call(s) left unbound at end of deck")]
    UnboundBranch { pending: usize },

    /// An END attachment anchored in the final block of the main branch.
    #[error("line {line}: ENDBRANCH attached after the last block of the main branch")]
    EndbranchOnFinalBlock { line: usize },
}

/// Deck compilation errors. Every variant that points at a statement carries
/// the 1-based line number; token payloads are the offending text verbatim.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("line {line}: malformed numeric token `{token}`")]
    BadNumber { line: usize, token: String },

    #[error("line {line}: {command} is missing an argument")]
    MissingArgument { line: usize, command: String },

    #[error("line {line}: unknown SWITCH kind `{token}`")]
    UnknownSwitchKind { line: usize, token: String },

    #[error("line {line}: statement before the first BRANCH")]
    StatementOutsideBranch { line: usize },

    #[error("line {line}: TRL has no resolution (per-line, TRLINE-RESOLUTION, or RESOLUTION-TIME)")]
    NoResolution { line: usize },

    #[error("deck has missing or nonpositive TIME-STEP / END-TIME")]
    BadTiming,

    #[error(transparent)]
    Topology(#[from] TopologyError),
}

/// Runtime solver errors. Node indices are local to the named branch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    #[error("singular system after diagonal flooring (branch {branch}, node {node})")]
    Singular { branch: usize, node: usize },

    #[error("non-finite coefficient reached assembly (branch {branch}, node {node})")]
    NonFinite { branch: usize, node: usize },
}
