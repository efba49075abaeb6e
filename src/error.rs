//! Engine error types.

use thiserror::Error;

use crate::battle::models::{MatchId, MatchStatus};
use crate::question::QuestionPayloadKind;
use crate::tournament::models::{
    ParticipantId, TournamentFormat, TournamentId, TournamentStatus,
};

/// Broad classification of an engine error, for callers that map errors
/// onto transport-level responses.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// The request itself is unacceptable (bad counts, wrong lifecycle
    /// phase, malformed data).
    Validation,
    /// The request raced with another actor or repeats an action that
    /// already happened.
    Conflict,
    /// The referenced entity does not exist.
    NotFound,
}

/// Errors that can occur during tournament and match operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    #[error("match not found: {0}")]
    MatchNotFound(MatchId),

    #[error("participant not found: {0}")]
    ParticipantNotFound(ParticipantId),

    #[error("need at least {needed} participants, have {current}")]
    NotEnoughParticipants { needed: usize, current: usize },

    #[error("tournament is full: capacity {capacity}")]
    CapacityReached { capacity: usize },

    #[error("bracket capacity must be a power of two, got {0}")]
    InvalidCapacity(usize),

    #[error("structural changes require draft status, tournament is {0}")]
    NotDraft(TournamentStatus),

    #[error("tournament not in correct status: expected {expected}, got {actual}")]
    InvalidTournamentStatus {
        expected: TournamentStatus,
        actual: TournamentStatus,
    },

    #[error("match not in correct status: expected {expected}, got {actual}")]
    InvalidMatchStatus {
        expected: MatchStatus,
        actual: MatchStatus,
    },

    #[error("matches already generated for this tournament")]
    AlreadyGenerated,

    #[error("operation requires a {expected} tournament")]
    WrongFormat { expected: TournamentFormat },

    #[error("roster changed while matches were being generated")]
    RosterChanged,

    #[error("contender already registered")]
    AlreadyRegistered,

    #[error("match has no opponent assigned yet")]
    MissingOpponent,

    #[error("participant {0} is not part of this match")]
    NotInMatch(ParticipantId),

    #[error("answer already recorded for this question")]
    DuplicateAnswer,

    #[error("question already resolved")]
    QuestionResolved,

    #[error("result not ready: waiting on answers and the time limit has not elapsed")]
    RevealNotReady,

    #[error("no active question")]
    NoActiveQuestion,

    #[error("current question has not been revealed yet")]
    RevealPending,

    #[error("malformed question payload: {0}")]
    MalformedQuestion(String),

    #[error("question {0} has no correct option")]
    NoCorrectOption(i64),

    #[error("answer payload does not fit the question: expected {expected}")]
    MalformedAnswer { expected: QuestionPayloadKind },

    #[error("question bank error: {0}")]
    QuestionBank(String),

    #[error("roster error: {0}")]
    Roster(String),

    #[error("reward service error: {0}")]
    Reward(String),
}

impl EngineError {
    /// Classify this error for transport mapping.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::TournamentNotFound(_)
            | Self::MatchNotFound(_)
            | Self::ParticipantNotFound(_) => ErrorKind::NotFound,

            Self::InvalidTournamentStatus { .. }
            | Self::InvalidMatchStatus { .. }
            | Self::AlreadyGenerated
            | Self::AlreadyRegistered
            | Self::MissingOpponent
            | Self::DuplicateAnswer
            | Self::QuestionResolved
            | Self::RevealNotReady
            | Self::NoActiveQuestion
            | Self::RevealPending
            | Self::RosterChanged => ErrorKind::Conflict,

            _ => ErrorKind::Validation,
        }
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
