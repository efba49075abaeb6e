//! # Quiz Arena
//!
//! A tournament and match orchestration engine for quiz competitions.
//!
//! The engine turns a roster of participants into a structured
//! competition — a single-elimination bracket or a round-robin league —
//! advances winners round by round, and resolves each head-to-head
//! match through an ordered question sequence with four
//! answer-validation policies.
//!
//! ## Architecture
//!
//! Everything is request/response driven by an external presentation
//! controller; there is no autonomous scheduler and no background
//! timer. Question time limits are advisory display values, checked
//! only when the presenter asks for a reveal.
//!
//! - [`tournament`]: lifecycle manager, roster, advancement, rewards
//! - [`bracket`]: single-elimination tree generation with seeded byes
//! - [`schedule`]: circle-method round-robin scheduling
//! - [`battle`]: per-match state machine over a question sequence
//! - [`standings`]: derived league table with deterministic tie-breaks
//! - [`question`]: normalized question snapshots and answer checking
//! - [`providers`]: seams for the question bank, roster, and rewards
//!
//! ## Example
//!
//! ```no_run
//! use quiz_arena::{TournamentConfig, TournamentManager};
//! # use std::sync::Arc;
//! # async fn example(
//! #     bank: Arc<dyn quiz_arena::providers::QuestionBank>,
//! #     roster: Arc<dyn quiz_arena::providers::Roster>,
//! #     rewards: Arc<dyn quiz_arena::providers::RewardService>,
//! # ) -> Result<(), quiz_arena::EngineError> {
//! let manager = TournamentManager::new(bank, roster, rewards);
//! let id = manager
//!     .create_tournament(TournamentConfig::league("Class League".to_string(), 6))
//!     .await?;
//! # Ok(())
//! # }
//! ```

/// Per-match head-to-head resolution.
pub mod battle;
pub use battle::{AnswerRecord, Match, MatchId, MatchStatus};

/// Single-elimination bracket generation.
pub mod bracket;

/// Engine error types.
pub mod error;
pub use error::{EngineError, EngineResult, ErrorKind};

/// External collaborator seams.
pub mod providers;

/// Question snapshots and answer validation.
pub mod question;
pub use question::{AnswerPayload, Question, QuestionKind, RawQuestion};

/// Round-robin league scheduling.
pub mod schedule;

/// Derived league standings.
pub mod standings;
pub use standings::StandingsRow;

/// Tournament lifecycle orchestration.
pub mod tournament;
pub use tournament::{
    Participant, ParticipantKind, RewardTiers, Tournament, TournamentConfig, TournamentFormat,
    TournamentId, TournamentInfo, TournamentManager, TournamentStatus,
};
