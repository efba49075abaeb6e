//! Tournament orchestration.
//!
//! This module provides the tournament lifecycle:
//! - Draft roster management (register, remove, shuffle seeds)
//! - Bracket / schedule generation
//! - Match driving through the presenter-facing manager API
//! - Winner advancement, final positions, and reward grants
//!
//! ## Example
//!
//! ```no_run
//! use quiz_arena::tournament::{TournamentConfig, TournamentManager};
//! use std::sync::Arc;
//!
//! # async fn example(
//! #     bank: Arc<dyn quiz_arena::providers::QuestionBank>,
//! #     roster: Arc<dyn quiz_arena::providers::Roster>,
//! #     rewards: Arc<dyn quiz_arena::providers::RewardService>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let manager = TournamentManager::new(bank, roster, rewards);
//!
//! // An 8-slot single-elimination bracket.
//! let config = TournamentConfig::bracket("Friday Cup".to_string(), 8);
//! let id = manager.create_tournament(config).await?;
//! manager.add_participants(id, &[101, 102, 103, 104, 105]).await?;
//! manager.generate_bracket(id).await?;
//! # Ok(())
//! # }
//! ```

pub(crate) mod advancement;
pub mod manager;
pub mod models;

pub use manager::TournamentManager;
pub use models::{
    ContenderRef, Participant, ParticipantId, ParticipantKind, RewardTier, RewardTiers,
    Tournament, TournamentConfig, TournamentFormat, TournamentId, TournamentInfo,
    TournamentStatus,
};
