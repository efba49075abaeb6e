//! External collaborator seams.
//!
//! The engine consumes a question bank, a roster, and a reward sink but
//! implements none of them; hosts plug in their own backends. Provider
//! errors surface as strings and are wrapped into [`EngineError`]
//! variants by the manager.
//!
//! [`EngineError`]: crate::error::EngineError

use async_trait::async_trait;

use crate::question::RawQuestion;
use crate::tournament::models::{ContenderRef, ParticipantKind, RewardTier, TournamentId};

/// A resolved student or team identity.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Contender {
    pub id: i64,
    pub display_name: String,
}

/// Source of assessable questions.
#[async_trait]
pub trait QuestionBank: Send + Sync {
    /// Draw an ordered sequence of `count` questions for one match.
    /// Payloads may arrive in heterogeneous shapes; the engine
    /// normalizes them at ingestion.
    async fn draw(&self, count: usize) -> Result<Vec<RawQuestion>, String>;
}

/// Source of student and team identities.
#[async_trait]
pub trait Roster: Send + Sync {
    /// Resolve external ids into contenders, in the given order. Every
    /// id must resolve; an unknown id is an error.
    async fn resolve(&self, kind: ParticipantKind, ids: &[i64]) -> Result<Vec<Contender>, String>;
}

/// Sink for XP and point grants issued when a tournament finishes.
#[async_trait]
pub trait RewardService: Send + Sync {
    async fn grant(
        &self,
        tournament_id: TournamentId,
        contender: ContenderRef,
        final_position: Option<u32>,
        tier: RewardTier,
    ) -> Result<(), String>;
}
