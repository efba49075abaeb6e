//! Tournament data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::battle::models::MatchId;
use crate::error::{EngineError, EngineResult};

/// Tournament ID type
pub type TournamentId = i64;

/// Participant ID type
pub type ParticipantId = i64;

/// Competition format
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentFormat {
    /// Single-elimination bracket
    Bracket,
    /// Round-robin league
    League,
}

impl fmt::Display for TournamentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Bracket => "bracket",
            Self::League => "league",
        };
        write!(f, "{repr}")
    }
}

/// Whether contenders are individual students or teams
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantKind {
    Individual,
    Team,
}

/// Tournament lifecycle status
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    /// Roster open; structural changes allowed
    Draft,
    /// Matches generated, none started
    Ready,
    /// At least one match started
    Active,
    /// Operator hold; no new match may start
    Paused,
    /// All required matches resolved
    Finished,
}

impl fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Draft => "draft",
            Self::Ready => "ready",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Finished => "finished",
        };
        write!(f, "{repr}")
    }
}

/// XP and points granted for one finishing tier
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RewardTier {
    pub xp: u32,
    pub points: u32,
}

/// Reward tiers for places 1-3 and participation
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RewardTiers {
    pub first: RewardTier,
    pub second: RewardTier,
    pub third: RewardTier,
    pub participation: RewardTier,
}

impl Default for RewardTiers {
    fn default() -> Self {
        Self {
            first: RewardTier { xp: 500, points: 100 },
            second: RewardTier { xp: 300, points: 60 },
            third: RewardTier { xp: 200, points: 40 },
            participation: RewardTier { xp: 50, points: 10 },
        }
    }
}

impl RewardTiers {
    /// The tier owed for a final position; participation when unplaced
    /// or below third.
    pub fn for_position(&self, position: Option<u32>) -> RewardTier {
        match position {
            Some(1) => self.first,
            Some(2) => self.second,
            Some(3) => self.third,
            _ => self.participation,
        }
    }
}

/// Reference to an externally owned contender (student or team).
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ContenderRef {
    pub kind: ParticipantKind,
    pub id: i64,
}

/// Tournament configuration
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TournamentConfig {
    pub title: String,
    pub format: TournamentFormat,
    pub participant_kind: ParticipantKind,
    /// Maximum roster size; must be a power of two for brackets
    pub capacity: usize,
    pub questions_per_match: usize,
    /// Advisory display limit, also the reveal-without-answer threshold
    pub seconds_per_question: u32,
    pub rewards: RewardTiers,
}

impl TournamentConfig {
    /// A single-elimination bracket with standard pacing.
    pub fn bracket(title: String, capacity: usize) -> Self {
        Self {
            title,
            format: TournamentFormat::Bracket,
            participant_kind: ParticipantKind::Individual,
            capacity,
            questions_per_match: 5,
            seconds_per_question: 20,
            rewards: RewardTiers::default(),
        }
    }

    /// A round-robin league with standard pacing.
    pub fn league(title: String, capacity: usize) -> Self {
        Self {
            format: TournamentFormat::League,
            ..Self::bracket(title, capacity)
        }
    }

    pub fn with_participant_kind(mut self, kind: ParticipantKind) -> Self {
        self.participant_kind = kind;
        self
    }

    pub fn with_questions_per_match(mut self, count: usize) -> Self {
        self.questions_per_match = count;
        self
    }

    pub fn with_seconds_per_question(mut self, secs: u32) -> Self {
        self.seconds_per_question = secs;
        self
    }

    pub fn with_rewards(mut self, rewards: RewardTiers) -> Self {
        self.rewards = rewards;
        self
    }

    /// Validate the configuration before a tournament is created.
    pub fn validate(&self) -> EngineResult<()> {
        if self.capacity < 2 {
            return Err(EngineError::NotEnoughParticipants {
                needed: 2,
                current: self.capacity,
            });
        }
        if self.format == TournamentFormat::Bracket && !self.capacity.is_power_of_two() {
            return Err(EngineError::InvalidCapacity(self.capacity));
        }
        if self.questions_per_match == 0 {
            return Err(EngineError::MalformedQuestion(
                "questions_per_match must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// A seeded roster entry.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub tournament_id: TournamentId,
    /// 1-based seed; seeds always form a contiguous permutation
    pub seed: u32,
    pub contender: ContenderRef,
    pub display_name: String,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    /// Bracket only; league participants are never eliminated
    pub eliminated: bool,
    pub final_position: Option<u32>,
}

/// A tournament record.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub config: TournamentConfig,
    pub status: TournamentStatus,
    /// Lowest round with unresolved matches; 0 before generation
    pub current_round: u32,
    /// 0 before generation
    pub total_rounds: u32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Full tournament view: record, roster, and the round-indexed match
/// arena.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TournamentInfo {
    pub tournament: Tournament,
    /// Seed-ordered roster
    pub participants: Vec<Participant>,
    /// `rounds[r - 1]` holds round r's match ids in slot order
    pub rounds: Vec<Vec<MatchId>>,
}
