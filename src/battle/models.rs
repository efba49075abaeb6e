//! Match data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::question::{AnswerPayload, Question};
use crate::tournament::models::{ParticipantId, TournamentId};

/// Match ID type
pub type MatchId = i64;

/// Match lifecycle status
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Created, waiting for both sides and a start call
    Pending,
    /// Being played
    InProgress,
    /// Resolved; `winner` is None on a draw
    Completed,
    /// Auto-won without play; one side was never assigned
    Bye,
}

impl MatchStatus {
    /// Terminal statuses accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Bye)
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Bye => "bye",
        };
        write!(f, "{repr}")
    }
}

/// One side of a match
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Side {
    A,
    B,
}

/// A scored answer, persisted at reveal time.
///
/// At most one record exists per (match, question index, participant).
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct AnswerRecord {
    pub match_id: MatchId,
    pub question_index: usize,
    pub participant_id: ParticipantId,
    pub submitted: AnswerPayload,
    pub is_correct: bool,
    pub submitted_at: DateTime<Utc>,
}

/// A submission buffered until the active question is revealed.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub(crate) struct PendingAnswer {
    pub participant_id: ParticipantId,
    pub payload: AnswerPayload,
    pub submitted_at: DateTime<Utc>,
}

/// One head-to-head contest in a tournament.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Match {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    /// 1-based round number
    pub round: u32,
    /// Index of this match within its round's array; the winner of slot
    /// `i` feeds slot `i / 2` of the next round.
    pub slot: usize,
    pub status: MatchStatus,
    pub contender_a: Option<ParticipantId>,
    pub contender_b: Option<ParticipantId>,
    pub score_a: u32,
    pub score_b: u32,
    /// None while unresolved, and after completion on a draw
    pub winner: Option<ParticipantId>,
    pub current_question: usize,
    /// Per-match question snapshots; empty for byes
    pub questions: Vec<Question>,
    /// Downstream match the winner feeds; None for the final and for
    /// league matches
    pub next_slot: Option<MatchId>,
    /// When the active question was activated; advisory-limit baseline
    pub question_started_at: Option<DateTime<Utc>>,
    /// Whether the active question's result has been revealed
    pub revealed: bool,
    pub(crate) pending: Vec<PendingAnswer>,
    pub answers: Vec<AnswerRecord>,
}

impl Match {
    /// Create a pending match.
    pub fn new(
        id: MatchId,
        tournament_id: TournamentId,
        round: u32,
        slot: usize,
        contender_a: Option<ParticipantId>,
        contender_b: Option<ParticipantId>,
        questions: Vec<Question>,
    ) -> Self {
        Self {
            id,
            tournament_id,
            round,
            slot,
            status: MatchStatus::Pending,
            contender_a,
            contender_b,
            score_a: 0,
            score_b: 0,
            winner: None,
            current_question: 0,
            questions,
            next_slot: None,
            question_started_at: None,
            revealed: false,
            pending: Vec::new(),
            answers: Vec::new(),
        }
    }

    /// Create a bye: auto-won at creation, no question sequence.
    pub fn new_bye(
        id: MatchId,
        tournament_id: TournamentId,
        round: u32,
        slot: usize,
        auto_winner: ParticipantId,
    ) -> Self {
        let mut m = Self::new(id, tournament_id, round, slot, Some(auto_winner), None, Vec::new());
        m.status = MatchStatus::Bye;
        m.winner = Some(auto_winner);
        m
    }

    /// Which side a participant plays on, if either.
    pub fn side_of(&self, participant_id: ParticipantId) -> Option<Side> {
        if self.contender_a == Some(participant_id) {
            Some(Side::A)
        } else if self.contender_b == Some(participant_id) {
            Some(Side::B)
        } else {
            None
        }
    }

    /// The participant on the given side, if assigned.
    pub fn contender(&self, side: Side) -> Option<ParticipantId> {
        match side {
            Side::A => self.contender_a,
            Side::B => self.contender_b,
        }
    }

    /// The opponent of the given participant, if both sides are known.
    pub fn opponent_of(&self, participant_id: ParticipantId) -> Option<ParticipantId> {
        match self.side_of(participant_id)? {
            Side::A => self.contender_b,
            Side::B => self.contender_a,
        }
    }

    /// The active question, if the sequence is not exhausted.
    pub fn active_question(&self) -> Option<&Question> {
        self.questions.get(self.current_question)
    }

    /// Whether every question in the sequence has been played.
    pub fn exhausted(&self) -> bool {
        self.current_question >= self.questions.len()
    }

    /// The loser, once completed with a winner. None on a draw or bye.
    pub fn loser(&self) -> Option<ParticipantId> {
        let winner = self.winner?;
        self.opponent_of(winner)
    }
}
