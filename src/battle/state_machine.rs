//! Match state machine: Pending → InProgress → Completed, with Bye as a
//! terminal state reached without play.
//!
//! Every transition re-checks the observed status against the expected
//! pre-state and fails with a conflict otherwise, so duplicate
//! concurrent calls resolve exactly once.

use chrono::{DateTime, Utc};
use log::debug;

use super::models::{AnswerRecord, Match, MatchStatus, PendingAnswer, Side};
use crate::error::{EngineError, EngineResult};
use crate::question::{AnswerPayload, CheckAnswer};
use crate::tournament::models::ParticipantId;

impl Match {
    /// Start play. Valid only from `Pending` with both sides assigned;
    /// activates the first question.
    pub fn start(&mut self, now: DateTime<Utc>) -> EngineResult<()> {
        if self.status != MatchStatus::Pending {
            return Err(EngineError::InvalidMatchStatus {
                expected: MatchStatus::Pending,
                actual: self.status,
            });
        }
        if self.contender_a.is_none() || self.contender_b.is_none() {
            return Err(EngineError::MissingOpponent);
        }
        self.status = MatchStatus::InProgress;
        self.current_question = 0;
        self.revealed = false;
        self.question_started_at = Some(now);
        debug!("match {} started", self.id);
        Ok(())
    }

    /// Buffer one participant's answer for the active question.
    ///
    /// The two sides submit independently; there is no alternation gate.
    /// The only access control is one submission per (question,
    /// participant).
    pub fn submit_answer(
        &mut self,
        participant_id: ParticipantId,
        payload: AnswerPayload,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        if self.status != MatchStatus::InProgress {
            return Err(EngineError::InvalidMatchStatus {
                expected: MatchStatus::InProgress,
                actual: self.status,
            });
        }
        if self.side_of(participant_id).is_none() {
            return Err(EngineError::NotInMatch(participant_id));
        }
        let index = self.current_question;
        let Some(question) = self.active_question() else {
            return Err(EngineError::NoActiveQuestion);
        };
        if self.revealed {
            return Err(EngineError::QuestionResolved);
        }
        let expected = question.body.expected_payload();
        if payload.kind() != expected {
            return Err(EngineError::MalformedAnswer { expected });
        }
        let duplicate = self
            .pending
            .iter()
            .any(|p| p.participant_id == participant_id)
            || self
                .answers
                .iter()
                .any(|r| r.question_index == index && r.participant_id == participant_id);
        if duplicate {
            return Err(EngineError::DuplicateAnswer);
        }
        self.pending.push(PendingAnswer {
            participant_id,
            payload,
            submitted_at: now,
        });
        Ok(())
    }

    /// Whether the presenter may reveal: both sides answered, or the
    /// advisory time limit has elapsed since the question was activated.
    /// Elapsing never reveals on its own.
    pub fn ready_to_reveal(&self, now: DateTime<Utc>, default_limit_secs: u32) -> bool {
        let both_answered = [Side::A, Side::B].into_iter().all(|side| {
            self.contender(side)
                .is_some_and(|id| self.pending.iter().any(|p| p.participant_id == id))
        });
        if both_answered {
            return true;
        }
        let limit = self
            .active_question()
            .and_then(|q| q.time_limit_secs)
            .unwrap_or(default_limit_secs);
        self.question_started_at
            .is_some_and(|started| (now - started).num_seconds() >= i64::from(limit))
    }

    /// Score the active question: persist an answer record per buffered
    /// submission and award a point per correct side. A side that never
    /// answered scores incorrect and gets no record. Exactly-once per
    /// question.
    pub fn reveal_result(
        &mut self,
        now: DateTime<Utc>,
        default_limit_secs: u32,
    ) -> EngineResult<()> {
        if self.status != MatchStatus::InProgress {
            return Err(EngineError::InvalidMatchStatus {
                expected: MatchStatus::InProgress,
                actual: self.status,
            });
        }
        if self.active_question().is_none() {
            return Err(EngineError::NoActiveQuestion);
        }
        if self.revealed {
            return Err(EngineError::QuestionResolved);
        }
        if !self.ready_to_reveal(now, default_limit_secs) {
            return Err(EngineError::RevealNotReady);
        }
        let index = self.current_question;
        for pending in std::mem::take(&mut self.pending) {
            // Shape was validated at submission; check pure correctness.
            let is_correct = self.questions[index].body.check(&pending.payload);
            if is_correct {
                match self.side_of(pending.participant_id) {
                    Some(Side::A) => self.score_a += 1,
                    Some(Side::B) => self.score_b += 1,
                    None => {}
                }
            }
            self.answers.push(AnswerRecord {
                match_id: self.id,
                question_index: index,
                participant_id: pending.participant_id,
                submitted: pending.payload,
                is_correct,
                submitted_at: pending.submitted_at,
            });
        }
        self.revealed = true;
        debug!(
            "match {} question {index} revealed, score {}-{}",
            self.id, self.score_a, self.score_b
        );
        Ok(())
    }

    /// Advance to the next question. The active question must have been
    /// revealed first; past the end of the sequence the match is ready
    /// for completion.
    pub fn next_question(&mut self, now: DateTime<Utc>) -> EngineResult<()> {
        if self.status != MatchStatus::InProgress {
            return Err(EngineError::InvalidMatchStatus {
                expected: MatchStatus::InProgress,
                actual: self.status,
            });
        }
        if self.exhausted() {
            return Err(EngineError::NoActiveQuestion);
        }
        if !self.revealed {
            return Err(EngineError::RevealPending);
        }
        self.current_question += 1;
        self.revealed = false;
        self.question_started_at = if self.exhausted() { None } else { Some(now) };
        Ok(())
    }

    /// Resolve the match: higher score wins, equal scores leave the
    /// winner unset (a draw). Valid from `InProgress` whether the
    /// sequence is exhausted or the presenter ends it early; a second
    /// call observes `Completed` and fails, so completion fires exactly
    /// once.
    pub fn complete(&mut self) -> EngineResult<()> {
        if self.status != MatchStatus::InProgress {
            return Err(EngineError::InvalidMatchStatus {
                expected: MatchStatus::InProgress,
                actual: self.status,
            });
        }
        self.winner = match self.score_a.cmp(&self.score_b) {
            std::cmp::Ordering::Greater => self.contender_a,
            std::cmp::Ordering::Less => self.contender_b,
            std::cmp::Ordering::Equal => None,
        };
        self.status = MatchStatus::Completed;
        self.question_started_at = None;
        self.pending.clear();
        debug!(
            "match {} completed {}-{}, winner {:?}",
            self.id, self.score_a, self.score_b, self.winner
        );
        Ok(())
    }
}
