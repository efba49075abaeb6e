//! Tournament manager: the request/response orchestration surface.
//!
//! All state lives in memory behind a `tokio::sync::RwLock`. Every
//! status transition re-checks the observed status under the write lock
//! (compare-and-set), so duplicate concurrent calls to the same
//! transition resolve exactly once. Generation is all-or-nothing:
//! question drawing and match construction happen fully before the
//! store is touched.

use chrono::Utc;
use log::{info, warn};
use rand::seq::SliceRandom;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::advancement;
use super::models::{
    ContenderRef, Participant, ParticipantId, RewardTier, Tournament, TournamentConfig,
    TournamentFormat, TournamentId, TournamentInfo, TournamentStatus,
};
use crate::battle::models::{Match, MatchId, MatchStatus};
use crate::bracket;
use crate::error::{EngineError, EngineResult};
use crate::providers::{QuestionBank, RewardService, Roster};
use crate::question::{AnswerPayload, Question};
use crate::schedule;
use crate::standings::{self, StandingsRow};

/// One tournament's full state: record, roster, and the round-indexed
/// match arena.
pub(crate) struct TournamentRecord {
    pub(crate) tournament: Tournament,
    /// Seed-ordered
    pub(crate) participants: Vec<Participant>,
    pub(crate) matches: HashMap<MatchId, Match>,
    pub(crate) rounds: Vec<Vec<MatchId>>,
}

struct EngineState {
    tournaments: HashMap<TournamentId, TournamentRecord>,
    /// Match id to owning tournament
    match_index: HashMap<MatchId, TournamentId>,
    next_tournament_id: TournamentId,
    next_match_id: MatchId,
    next_participant_id: ParticipantId,
}

impl EngineState {
    fn record_mut(&mut self, id: TournamentId) -> EngineResult<&mut TournamentRecord> {
        self.tournaments
            .get_mut(&id)
            .ok_or(EngineError::TournamentNotFound(id))
    }

    fn record(&self, id: TournamentId) -> EngineResult<&TournamentRecord> {
        self.tournaments
            .get(&id)
            .ok_or(EngineError::TournamentNotFound(id))
    }

    fn record_for_match(&mut self, match_id: MatchId) -> EngineResult<&mut TournamentRecord> {
        let tournament_id = *self
            .match_index
            .get(&match_id)
            .ok_or(EngineError::MatchNotFound(match_id))?;
        self.record_mut(tournament_id)
    }
}

/// Tournament manager
#[derive(Clone)]
pub struct TournamentManager {
    question_bank: Arc<dyn QuestionBank>,
    roster: Arc<dyn Roster>,
    rewards: Arc<dyn RewardService>,
    state: Arc<RwLock<EngineState>>,
}

impl TournamentManager {
    /// Create a new tournament manager over the given collaborators.
    pub fn new(
        question_bank: Arc<dyn QuestionBank>,
        roster: Arc<dyn Roster>,
        rewards: Arc<dyn RewardService>,
    ) -> Self {
        Self {
            question_bank,
            roster,
            rewards,
            state: Arc::new(RwLock::new(EngineState {
                tournaments: HashMap::new(),
                match_index: HashMap::new(),
                next_tournament_id: 1,
                next_match_id: 1,
                next_participant_id: 1,
            })),
        }
    }

    /// Create a new tournament in draft status.
    pub async fn create_tournament(&self, config: TournamentConfig) -> EngineResult<TournamentId> {
        config.validate()?;
        let mut state = self.state.write().await;
        let id = state.next_tournament_id;
        state.next_tournament_id += 1;
        state.tournaments.insert(
            id,
            TournamentRecord {
                tournament: Tournament {
                    id,
                    config,
                    status: TournamentStatus::Draft,
                    current_round: 0,
                    total_rounds: 0,
                    created_at: Utc::now(),
                    started_at: None,
                    finished_at: None,
                },
                participants: Vec::new(),
                matches: HashMap::new(),
                rounds: Vec::new(),
            },
        );
        info!("created tournament {id}");
        Ok(id)
    }

    /// Register contenders, assigning the next free seeds. Draft only.
    pub async fn add_participants(
        &self,
        tournament_id: TournamentId,
        contender_ids: &[i64],
    ) -> EngineResult<Vec<ParticipantId>> {
        let kind = {
            let state = self.state.read().await;
            let record = state.record(tournament_id)?;
            require_draft(&record.tournament)?;
            record.tournament.config.participant_kind
        };

        // Resolve identities without holding the lock, then re-validate
        // under the write lock before mutating.
        let contenders = self
            .roster
            .resolve(kind, contender_ids)
            .await
            .map_err(EngineError::Roster)?;
        if contenders.len() != contender_ids.len() {
            return Err(EngineError::Roster(
                "roster did not resolve every id".into(),
            ));
        }

        let mut state = self.state.write().await;
        {
            let record = state.record(tournament_id)?;
            require_draft(&record.tournament)?;
            let capacity = record.tournament.config.capacity;
            if record.participants.len() + contenders.len() > capacity {
                return Err(EngineError::CapacityReached { capacity });
            }
            // Guard against duplicates within the batch as well as
            // against the existing roster.
            let mut seen: HashSet<i64> = record
                .participants
                .iter()
                .map(|p| p.contender.id)
                .collect();
            for contender in &contenders {
                if !seen.insert(contender.id) {
                    return Err(EngineError::AlreadyRegistered);
                }
            }
        }

        let first_id = state.next_participant_id;
        state.next_participant_id += contenders.len() as i64;
        let mut assigned_ids = Vec::with_capacity(contenders.len());
        let record = state.record_mut(tournament_id)?;
        for (offset, contender) in contenders.into_iter().enumerate() {
            let id = first_id + offset as i64;
            let seed = record.participants.len() as u32 + 1;
            record.participants.push(Participant {
                id,
                tournament_id,
                seed,
                contender: ContenderRef {
                    kind,
                    id: contender.id,
                },
                display_name: contender.display_name,
                wins: 0,
                draws: 0,
                losses: 0,
                eliminated: false,
                final_position: None,
            });
            assigned_ids.push(id);
        }
        Ok(assigned_ids)
    }

    /// Remove a participant and close the seed gap. Draft only.
    pub async fn remove_participant(
        &self,
        tournament_id: TournamentId,
        participant_id: ParticipantId,
    ) -> EngineResult<()> {
        let mut state = self.state.write().await;
        let record = state.record_mut(tournament_id)?;
        require_draft(&record.tournament)?;
        let before = record.participants.len();
        record.participants.retain(|p| p.id != participant_id);
        if record.participants.len() == before {
            return Err(EngineError::ParticipantNotFound(participant_id));
        }
        reseed(&mut record.participants);
        Ok(())
    }

    /// Randomize the seed order. Draft only.
    pub async fn shuffle_seeds(&self, tournament_id: TournamentId) -> EngineResult<()> {
        let mut state = self.state.write().await;
        let record = state.record_mut(tournament_id)?;
        require_draft(&record.tournament)?;
        record.participants.shuffle(&mut rand::rng());
        reseed(&mut record.participants);
        Ok(())
    }

    /// Generate the full single-elimination match tree and flip the
    /// tournament to ready. Atomic: every match for every round is
    /// created, or none is.
    pub async fn generate_bracket(&self, tournament_id: TournamentId) -> EngineResult<()> {
        let (n, per_match) =
            self.pre_generation_checks(tournament_id, TournamentFormat::Bracket).await?;
        // A bracket of N participants plays N - 1 real matches.
        let question_sets = self.draw_question_sets(n - 1, per_match).await?;

        let mut state = self.state.write().await;
        let mut next_match_id = state.next_match_id;
        let record = state.record_mut(tournament_id)?;
        if !record.matches.is_empty() {
            return Err(EngineError::AlreadyGenerated);
        }
        require_draft(&record.tournament)?;
        if record.participants.len() != n {
            return Err(EngineError::RosterChanged);
        }
        let plan = bracket::build(
            tournament_id,
            &record.participants,
            question_sets,
            &mut next_match_id,
        )?;
        let bye_ids: Vec<MatchId> = plan
            .matches
            .iter()
            .filter(|m| m.status == MatchStatus::Bye)
            .map(|m| m.id)
            .collect();
        let match_ids: Vec<MatchId> = plan.matches.iter().map(|m| m.id).collect();
        record.tournament.total_rounds = plan.total_rounds;
        record.tournament.current_round = 1;
        record.tournament.status = TournamentStatus::Ready;
        record.rounds = plan.rounds;
        record
            .matches
            .extend(plan.matches.into_iter().map(|m| (m.id, m)));
        // Byes resolve at creation: credit the auto-winner and slot
        // them into the next round.
        for bye_id in bye_ids {
            advancement::apply(record, bye_id, Utc::now())?;
        }
        for id in match_ids {
            state.match_index.insert(id, tournament_id);
        }
        state.next_match_id = next_match_id;
        info!("generated bracket for tournament {tournament_id}");
        Ok(())
    }

    /// Generate the full round-robin schedule and flip the tournament
    /// to ready. Atomic like bracket generation.
    pub async fn build_schedule(&self, tournament_id: TournamentId) -> EngineResult<()> {
        let (n, per_match) =
            self.pre_generation_checks(tournament_id, TournamentFormat::League).await?;
        let question_sets = self.draw_question_sets(n * (n - 1) / 2, per_match).await?;

        let mut state = self.state.write().await;
        let mut next_match_id = state.next_match_id;
        let record = state.record_mut(tournament_id)?;
        if !record.matches.is_empty() {
            return Err(EngineError::AlreadyGenerated);
        }
        require_draft(&record.tournament)?;
        if record.participants.len() != n {
            return Err(EngineError::RosterChanged);
        }
        let plan = schedule::build(
            tournament_id,
            &record.participants,
            question_sets,
            &mut next_match_id,
        )?;
        let match_ids: Vec<MatchId> = plan.matches.iter().map(|m| m.id).collect();
        record.tournament.total_rounds = plan.total_rounds;
        record.tournament.current_round = 1;
        record.tournament.status = TournamentStatus::Ready;
        record.rounds = plan.rounds;
        record
            .matches
            .extend(plan.matches.into_iter().map(|m| (m.id, m)));
        for id in match_ids {
            state.match_index.insert(id, tournament_id);
        }
        state.next_match_id = next_match_id;
        info!("built schedule for tournament {tournament_id}");
        Ok(())
    }

    /// Full tournament view.
    pub async fn get_tournament(&self, tournament_id: TournamentId) -> EngineResult<TournamentInfo> {
        let state = self.state.read().await;
        let record = state.record(tournament_id)?;
        Ok(TournamentInfo {
            tournament: record.tournament.clone(),
            participants: record.participants.clone(),
            rounds: record.rounds.clone(),
        })
    }

    /// Single match view.
    pub async fn get_match(&self, match_id: MatchId) -> EngineResult<Match> {
        let state = self.state.read().await;
        let tournament_id = *state
            .match_index
            .get(&match_id)
            .ok_or(EngineError::MatchNotFound(match_id))?;
        let record = state.record(tournament_id)?;
        record
            .matches
            .get(&match_id)
            .cloned()
            .ok_or(EngineError::MatchNotFound(match_id))
    }

    /// List tournaments, newest first, optionally filtered by status.
    pub async fn list_tournaments(
        &self,
        status_filter: Option<TournamentStatus>,
    ) -> Vec<Tournament> {
        let state = self.state.read().await;
        let mut tournaments: Vec<Tournament> = state
            .tournaments
            .values()
            .map(|r| r.tournament.clone())
            .filter(|t| status_filter.is_none_or(|s| t.status == s))
            .collect();
        tournaments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tournaments
    }

    /// Start a match. The first start flips the tournament to active;
    /// a paused tournament starts nothing.
    pub async fn start_match(&self, match_id: MatchId) -> EngineResult<()> {
        let now = Utc::now();
        let mut state = self.state.write().await;
        let record = state.record_for_match(match_id)?;
        match record.tournament.status {
            TournamentStatus::Ready | TournamentStatus::Active => {}
            actual => {
                return Err(EngineError::InvalidTournamentStatus {
                    expected: TournamentStatus::Active,
                    actual,
                });
            }
        }
        let m = record
            .matches
            .get_mut(&match_id)
            .ok_or(EngineError::MatchNotFound(match_id))?;
        m.start(now)?;
        if record.tournament.status == TournamentStatus::Ready {
            record.tournament.status = TournamentStatus::Active;
            record.tournament.started_at = Some(now);
            info!("tournament {} is now active", record.tournament.id);
        }
        Ok(())
    }

    /// Submit one participant's answer for the active question.
    pub async fn submit_answer(
        &self,
        match_id: MatchId,
        participant_id: ParticipantId,
        payload: AnswerPayload,
    ) -> EngineResult<()> {
        let now = Utc::now();
        let mut state = self.state.write().await;
        let record = state.record_for_match(match_id)?;
        let m = record
            .matches
            .get_mut(&match_id)
            .ok_or(EngineError::MatchNotFound(match_id))?;
        m.submit_answer(participant_id, payload, now)
    }

    /// Reveal and score the active question.
    pub async fn reveal_result(&self, match_id: MatchId) -> EngineResult<()> {
        let now = Utc::now();
        let mut state = self.state.write().await;
        let record = state.record_for_match(match_id)?;
        let limit = record.tournament.config.seconds_per_question;
        let m = record
            .matches
            .get_mut(&match_id)
            .ok_or(EngineError::MatchNotFound(match_id))?;
        m.reveal_result(now, limit)
    }

    /// Advance the match to its next question.
    pub async fn next_question(&self, match_id: MatchId) -> EngineResult<()> {
        let now = Utc::now();
        let mut state = self.state.write().await;
        let record = state.record_for_match(match_id)?;
        let m = record
            .matches
            .get_mut(&match_id)
            .ok_or(EngineError::MatchNotFound(match_id))?;
        m.next_question(now)
    }

    /// Complete a match and run the advancement engine. If this was the
    /// last required match, the tournament finishes and reward grants
    /// go out.
    pub async fn complete_match(&self, match_id: MatchId) -> EngineResult<()> {
        let now = Utc::now();
        let (tournament_id, grants) = {
            let mut state = self.state.write().await;
            let record = state.record_for_match(match_id)?;
            let tournament_id = record.tournament.id;
            let m = record
                .matches
                .get_mut(&match_id)
                .ok_or(EngineError::MatchNotFound(match_id))?;
            m.complete()?;
            let finished = advancement::apply(record, match_id, now)?;
            let grants: Vec<(ContenderRef, Option<u32>, RewardTier)> = if finished {
                let tiers = record.tournament.config.rewards;
                record
                    .participants
                    .iter()
                    .map(|p| {
                        (
                            p.contender,
                            p.final_position,
                            tiers.for_position(p.final_position),
                        )
                    })
                    .collect()
            } else {
                Vec::new()
            };
            (tournament_id, grants)
        };

        // Grants go out after the store settles; a reward failure never
        // rolls back a finished tournament.
        for (contender, position, tier) in grants {
            if let Err(err) = self
                .rewards
                .grant(tournament_id, contender, position, tier)
                .await
            {
                warn!("reward grant failed for contender {}: {err}", contender.id);
            }
        }
        Ok(())
    }

    /// Current league table. League only; recomputed on demand.
    pub async fn standings(&self, tournament_id: TournamentId) -> EngineResult<Vec<StandingsRow>> {
        let state = self.state.read().await;
        let record = state.record(tournament_id)?;
        if record.tournament.config.format != TournamentFormat::League {
            return Err(EngineError::WrongFormat {
                expected: TournamentFormat::League,
            });
        }
        Ok(standings::compute(
            &record.participants,
            record.matches.values(),
        ))
    }

    /// Operator hold: no new match may start. In-flight matches finish.
    pub async fn pause_tournament(&self, tournament_id: TournamentId) -> EngineResult<()> {
        self.flip_status(tournament_id, TournamentStatus::Active, TournamentStatus::Paused)
            .await
    }

    /// Lift an operator hold.
    pub async fn resume_tournament(&self, tournament_id: TournamentId) -> EngineResult<()> {
        self.flip_status(tournament_id, TournamentStatus::Paused, TournamentStatus::Active)
            .await
    }

    /// Delete a tournament and all its matches. An explicit operator
    /// action; nothing in the engine aborts on a timer.
    pub async fn delete_tournament(&self, tournament_id: TournamentId) -> EngineResult<()> {
        let mut state = self.state.write().await;
        let record = state
            .tournaments
            .remove(&tournament_id)
            .ok_or(EngineError::TournamentNotFound(tournament_id))?;
        for match_id in record.matches.keys() {
            state.match_index.remove(match_id);
        }
        info!("deleted tournament {tournament_id}");
        Ok(())
    }

    async fn flip_status(
        &self,
        tournament_id: TournamentId,
        expected: TournamentStatus,
        next: TournamentStatus,
    ) -> EngineResult<()> {
        let mut state = self.state.write().await;
        let record = state.record_mut(tournament_id)?;
        if record.tournament.status != expected {
            return Err(EngineError::InvalidTournamentStatus {
                expected,
                actual: record.tournament.status,
            });
        }
        record.tournament.status = next;
        info!("tournament {tournament_id} is now {next}");
        Ok(())
    }

    /// Shared draft-phase validation for both generators. Returns the
    /// participant count and questions per match.
    async fn pre_generation_checks(
        &self,
        tournament_id: TournamentId,
        expected_format: TournamentFormat,
    ) -> EngineResult<(usize, usize)> {
        let state = self.state.read().await;
        let record = state.record(tournament_id)?;
        if record.tournament.config.format != expected_format {
            return Err(EngineError::WrongFormat {
                expected: expected_format,
            });
        }
        if !record.matches.is_empty() {
            return Err(EngineError::AlreadyGenerated);
        }
        require_draft(&record.tournament)?;
        let n = record.participants.len();
        if n < 2 {
            return Err(EngineError::NotEnoughParticipants {
                needed: 2,
                current: n,
            });
        }
        Ok((n, record.tournament.config.questions_per_match))
    }

    /// Draw and normalize one question sequence per real match. Any
    /// bank or normalization failure aborts generation before the store
    /// is touched.
    async fn draw_question_sets(
        &self,
        sets: usize,
        per_match: usize,
    ) -> EngineResult<Vec<Vec<Question>>> {
        let mut question_sets = Vec::with_capacity(sets);
        for _ in 0..sets {
            let raw = self
                .question_bank
                .draw(per_match)
                .await
                .map_err(EngineError::QuestionBank)?;
            let questions = raw
                .into_iter()
                .map(Question::normalize)
                .collect::<EngineResult<Vec<Question>>>()?;
            question_sets.push(questions);
        }
        Ok(question_sets)
    }
}

fn require_draft(tournament: &Tournament) -> EngineResult<()> {
    if tournament.status != TournamentStatus::Draft {
        return Err(EngineError::NotDraft(tournament.status));
    }
    Ok(())
}

/// Reassign seeds 1..=N in current roster order; seeds always form a
/// contiguous permutation.
fn reseed(participants: &mut [Participant]) {
    for (index, p) in participants.iter_mut().enumerate() {
        p.seed = index as u32 + 1;
    }
}
