//! Advancement engine.
//!
//! Consumes matches that reached a terminal state, keeps participant
//! aggregates, propagates bracket winners down the `next_slot` links,
//! assigns final positions, and flips the tournament to finished when
//! the last required match resolves.

use chrono::{DateTime, Utc};
use log::info;

use super::manager::TournamentRecord;
use super::models::{Participant, ParticipantId, TournamentFormat, TournamentStatus};
use crate::battle::models::{MatchId, MatchStatus};
use crate::error::{EngineError, EngineResult};
use crate::standings;

/// Apply the consequences of `match_id` having reached a terminal
/// state. Returns whether this resolution finished the tournament.
pub(crate) fn apply(
    record: &mut TournamentRecord,
    match_id: MatchId,
    now: DateTime<Utc>,
) -> EngineResult<bool> {
    let m = record
        .matches
        .get(&match_id)
        .ok_or(EngineError::MatchNotFound(match_id))?;
    debug_assert!(m.status.is_terminal());

    match record.tournament.config.format {
        TournamentFormat::Bracket => apply_bracket(record, match_id, now),
        TournamentFormat::League => apply_league(record, match_id, now),
    }
}

fn apply_bracket(
    record: &mut TournamentRecord,
    match_id: MatchId,
    now: DateTime<Utc>,
) -> EngineResult<bool> {
    // A drawn bracket match cannot stand: the better seed advances and
    // is recorded as the winner.
    resolve_bracket_draw(record, match_id);

    let m = &record.matches[&match_id];
    let status = m.status;
    let round = m.round;
    let winner = m.winner;
    let loser = m.loser();
    let next_slot = m.next_slot;

    if let Some(winner) = winner {
        participant_mut(record, winner)?.wins += 1;
    }
    // A bye penalizes nobody; only a played match eliminates its loser.
    if status == MatchStatus::Completed
        && let Some(loser) = loser
    {
        let p = participant_mut(record, loser)?;
        p.losses += 1;
        p.eliminated = true;
    }

    // Slot the winner into the downstream match's open side.
    if let (Some(winner), Some(next_id)) = (winner, next_slot)
        && let Some(next) = record.matches.get_mut(&next_id)
    {
        if next.contender_a.is_none() {
            next.contender_a = Some(winner);
        } else if next.contender_b.is_none() {
            next.contender_b = Some(winner);
        }
    }

    record.tournament.current_round = lowest_unresolved_round(record);

    let is_final = round == record.tournament.total_rounds && status == MatchStatus::Completed;
    if !is_final {
        return Ok(false);
    }

    if let Some(winner) = winner {
        participant_mut(record, winner)?.final_position = Some(1);
    }
    if let Some(loser) = loser {
        participant_mut(record, loser)?.final_position = Some(2);
    }
    if let Some(third) = best_losing_semifinalist(record) {
        participant_mut(record, third)?.final_position = Some(3);
    }
    finish(record, now);
    Ok(true)
}

fn apply_league(
    record: &mut TournamentRecord,
    match_id: MatchId,
    now: DateTime<Utc>,
) -> EngineResult<bool> {
    let m = &record.matches[&match_id];
    let winner = m.winner;
    let loser = m.loser();
    let contenders = [m.contender_a, m.contender_b];

    // League play never eliminates or propagates; matches stand alone.
    match winner {
        Some(winner) => {
            participant_mut(record, winner)?.wins += 1;
            if let Some(loser) = loser {
                participant_mut(record, loser)?.losses += 1;
            }
        }
        None => {
            for contender in contenders.into_iter().flatten() {
                participant_mut(record, contender)?.draws += 1;
            }
        }
    }

    record.tournament.current_round = lowest_unresolved_round(record);

    let all_done = record
        .matches
        .values()
        .all(|m| m.status == MatchStatus::Completed);
    if !all_done {
        return Ok(false);
    }

    // Final league positions come from the standings ordering.
    let table = standings::compute(&record.participants, record.matches.values());
    for (rank, row) in table.iter().enumerate() {
        participant_mut(record, row.participant_id)?.final_position = Some(rank as u32 + 1);
    }
    finish(record, now);
    Ok(true)
}

/// Resolve a drawn bracket match in favor of the better (lower) seed.
fn resolve_bracket_draw(record: &mut TournamentRecord, match_id: MatchId) {
    let m = &record.matches[&match_id];
    if m.status != MatchStatus::Completed || m.winner.is_some() {
        return;
    }
    let seed_of = |id: Option<ParticipantId>| {
        id.and_then(|id| record.participants.iter().find(|p| p.id == id))
            .map(|p| p.seed)
    };
    let winner = match (seed_of(m.contender_a), seed_of(m.contender_b)) {
        (Some(a), Some(b)) if a <= b => m.contender_a,
        (Some(_), Some(_)) => m.contender_b,
        _ => return,
    };
    info!(
        "match {match_id} drawn, better seed {:?} advances",
        winner
    );
    if let Some(m) = record.matches.get_mut(&match_id) {
        m.winner = winner;
    }
}

/// Third place goes to the losing semifinalist with the higher losing
/// score, ties broken by the better seed. A bye semifinal has no loser
/// and contributes no candidate.
fn best_losing_semifinalist(record: &TournamentRecord) -> Option<ParticipantId> {
    let total = record.tournament.total_rounds;
    if total < 2 {
        return None;
    }
    let semifinal_ids = record.rounds.get(total as usize - 2)?;
    let mut candidates: Vec<(u32, u32, ParticipantId)> = Vec::new();
    for id in semifinal_ids {
        let m = record.matches.get(id)?;
        if m.status != MatchStatus::Completed {
            continue;
        }
        let Some(loser) = m.loser() else { continue };
        let loser_score = if m.contender_a == Some(loser) {
            m.score_a
        } else {
            m.score_b
        };
        let seed = record
            .participants
            .iter()
            .find(|p| p.id == loser)
            .map_or(u32::MAX, |p| p.seed);
        candidates.push((loser_score, seed, loser));
    }
    candidates
        .into_iter()
        .max_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(&a.1)))
        .map(|(_, _, id)| id)
}

/// Lowest 1-based round still holding unresolved matches; the last
/// round once everything is terminal.
fn lowest_unresolved_round(record: &TournamentRecord) -> u32 {
    for (index, round_ids) in record.rounds.iter().enumerate() {
        let unresolved = round_ids.iter().any(|id| {
            record
                .matches
                .get(id)
                .is_some_and(|m| !m.status.is_terminal())
        });
        if unresolved {
            return index as u32 + 1;
        }
    }
    record.tournament.total_rounds
}

fn finish(record: &mut TournamentRecord, now: DateTime<Utc>) {
    record.tournament.status = TournamentStatus::Finished;
    record.tournament.finished_at = Some(now);
    info!("tournament {} finished", record.tournament.id);
}

fn participant_mut(
    record: &mut TournamentRecord,
    id: ParticipantId,
) -> EngineResult<&mut Participant> {
    record
        .participants
        .iter_mut()
        .find(|p| p.id == id)
        .ok_or(EngineError::ParticipantNotFound(id))
}
