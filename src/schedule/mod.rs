//! Round-robin league scheduling.
//!
//! Circle method: one entry stays fixed while the rest rotate one
//! position per round, pairing opposite positions. An odd field gets a
//! synthetic rest slot whose pairings are discarded, so every unordered
//! pair plays exactly once and nobody plays twice in a round.

use std::collections::VecDeque;

use crate::battle::models::{Match, MatchId};
use crate::error::{EngineError, EngineResult};
use crate::question::Question;
use crate::tournament::models::{Participant, TournamentId};

/// A fully generated league schedule, not yet committed to a store.
#[derive(Debug)]
pub struct SchedulePlan {
    pub matches: Vec<Match>,
    /// `rounds[r - 1]` holds the match ids of round r.
    pub rounds: Vec<Vec<MatchId>>,
    pub total_rounds: u32,
}

/// Pair seeds (1-based) round by round. Returns `n` rounds for odd `n`,
/// `n - 1` for even.
pub fn circle_rounds(n: usize) -> Vec<Vec<(usize, usize)>> {
    // None is the rest slot for an odd field.
    let mut entries: Vec<Option<usize>> = (1..=n).map(Some).collect();
    if n % 2 == 1 {
        entries.push(None);
    }
    let len = entries.len();
    let round_count = len - 1;

    let mut rounds = Vec::with_capacity(round_count);
    for _ in 0..round_count {
        let mut pairings = Vec::with_capacity(len / 2);
        for i in 0..len / 2 {
            if let (Some(a), Some(b)) = (entries[i], entries[len - 1 - i]) {
                pairings.push((a, b));
            }
        }
        rounds.push(pairings);
        entries[1..].rotate_right(1);
    }
    rounds
}

/// Build all league matches for a seed-ordered participant list.
///
/// `question_sets` supplies one pre-drawn sequence per match; a league
/// of N participants plays exactly N * (N - 1) / 2 matches, all created
/// pending — there are no byes in league play.
pub fn build(
    tournament_id: TournamentId,
    participants: &[Participant],
    question_sets: Vec<Vec<Question>>,
    next_id: &mut MatchId,
) -> EngineResult<SchedulePlan> {
    let n = participants.len();
    if n < 2 {
        return Err(EngineError::NotEnoughParticipants {
            needed: 2,
            current: n,
        });
    }
    let mut question_sets: VecDeque<Vec<Question>> = question_sets.into();
    let by_seed = |seed: usize| participants[seed - 1].id;

    let mut matches = Vec::with_capacity(n * (n - 1) / 2);
    let mut rounds = Vec::new();
    for (round_index, pairings) in circle_rounds(n).into_iter().enumerate() {
        let mut round_ids = Vec::with_capacity(pairings.len());
        for (slot, (seed_a, seed_b)) in pairings.into_iter().enumerate() {
            let id = *next_id;
            *next_id += 1;
            round_ids.push(id);
            matches.push(Match::new(
                id,
                tournament_id,
                round_index as u32 + 1,
                slot,
                Some(by_seed(seed_a)),
                Some(by_seed(seed_b)),
                question_sets.pop_front().unwrap_or_default(),
            ));
        }
        rounds.push(round_ids);
    }

    let total_rounds = rounds.len() as u32;
    Ok(SchedulePlan {
        matches,
        rounds,
        total_rounds,
    })
}
