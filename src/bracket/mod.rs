//! Single-elimination bracket generation.
//!
//! The bracket is an arena-indexed binary tree: round r holds an array
//! of matches, and the winner of slot `i` feeds slot `i / 2` of round
//! r + 1. All matches for all rounds are created up front; later-round
//! contender slots stay empty until the advancement engine fills them.

use std::collections::VecDeque;

use crate::battle::models::{Match, MatchId};
use crate::error::{EngineError, EngineResult};
use crate::question::Question;
use crate::tournament::models::{Participant, TournamentId};

/// A fully generated bracket, not yet committed to a store.
#[derive(Debug)]
pub struct BracketPlan {
    pub matches: Vec<Match>,
    /// Arena index: `rounds[r - 1][slot]` is the match id at that slot.
    pub rounds: Vec<Vec<MatchId>>,
    pub total_rounds: u32,
}

/// Standard seeding order for a bracket of `size` entries (a power of
/// two), built by the doubling expansion: seed k meets seed
/// `size + 1 - k` in round 1, byes fall to the highest seeds, and the
/// top two seeds can only meet in the final.
pub fn seeding_order(size: usize) -> Vec<usize> {
    let mut order = vec![1];
    let mut round = 1;
    while round < size {
        round *= 2;
        let mut next = Vec::with_capacity(round);
        for &seed in &order {
            next.push(seed);
            next.push(round + 1 - seed);
        }
        order = next;
    }
    order
}

/// Build the complete match tree for a seed-ordered participant list.
///
/// `question_sets` supplies one pre-drawn sequence per real (non-bye)
/// match; a bracket of N participants plays exactly N - 1 real matches.
/// Ids are taken from `next_id`. The caller commits the plan atomically.
pub fn build(
    tournament_id: TournamentId,
    participants: &[Participant],
    question_sets: Vec<Vec<Question>>,
    next_id: &mut MatchId,
) -> EngineResult<BracketPlan> {
    let n = participants.len();
    if n < 2 {
        return Err(EngineError::NotEnoughParticipants {
            needed: 2,
            current: n,
        });
    }
    let size = n.next_power_of_two();
    let total_rounds = size.trailing_zeros();
    let mut question_sets: VecDeque<Vec<Question>> = question_sets.into();

    let by_seed = |seed: usize| -> Option<&Participant> { participants.get(seed - 1) };

    let mut matches = Vec::with_capacity(size - 1);
    let mut rounds: Vec<Vec<MatchId>> = Vec::with_capacity(total_rounds as usize);

    // Round 1: pair the seeding order two at a time. A pairing whose
    // opposite seed does not exist becomes a bye, auto-won by the real
    // participant with no question sequence.
    let order = seeding_order(size);
    let mut round_ids = Vec::with_capacity(size / 2);
    for slot in 0..size / 2 {
        let id = *next_id;
        *next_id += 1;
        let high = by_seed(order[2 * slot]);
        let low = by_seed(order[2 * slot + 1]);
        let m = match (high, low) {
            (Some(a), Some(b)) => Match::new(
                id,
                tournament_id,
                1,
                slot,
                Some(a.id),
                Some(b.id),
                question_sets.pop_front().unwrap_or_default(),
            ),
            (Some(p), None) | (None, Some(p)) => {
                Match::new_bye(id, tournament_id, 1, slot, p.id)
            }
            (None, None) => {
                // Unreachable for n >= 2: every pairing holds a seed
                // no greater than size / 2.
                return Err(EngineError::NotEnoughParticipants {
                    needed: 2,
                    current: n,
                });
            }
        };
        round_ids.push(id);
        matches.push(m);
    }
    rounds.push(round_ids);

    // Later rounds: empty slots, filled by advancement.
    for round in 2..=total_rounds {
        let count = size >> round;
        let mut round_ids = Vec::with_capacity(count);
        for slot in 0..count {
            let id = *next_id;
            *next_id += 1;
            round_ids.push(id);
            matches.push(Match::new(
                id,
                tournament_id,
                round,
                slot,
                None,
                None,
                question_sets.pop_front().unwrap_or_default(),
            ));
        }
        rounds.push(round_ids);
    }

    // Winner of round r slot i feeds round r + 1 slot i / 2.
    for m in &mut matches {
        m.next_slot = rounds
            .get(m.round as usize)
            .and_then(|next_round| next_round.get(m.slot / 2))
            .copied();
    }

    Ok(BracketPlan {
        matches,
        rounds,
        total_rounds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::models::MatchStatus;
    use crate::tournament::models::{ContenderRef, ParticipantKind};

    fn participants(n: usize) -> Vec<Participant> {
        (1..=n)
            .map(|seed| Participant {
                id: seed as i64,
                tournament_id: 1,
                seed: seed as u32,
                contender: ContenderRef {
                    kind: ParticipantKind::Individual,
                    id: 100 + seed as i64,
                },
                display_name: format!("player-{seed}"),
                wins: 0,
                draws: 0,
                losses: 0,
                eliminated: false,
                final_position: None,
            })
            .collect()
    }

    #[test]
    fn test_seeding_order_defers_top_seed_collisions() {
        assert_eq!(seeding_order(2), vec![1, 2]);
        assert_eq!(seeding_order(4), vec![1, 4, 2, 3]);
        assert_eq!(seeding_order(8), vec![1, 8, 4, 5, 2, 7, 3, 6]);
        // Seeds 1 and 2 land in opposite halves for every size.
        for k in 1..=6u32 {
            let size = 1 << k;
            let order = seeding_order(size);
            let pos1 = order.iter().position(|&s| s == 1).unwrap();
            let pos2 = order.iter().position(|&s| s == 2).unwrap();
            assert!((pos1 < size / 2) != (pos2 < size / 2));
        }
    }

    #[test]
    fn test_rejects_single_participant() {
        let mut next_id = 1;
        let err = build(1, &participants(1), Vec::new(), &mut next_id).unwrap_err();
        assert!(matches!(err, EngineError::NotEnoughParticipants { .. }));
    }

    #[test]
    fn test_five_participants_in_capacity_eight() {
        // bracket_size = 8, byes = 3: three round-1 byes and one real
        // match, then 4/2/1 slots across rounds 1..3.
        let mut next_id = 1;
        let plan = build(1, &participants(5), vec![Vec::new(); 4], &mut next_id).unwrap();
        assert_eq!(plan.total_rounds, 3);
        assert_eq!(plan.matches.len(), 7);
        assert_eq!(plan.rounds[0].len(), 4);
        assert_eq!(plan.rounds[1].len(), 2);
        assert_eq!(plan.rounds[2].len(), 1);

        let round1: Vec<&Match> = plan.matches.iter().filter(|m| m.round == 1).collect();
        let byes: Vec<&&Match> = round1
            .iter()
            .filter(|m| m.status == MatchStatus::Bye)
            .collect();
        assert_eq!(byes.len(), 3);
        // Byes go to the highest seeds and consume no questions.
        for bye in &byes {
            assert!(bye.questions.is_empty());
            assert!(bye.winner.is_some());
        }
        let bye_winners: Vec<i64> = byes.iter().filter_map(|m| m.winner).collect();
        assert!(bye_winners.contains(&1));
        assert!(bye_winners.contains(&2));
        assert!(bye_winners.contains(&3));
        // The single real match is seed 4 vs seed 5.
        let real = round1
            .iter()
            .find(|m| m.status == MatchStatus::Pending)
            .unwrap();
        assert_eq!((real.contender_a, real.contender_b), (Some(4), Some(5)));
    }

    #[test]
    fn test_next_slot_links_form_binary_tree() {
        let mut next_id = 1;
        let plan = build(1, &participants(8), vec![Vec::new(); 7], &mut next_id).unwrap();
        for m in &plan.matches {
            if m.round < plan.total_rounds {
                let expected = plan.rounds[m.round as usize][m.slot / 2];
                assert_eq!(m.next_slot, Some(expected));
            } else {
                assert_eq!(m.next_slot, None);
            }
        }
    }

    #[test]
    fn test_match_count_for_all_small_sizes() {
        for n in 2..=16 {
            let mut next_id = 1;
            let plan = build(1, &participants(n), vec![Vec::new(); n - 1], &mut next_id).unwrap();
            let size = n.next_power_of_two();
            assert_eq!(plan.matches.len(), size - 1, "n = {n}");
            let real = plan
                .matches
                .iter()
                .filter(|m| m.status != MatchStatus::Bye)
                .count();
            assert_eq!(real, n - 1, "n = {n}");
        }
    }
}
