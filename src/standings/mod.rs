//! League standings, recomputed on demand.
//!
//! A read-only view derived from completed matches; nothing here is
//! stored. Ordering is a strict comparison on (points, score
//! difference, points for), all descending, with any remaining ties
//! left in seed order.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::battle::models::{Match, MatchStatus};
use crate::tournament::models::{Participant, ParticipantId};

/// One ranked line of the league table.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct StandingsRow {
    pub participant_id: ParticipantId,
    pub display_name: String,
    pub seed: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    /// Sum of own match scores
    pub points_for: u32,
    /// Sum of opponent match scores
    pub points_against: u32,
    /// 3 per win, 1 per draw
    pub points: u32,
}

impl StandingsRow {
    pub fn score_diff(&self) -> i64 {
        i64::from(self.points_for) - i64::from(self.points_against)
    }
}

/// Aggregate completed matches into a ranked table.
pub fn compute<'a>(
    participants: &[Participant],
    matches: impl IntoIterator<Item = &'a Match>,
) -> Vec<StandingsRow> {
    let mut rows: Vec<StandingsRow> = participants
        .iter()
        .map(|p| StandingsRow {
            participant_id: p.id,
            display_name: p.display_name.clone(),
            seed: p.seed,
            wins: 0,
            draws: 0,
            losses: 0,
            points_for: 0,
            points_against: 0,
            points: 0,
        })
        .collect();
    rows.sort_by_key(|r| r.seed);
    let index: HashMap<ParticipantId, usize> = rows
        .iter()
        .enumerate()
        .map(|(i, r)| (r.participant_id, i))
        .collect();

    for m in matches {
        if m.status != MatchStatus::Completed {
            continue;
        }
        let sides = [
            (m.contender_a, m.score_a, m.score_b),
            (m.contender_b, m.score_b, m.score_a),
        ];
        for (contender, own, other) in sides {
            let Some(row) = contender.and_then(|id| index.get(&id)).map(|&i| &mut rows[i])
            else {
                continue;
            };
            row.points_for += own;
            row.points_against += other;
            match m.winner {
                Some(winner) if Some(winner) == contender => row.wins += 1,
                Some(_) => row.losses += 1,
                None => row.draws += 1,
            }
        }
    }

    for row in &mut rows {
        row.points = 3 * row.wins + row.draws;
    }

    // Stable sort: rows start in seed order, so equal keys keep it.
    rows.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then_with(|| b.score_diff().cmp(&a.score_diff()))
            .then_with(|| b.points_for.cmp(&a.points_for))
    });
    rows
}
