//! Integration tests for the full tournament lifecycle.
//!
//! These drive the manager end to end: roster in draft, generation,
//! match play through the presenter-facing API, advancement, and
//! reward grants at finish.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicI64, Ordering},
};

use async_trait::async_trait;
use serde_json::json;

use quiz_arena::providers::{Contender, QuestionBank, RewardService, Roster};
use quiz_arena::tournament::{
    ContenderRef, ParticipantId, ParticipantKind, RewardTier, TournamentConfig, TournamentId,
    TournamentManager,
};
use quiz_arena::{
    AnswerPayload, EngineError, ErrorKind, MatchId, MatchStatus, QuestionKind, RawQuestion,
    TournamentStatus,
};

/// Serves single-choice questions whose first option is always correct,
/// with payloads in the bank's raw (stringly serialized) form.
struct StaticBank {
    next_id: AtomicI64,
}

impl StaticBank {
    fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl QuestionBank for StaticBank {
    async fn draw(&self, count: usize) -> Result<Vec<RawQuestion>, String> {
        Ok((0..count)
            .map(|_| RawQuestion {
                id: self.next_id.fetch_add(1, Ordering::SeqCst),
                kind: QuestionKind::SingleChoice,
                options: json!("[\"alpha\", \"beta\", \"gamma\"]"),
                correct: json!(0),
                time_limit_secs: None,
            })
            .collect())
    }
}

struct StaticRoster;

#[async_trait]
impl Roster for StaticRoster {
    async fn resolve(
        &self,
        _kind: ParticipantKind,
        ids: &[i64],
    ) -> Result<Vec<Contender>, String> {
        Ok(ids
            .iter()
            .map(|&id| Contender {
                id,
                display_name: format!("student-{id}"),
            })
            .collect())
    }
}

type Grant = (TournamentId, ContenderRef, Option<u32>, RewardTier);

#[derive(Default)]
struct RecordingRewards {
    grants: Mutex<Vec<Grant>>,
}

#[async_trait]
impl RewardService for RecordingRewards {
    async fn grant(
        &self,
        tournament_id: TournamentId,
        contender: ContenderRef,
        final_position: Option<u32>,
        tier: RewardTier,
    ) -> Result<(), String> {
        self.grants
            .lock()
            .unwrap()
            .push((tournament_id, contender, final_position, tier));
        Ok(())
    }
}

fn manager_with_rewards() -> (TournamentManager, Arc<RecordingRewards>) {
    let rewards = Arc::new(RecordingRewards::default());
    let manager = TournamentManager::new(
        Arc::new(StaticBank::new()),
        Arc::new(StaticRoster),
        rewards.clone(),
    );
    (manager, rewards)
}

fn manager() -> TournamentManager {
    manager_with_rewards().0
}

/// Play a match to completion. `targets` maps each participant to the
/// number of questions they should answer correctly.
async fn play(manager: &TournamentManager, match_id: MatchId, targets: &[(ParticipantId, usize)]) {
    let m = manager.get_match(match_id).await.unwrap();
    let total = m.questions.len();
    manager.start_match(match_id).await.unwrap();
    for q in 0..total {
        for &(pid, correct_count) in targets {
            let payload = if q < correct_count {
                AnswerPayload::Choice(0)
            } else {
                AnswerPayload::Choice(1)
            };
            manager.submit_answer(match_id, pid, payload).await.unwrap();
        }
        manager.reveal_result(match_id).await.unwrap();
        manager.next_question(match_id).await.unwrap();
    }
    manager.complete_match(match_id).await.unwrap();
}

#[tokio::test]
async fn test_draft_roster_management() {
    let manager = manager();
    let id = manager
        .create_tournament(TournamentConfig::bracket("Cup".into(), 8))
        .await
        .unwrap();
    let pids = manager.add_participants(id, &[101, 102, 103]).await.unwrap();
    assert_eq!(pids.len(), 3);

    // Duplicate registration is a conflict.
    let err = manager.add_participants(id, &[102]).await.unwrap_err();
    assert!(matches!(err, EngineError::AlreadyRegistered));

    // Removal closes the seed gap.
    manager.remove_participant(id, pids[1]).await.unwrap();
    let info = manager.get_tournament(id).await.unwrap();
    let seeds: Vec<u32> = info.participants.iter().map(|p| p.seed).collect();
    assert_eq!(seeds, vec![1, 2]);

    // Shuffling keeps the contiguous permutation.
    manager.add_participants(id, &[104, 105, 106]).await.unwrap();
    manager.shuffle_seeds(id).await.unwrap();
    let info = manager.get_tournament(id).await.unwrap();
    let mut seeds: Vec<u32> = info.participants.iter().map(|p| p.seed).collect();
    seeds.sort_unstable();
    assert_eq!(seeds, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_repeated_id_in_one_batch_is_rejected() {
    let manager = manager();
    let id = manager
        .create_tournament(TournamentConfig::bracket("Cup".into(), 8))
        .await
        .unwrap();

    // A single call carrying the same external id twice must fail
    // outright, not seat the contender under two seeds.
    let err = manager.add_participants(id, &[101, 101]).await.unwrap_err();
    assert!(matches!(err, EngineError::AlreadyRegistered));

    let info = manager.get_tournament(id).await.unwrap();
    assert!(info.participants.is_empty());
}

#[tokio::test]
async fn test_capacity_is_enforced() {
    let manager = manager();
    let id = manager
        .create_tournament(TournamentConfig::bracket("Cup".into(), 4))
        .await
        .unwrap();
    let err = manager
        .add_participants(id, &[1, 2, 3, 4, 5])
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::CapacityReached { capacity: 4 }));
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_generation_needs_two_participants_and_draft_status() {
    let manager = manager();
    let id = manager
        .create_tournament(TournamentConfig::bracket("Cup".into(), 8))
        .await
        .unwrap();
    manager.add_participants(id, &[101]).await.unwrap();
    let err = manager.generate_bracket(id).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::NotEnoughParticipants {
            needed: 2,
            current: 1
        }
    ));

    manager.add_participants(id, &[102]).await.unwrap();
    manager.generate_bracket(id).await.unwrap();

    // Structural mutation is locked once out of draft.
    let err = manager.add_participants(id, &[103]).await.unwrap_err();
    assert!(matches!(err, EngineError::NotDraft(TournamentStatus::Ready)));

    // Regeneration is a conflict, not a validation failure.
    let err = manager.generate_bracket(id).await.unwrap_err();
    assert!(matches!(err, EngineError::AlreadyGenerated));
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_five_participants_in_capacity_eight_bracket() {
    let (manager, rewards) = manager_with_rewards();
    let id = manager
        .create_tournament(
            TournamentConfig::bracket("Friday Cup".into(), 8).with_questions_per_match(3),
        )
        .await
        .unwrap();
    let pids = manager
        .add_participants(id, &[101, 102, 103, 104, 105])
        .await
        .unwrap();
    manager.generate_bracket(id).await.unwrap();

    let info = manager.get_tournament(id).await.unwrap();
    assert_eq!(info.tournament.status, TournamentStatus::Ready);
    assert_eq!(info.tournament.total_rounds, 3);
    assert_eq!(info.rounds[0].len(), 4);
    assert_eq!(info.rounds[1].len(), 2);
    assert_eq!(info.rounds[2].len(), 1);

    // Round 1: three byes for the top seeds (resolved at generation,
    // consuming no questions) and one real match, seed 4 vs seed 5.
    let mut bye_count = 0;
    let mut real_id = None;
    for &mid in &info.rounds[0] {
        let m = manager.get_match(mid).await.unwrap();
        match m.status {
            MatchStatus::Bye => {
                bye_count += 1;
                assert!(m.questions.is_empty());
                assert!(m.winner.is_some());
            }
            MatchStatus::Pending => {
                assert_eq!(
                    (m.contender_a, m.contender_b),
                    (Some(pids[3]), Some(pids[4]))
                );
                real_id = Some(mid);
            }
            other => panic!("unexpected round-1 status {other}"),
        }
    }
    assert_eq!(bye_count, 3);

    // Bye winners carry a win; nobody carries a loss.
    let by_seed = |seed: u32| {
        info.participants
            .iter()
            .find(|p| p.seed == seed)
            .unwrap()
            .clone()
    };
    for seed in 1..=3 {
        assert_eq!(by_seed(seed).wins, 1);
    }
    assert!(info.participants.iter().all(|p| p.losses == 0));

    // Seed 4 wins the play-in 3-1.
    play(&manager, real_id.unwrap(), &[(pids[3], 3), (pids[4], 1)]).await;

    // Round 2 is now fully slotted.
    let info = manager.get_tournament(id).await.unwrap();
    assert_eq!(info.tournament.current_round, 2);
    let semi_a = manager.get_match(info.rounds[1][0]).await.unwrap();
    let semi_b = manager.get_match(info.rounds[1][1]).await.unwrap();
    for semi in [&semi_a, &semi_b] {
        assert!(semi.contender_a.is_some() && semi.contender_b.is_some());
    }

    // Semifinals: seed 1 beats seed 4 (loser scores 1); seed 2 beats
    // seed 3 (loser scores 2).
    let semi_of = |pid: ParticipantId| {
        if semi_a.side_of(pid).is_some() {
            semi_a.id
        } else {
            semi_b.id
        }
    };
    play(&manager, semi_of(pids[0]), &[(pids[0], 3), (pids[3], 1)]).await;
    play(&manager, semi_of(pids[1]), &[(pids[1], 3), (pids[2], 2)]).await;

    // Final: seed 1 beats seed 2.
    let final_id = manager.get_tournament(id).await.unwrap().rounds[2][0];
    play(&manager, final_id, &[(pids[0], 2), (pids[1], 0)]).await;

    let info = manager.get_tournament(id).await.unwrap();
    assert_eq!(info.tournament.status, TournamentStatus::Finished);
    assert!(info.tournament.finished_at.is_some());

    let position_of = |pid: ParticipantId| {
        info.participants
            .iter()
            .find(|p| p.id == pid)
            .unwrap()
            .final_position
    };
    assert_eq!(position_of(pids[0]), Some(1));
    assert_eq!(position_of(pids[1]), Some(2));
    // Third place: the losing semifinalist with the higher losing score.
    assert_eq!(position_of(pids[2]), Some(3));
    assert_eq!(position_of(pids[3]), None);

    // Losers of played matches are eliminated; the champion is not.
    assert!(!info.participants.iter().find(|p| p.id == pids[0]).unwrap().eliminated);
    assert!(info.participants.iter().find(|p| p.id == pids[4]).unwrap().eliminated);

    // One grant per participant, tiered by final position.
    let grants = rewards.grants.lock().unwrap();
    assert_eq!(grants.len(), 5);
    let first = grants.iter().find(|g| g.2 == Some(1)).unwrap();
    assert_eq!(first.1.id, 101);
    assert_eq!(grants.iter().filter(|g| g.2.is_none()).count(), 2);
}

#[tokio::test]
async fn test_two_player_bracket_draw_resolves_to_better_seed() {
    let manager = manager();
    let id = manager
        .create_tournament(
            TournamentConfig::bracket("Duel".into(), 2).with_questions_per_match(3),
        )
        .await
        .unwrap();
    let pids = manager.add_participants(id, &[101, 102]).await.unwrap();
    manager.generate_bracket(id).await.unwrap();

    let final_id = manager.get_tournament(id).await.unwrap().rounds[0][0];
    // Both answer everything correctly: 3-3 on the scoreboard.
    play(&manager, final_id, &[(pids[0], 3), (pids[1], 3)]).await;

    let m = manager.get_match(final_id).await.unwrap();
    assert_eq!((m.score_a, m.score_b), (3, 3));
    // A bracket cannot stand a draw: the better seed advances.
    assert_eq!(m.winner, Some(pids[0]));

    let info = manager.get_tournament(id).await.unwrap();
    assert_eq!(info.tournament.status, TournamentStatus::Finished);
    let seed1 = info.participants.iter().find(|p| p.id == pids[0]).unwrap();
    let seed2 = info.participants.iter().find(|p| p.id == pids[1]).unwrap();
    assert_eq!(seed1.final_position, Some(1));
    assert_eq!(seed2.final_position, Some(2));
}

#[tokio::test]
async fn test_league_lifecycle_with_standings() {
    let manager = manager();
    let id = manager
        .create_tournament(
            TournamentConfig::league("Class League".into(), 4).with_questions_per_match(2),
        )
        .await
        .unwrap();
    let pids = manager
        .add_participants(id, &[201, 202, 203, 204])
        .await
        .unwrap();
    manager.build_schedule(id).await.unwrap();

    let info = manager.get_tournament(id).await.unwrap();
    assert_eq!(info.tournament.total_rounds, 3);
    let all_ids: Vec<MatchId> = info.rounds.iter().flatten().copied().collect();
    // 4 participants: 6 matches, every unordered pair exactly once.
    assert_eq!(all_ids.len(), 6);
    let mut pairs = std::collections::BTreeSet::new();
    for &mid in &all_ids {
        let m = manager.get_match(mid).await.unwrap();
        assert_eq!(m.status, MatchStatus::Pending);
        let a = m.contender_a.unwrap();
        let b = m.contender_b.unwrap();
        assert!(pairs.insert((a.min(b), a.max(b))));
    }
    assert_eq!(pairs.len(), 6);

    // Play every match: participant 0 wins all, 1 and 2 draw against
    // each other, 3 loses all.
    for &mid in &all_ids {
        let m = manager.get_match(mid).await.unwrap();
        let a = m.contender_a.unwrap();
        let b = m.contender_b.unwrap();
        let score = |pid: ParticipantId| {
            if pid == pids[0] {
                2
            } else if pid == pids[3] {
                0
            } else {
                1
            }
        };
        play(&manager, mid, &[(a, score(a)), (b, score(b))]).await;
    }

    let info = manager.get_tournament(id).await.unwrap();
    assert_eq!(info.tournament.status, TournamentStatus::Finished);

    // Nobody is ever eliminated in league play.
    assert!(info.participants.iter().all(|p| !p.eliminated));

    let table = manager.standings(id).await.unwrap();
    assert_eq!(table[0].participant_id, pids[0]);
    assert_eq!(table[0].points, 9); // three wins
    // 1 and 2 each: one loss to 0, one win vs 3, and a 1-1 draw.
    assert_eq!(table[1].points, 4);
    assert_eq!(table[2].points, 4);
    assert_eq!(table[1].draws, 1);
    assert_eq!(table[3].participant_id, pids[3]);
    assert_eq!(table[3].points, 0);

    // League final positions follow the standings.
    let champion = info.participants.iter().find(|p| p.id == pids[0]).unwrap();
    assert_eq!(champion.final_position, Some(1));
    let last = info.participants.iter().find(|p| p.id == pids[3]).unwrap();
    assert_eq!(last.final_position, Some(4));
}

#[tokio::test]
async fn test_standings_require_league_format() {
    let manager = manager();
    let id = manager
        .create_tournament(TournamentConfig::bracket("Cup".into(), 4))
        .await
        .unwrap();
    let err = manager.standings(id).await.unwrap_err();
    assert!(matches!(err, EngineError::WrongFormat { .. }));
}

#[tokio::test]
async fn test_unanswered_side_scores_nothing_when_limit_elapsed() {
    let manager = manager();
    // A zero-second advisory limit makes the reveal immediately valid
    // with only one answer in.
    let id = manager
        .create_tournament(
            TournamentConfig::bracket("Speed Duel".into(), 2)
                .with_questions_per_match(2)
                .with_seconds_per_question(0),
        )
        .await
        .unwrap();
    let pids = manager.add_participants(id, &[101, 102]).await.unwrap();
    manager.generate_bracket(id).await.unwrap();
    let mid = manager.get_tournament(id).await.unwrap().rounds[0][0];

    manager.start_match(mid).await.unwrap();
    for _ in 0..2 {
        manager
            .submit_answer(mid, pids[0], AnswerPayload::Choice(0))
            .await
            .unwrap();
        manager.reveal_result(mid).await.unwrap();
        manager.next_question(mid).await.unwrap();
    }
    manager.complete_match(mid).await.unwrap();

    let m = manager.get_match(mid).await.unwrap();
    assert_eq!((m.score_a, m.score_b), (2, 0));
    assert_eq!(m.winner, Some(pids[0]));
    // Only the submitted answers produced records.
    assert_eq!(m.answers.len(), 2);
    assert!(m.answers.iter().all(|r| r.participant_id == pids[0]));
}

#[tokio::test]
async fn test_duplicate_completion_fires_exactly_once() {
    let manager = manager();
    let id = manager
        .create_tournament(
            TournamentConfig::bracket("Duel".into(), 2).with_questions_per_match(1),
        )
        .await
        .unwrap();
    let pids = manager.add_participants(id, &[101, 102]).await.unwrap();
    manager.generate_bracket(id).await.unwrap();
    let mid = manager.get_tournament(id).await.unwrap().rounds[0][0];

    manager.start_match(mid).await.unwrap();
    manager
        .submit_answer(mid, pids[0], AnswerPayload::Choice(0))
        .await
        .unwrap();
    manager
        .submit_answer(mid, pids[1], AnswerPayload::Choice(1))
        .await
        .unwrap();
    manager.reveal_result(mid).await.unwrap();

    // Concurrent duplicate requests: exactly one completion succeeds.
    let (first, second) = tokio::join!(
        manager.complete_match(mid),
        manager.complete_match(mid)
    );
    assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1);
    let failure = first.err().or(second.err()).unwrap();
    assert_eq!(failure.kind(), ErrorKind::Conflict);

    // Duplicate reveals conflict the same way.
    let err = manager.reveal_result(mid).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_pause_blocks_new_match_starts() {
    let manager = manager();
    let id = manager
        .create_tournament(
            TournamentConfig::league("League".into(), 3).with_questions_per_match(1),
        )
        .await
        .unwrap();
    manager.add_participants(id, &[201, 202, 203]).await.unwrap();
    manager.build_schedule(id).await.unwrap();
    let info = manager.get_tournament(id).await.unwrap();
    let all_ids: Vec<MatchId> = info.rounds.iter().flatten().copied().collect();

    // Pausing requires an active tournament.
    let err = manager.pause_tournament(id).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidTournamentStatus { .. }));

    manager.start_match(all_ids[0]).await.unwrap();
    manager.pause_tournament(id).await.unwrap();
    let err = manager.start_match(all_ids[1]).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidTournamentStatus {
            actual: TournamentStatus::Paused,
            ..
        }
    ));

    manager.resume_tournament(id).await.unwrap();
    manager.start_match(all_ids[1]).await.unwrap();
}

#[tokio::test]
async fn test_delete_removes_tournament_and_matches() {
    let manager = manager();
    let id = manager
        .create_tournament(TournamentConfig::bracket("Cup".into(), 4))
        .await
        .unwrap();
    manager.add_participants(id, &[101, 102, 103]).await.unwrap();
    manager.generate_bracket(id).await.unwrap();
    let mid = manager.get_tournament(id).await.unwrap().rounds[0][0];

    manager.delete_tournament(id).await.unwrap();
    assert!(matches!(
        manager.get_tournament(id).await.unwrap_err(),
        EngineError::TournamentNotFound(_)
    ));
    assert!(matches!(
        manager.get_match(mid).await.unwrap_err(),
        EngineError::MatchNotFound(_)
    ));
    assert!(matches!(
        manager.delete_tournament(id).await.unwrap_err(),
        EngineError::TournamentNotFound(_)
    ));
}

#[tokio::test]
async fn test_list_tournaments_filters_by_status() {
    let manager = manager();
    let draft = manager
        .create_tournament(TournamentConfig::bracket("Draft Cup".into(), 4))
        .await
        .unwrap();
    let ready = manager
        .create_tournament(TournamentConfig::bracket("Ready Cup".into(), 4))
        .await
        .unwrap();
    manager.add_participants(ready, &[101, 102]).await.unwrap();
    manager.generate_bracket(ready).await.unwrap();

    let drafts = manager.list_tournaments(Some(TournamentStatus::Draft)).await;
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].id, draft);
    assert_eq!(manager.list_tournaments(None).await.len(), 2);
}
