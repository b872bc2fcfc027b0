//! End-to-end session tests driving the controller against the offline and
//! mock services.
//!
//! These run on tokio's paused clock, so full study phases finish instantly
//! while still observing real pacing.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use memtrain_client::local::LocalSettings;
use memtrain_client::{LocalExerciseApi, MockExerciseApi};
use memtrain_core::model::{ExerciseKind, Item, RecallMode, SessionPhase};
use memtrain_core::scheduler::PlaybackEvent;
use memtrain_core::session::{ControllerConfig, SessionController};
use memtrain_core::summary::load_history;
use memtrain_core::traits::ExerciseApi;

fn make_controller(api: Arc<dyn ExerciseApi>, trailing_ms: u64) -> SessionController {
    SessionController::new(
        api,
        ControllerConfig {
            trailing_pause: Duration::from_millis(trailing_ms),
            ..Default::default()
        },
    )
}

fn local(words: usize, digits: usize, faces: usize) -> Arc<LocalExerciseApi> {
    Arc::new(LocalExerciseApi::new(LocalSettings {
        words,
        digits,
        faces,
        skill_level: 3,
    }))
}

async fn play_study(controller: &mut SessionController) -> Vec<PlaybackEvent> {
    let mut events = Vec::new();
    while let Some(event) = controller.next_study_event().await {
        events.push(event.event);
    }
    events
}

fn labels(controller: &SessionController) -> Vec<String> {
    controller
        .session()
        .unwrap()
        .target_items()
        .iter()
        .map(|item| item.label().into_owned())
        .collect()
}

// --- Offline service ---

#[tokio::test(start_paused = true)]
async fn e2e_offline_words_session() {
    let api = local(5, 0, 0);
    let mut controller = make_controller(api.clone(), 500);

    let session = controller
        .start_session(ExerciseKind::SequenceOfWords)
        .await
        .unwrap();
    assert_eq!(session.item_count(), 5);
    assert_eq!(session.skill_level(), Some(3));
    // 5 items at 2.0s plus 10s buffer, split into 4s slots
    assert_eq!(session.pacing().total_study_seconds, 20.0);
    assert_eq!(session.pacing().per_item_show_ms, 2500);
    assert_eq!(session.pacing().inter_item_gap_ms, 625);

    let started = Instant::now();
    let events = play_study(&mut controller).await;
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, PlaybackEvent::Show { .. }))
            .count(),
        5
    );
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, PlaybackEvent::Gap { .. }))
            .count(),
        4
    );
    assert_eq!(events.last(), Some(&PlaybackEvent::Complete));
    assert_eq!(
        started.elapsed(),
        Duration::from_millis(5 * 2500 + 4 * 625 + 500)
    );
    assert_eq!(controller.phase(), SessionPhase::Recall);

    // Everything recalled, shifted by one position.
    let mut answers = labels(&controller);
    answers.rotate_left(1);
    let recall = controller.recall_mut().unwrap();
    assert_eq!(recall.mode(), RecallMode::FreeForm);
    for answer in &answers {
        recall.push(answer.to_uppercase());
    }

    let summary = controller.submit().await.unwrap();
    assert_eq!(summary.local.unordered_correct_count, 5);
    assert_eq!(summary.local.ordered_correct_count, 0);
    // The service only sees the aligned answers, so it scores them as in place.
    assert_eq!(summary.server.unordered_correct_count, 5);
    assert_eq!(summary.server.ordered_correct_count, 5);
    assert!(summary.has_discrepancy());
    assert_eq!(summary.server.points_earned, 10);
    assert_eq!(summary.server.updated_skill_level, Some(4));
    assert_eq!(api.skill_level(), 4);
    assert_eq!(controller.phase(), SessionPhase::Summary);
}

#[tokio::test(start_paused = true)]
async fn e2e_offline_digits_fixed_slot() {
    let mut controller = make_controller(local(0, 4, 0), 0);
    controller
        .start_session(ExerciseKind::SequenceOfDigits)
        .await
        .unwrap();
    play_study(&mut controller).await;

    let targets = labels(&controller);
    let recall = controller.recall_mut().unwrap();
    assert_eq!(recall.mode(), RecallMode::FixedSlot);
    assert_eq!(recall.len(), 4);
    for (i, label) in targets.iter().enumerate().take(3) {
        recall.set_slot(i, format!(" {label} "));
    }

    let summary = controller.submit().await.unwrap();
    assert_eq!(summary.local.ordered_correct_count, 3);
    assert_eq!(summary.server.ordered_correct_count, 3);
    assert_eq!(summary.local.positioned_answers[3], "");
    // 75% neither raises nor lowers the skill level.
    assert_eq!(summary.server.updated_skill_level, Some(3));
}

#[tokio::test(start_paused = true)]
async fn e2e_faces_stepped_through_while_paused() {
    let mut controller = make_controller(local(0, 0, 3), 1000);
    controller
        .start_session(ExerciseKind::SequenceOfFaces)
        .await
        .unwrap();
    assert!(matches!(
        controller.visible_item(),
        Some(Item::Face { .. })
    ));

    let first = controller.next_study_event().await.unwrap();
    assert_eq!(first.event, PlaybackEvent::Show { index: 0 });
    controller.pause_study().unwrap();

    let started = Instant::now();
    assert_eq!(
        controller.skip_ahead().unwrap().event,
        PlaybackEvent::Skipped { index: 1 }
    );
    assert_eq!(
        controller.skip_ahead().unwrap().event,
        PlaybackEvent::Skipped { index: 2 }
    );
    assert_eq!(
        controller.skip_ahead().unwrap().event,
        PlaybackEvent::Complete
    );
    assert_eq!(started.elapsed(), Duration::ZERO);
    assert_eq!(controller.phase(), SessionPhase::Recall);

    let names = labels(&controller);
    let recall = controller.recall_mut().unwrap();
    recall.set_slot(0, names[0].to_lowercase());
    let summary = controller.submit().await.unwrap();
    assert_eq!(summary.server.unordered_correct_count, 1);
    assert_eq!(summary.server.missed_targets.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn e2e_abandon_and_restart() {
    let mut controller = make_controller(local(4, 0, 0), 0);

    controller
        .start_session(ExerciseKind::SequenceOfWords)
        .await
        .unwrap();
    let old_id = controller.session().unwrap().session_id().to_string();
    controller.next_study_event().await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    controller.reset();

    controller
        .start_session(ExerciseKind::SequenceOfWords)
        .await
        .unwrap();
    let new_id = controller.session().unwrap().session_id().to_string();
    assert_ne!(old_id, new_id);

    let first = controller.next_study_event().await.unwrap();
    assert_eq!(&*first.session_id, new_id);
    assert_eq!(first.event, PlaybackEvent::Show { index: 0 });

    while let Some(event) = controller.next_study_event().await {
        assert_eq!(&*event.session_id, new_id);
    }
    assert_eq!(controller.phase(), SessionPhase::Recall);
}

// --- Mock service ---

#[tokio::test(start_paused = true)]
async fn e2e_mock_retries_keep_answers() {
    let mock = Arc::new(MockExerciseApi::with_items(
        "mock-1",
        vec![Item::word("amber"), Item::word("basil")],
    ));
    let mut controller = make_controller(mock.clone(), 0);

    mock.fail_next_starts(1);
    let err = controller
        .start_session(ExerciseKind::SequenceOfWords)
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(controller.phase(), SessionPhase::Idle);
    assert!(controller.last_error().is_some());

    controller
        .start_session(ExerciseKind::SequenceOfWords)
        .await
        .unwrap();
    assert_eq!(controller.last_error(), None);
    assert_eq!(mock.start_calls(), 2);
    play_study(&mut controller).await;

    let recall = controller.recall_mut().unwrap();
    recall.push("basil");
    recall.push("clove");

    mock.fail_next_submits(1);
    assert!(controller.submit().await.is_err());
    assert_eq!(controller.phase(), SessionPhase::Recall);
    assert_eq!(controller.recall().unwrap().entries(), ["basil", "clove"]);

    let summary = controller.submit().await.unwrap();
    assert_eq!(summary.local.positioned_answers, vec!["", "basil"]);
    assert_eq!(summary.local.extra_answers.len(), 1);
    assert_eq!(mock.submit_calls(), 2);
    assert_eq!(
        mock.last_submit().unwrap().positioned_answers,
        vec!["", "basil"]
    );
}

#[tokio::test(start_paused = true)]
async fn e2e_summary_saved_to_history() {
    let dir = tempfile::tempdir().unwrap();
    let mock = Arc::new(MockExerciseApi::with_items(
        "mock-history",
        vec![Item::digit(4, "rye")],
    ));
    let mut controller = make_controller(mock, 0);

    controller
        .start_session(ExerciseKind::SequenceOfDigits)
        .await
        .unwrap();
    play_study(&mut controller).await;
    controller.recall_mut().unwrap().set_slot(0, "4");
    let summary = controller.submit().await.unwrap();
    summary.save_to_dir(dir.path()).unwrap();

    let history = load_history(dir.path()).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].session_id, "mock-history");
    assert_eq!(history[0].server.ordered_correct_count, 1);
    assert_eq!(history[0].accuracy(), 1.0);
}
