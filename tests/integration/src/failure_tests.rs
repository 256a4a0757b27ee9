use crate::test_utils::{catalog_of, failures, states, ConsoleCall, ConsoleOp, TestBed};
use minic_catalog::MissionId;
use minic_playback::{PlaybackEvent, PlaybackStage, PlaybackState};
use tokio::sync::broadcast::error::TryRecvError;

#[tokio::test(start_paused = true)]
async fn test_load_failure_reports_once_and_stays_stopped() {
    let mut bed = TestBed::new(&catalog_of(&[("Alpha", 5)]));
    bed.connect().await;
    bed.console.fail_next(ConsoleOp::Load);

    bed.handle.run_mission().await.unwrap();
    let events = bed.wait_for_state(PlaybackState::Stopped).await;

    assert_eq!(
        states(&events),
        vec![PlaybackState::Loading, PlaybackState::Stopped]
    );
    assert_eq!(failures(&events), 1);
    assert!(events.iter().any(|event| matches!(
        event,
        PlaybackEvent::Failed {
            mission: Some(MissionId(1)),
            stage: PlaybackStage::Load,
            ..
        }
    )));
    assert!(bed
        .console
        .chat()
        .contains(&"Failed to load mission.".to_string()));
    // Never tried to begin a mission that did not load
    assert_eq!(bed.console.calls(), vec![ConsoleCall::Load("Net/dogfight/alpha.mis".to_string())]);

    // The next attempt goes through
    bed.play().await;
    assert_eq!(bed.console.loads().len(), 2);

    bed.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_begin_failure_clears_active_mission() {
    let mut bed = TestBed::new(&catalog_of(&[("Alpha", 5)]));
    bed.connect().await;
    bed.console.fail_next(ConsoleOp::Begin);

    bed.handle.run_mission().await.unwrap();
    let events = bed.wait_for_state(PlaybackState::Stopped).await;

    assert_eq!(
        states(&events),
        vec![
            PlaybackState::Loading,
            PlaybackState::Starting,
            PlaybackState::Stopped
        ]
    );
    assert_eq!(failures(&events), 1);
    let status = bed.handle.status().await.unwrap();
    assert!(status.playback.active_mission.is_none());
    assert_eq!(status.playback.seconds_remaining, 0);

    bed.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_destroy_failure_skips_rotation() {
    let mut bed = TestBed::new(&catalog_of(&[("Alpha", 1), ("Bravo", 1)]));
    bed.connect().await;
    bed.play().await;
    bed.console.fail_next(ConsoleOp::Destroy);

    bed.wait_for_state(PlaybackState::Stopping).await;
    let events = bed.wait_for_state(PlaybackState::Stopped).await;
    assert_eq!(failures(&events), 1);
    assert!(bed
        .console
        .chat()
        .contains(&"Failed to stop mission.".to_string()));

    let status = bed.handle.status().await.unwrap();
    assert_eq!(status.current_id, Some(MissionId(1)));
    assert_eq!(bed.console.loads().len(), 1);

    bed.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_while_stopped_is_silent() {
    let mut bed = TestBed::new(&catalog_of(&[("Alpha", 5)]));
    bed.connect().await;
    let chat_before = bed.console.chat();

    bed.handle.stop_mission().await.unwrap();
    // Round trip through the loop so anything emitted by the stop is queued
    bed.handle.status().await.unwrap();

    assert!(matches!(bed.playback.try_recv(), Err(TryRecvError::Empty)));
    assert_eq!(bed.console.chat(), chat_before);
    assert!(!bed.console.calls().contains(&ConsoleCall::Destroy));

    bed.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_run_while_busy_is_rejected() {
    let mut bed = TestBed::new(&catalog_of(&[("Alpha", 5)]));
    bed.connect().await;
    bed.play().await;

    let result = bed.handle.run_mission().await;
    assert!(matches!(
        result,
        Err(minic_commander::CommanderError::Playback(
            minic_playback::PlaybackError::Busy {
                state: PlaybackState::Playing
            }
        ))
    ));
    assert_eq!(bed.console.loads().len(), 1);

    bed.shutdown().await;
}
