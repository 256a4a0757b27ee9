use crate::test_utils::{catalog_of, states, TestBed};
use minic_catalog::{MissionDraft, MissionId, MissionUpdate};
use minic_commander::CommanderError;
use minic_playback::{PlaybackError, PlaybackState};

#[tokio::test(start_paused = true)]
async fn test_removing_current_mission_clears_selection() {
    let mut bed = TestBed::new(&catalog_of(&[("Alpha", 5), ("Bravo", 5)]));
    bed.connect().await;

    let removed = bed.handle.remove_mission(MissionId(1)).await.unwrap();
    assert_eq!(removed.name, "Alpha");

    let snapshot = bed.handle.missions().await.unwrap();
    assert_eq!(snapshot.current_id, None);
    assert_eq!(snapshot.missions.len(), 1);
    assert_eq!(bed.store.load().unwrap().current_id(), None);

    assert!(matches!(
        bed.handle.run_mission().await,
        Err(CommanderError::Playback(PlaybackError::NoCurrentMission))
    ));
    assert!(bed.console.loads().is_empty());

    bed.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_selecting_another_mission_while_playing_restarts() {
    let mut bed = TestBed::new(&catalog_of(&[("Alpha", 5), ("Bravo", 5)]));
    bed.connect().await;
    bed.play().await;

    bed.handle.select_mission(Some(MissionId(2))).await.unwrap();
    let events = bed.wait_for_state(PlaybackState::Playing).await;
    assert_eq!(
        states(&events),
        vec![
            PlaybackState::Stopping,
            PlaybackState::Loading,
            PlaybackState::Starting,
            PlaybackState::Playing
        ]
    );

    assert!(bed
        .console
        .chat()
        .contains(&"Restarting mission 'Alpha'...".to_string()));
    assert_eq!(bed.console.loads().last().unwrap(), "Net/dogfight/bravo.mis");
    let status = bed.handle.status().await.unwrap();
    assert_eq!(status.playback.active_mission.unwrap().id, MissionId(2));
    assert_eq!(bed.store.load().unwrap().current_id(), Some(MissionId(2)));

    bed.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_reselecting_live_mission_keeps_playing() {
    let mut bed = TestBed::new(&catalog_of(&[("Alpha", 5), ("Bravo", 5)]));
    bed.connect().await;
    bed.play().await;

    bed.handle.select_mission(Some(MissionId(1))).await.unwrap();
    let status = bed.handle.status().await.unwrap();
    assert_eq!(status.playback.state, PlaybackState::Playing);
    assert_eq!(bed.console.loads().len(), 1);

    bed.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_editing_live_mission_duration_restarts_it() {
    let mut bed = TestBed::new(&catalog_of(&[("Alpha", 1)]));
    bed.connect().await;
    bed.play().await;

    let edited = bed
        .handle
        .update_mission(MissionId(1), MissionUpdate::duration(2))
        .await
        .unwrap();
    assert_eq!(edited.duration_minutes, 2);

    bed.wait_for_state(PlaybackState::Stopping).await;
    bed.wait_for_state(PlaybackState::Playing).await;

    let active = bed.handle.status().await.unwrap().playback.active_mission.unwrap();
    assert_eq!(active.duration_minutes, 2);
    assert_eq!(bed.console.loads().len(), 2);

    bed.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_renaming_live_mission_does_not_restart() {
    let mut bed = TestBed::new(&catalog_of(&[("Alpha", 5)]));
    bed.connect().await;
    bed.play().await;

    bed.handle
        .update_mission(MissionId(1), MissionUpdate::rename("Alpha Prime"))
        .await
        .unwrap();

    let status = bed.handle.status().await.unwrap();
    assert_eq!(status.playback.state, PlaybackState::Playing);
    // The playing snapshot keeps the name it was loaded with
    assert_eq!(status.playback.active_mission.unwrap().name, "Alpha");
    assert_eq!(bed.console.loads().len(), 1);

    bed.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_added_and_moved_missions_shape_the_rotation() {
    let mut bed = TestBed::new(&catalog_of(&[("Alpha", 1), ("Bravo", 1)]));
    bed.connect().await;

    let charlie = bed
        .handle
        .add_mission(MissionDraft::new("Charlie", 1).with_path("charlie.mis"))
        .await
        .unwrap();
    assert_eq!(charlie, MissionId(3));
    bed.handle.move_mission(charlie, 1).await.unwrap();

    let names: Vec<String> = bed
        .store
        .load()
        .unwrap()
        .list()
        .iter()
        .map(|m| m.name.clone())
        .collect();
    assert_eq!(names, vec!["Alpha", "Charlie", "Bravo"]);

    // Alpha expires and hands over to the mission now behind it
    bed.play().await;
    bed.wait_for_state(PlaybackState::Stopping).await;
    bed.wait_for_state(PlaybackState::Playing).await;
    assert_eq!(bed.console.loads().last().unwrap(), "Net/dogfight/charlie.mis");

    bed.shutdown().await;
}
