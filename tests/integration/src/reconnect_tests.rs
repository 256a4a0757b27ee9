use crate::test_utils::{catalog_of, TestBed};
use minic_commander::{FAREWELL, GREETING};
use minic_core::ConsoleReply;
use minic_playback::PlaybackState;
use minic_supervisor::{ConnectionEvent, ConnectionState};
use tokio::time::{sleep, Duration};

#[tokio::test(start_paused = true)]
async fn test_connection_loss_resumes_interrupted_mission() {
    let mut bed = TestBed::new(&catalog_of(&[("Alpha", 5), ("Bravo", 5)]));
    bed.connect().await;
    bed.play().await;

    bed.link.lose("connection reset by peer");
    let lost = bed
        .wait_for_connection(|e| matches!(e, ConnectionEvent::ConnectionLost(_)))
        .await;
    assert_eq!(
        lost,
        ConnectionEvent::ConnectionLost("connection reset by peer".to_string())
    );
    bed.wait_for_state(PlaybackState::Stopped).await;
    assert_eq!(
        bed.handle.status().await.unwrap().connection,
        ConnectionState::Connecting
    );

    // A failed retry does not forget the interrupted mission
    bed.link.fail_attempt("connection refused");
    bed.wait_for_connection(|e| matches!(e, ConnectionEvent::ConnectFailed(_)))
        .await;

    bed.link.establish();
    bed.wait_for_connection(|e| *e == ConnectionEvent::Connected)
        .await;
    bed.wait_for_state(PlaybackState::Playing).await;

    assert_eq!(bed.console.loads(), vec!["Net/dogfight/alpha.mis"; 2]);
    let greetings = bed
        .console
        .chat()
        .iter()
        .filter(|line| line.as_str() == GREETING)
        .count();
    assert_eq!(greetings, 2);

    bed.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_graceful_close_does_not_resume() {
    let mut bed = TestBed::new(&catalog_of(&[("Alpha", 5)]));
    bed.connect().await;
    bed.play().await;

    bed.link.close();
    bed.wait_for_connection(|e| *e == ConnectionEvent::Disconnected)
        .await;
    bed.wait_for_state(PlaybackState::Stopped).await;

    bed.link.establish();
    bed.wait_for_connection(|e| *e == ConnectionEvent::Connected)
        .await;

    let status = bed.handle.status().await.unwrap();
    assert_eq!(status.connection, ConnectionState::Connected);
    assert_eq!(status.playback.state, PlaybackState::Stopped);
    assert_eq!(bed.console.loads().len(), 1);

    bed.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_stops_services_before_links() {
    let mut bed = TestBed::new(&catalog_of(&[("Alpha", 5)]));
    bed.connect().await;
    bed.play().await;

    bed.handle.disconnect().await.unwrap();
    bed.wait_for_connection(|e| *e == ConnectionEvent::Disconnected)
        .await;

    let farewell = bed.journal.position(&format!("chat:{}", FAREWELL)).unwrap();
    let telemetry = bed.journal.position("telemetry:stop").unwrap();
    let stop_trying = bed.journal.position("console:stop_trying").unwrap();
    let disconnect = bed.journal.position("console:disconnect").unwrap();
    assert!(farewell < telemetry);
    assert!(telemetry < stop_trying);
    assert!(stop_trying < disconnect);

    let status = bed.handle.status().await.unwrap();
    assert_eq!(status.connection, ConnectionState::Disconnected);
    assert_eq!(status.playback.state, PlaybackState::Stopped);

    // A second disconnect has nothing left to stop
    bed.handle.disconnect().await.unwrap();
    assert_eq!(
        bed.journal
            .entries()
            .iter()
            .filter(|e| e.as_str() == "console:disconnect")
            .count(),
        1
    );

    bed.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_connect_twice_is_rejected() {
    let mut bed = TestBed::new(&catalog_of(&[("Alpha", 5)]));
    bed.connect().await;

    assert!(bed.handle.connect().await.is_err());
    let entries = bed.journal.entries();
    assert_eq!(
        entries.iter().filter(|e| e.starts_with("console:connect")).count(),
        1
    );
    assert!(entries.contains(&"telemetry:listen:127.0.0.1:10000".to_string()));

    bed.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_pilots_are_forgotten_when_link_drops() {
    let mut bed = TestBed::new(&catalog_of(&[("Alpha", 5)]));
    bed.connect().await;

    bed.pipes
        .console
        .send(ConsoleReply::PilotJoined {
            callsign: "Raven".to_string(),
            channel: 3,
            address: "10.0.0.2:21000".to_string(),
        })
        .await
        .unwrap();

    // Pipes and commands are separate queues; poll until the reply lands
    let mut online = 0;
    for _ in 0..10 {
        online = bed.handle.status().await.unwrap().pilots_online;
        if online == 1 {
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(online, 1);

    bed.link.lose("timeout");
    bed.wait_for_connection(|e| matches!(e, ConnectionEvent::ConnectionLost(_)))
        .await;
    assert_eq!(bed.handle.status().await.unwrap().pilots_online, 0);

    bed.shutdown().await;
}
