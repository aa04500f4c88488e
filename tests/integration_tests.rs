use std::sync::Arc;
use std::time::Duration;

use fieldmap::{
    api::{geocoding::Geocoder, places::ScriptedPlaceSource},
    live::source::MemoryPushSource,
    navigation::provider::ScriptedPositionProvider,
    FieldMapConfig, LatLng, MapError, MapSession, Marker, NavigationState, RecordingSurface,
    RenderCommand, SurfaceEvent,
};

/// Integration tests driving a whole map session the way a screen would
type Session = MapSession<RecordingSurface>;

fn marker(id: &str, lat: f64, lng: f64) -> Marker {
    Marker::new(id, LatLng::new(lat, lng))
}

fn session_with(provider: &ScriptedPositionProvider) -> Session {
    MapSession::new(
        FieldMapConfig::default(),
        RecordingSurface::new(),
        Arc::new(provider.clone()),
    )
}

fn live_session(provider: &ScriptedPositionProvider, push: &MemoryPushSource) -> Session {
    let mut config = FieldMapConfig::default();
    config.live.endpoint = Some("memory://places".into());
    MapSession::new(config, RecordingSurface::new(), Arc::new(provider.clone()))
        .with_push_source(Arc::new(push.clone()))
}

/// Polls the live channel until `done` holds or a second has passed
async fn poll_until(session: &mut Session, mut done: impl FnMut(&Session) -> bool) {
    for _ in 0..100 {
        session.poll_live();
        if done(session) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn test_refresh_reconciles_full_sets() {
    let provider = ScriptedPositionProvider::new();
    let mut session = session_with(&provider);
    let source = ScriptedPlaceSource::new();
    source
        .push_response(vec![marker("a", 1.0, 1.0), marker("b", 2.0, 2.0)])
        .push_response(vec![marker("b", 2.0, 2.0), marker("c", 3.0, 3.0)]);

    let first = session.refresh_from(&source).await.unwrap();
    assert_eq!(first.added_ids(), vec!["a", "b"]);
    session.surface_mut().take();

    let second = session.refresh_from(&source).await.unwrap();
    assert_eq!(second.added_ids(), vec!["c"]);
    assert_eq!(second.removed_ids(), vec!["a"]);
    assert_eq!(session.store().ids(), vec!["b", "c"]);
    assert_eq!(
        session.surface().commands(),
        &[
            RenderCommand::remove_marker("a"),
            RenderCommand::add_marker(marker("c", 3.0, 3.0)),
        ]
    );

    // same set again: nothing to do
    let third = session.refresh_from(&source).await.unwrap();
    assert!(third.is_empty());
    assert_eq!(session.surface().commands().len(), 2);
}

#[tokio::test]
async fn test_failed_refresh_keeps_store() {
    let provider = ScriptedPositionProvider::new();
    let mut session = session_with(&provider);
    session.apply_snapshot(vec![marker("a", 1.0, 1.0)]);

    let source = ScriptedPlaceSource::new();
    source.push_failure("connection refused");
    let err = session.refresh_from(&source).await.unwrap_err();

    assert!(err.is_transient());
    assert_eq!(session.store().ids(), vec!["a"]);
}

#[tokio::test]
async fn test_update_via_channel_replaces_marker() {
    let provider = ScriptedPositionProvider::new();
    let push = MemoryPushSource::new();
    let tx = push.queue_connection();
    let mut session = live_session(&provider, &push);
    session.apply_snapshot(vec![marker("x", -12.0, -77.0).with_status("Pendiente")]);

    assert!(session.on_foreground());
    tx.unbounded_send(
        r#"{"action":"updated","place":{"id":"x","latitude":-12.0,"longitude":-77.0,"status":"Completo"}}"#
            .to_string(),
    )
    .unwrap();

    poll_until(&mut session, |s| {
        s.store().get("x").and_then(|m| m.status.as_deref()) == Some("Completo")
    })
    .await;

    assert_eq!(session.store().len(), 1);
    assert_eq!(session.store().snapshot()[0].status.as_deref(), Some("Completo"));
}

#[tokio::test]
async fn test_channel_survives_malformed_messages() {
    let provider = ScriptedPositionProvider::new();
    let push = MemoryPushSource::new();
    let tx = push.queue_connection();
    let mut session = live_session(&provider, &push);
    session.apply_snapshot(vec![marker("keep", 0.0, 0.0)]);
    session.on_foreground();

    for frame in [
        "definitely not json",
        r#"{"action":"added","place":{"id":"bad"}}"#,
        r#"{"action":"added","place":{"id":"new","latitude":5,"longitude":5}}"#,
    ] {
        tx.unbounded_send(frame.to_string()).unwrap();
    }

    let mut dropped = 0;
    for _ in 0..100 {
        dropped += session.poll_live().dropped;
        if session.store().contains("new") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(dropped, 2);
    assert_eq!(session.store().ids(), vec!["keep", "new"]);
    assert!(session.is_live());
}

#[tokio::test]
async fn test_channel_lifecycle() {
    let provider = ScriptedPositionProvider::new();
    let push = MemoryPushSource::new();
    let first = push.queue_connection();
    let mut session = live_session(&provider, &push);

    assert!(session.on_foreground());
    assert!(!session.on_foreground(), "second open must be a no-op");
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(push.pending_connections(), 0);
    assert!(session.is_live());

    session.on_background();
    session.on_background();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(first.is_closed(), "listener must release the connection");
    assert!(!session.is_live());

    // nothing sent to a released connection reaches the store
    let _ = first.unbounded_send(
        r#"{"action":"added","place":{"id":"late","latitude":1,"longitude":1}}"#.to_string(),
    );
    assert!(session.poll_live().is_empty());
    assert!(session.store().is_empty());

    let second = push.queue_connection();
    assert!(session.on_foreground());
    second
        .unbounded_send(
            r#"{"action":"added","place":{"id":"fresh","latitude":1,"longitude":1}}"#.to_string(),
        )
        .unwrap();
    poll_until(&mut session, |s| s.store().contains("fresh")).await;
    assert!(!session.store().contains("late"));
}

#[tokio::test]
async fn test_delete_clears_selection() {
    let provider = ScriptedPositionProvider::new();
    let push = MemoryPushSource::new();
    let tx = push.queue_connection();
    let mut session = live_session(&provider, &push);
    session.apply_snapshot(vec![marker("gone", 0.0, 0.0)]);
    session.handle_surface_event(SurfaceEvent::MarkerClicked {
        marker: marker("gone", 0.0, 0.0),
    });
    assert!(session.selected_marker().is_some());

    session.on_foreground();
    tx.unbounded_send(r#"{"action":"deleted","place":{"id":"gone"}}"#.to_string())
        .unwrap();
    poll_until(&mut session, |s| s.store().is_empty()).await;

    assert!(session.selected_marker().is_none());
    assert_eq!(
        session.surface().commands().last(),
        Some(&RenderCommand::remove_marker("gone"))
    );
}

#[tokio::test]
async fn test_navigate_to_nearest() {
    let provider = ScriptedPositionProvider::at(LatLng::new(-12.046, -77.042));
    let mut session = session_with(&provider);
    session.apply_snapshot(vec![marker("1", -12.05, -77.04), marker("2", -12.10, -77.10)]);
    session.surface_mut().take();

    let (nearest, route) = session.navigate_to_nearest().await.unwrap();

    assert_eq!(nearest.id, "1");
    assert_eq!(route.destination, LatLng::new(-12.05, -77.04));
    assert_eq!(session.selected_marker().map(|m| m.id.as_str()), Some("1"));
    assert_eq!(
        session.surface().commands(),
        &[RenderCommand::show_route(
            LatLng::new(-12.046, -77.042),
            LatLng::new(-12.05, -77.04)
        )]
    );
}

#[tokio::test]
async fn test_nearest_preconditions() {
    let provider = ScriptedPositionProvider::at(LatLng::new(0.0, 0.0));
    let mut session = session_with(&provider);
    let err = session.navigate_to_nearest().await.unwrap_err();
    assert!(matches!(err, MapError::EmptyStore));

    let unknown = ScriptedPositionProvider::new();
    let mut session = session_with(&unknown);
    session.apply_snapshot(vec![marker("1", 0.0, 0.0)]);
    session.surface_mut().take();
    let err = session.navigate_to_nearest().await.unwrap_err();
    assert!(err.is_precondition());
    assert_eq!(session.tracker().state(), NavigationState::Idle);
    assert!(session.surface().commands().is_empty());
}

#[tokio::test]
async fn test_route_follows_position_stream() {
    let provider = ScriptedPositionProvider::at(LatLng::new(-12.046, -77.042));
    let mut session = session_with(&provider);
    session.apply_snapshot(vec![marker("dest", -12.10, -77.10)]);
    session.handle_surface_message(r#"{"id":"dest","position":{"lat":-12.1,"lng":-77.1}}"#)
        .unwrap();
    session.navigate_to_selected().await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    // ~3 m: below the 10 m filter
    provider.set_position(LatLng::new(-12.04603, -77.042));
    // ~550 m
    provider.set_position(LatLng::new(-12.051, -77.042));

    let mut published = 0;
    for _ in 0..100 {
        published += session.pump_navigation();
        if published > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
    published += session.pump_navigation();

    assert_eq!(published, 1);
    assert_eq!(session.surface().route_count(), 2);
    assert_eq!(
        session.tracker().current_route().map(|r| r.origin),
        Some(LatLng::new(-12.051, -77.042))
    );

    session.on_background();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(provider.active_watchers(), 0);
    assert_eq!(session.tracker().state(), NavigationState::Idle);
}

#[tokio::test]
async fn test_navigate_without_selection() {
    let provider = ScriptedPositionProvider::at(LatLng::new(0.0, 0.0));
    let mut session = session_with(&provider);
    let err = session.navigate_to_selected().await.unwrap_err();
    assert!(matches!(err, MapError::NoSelection));

    // clicks on markers the store does not know are ignored
    let clicked = session.handle_surface_event(SurfaceEvent::MarkerClicked {
        marker: marker("ghost", 0.0, 0.0),
    });
    assert!(clicked.is_none());
    assert!(!session.stop_navigation());
}

struct OneResult;

#[async_trait::async_trait]
impl Geocoder for OneResult {
    async fn geocode(&self, _query: &str) -> fieldmap::Result<Vec<LatLng>> {
        Ok(vec![LatLng::new(-12.0464, -77.0428)])
    }
}

#[tokio::test]
async fn test_search_flies_to_first_result() {
    let provider = ScriptedPositionProvider::new();
    let mut session = session_with(&provider);

    let found = session.search_address(&OneResult, "Lima").await.unwrap();

    assert_eq!(found, LatLng::new(-12.0464, -77.0428));
    assert_eq!(
        session.surface().commands(),
        &[RenderCommand::fly_to(LatLng::new(-12.0464, -77.0428))]
    );
}

#[test]
fn test_foreground_from_lifecycle_thread() {
    let provider = ScriptedPositionProvider::new();
    let push = MemoryPushSource::new();
    let connection = push.queue_connection();
    let mut session = live_session(&provider, &push);

    assert!(session.on_foreground());
    connection
        .unbounded_send(
            r#"{"action":"added","place":{"id":"bg","latitude":4,"longitude":4}}"#.to_string(),
        )
        .unwrap();

    for _ in 0..100 {
        session.poll_live();
        if session.store().contains("bg") {
            break;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    assert!(session.store().contains("bg"));

    session.teardown();
    std::thread::sleep(Duration::from_millis(20));
    assert!(connection.is_closed());
}
