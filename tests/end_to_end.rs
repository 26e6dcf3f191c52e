use std::sync::Arc;
use std::time::Duration;

use sat_overlay::hud::RecordingSurface;
use sat_overlay::propagation::{
    parse_element_sets, ElementSource, Geodetic, Horizontal, ObserverCoordinate, TargetStateVector,
    TickPayload, TopocentricVelocity, TrackerEvent, TrackerMode,
};
use sat_overlay::scene::HeadlessBackend;
use sat_overlay::sensor::NullBackend;
use sat_overlay::view::{ArSettings, ArView, FrameLoop, GlobeSettings, GlobeView, Session};
use tokio::time::{timeout, Instant};

const STATIONS: &str = r#"[{
    "OBJECT_NAME": "ISS (ZARYA)",
    "OBJECT_ID": "1998-067A",
    "EPOCH": "2026-01-01T00:00:00.000000",
    "MEAN_MOTION": 15.49560532,
    "ECCENTRICITY": 0.0001771,
    "INCLINATION": 51.6435,
    "RA_OF_ASC_NODE": 225.4004,
    "ARG_OF_PERICENTER": 44.9625,
    "MEAN_ANOMALY": 5.1087,
    "EPHEMERIS_TYPE": 0,
    "CLASSIFICATION_TYPE": "U",
    "NORAD_CAT_ID": 25544,
    "ELEMENT_SET_NO": 999,
    "REV_AT_EPOCH": 23587,
    "BSTAR": 0,
    "MEAN_MOTION_DOT": 0,
    "MEAN_MOTION_DDOT": 0
}]"#;

fn state(name: &str, azimuth_deg: f64, elevation_deg: f64, range_km: f64) -> TargetStateVector {
    TargetStateVector {
        name: name.to_string(),
        geodetic: Geodetic {
            lat_deg: 12.0,
            lon_deg: 34.0,
            alt_km: 420.0,
        },
        horizontal: Horizontal {
            azimuth_deg,
            elevation_deg,
            range_km,
        },
        velocity: TopocentricVelocity {
            east_km_s: 6.8,
            north_km_s: 2.1,
            up_km_s: -0.1,
        },
    }
}

fn ar_view() -> ArView<HeadlessBackend, RecordingSurface> {
    ArView::new(
        HeadlessBackend::new(),
        RecordingSurface::new(1280, 720),
        ArSettings::default(),
    )
}

#[tokio::test]
async fn targets_rising_above_the_horizon_become_markers() {
    let mut session = Session::new(Box::new(NullBackend));
    let mut ar = ar_view();
    ar.attach(&mut session, true);

    let below = TickPayload::from_states(vec![
        state("ONE", 10.0, -5.0, 3000.0),
        state("TWO", 0.0, -1.0, 2500.0),
        state("THREE", 200.0, -40.0, 9000.0),
    ]);
    ar.handle_tracker(TrackerEvent::Tick(Arc::new(below)), Instant::now());
    let stats = ar.render_frame(Instant::now());
    assert_eq!(stats.objects, 0);
    assert_eq!(stats.labels, 0);
    assert!(ar.surface().labels().is_empty());

    let rising = TickPayload::from_states(vec![
        state("ONE", 10.0, -5.0, 3000.0),
        state("TWO", 0.0, 10.0, 500.0),
        state("THREE", 200.0, -40.0, 9000.0),
    ]);
    ar.handle_tracker(TrackerEvent::Tick(Arc::new(rising)), Instant::now());
    ar.render_frame(Instant::now());

    assert_eq!(ar.pool().len(), 1);
    assert_eq!(ar.backend().live_meshes(), 1);
    let marker = &ar.pool().objects()[0];
    assert_eq!(marker.metadata.name, "TWO");
    assert!(marker.position.y > 0.0);
    assert!(marker.position.z < 0.0);
    assert!(marker.position.x.abs() < 1e-9);
}

#[tokio::test]
async fn wire_payload_with_misaligned_arrays_is_rejected() {
    let json = r#"[
        [{"lat_deg": 1.0, "lon_deg": 2.0, "alt_km": 400.0}],
        [],
        [],
        ["ONE"]
    ]"#;
    assert!(serde_json::from_str::<TickPayload>(json).is_err());
}

#[tokio::test]
async fn tracker_session_delivers_ticks_to_the_ar_view() {
    let sets = parse_element_sets(STATIONS).unwrap();
    let mut session = Session::new(Box::new(NullBackend));
    let mut ticks = session.tracker.subscribe();
    session
        .start(
            ElementSource::Inline(sets),
            ObserverCoordinate::new(47.37, 8.54, 0.4),
            Duration::from_millis(50),
        )
        .unwrap();

    let mut ar = ar_view();
    ar.attach(&mut session, true);

    let payload = loop {
        match timeout(Duration::from_secs(5), ticks.recv()).await {
            Ok(Some(TrackerEvent::Tick(payload))) => break payload,
            Ok(Some(TrackerEvent::Unavailable(reason))) => panic!("tracker unavailable: {reason}"),
            Ok(None) => panic!("tracker channel closed"),
            Err(_) => panic!("no tick within 5s"),
        }
    };
    assert_eq!(payload.len(), 1);
    assert_eq!(payload.names()[0], "ISS (ZARYA)");
    assert!(matches!(
        session.tracker.status().mode,
        TrackerMode::Ready { targets: 1 }
    ));

    assert!(ar.pump(&mut session) > 0);
    let visible = ar.pool().len();
    assert!(visible <= 1);
    assert_eq!(ar.backend().live_meshes(), visible);

    ar.detach();
    session.shutdown().await;
    assert!(matches!(session.tracker.status().mode, TrackerMode::Idle));
}

#[tokio::test]
async fn globe_session_runs_until_cancelled() {
    let sets = parse_element_sets(STATIONS).unwrap();
    let mut session = Session::new(Box::new(NullBackend));
    session
        .start(
            ElementSource::Inline(sets),
            ObserverCoordinate::default(),
            Duration::from_millis(50),
        )
        .unwrap();

    let mut globe = GlobeView::new(
        HeadlessBackend::new(),
        800,
        600,
        GlobeSettings {
            period: Duration::from_millis(50),
            ..GlobeSettings::default()
        },
    );
    globe.attach(&mut session).unwrap();
    assert!(session.readiness.is_clear());

    let mut frames = FrameLoop::new(Duration::from_millis(10));
    let cancel = frames.cancel_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(600)).await;
        cancel.cancel();
    });
    timeout(Duration::from_secs(5), globe.run(&mut frames))
        .await
        .unwrap();

    assert!(globe.backend().frames_drawn() > 0);
    assert_eq!(globe.instances().count(), 1);
    assert_eq!(globe.backend().live_buffers(), 1);

    globe.detach();
    assert_eq!(globe.backend().live_meshes(), 0);
    session.shutdown().await;
}

#[tokio::test]
async fn failed_element_load_is_terminal() {
    let mut session = Session::new(Box::new(NullBackend));
    let mut events = session.tracker.subscribe();
    session
        .start(
            ElementSource::File("does/not/exist.json".into()),
            ObserverCoordinate::default(),
            Duration::from_millis(50),
        )
        .unwrap();

    let event = timeout(Duration::from_secs(5), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(event, TrackerEvent::Unavailable(_)));

    let mut ar = ar_view();
    ar.attach(&mut session, true);
    ar.pump(&mut session);
    assert_eq!(ar.render_frame(Instant::now()).objects, 0);
    assert!(session
        .start(
            ElementSource::Inline(parse_element_sets(STATIONS).unwrap()),
            ObserverCoordinate::default(),
            Duration::from_millis(50),
        )
        .is_err());
}
