use bus_bunching::detect::{DEFAULT_THRESHOLD_KM, detect_bunching};
use bus_bunching::error::FailureKind;
use bus_bunching::gtfs_rt::{
    FeedEntity, FeedHeader, FeedMessage, Position, TripDescriptor, VehicleDescriptor,
    VehiclePosition,
};
use bus_bunching::normalize::normalize;
use bus_bunching::parser::parse_feed;
use bus_bunching::refresh::Refresher;
use bus_bunching::source::FileSource;
use prost::Message;
use std::time::Duration;

fn header() -> FeedHeader {
    FeedHeader {
        gtfs_realtime_version: "2.0".to_string(),
        timestamp: Some(1700000000),
        incrementality: None,
        feed_version: None,
    }
}

fn bus(id: &str, route: &str, latitude: f32, longitude: f32) -> FeedEntity {
    FeedEntity {
        id: id.to_string(),
        vehicle: Some(VehiclePosition {
            trip: Some(TripDescriptor {
                trip_id: Some(format!("trip-{id}")),
                route_id: Some(route.to_string()),
                ..Default::default()
            }),
            vehicle: Some(VehicleDescriptor {
                id: Some(id.to_string()),
                ..Default::default()
            }),
            position: Some(Position {
                latitude,
                longitude,
                bearing: Some(90.0),
                ..Default::default()
            }),
            timestamp: Some(1700000000),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn wire(entity: Vec<FeedEntity>) -> Vec<u8> {
    FeedMessage {
        header: header(),
        entity,
    }
    .encode_to_vec()
}

#[test]
fn test_full_pipeline_two_close_buses() {
    let bytes = wire(vec![
        bus("a", "400", -33.8688, 151.2093),
        bus("b", "400", -33.8690, 151.2095),
    ]);

    let feed = parse_feed(&bytes).expect("Failed to parse feed");
    let reports = normalize(&feed);
    let alerts = detect_bunching(&reports, DEFAULT_THRESHOLD_KM).unwrap();

    assert_eq!(reports.len(), 2);
    assert_eq!(alerts.len(), 1);
    let alert = &alerts.get("400").unwrap()[0];
    assert_eq!(alert.first_id, "a");
    assert_eq!(alert.second_id, "b");
    assert!(alert.distance_km < 0.5);
}

#[test]
fn test_full_pipeline_mixed_feed() {
    let mut no_position = bus("ghost", "400", 0.0, 0.0);
    no_position.vehicle.as_mut().unwrap().position = None;

    let mut no_trip = bus("depot", "400", -33.8688, 151.2093);
    no_trip.vehicle.as_mut().unwrap().trip = None;

    let bytes = wire(vec![
        bus("a", "400", -33.8688, 151.2093),
        no_position,
        bus("x", "333", -33.8688, 151.2093),
        no_trip,
        bus("b", "400", -33.8689, 151.2094),
        bus("far", "400", -33.9500, 151.2093),
    ]);

    let feed = parse_feed(&bytes).unwrap();
    let reports = normalize(&feed);
    let alerts = detect_bunching(&reports, DEFAULT_THRESHOLD_KM).unwrap();

    assert_eq!(
        reports.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
        vec!["a", "x", "b", "far"]
    );
    assert_eq!(alerts.len(), 1);
    assert!(alerts.get("333").is_none());
    assert_eq!(alerts.get("400").unwrap()[0].second_id, "b");

    for alert in alerts.alerts() {
        assert!(reports.iter().any(|r| r.id == alert.first_id));
        assert!(reports.iter().any(|r| r.id == alert.second_id));
    }
}

#[test]
fn test_empty_snapshot() {
    let feed = parse_feed(&wire(vec![])).unwrap();
    let reports = normalize(&feed);
    let alerts = detect_bunching(&reports, DEFAULT_THRESHOLD_KM).unwrap();

    assert!(reports.is_empty());
    assert!(alerts.is_empty());
}

#[tokio::test]
async fn test_refresher_over_file_snapshot() {
    let path = std::env::temp_dir().join("bus_bunching_integration_snapshot.pb");
    std::fs::write(
        &path,
        wire(vec![
            bus("a", "400", -33.8688, 151.2093),
            bus("b", "400", -33.8690, 151.2095),
            bus("c", "333", -33.8000, 151.1000),
        ]),
    )
    .unwrap();

    let mut refresher = Refresher::new(FileSource::new(&path), 0.5, Duration::from_secs(5));
    let view = refresher.subscribe();

    let output = refresher.tick().await.unwrap();
    assert_eq!(output.reports.len(), 3);
    assert_eq!(output.alerts.len(), 1);

    // Corrupt the snapshot; the previous output must survive.
    std::fs::write(&path, [0xFF, 0xFE, 0x00, 0x01]).unwrap();
    let err = refresher.tick().await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::InvalidSnapshot);

    {
        let view = view.borrow();
        assert_eq!(view.latest.as_ref().unwrap().tick, 1);
        assert_eq!(view.last_failure.as_ref().unwrap().kind, FailureKind::InvalidSnapshot);
    }

    std::fs::remove_file(&path).unwrap();

    let err = refresher.tick().await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::SourceUnavailable);
    assert_eq!(view.borrow().consecutive_failures, 2);
}
