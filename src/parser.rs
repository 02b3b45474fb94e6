//! Protobuf parser for GTFS Realtime vehicle-position feeds.

use prost::Message;

use crate::error::SnapshotError;
use crate::gtfs_rt::FeedMessage;

/// Decodes a protobuf-encoded GTFS-RT [`FeedMessage`] from raw bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not valid protobuf for a `FeedMessage`,
/// or if the message lacks a header. prost does not enforce proto2 `required`,
/// so an empty body would otherwise pass as a snapshot with no vehicles.
pub fn parse_feed(bytes: &[u8]) -> Result<FeedMessage, SnapshotError> {
    let feed = FeedMessage::decode(bytes)?;
    if feed.header.gtfs_realtime_version.is_empty() {
        return Err(SnapshotError::MissingHeader);
    }
    Ok(feed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gtfs_rt::{FeedEntity, FeedHeader, Position, TripDescriptor, VehiclePosition};

    #[test]
    fn test_parse_invalid_bytes() {
        let invalid_bytes = vec![0xFF, 0xFE, 0x00, 0x01];
        let result = parse_feed(&invalid_bytes);
        assert!(matches!(result, Err(SnapshotError::Decode(_))));
    }

    #[test]
    fn test_parse_empty_bytes_is_rejected() {
        assert!(matches!(parse_feed(&[]), Err(SnapshotError::MissingHeader)));
    }

    #[test]
    fn test_parse_headerless_feed_is_rejected() {
        let feed = FeedMessage {
            header: FeedHeader::default(),
            entity: vec![FeedEntity {
                id: "v1".to_string(),
                ..Default::default()
            }],
        };

        let result = parse_feed(&feed.encode_to_vec());
        assert!(matches!(result, Err(SnapshotError::MissingHeader)));
    }

    #[test]
    fn test_parse_header_only_feed_is_empty_snapshot() {
        let feed = FeedMessage {
            header: FeedHeader {
                gtfs_realtime_version: "2.0".to_string(),
                ..Default::default()
            },
            entity: vec![],
        };

        let parsed = parse_feed(&feed.encode_to_vec()).unwrap();
        assert!(parsed.entity.is_empty());
    }

    #[test]
    fn test_parse_vehicle_feed() {
        let feed = FeedMessage {
            header: FeedHeader {
                gtfs_realtime_version: "2.0".to_string(),
                timestamp: Some(1234567890),
                incrementality: None,
                feed_version: None,
            },
            entity: vec![FeedEntity {
                id: "v1".to_string(),
                vehicle: Some(VehiclePosition {
                    trip: Some(TripDescriptor {
                        route_id: Some("400".to_string()),
                        ..Default::default()
                    }),
                    position: Some(Position {
                        latitude: -33.8688,
                        longitude: 151.2093,
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            }],
        };
        let encoded = feed.encode_to_vec();
        let parsed = parse_feed(&encoded).unwrap();

        assert_eq!(parsed.header.timestamp, Some(1234567890));
        assert_eq!(parsed.entity.len(), 1);
        let trip = parsed.entity[0].vehicle.as_ref().unwrap().trip.as_ref().unwrap();
        assert_eq!(trip.route_id.as_deref(), Some("400"));
    }
}
