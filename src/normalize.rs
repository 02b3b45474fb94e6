//! Turns a decoded GTFS-RT snapshot into [`VehicleReport`]s.

use tracing::debug;

use crate::geo::is_valid_coordinate;
use crate::gtfs_rt::{FeedEntity, FeedMessage};
use crate::model::VehicleReport;

/// Counts of entities skipped while normalizing one snapshot.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Dropped {
    pub deleted: usize,
    pub no_vehicle: usize,
    pub no_position: usize,
    pub no_route: usize,
    pub bad_coordinates: usize,
}

impl Dropped {
    pub fn total(&self) -> usize {
        self.deleted + self.no_vehicle + self.no_position + self.no_route + self.bad_coordinates
    }
}

/// Builds one report per usable entity, in feed order.
///
/// Entities marked deleted, without a vehicle position, without a route id,
/// or with coordinates outside the WGS-84 range are skipped. Duplicate ids are
/// kept.
pub fn normalize(feed: &FeedMessage) -> Vec<VehicleReport> {
    normalize_counted(feed).0
}

/// Like [`normalize`], also returning what was skipped.
pub fn normalize_counted(feed: &FeedMessage) -> (Vec<VehicleReport>, Dropped) {
    let mut dropped = Dropped::default();
    let mut reports = Vec::with_capacity(feed.entity.len());

    for entity in &feed.entity {
        match to_report(entity) {
            Ok(report) => reports.push(report),
            Err(reason) => match reason {
                Skip::Deleted => dropped.deleted += 1,
                Skip::NoVehicle => dropped.no_vehicle += 1,
                Skip::NoPosition => dropped.no_position += 1,
                Skip::NoRoute => dropped.no_route += 1,
                Skip::BadCoordinates => dropped.bad_coordinates += 1,
            },
        }
    }

    if dropped.total() > 0 {
        debug!(
            kept = reports.len(),
            deleted = dropped.deleted,
            no_vehicle = dropped.no_vehicle,
            no_position = dropped.no_position,
            no_route = dropped.no_route,
            bad_coordinates = dropped.bad_coordinates,
            "Dropped unusable feed entities"
        );
    }

    (reports, dropped)
}

enum Skip {
    Deleted,
    NoVehicle,
    NoPosition,
    NoRoute,
    BadCoordinates,
}

fn to_report(entity: &FeedEntity) -> Result<VehicleReport, Skip> {
    if entity.is_deleted == Some(true) {
        return Err(Skip::Deleted);
    }
    let vehicle = entity.vehicle.as_ref().ok_or(Skip::NoVehicle)?;
    let position = vehicle.position.as_ref().ok_or(Skip::NoPosition)?;

    let route_id = vehicle
        .trip
        .as_ref()
        .and_then(|t| t.route_id.as_deref())
        .filter(|r| !r.is_empty())
        .ok_or(Skip::NoRoute)?;

    let latitude = f64::from(position.latitude);
    let longitude = f64::from(position.longitude);
    if !is_valid_coordinate(latitude, longitude) {
        return Err(Skip::BadCoordinates);
    }

    Ok(VehicleReport {
        id: entity.id.clone(),
        route_id: route_id.to_string(),
        latitude,
        longitude,
        timestamp: vehicle.timestamp,
    })
}
