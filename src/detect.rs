//! Per-route pairwise proximity scan.

use std::collections::BTreeMap;
use tracing::debug;

use crate::error::DetectError;
use crate::geo::{haversine_km, midpoint};
use crate::model::{AlertSet, BunchingAlert, VehicleReport};

/// Threshold used when nothing else is configured.
pub const DEFAULT_THRESHOLD_KM: f64 = 0.5;

/// Flags every same-route pair of reports closer than `threshold_km`.
///
/// Reports are grouped by route keeping their input order, then each unordered
/// pair `(i, j)` with `i < j` is checked once. The earlier report is always
/// `first_id`. A pair is flagged when its distance is strictly below the
/// threshold, or when the two positions coincide exactly.
///
/// # Errors
///
/// Fails before scanning if the threshold is negative or not finite, or if any
/// report carries coordinates outside the WGS-84 range.
pub fn detect_bunching(
    reports: &[VehicleReport],
    threshold_km: f64,
) -> Result<AlertSet, DetectError> {
    if !threshold_km.is_finite() || threshold_km < 0.0 {
        return Err(DetectError::InvalidThreshold(threshold_km));
    }

    if let Some(bad) = reports.iter().find(|r| !r.position().is_valid()) {
        return Err(DetectError::InvalidCoordinate {
            id: bad.id.clone(),
            latitude: bad.latitude,
            longitude: bad.longitude,
        });
    }

    let mut alerts = AlertSet::new();

    for (route_id, group) in group_by_route(reports) {
        if group.len() < 2 {
            continue;
        }

        for (i, first) in group.iter().enumerate() {
            for second in &group[i + 1..] {
                let distance_km = haversine_km(first.position(), second.position());

                if distance_km < threshold_km || distance_km == 0.0 {
                    alerts.push(BunchingAlert {
                        route_id: route_id.to_string(),
                        first_id: first.id.clone(),
                        second_id: second.id.clone(),
                        distance_km,
                        midpoint: midpoint(first.position(), second.position()),
                    });
                }
            }
        }
    }

    debug!(
        reports = reports.len(),
        threshold_km,
        alerts = alerts.len(),
        routes = alerts.route_count(),
        "Bunching scan complete"
    );

    Ok(alerts)
}

fn group_by_route(reports: &[VehicleReport]) -> BTreeMap<&str, Vec<&VehicleReport>> {
    let mut groups: BTreeMap<&str, Vec<&VehicleReport>> = BTreeMap::new();
    for report in reports {
        groups.entry(report.route_id.as_str()).or_default().push(report);
    }
    groups
}
