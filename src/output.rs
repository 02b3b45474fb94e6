//! Output formatting for one-shot analysis runs.

use anyhow::Result;
use serde::Serialize;
use std::io::Write;
use tracing::{debug, info};

use crate::refresh::TickOutput;

/// Logs the output using Rust's debug pretty-print format.
pub fn print_pretty(output: &TickOutput) {
    debug!("{:#?}", output);
}

/// Writes `value` as pretty-printed JSON followed by a newline.
pub fn write_json<W: Write>(mut writer: W, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Writes the reports and alerts of `output` as JSON to stdout.
pub fn print_json(output: &TickOutput) -> Result<()> {
    write_json(std::io::stdout().lock(), output)
}

/// Logs one line per bunched pair.
pub fn log_alerts(output: &TickOutput) {
    info!(
        reports = output.reports.len(),
        alerts = output.alerts.len(),
        routes = output.alerts.route_count(),
        threshold_km = output.threshold_km,
        "Bunching summary"
    );

    for alert in output.alerts.alerts() {
        info!(
            route_id = %alert.route_id,
            first_id = %alert.first_id,
            second_id = %alert.second_id,
            distance_m = (alert.distance_km * 1000.0).round() as u64,
            "Buses bunched"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::detect_bunching;
    use crate::model::VehicleReport;
    use chrono::Utc;

    fn output() -> TickOutput {
        let reports = vec![
            VehicleReport::new("a", "400", -33.8688, 151.2093),
            VehicleReport::new("b", "400", -33.8690, 151.2095),
        ];
        let alerts = detect_bunching(&reports, 0.5).unwrap();
        TickOutput {
            tick: 1,
            refreshed_at: Utc::now(),
            feed_timestamp: None,
            threshold_km: 0.5,
            dropped: 0,
            reports,
            alerts,
        }
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&output());
    }

    #[test]
    fn test_log_alerts_does_not_panic() {
        log_alerts(&output());
    }

    #[test]
    fn test_write_json_shape() {
        let mut buf = Vec::new();
        write_json(&mut buf, &output()).unwrap();

        let text = String::from_utf8(buf).unwrap();
        assert!(text.ends_with('\n'));

        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["reports"].as_array().unwrap().len(), 2);
        assert_eq!(json["alerts"]["400"][0]["secondId"], "b");
        assert_eq!(json["thresholdKm"], 0.5);
    }
}
