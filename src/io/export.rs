//! CSV export for tick reports.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::core::TickReport;

/// Column header for CSV telemetry export.
const HEADER: &str = "tick,origin,reading_time,processed_at,solar_kw,wind_kw,battery_soc,battery_soh,\
                       battery_temp_c,cell_spread_v,ev_active,ev_available,grid_load_kw,\
                       grid_freq_hz,fire_temp_c,smoke_pct,battery_health,renewable_health,\
                       safety_health,new_alerts,bucket,action,confidence";

/// Exports tick reports to a CSV file at the given path.
///
/// Writes a header row followed by one data row per report. Produces
/// deterministic output for identical inputs.
///
/// # Arguments
///
/// * `reports` - Tick reports in processing order
/// * `path` - Output file path
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(reports: &[TickReport], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(reports, buf)
}

/// Writes tick reports as CSV to any writer.
///
/// New alert codes are joined with `;` in a single column.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(reports: &[TickReport], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for r in reports {
        let reading = &r.reading;
        let alerts: Vec<&str> = r.new_alerts.iter().map(|a| a.code.as_str()).collect();
        wtr.write_record(&[
            r.tick.to_string(),
            r.origin.to_string(),
            reading.timestamp.to_rfc3339(),
            r.processed_at.to_rfc3339(),
            format!("{:.3}", reading.renewables.solar.output),
            format!("{:.3}", reading.renewables.wind.output),
            format!("{:.3}", reading.battery.state_of_charge),
            format!("{:.3}", reading.battery.state_of_health),
            format!("{:.3}", reading.battery.temperature),
            format!("{:.4}", reading.battery.cell_voltage_spread()),
            reading.ev.active_sessions.to_string(),
            reading.ev.available_stations.to_string(),
            format!("{:.3}", reading.grid.load),
            format!("{:.3}", reading.grid.frequency),
            format!("{:.3}", reading.fire.temperature),
            format!("{:.3}", reading.fire.smoke_level),
            r.battery_health.to_string(),
            r.renewable_health.to_string(),
            r.safety_health.to_string(),
            alerts.join(";"),
            r.recommendation.key.to_string(),
            r.recommendation.action.to_string(),
            format!("{:.2}", r.recommendation.confidence),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
