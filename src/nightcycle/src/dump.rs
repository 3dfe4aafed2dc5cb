use std::io::Write;

use nightcycle_algos::DailySleepAnalyzer;

/// Writes the per-minute classification of an analysis run as JSON.
pub fn write_minutes<W: Write>(analyzer: &DailySleepAnalyzer, writer: W) -> anyhow::Result<()> {
    let minutes = analyzer.minutes();
    serde_json::to_writer_pretty(writer, &minutes)?;
    info!("dumped {} minutes", minutes.len());
    Ok(())
}
