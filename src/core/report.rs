//! Report serialization. Reports are plain JSON files written through the
//! `ReportSink` seam so tests can capture them in memory.

use crate::domain::ports::ReportSink;
use crate::utils::error::Result;
use chrono::Utc;
use serde::Serialize;

/// `<dir>/<prefix>_20250825_143000.json`
pub fn timestamped_path(dir: &str, prefix: &str) -> String {
    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        format!("{}_{}.json", prefix, stamp)
    } else {
        format!("{}/{}_{}.json", dir, prefix, stamp)
    }
}

pub async fn write_json_report<S, T>(sink: &S, path: &str, report: &T) -> Result<()>
where
    S: ReportSink,
    T: Serialize + ?Sized,
{
    let data = serde_json::to_vec_pretty(report)?;
    sink.write_file(path, &data).await?;
    tracing::info!("📊 Report written to {}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_combines_dir_prefix_and_timestamp() {
        let path = timestamped_path("reports/", "orphaned_scan");
        assert!(path.starts_with("reports/orphaned_scan_"));
        assert!(path.ends_with(".json"));
    }

    #[test]
    fn empty_dir_means_current_directory() {
        let path = timestamped_path("", "deprecated_scan");
        assert!(path.starts_with("deprecated_scan_"));
    }
}
