//! JSON-lines sample ingestion.
//!
//! Each non-empty line is one [`Metric`] record. Lines that fail to
//! decode, including lines that are not valid UTF-8, are logged and
//! skipped; ingestion only stops at end of input or on a read error.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::metrics::EngineMetrics;
use crate::store::SeriesRegistry;
use crate::types::Metric;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub recorded: u64,
    pub rejected: u64,
}

/// Record every metric line read from `reader` into `registry`.
pub async fn ingest_lines<R>(
    mut reader: R,
    registry: &SeriesRegistry,
    metrics: Option<&EngineMetrics>,
) -> std::io::Result<IngestStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let mut stats = IngestStats::default();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            break;
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        match serde_json::from_slice::<Metric>(&line) {
            Ok(metric) => {
                registry.record_metric(&metric);
                stats.recorded += 1;
                if let Some(metrics) = metrics {
                    metrics.samples_recorded_total.inc();
                    metrics.series_active.set(registry.len() as f64);
                }
            }
            Err(err) => {
                tracing::warn!("Rejecting malformed metric record: {}", err);
                stats.rejected += 1;
                if let Some(metrics) = metrics {
                    metrics.ingest_rejected_total.inc();
                }
            }
        }
    }

    tracing::info!(
        "Ingestion finished: {} recorded, {} rejected",
        stats.recorded,
        stats.rejected
    );
    Ok(stats)
}
