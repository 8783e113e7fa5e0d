//! Pipeline statistics.

use std::time::Duration;

use edge::AgentReport;

/// Statistics from an agent run
#[derive(Debug, Clone)]
pub struct PipelineStats {
    /// Agent loop report
    pub report: AgentReport,

    /// Total duration including setup
    pub duration: Duration,
}

impl PipelineStats {
    /// Readings per second
    pub fn rows_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.report.rows_read as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Share of forwarded batches that were dropped, in percent
    pub fn batch_failure_rate(&self) -> f64 {
        let total = self.report.batches_forwarded + self.report.batches_failed;
        if total > 0 {
            (self.report.batches_failed as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        let report = &self.report;
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                      Agent Statistics                        ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Readings: {}", report.rows_read);
        println!("   ├─ Rows/s: {:.2}", self.rows_per_sec());
        println!("   └─ Stopped: {}", report.terminated_by);

        println!("\n📈 Streams");
        println!("   ├─ Resyncs: {}", report.resyncs);
        println!("   └─ Malformed rows: {}", report.malformed_rows);

        println!("\n🛣  Surface");
        println!("   ├─ Smooth: {}", report.smooth);
        println!("   └─ Bumpy: {}", report.bumpy);

        println!("\n📦 Batches");
        println!("   ├─ Forwarded: {}", report.batches_forwarded);
        println!(
            "   ├─ Failed: {} ({:.2}%)",
            report.batches_failed,
            self.batch_failure_rate()
        );
        println!("   ├─ Records persisted: {}", report.records_persisted);
        println!("   └─ Forward latency (ms): {}", report.forward_latency_ms);

        println!();
    }
}
