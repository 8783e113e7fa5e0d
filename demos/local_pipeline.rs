//! Local Pipeline Demo
//!
//! Runs the whole chain in one process: three streams → reader → classifier →
//! LocalForwarder → in-memory store → live subscriber. No store server required.
//!
//! Run with: cargo run -p demos --bin local_pipeline [config.toml]
//!
//! Without a config file, synthetic in-memory streams are used.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use broadcaster::Broadcaster;
use config_loader::ConfigLoader;
use contracts::{StreamKind, StreamSource};
use edge::{AgentLoop, AgentSettings, SurfaceClassifier};
use ingestion::{csv_sources, MemoryStreamSource};
use observability::{init_with_config, LogFormat, ObservabilityConfig};
use store::{IngestionService, LocalForwarder, SqliteRecordStore};
use sync_engine::MultiStreamReader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_with_config(ObservabilityConfig {
        log_format: LogFormat::Compact,
        ..Default::default()
    })?;

    tracing::info!("Starting Local Pipeline Demo");

    // ==== Stage 1: Sources (config file or synthetic) ====
    let (sources, settings, classifier): ([Box<dyn StreamSource>; 3], _, _) =
        if let Some(path) = std::env::args().nth(1) {
            tracing::info!(path = %path, "Loading config");
            let blueprint = ConfigLoader::load_from_path(Path::new(&path))?;
            let [acc, gps, parking] = csv_sources(&blueprint.agent.streams);
            let sources: [Box<dyn StreamSource>; 3] =
                [Box::new(acc), Box::new(gps), Box::new(parking)];
            (
                sources,
                AgentSettings::from_blueprint(&blueprint),
                SurfaceClassifier::from_config(&blueprint.classifier),
            )
        } else {
            (
                synthetic_sources(),
                AgentSettings {
                    read_interval: Duration::from_millis(20),
                    batch_size: 4,
                    max_rows: 24,
                    ..Default::default()
                },
                SurfaceClassifier::new(10.0, 0.3),
            )
        };

    // ==== Stage 2: Store + broadcaster ====
    let store = SqliteRecordStore::in_memory().await?;
    let service = Arc::new(IngestionService::new(store, Broadcaster::new(32)));

    // ==== Stage 3: Live subscriber ====
    let mut subscription = service.broadcaster().subscribe();
    let subscriber = tokio::spawn(async move {
        let mut received = 0u64;
        while let Some(record) = subscription.recv().await {
            received += 1;
            tracing::info!(
                id = record.id,
                state = %record.road_state,
                z = record.z,
                lat = record.latitude,
                lon = record.longitude,
                "Record received"
            );
        }
        received
    });

    // ==== Stage 4: Agent loop ====
    let [acc, gps, parking] = sources;
    let reader = MultiStreamReader::new(acc, gps, parking);
    let agent = AgentLoop::new(
        reader,
        classifier,
        LocalForwarder::new(service.clone()),
        settings,
    );

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    let report = agent.run(shutdown).await;

    // ==== Stage 5: Cleanup ====
    let stored = service.count().await?;
    drop(service);
    let received = tokio::time::timeout(Duration::from_secs(5), subscriber)
        .await
        .map_err(|_| anyhow::anyhow!("subscriber did not finish"))??;

    tracing::info!(
        rows = report.rows_read,
        resyncs = report.resyncs,
        smooth = report.smooth,
        bumpy = report.bumpy,
        stored,
        received,
        reason = %report.terminated_by,
        "Demo completed"
    );
    Ok(())
}

/// Synthetic streams: the GPS track is shorter, so the reader resyncs and loops
fn synthetic_sources() -> [Box<dyn StreamSource>; 3] {
    let accelerometer: Vec<String> = std::iter::once("x,y,z".to_string())
        .chain((0..10).map(|i| {
            let bump = if i % 3 == 0 { 1.5 } else { 0.1 };
            format!("0.0,0.0,{:.2}", 10.0 + bump * if i % 2 == 0 { 1.0 } else { -1.0 })
        }))
        .collect();
    let gps: Vec<String> = std::iter::once("lon,lat".to_string())
        .chain((0..8).map(|i| format!("{:.4},{:.4}", 30.52 + i as f64 * 0.001, 50.45)))
        .collect();
    let parking: Vec<String> = std::iter::once("emptyCount,lon,lat".to_string())
        .chain((0..10).map(|i| format!("{},30.52,50.45", 20 - i)))
        .collect();

    [
        Box::new(MemoryStreamSource::new(StreamKind::Accelerometer, accelerometer, true)),
        Box::new(MemoryStreamSource::new(StreamKind::Gps, gps, true)),
        Box::new(MemoryStreamSource::new(StreamKind::Parking, parking, true)),
    ]
}
