//! # Integration Tests
//!
//! 跨 crate 的集成测试与端到端测试。
//!
//! 负责：
//! - 配置快照测试
//! - 文件 → 代理 → 存储 → 订阅者 的完整链路
//! - HTTP 接入往返

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::ConfigVersion;

    #[test]
    fn test_minimal_config_snapshot() {
        let blueprint = ConfigLoader::load_from_str(
            r#"
[agent.streams]
accelerometer = "data/accelerometer.csv"
gps = "data/gps.csv"
parking = "data/parking.csv"
"#,
            ConfigFormat::Toml,
        )
        .unwrap();

        assert_eq!(blueprint.version, ConfigVersion::V1);
        assert_eq!(blueprint.agent.batch_size, 5);
        assert_eq!(blueprint.classifier.rest_value, 10.0);
        assert_eq!(blueprint.classifier.epsilon, 0.0);
        assert_eq!(blueprint.forwarder.endpoint, "http://127.0.0.1:8000");
        assert_eq!(blueprint.store.subscriber_queue_capacity, 64);

        // TOML 输出可再次加载且语义不变
        let toml = ConfigLoader::to_toml(&blueprint).unwrap();
        let reloaded = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        assert_eq!(reloaded, blueprint);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::io::Write;
    use std::net::SocketAddr;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;

    use broadcaster::Broadcaster;
    use contracts::{
        BatchForwarder, ClassifiedReading, PersistedRecord, StreamKind, StreamPaths, SurfaceState,
    };
    use edge::{AgentLoop, AgentSettings, HttpForwarder, RetryPolicy, SurfaceClassifier, Termination};
    use ingestion::{csv_sources, MemoryStreamSource};
    use store::{AppState, IngestionService, LocalForwarder, SqliteRecordStore};
    use futures::StreamExt;
    use sync_engine::MultiStreamReader;
    use tokio::sync::oneshot;
    use tokio::time::timeout;
    use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

    fn write_csv(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        path
    }

    fn settings(batch_size: usize, max_rows: u64) -> AgentSettings {
        AgentSettings {
            read_interval: Duration::from_millis(1),
            read_timeout: Duration::from_secs(2),
            batch_size,
            max_rows,
            retry: RetryPolicy::no_retry(),
        }
    }

    async fn memory_service(queue_capacity: usize) -> Arc<IngestionService<SqliteRecordStore>> {
        let store = SqliteRecordStore::in_memory().await.unwrap();
        Arc::new(IngestionService::new(store, Broadcaster::new(queue_capacity)))
    }

    fn csv_reader(dir: &Path, accelerometer: &[&str], gps: &[&str]) -> MultiStreamReader {
        let paths = StreamPaths {
            accelerometer: write_csv(dir, "accelerometer.csv", accelerometer),
            gps: write_csv(dir, "gps.csv", gps),
            parking: write_csv(
                dir,
                "parking.csv",
                &["emptyCount,lon,lat", "3,37.5,55.7", "2,37.5,55.7", "1,37.5,55.7"],
            ),
            has_headers: true,
        };
        let [acc, gps, parking] = csv_sources(&paths);
        MultiStreamReader::new(Box::new(acc), Box::new(gps), Box::new(parking))
    }

    /// 文件 → MultiStreamReader → 分类 → LocalForwarder → 存储 → 订阅者
    #[tokio::test]
    async fn test_files_to_subscriber() {
        let dir = tempfile::tempdir().unwrap();
        let reader = csv_reader(
            dir.path(),
            &["x,y,z", "1.0,2.0,10.0", "1.0,2.0,10.1", "0.5,0.5,9.0"],
            &["lon,lat", "37.5,55.7", "37.6,55.8", "37.7,55.9"],
        );

        let service = memory_service(16).await;
        let mut subscriber = service.broadcaster().subscribe();

        let agent = AgentLoop::new(
            reader,
            SurfaceClassifier::new(10.0, 0.0),
            LocalForwarder::new(service.clone()),
            settings(2, 3),
        );
        let report = timeout(Duration::from_secs(10), agent.run(std::future::pending()))
            .await
            .unwrap();

        assert_eq!(report.terminated_by, Termination::MaxRows);
        assert_eq!(report.rows_read, 3);
        assert_eq!(report.batches_forwarded, 2);
        assert_eq!(report.records_persisted, 3);
        assert_eq!((report.smooth, report.bumpy), (1, 2));

        let mut received = Vec::new();
        for _ in 0..3 {
            received.push(subscriber.recv().await.unwrap());
        }
        assert!(received.windows(2).all(|w| w[0].id < w[1].id));
        assert_eq!(
            received.iter().map(|r| r.road_state).collect::<Vec<_>>(),
            vec![SurfaceState::Smooth, SurfaceState::Bumpy, SurfaceState::Bumpy]
        );
        assert_eq!(received[1].latitude, 55.8);
        assert_eq!(service.list().await.unwrap(), received);
    }

    /// 较短的一路在末尾触发一次重新同步，之后从第一行重新对齐
    #[tokio::test]
    async fn test_short_stream_resyncs_once_and_realigns() {
        let dir = tempfile::tempdir().unwrap();
        let reader = csv_reader(
            dir.path(),
            &["x,y,z", "0,0,1", "0,0,2", "0,0,3"],
            &["lon,lat", "30.0,50.0", "30.1,50.1"],
        );

        let service = memory_service(16).await;
        let agent = AgentLoop::new(
            reader,
            SurfaceClassifier::default(),
            LocalForwarder::new(service.clone()),
            settings(4, 4),
        );
        let report = timeout(Duration::from_secs(10), agent.run(std::future::pending()))
            .await
            .unwrap();

        assert_eq!(report.rows_read, 4);
        assert_eq!(report.resyncs, 1);

        let stored = service.list().await.unwrap();
        let pairs: Vec<(f64, f64)> = stored.iter().map(|r| (r.z, r.latitude)).collect();
        assert_eq!(
            pairs,
            vec![(1.0, 50.0), (2.0, 50.1), (1.0, 50.0), (2.0, 50.1)]
        );
    }

    /// 非有限数值的行只丢弃本行，同批次其他行照常落库
    #[tokio::test]
    async fn test_non_finite_row_is_skipped_and_batch_mates_persist() {
        let dir = tempfile::tempdir().unwrap();
        let reader = csv_reader(
            dir.path(),
            &["x,y,z", "1,2,10", "NaN,2,10", "3,2,10"],
            &["lon,lat", "37.5,55.7", "37.6,55.8", "37.7,55.9"],
        );

        let service = memory_service(16).await;
        let agent = AgentLoop::new(
            reader,
            SurfaceClassifier::default(),
            LocalForwarder::new(service.clone()),
            settings(2, 2),
        );
        let report = timeout(Duration::from_secs(10), agent.run(std::future::pending()))
            .await
            .unwrap();

        assert_eq!(report.rows_read, 2);
        assert_eq!(report.malformed_rows, 1);
        assert_eq!(report.batches_failed, 0);
        assert_eq!(report.records_persisted, 2);

        let stored = service.list().await.unwrap();
        let rows: Vec<(f64, f64)> = stored.iter().map(|r| (r.x, r.latitude)).collect();
        assert_eq!(rows, vec![(1.0, 55.7), (3.0, 55.9)]);
    }

    /// 空数据流：一次重新同步后结束本轮，残余批次仍被转发
    #[tokio::test]
    async fn test_empty_stream_ends_cycle_and_flushes() {
        let acc = MemoryStreamSource::new(StreamKind::Accelerometer, ["x,y,z", "0,0,10"], true);
        let gps = MemoryStreamSource::new(StreamKind::Gps, ["lon,lat", "30,50"], true);
        let parking = MemoryStreamSource::new(StreamKind::Parking, ["emptyCount,lon,lat", "1,30,50"], true);
        let parking_handle = parking.handle();
        let reader = MultiStreamReader::new(Box::new(acc), Box::new(gps), Box::new(parking));

        let service = memory_service(16).await;
        let forwarder = LocalForwarder::new(service.clone());

        // 运行一段时间后生产者清空了 parking 文件
        let agent = AgentLoop::new(reader, SurfaceClassifier::default(), forwarder, settings(5, 0));
        let run = tokio::spawn(agent.run(std::future::pending()));
        tokio::time::sleep(Duration::from_millis(50)).await;
        parking_handle.replace(["emptyCount,lon,lat"]);

        let report = timeout(Duration::from_secs(10), run).await.unwrap().unwrap();
        assert_eq!(report.terminated_by, Termination::StreamExhausted);
        assert!(report.rows_read >= 1);
        assert_eq!(report.records_persisted, report.rows_read);
        assert_eq!(service.count().await.unwrap(), report.rows_read);
    }

    /// 慢订阅者被移除，不影响写入链路和其他订阅者
    #[tokio::test]
    async fn test_stalled_subscriber_does_not_block_ingestion() {
        let service = memory_service(2).await;
        let mut stalled = service.broadcaster().subscribe();
        let mut active = service.broadcaster().subscribe();
        let forwarder = LocalForwarder::new(service.clone());

        let mut ids = Vec::new();
        for round in 0..4 {
            let batch = vec![classified(10.0 + round as f64)];
            let persisted = forwarder.forward(&batch).await.unwrap();
            ids.push(persisted[0].id);
            assert_eq!(active.recv().await.map(|r| r.id), Some(persisted[0].id));
        }

        assert_eq!(service.broadcaster().subscriber_count(), 1);
        let mut leftover = Vec::new();
        while let Some(record) = stalled.recv().await {
            leftover.push(record.id);
        }
        assert_eq!(leftover, ids[..2].to_vec());
    }

    type Server = tokio::task::JoinHandle<std::io::Result<()>>;

    async fn start_server(
        service: Arc<IngestionService<SqliteRecordStore>>,
    ) -> (SocketAddr, oneshot::Sender<()>, Server) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(store::serve(listener, AppState::new(service), async move {
            let _ = stop_rx.await;
        }));
        (addr, stop_tx, server)
    }

    async fn stop_server(stop_tx: oneshot::Sender<()>, server: Server) {
        let _ = stop_tx.send(());
        timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    /// 服务端在升级完成后才注册订阅，发布前先等它出现
    async fn wait_for_subscribers(service: &IngestionService<SqliteRecordStore>, count: usize) {
        timeout(Duration::from_secs(5), async {
            while service.broadcaster().subscriber_count() != count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    /// HttpForwarder → axum 路由 → 存储 → 订阅者
    #[tokio::test]
    async fn test_http_forwarder_round_trip() {
        let service = memory_service(16).await;
        let mut subscriber = service.broadcaster().subscribe();
        let (addr, stop_tx, server) = start_server(service.clone()).await;

        let forwarder = HttpForwarder::new(&contracts::ForwarderConfig {
            endpoint: format!("http://{addr}"),
            ..Default::default()
        })
        .unwrap();

        let persisted = forwarder
            .forward(&[classified(10.0), classified(12.0)])
            .await
            .unwrap();
        assert_eq!(persisted.len(), 2);
        assert!(persisted[0].id < persisted[1].id);
        assert_eq!(persisted[0].road_state, SurfaceState::Smooth);

        assert_eq!(subscriber.recv().await, Some(persisted[0]));
        assert_eq!(subscriber.recv().await, Some(persisted[1]));
        assert_eq!(service.count().await.unwrap(), 2);

        stop_server(stop_tx, server).await;
    }

    /// POST 的批次按提交顺序逐条出现在 WebSocket 文本帧中
    #[tokio::test]
    async fn test_ws_feed_receives_posted_batch_in_order() {
        let service = memory_service(16).await;
        let (addr, stop_tx, server) = start_server(service.clone()).await;

        let (mut socket, _) = connect_async(format!("ws://{addr}/ws/")).await.unwrap();
        wait_for_subscribers(&service, 1).await;

        let forwarder = HttpForwarder::new(&contracts::ForwarderConfig {
            endpoint: format!("http://{addr}"),
            ..Default::default()
        })
        .unwrap();
        let persisted = forwarder
            .forward(&[classified(10.0), classified(12.0), classified(10.0)])
            .await
            .unwrap();

        let mut received = Vec::new();
        while received.len() < persisted.len() {
            let frame = timeout(Duration::from_secs(5), socket.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            match frame {
                WsMessage::Text(text) => {
                    let record: PersistedRecord = serde_json::from_str(&text).unwrap();
                    received.push(record);
                }
                WsMessage::Ping(_) | WsMessage::Pong(_) => {}
                other => panic!("unexpected frame: {other:?}"),
            }
        }
        assert_eq!(received, persisted);
        assert_eq!(
            received.iter().map(|r| r.road_state).collect::<Vec<_>>(),
            vec![SurfaceState::Smooth, SurfaceState::Bumpy, SurfaceState::Smooth]
        );

        socket.close(None).await.unwrap();
        wait_for_subscribers(&service, 0).await;
        stop_server(stop_tx, server).await;
    }

    /// 不读的客户端队列溢出后被移除：先收到已入队的记录，然后是 Close 帧
    #[tokio::test]
    async fn test_ws_overflowed_client_gets_close_frame() {
        let service = memory_service(1).await;
        let (addr, stop_tx, server) = start_server(service.clone()).await;

        let (mut socket, _) = connect_async(format!("ws://{addr}/ws/")).await.unwrap();
        wait_for_subscribers(&service, 1).await;

        // 单线程运行时下一次 publish 内不会被推送任务打断，第二条即溢出
        let persisted = service
            .ingest_classified(&[classified(10.0), classified(12.0), classified(14.0)])
            .await
            .unwrap();
        assert_eq!(service.broadcaster().subscriber_count(), 0);
        assert_eq!(service.count().await.unwrap(), 3);

        let mut texts = Vec::new();
        let mut closed = false;
        while let Some(frame) = timeout(Duration::from_secs(5), socket.next()).await.unwrap() {
            match frame {
                Ok(WsMessage::Text(text)) => {
                    let record: PersistedRecord = serde_json::from_str(&text).unwrap();
                    texts.push(record.id);
                }
                Ok(WsMessage::Close(_)) => {
                    closed = true;
                    break;
                }
                Ok(_) => {}
                Err(e) => panic!("socket error before close: {e}"),
            }
        }
        assert!(closed, "expected a close frame");
        assert_eq!(texts, vec![persisted[0].id]);

        drop(socket);
        stop_server(stop_tx, server).await;
    }

    fn classified(z: f64) -> ClassifiedReading {
        use chrono::{TimeZone, Utc};
        use contracts::{Accelerometer, GpsPoint, Parking, SensorReading};

        let reading = SensorReading {
            accelerometer: Accelerometer { x: 0.1, y: 0.2, z },
            gps: GpsPoint {
                lat: 50.45,
                lon: 30.52,
            },
            parking: Parking::default(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        };
        SurfaceClassifier::default().classify_reading(reading)
    }
}
