//! MultiStreamReader 核心实现
//!
//! 两状态机：`Aligned` (初始) / `Resyncing`。
//!
//! 每次 `read_aggregate` 从三路流各取一行。任一路到达流末尾 (或读错误) 时，
//! 关闭并重新打开全部三路 (重新跳过表头)，然后恰好重试一次；重试仍失败则
//! 返回 `StreamExhausted`，由调用方结束本轮采集。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use contracts::{ContractError, RawRow, ReadOutcome, SensorReading, StreamSource};
use ingestion::IngestionMetrics;
use tracing::{debug, instrument, warn};

use crate::row;

/// 聚合时刻来源
pub type Clock = Box<dyn Fn() -> DateTime<Utc> + Send>;

/// 读取器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// 三路行号对齐
    Aligned,
    /// 正在 (或刚刚未能) 重新同步
    Resyncing,
}

/// 一次拉取的结果
enum Pull {
    Rows([RawRow; 3]),
    /// 首个未能给出一行的流
    Broken {
        stream: String,
        error: Option<ContractError>,
    },
}

/// 多路流读取器
pub struct MultiStreamReader {
    /// accelerometer, gps, parking
    sources: [Box<dyn StreamSource>; 3],
    state: ReaderState,
    opened: bool,
    resync_count: u64,
    clock: Clock,
    metrics: Arc<IngestionMetrics>,
}

impl MultiStreamReader {
    /// 创建读取器 (不打开数据源)
    pub fn new(
        accelerometer: Box<dyn StreamSource>,
        gps: Box<dyn StreamSource>,
        parking: Box<dyn StreamSource>,
    ) -> Self {
        Self {
            sources: [accelerometer, gps, parking],
            state: ReaderState::Aligned,
            opened: false,
            resync_count: 0,
            clock: Box::new(Utc::now),
            metrics: Arc::new(IngestionMetrics::new()),
        }
    }

    /// 替换时钟
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// 使用共享的计数器
    pub fn with_metrics(mut self, metrics: Arc<IngestionMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// 累计重新同步次数
    pub fn resync_count(&self) -> u64 {
        self.resync_count
    }

    pub fn metrics(&self) -> &Arc<IngestionMetrics> {
        &self.metrics
    }

    /// 打开全部三路
    ///
    /// # Errors
    /// 任一路打开失败时返回 `StreamOpen`，已打开的流会被关闭
    pub fn open(&mut self) -> Result<(), ContractError> {
        for idx in 0..self.sources.len() {
            if let Err(e) = self.sources[idx].open() {
                self.close();
                return Err(e);
            }
        }
        self.opened = true;
        self.state = ReaderState::Aligned;
        debug!("All streams opened");
        Ok(())
    }

    /// 关闭全部三路
    pub fn close(&mut self) {
        for source in &mut self.sources {
            source.close();
        }
        self.opened = false;
    }

    /// 读取一行聚合数据
    ///
    /// # Errors
    /// - `MalformedRecord`: 本行字段无法解析，仅影响本次读取 (三路各已消耗一行)
    /// - `StreamExhausted`: 重新同步一次后仍无法读到完整一行 (流末尾或读错误，
    ///   原始读错误只记录日志)
    /// - `StreamOpen`: 重新同步时数据源不可用
    #[instrument(name = "read_aggregate", level = "debug", skip(self), fields(state = ?self.state))]
    pub fn read_aggregate(&mut self) -> Result<SensorReading, ContractError> {
        if !self.opened {
            self.open()?;
        }

        // 上一轮以失败告终：对齐状态未知，直接重新同步
        if self.state == ReaderState::Aligned {
            match self.pull() {
                Pull::Rows(rows) => return self.assemble(rows),
                Pull::Broken { stream, error } => {
                    if let Some(e) = error {
                        warn!(stream = %stream, error = %e, "Stream read failed");
                    }
                    self.state = ReaderState::Resyncing;
                }
            }
        }

        self.resync()?;

        match self.pull() {
            Pull::Rows(rows) => {
                self.state = ReaderState::Aligned;
                self.assemble(rows)
            }
            Pull::Broken { stream, error } => {
                self.metrics.record_exhausted();
                match error {
                    Some(e) => warn!(stream = %stream, error = %e, "Stream read failed after resync"),
                    None => warn!(stream = %stream, "Stream exhausted after resync"),
                }
                Err(ContractError::StreamExhausted { stream })
            }
        }
    }

    /// 关闭并重新打开全部三路
    fn resync(&mut self) -> Result<(), ContractError> {
        self.state = ReaderState::Resyncing;
        self.resync_count += 1;
        self.metrics.record_resync();
        warn!(resync = self.resync_count, "Resync triggered");

        self.close();
        self.open()?;
        self.state = ReaderState::Resyncing;
        Ok(())
    }

    /// 从三路各拉取一行
    ///
    /// 即使某一路已到末尾，其余流也照常各取一行，重新同步后位置会被重置。
    fn pull(&mut self) -> Pull {
        let mut rows: [Option<RawRow>; 3] = [None, None, None];
        let mut broken: Option<(String, Option<ContractError>)> = None;

        for (slot, source) in rows.iter_mut().zip(self.sources.iter_mut()) {
            match source.next_record() {
                Ok(ReadOutcome::Record(row)) => *slot = Some(row),
                Ok(ReadOutcome::EndOfStream) => {
                    debug!(stream = %source.name(), "End of stream");
                    broken.get_or_insert_with(|| (source.name().to_string(), None));
                }
                Err(e) => {
                    broken.get_or_insert_with(|| (source.name().to_string(), Some(e)));
                }
            }
        }

        if let Some((stream, error)) = broken {
            return Pull::Broken { stream, error };
        }
        match rows {
            [Some(acc), Some(gps), Some(parking)] => Pull::Rows([acc, gps, parking]),
            _ => Pull::Broken {
                stream: self.sources[0].name().to_string(),
                error: None,
            },
        }
    }

    /// 行映射 + 打时间戳
    fn assemble(&self, rows: [RawRow; 3]) -> Result<SensorReading, ContractError> {
        let [acc, gps, parking] = &rows;
        let result = row::parse_accelerometer(self.sources[0].name(), acc).and_then(|a| {
            let g = row::parse_gps(self.sources[1].name(), gps)?;
            let p = row::parse_parking(self.sources[2].name(), parking)?;
            Ok((a, g, p))
        });

        match result {
            Ok((accelerometer, gps, parking)) => {
                self.metrics.record_row();
                Ok(SensorReading {
                    accelerometer,
                    gps,
                    parking,
                    timestamp: (self.clock)(),
                })
            }
            Err(e) => {
                if let ContractError::MalformedRecord { stream, .. } = &e {
                    self.metrics.record_malformed(stream);
                }
                Err(e)
            }
        }
    }
}

impl Drop for MultiStreamReader {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use contracts::StreamKind;
    use ingestion::{MemoryStreamHandle, MemoryStreamSource};
    use rand::Rng;

    struct Fixture {
        reader: MultiStreamReader,
        handles: [MemoryStreamHandle; 3],
    }

    fn fixture(acc: &[&str], gps: &[&str], parking: &[&str]) -> Fixture {
        let with_header = |header: &str, rows: &[&str]| {
            std::iter::once(header.to_string())
                .chain(rows.iter().map(|r| r.to_string()))
                .collect::<Vec<_>>()
        };
        let acc = MemoryStreamSource::new(
            StreamKind::Accelerometer,
            with_header("x,y,z", acc),
            true,
        );
        let gps = MemoryStreamSource::new(StreamKind::Gps, with_header("lon,lat", gps), true);
        let parking = MemoryStreamSource::new(
            StreamKind::Parking,
            with_header("emptyCount,lon,lat", parking),
            true,
        );
        let handles = [acc.handle(), gps.handle(), parking.handle()];
        let reader = MultiStreamReader::new(Box::new(acc), Box::new(gps), Box::new(parking))
            .with_clock(|| Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
        Fixture { reader, handles }
    }

    fn refs(lines: &[String]) -> Vec<&str> {
        lines.iter().map(String::as_str).collect()
    }

    fn open_counts(handles: &[MemoryStreamHandle; 3]) -> [usize; 3] {
        [
            handles[0].open_count(),
            handles[1].open_count(),
            handles[2].open_count(),
        ]
    }

    #[test]
    fn test_single_aggregate_row() {
        let mut f = fixture(&["1.0,2.0,10.0"], &["37.5,55.7"], &["3,37.5,55.7"]);
        let reading = f.reader.read_aggregate().unwrap();

        assert_eq!(reading.accelerometer.z, 10.0);
        assert_eq!(reading.gps.lon, 37.5);
        assert_eq!(reading.gps.lat, 55.7);
        assert_eq!(reading.parking.empty_count, 3);
        assert_eq!(
            reading.timestamp,
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
        );
        assert_eq!(f.reader.state(), ReaderState::Aligned);
    }

    #[test]
    fn test_random_triples_stay_row_aligned() {
        let mut rng = rand::rng();
        for _ in 0..20 {
            let n = rng.random_range(1..40);
            let acc: Vec<String> = (0..n).map(|i| format!("{i},{}.5,10", i)).collect();
            let gps: Vec<String> = (0..n).map(|i| format!("{},{}", i + 1000, i + 2000)).collect();
            let parking: Vec<String> = (0..n)
                .map(|i| format!("{i},{},{}", i + 3000, i + 4000))
                .collect();
            let mut f = fixture(&refs(&acc), &refs(&gps), &refs(&parking));

            for i in 0..n {
                let r = f.reader.read_aggregate().unwrap();
                let i = i as f64;
                assert_eq!(r.accelerometer.x, i);
                assert_eq!(r.accelerometer.y, i + 0.5);
                assert_eq!(r.gps.lon, i + 1000.0);
                assert_eq!(r.gps.lat, i + 2000.0);
                assert_eq!(r.parking.empty_count as f64, i);
                assert_eq!(r.parking.gps.lon, i + 3000.0);
                assert_eq!(r.parking.gps.lat, i + 4000.0);
            }
            assert_eq!(f.reader.resync_count(), 0);
        }
    }

    #[test]
    fn test_short_stream_triggers_exactly_one_resync() {
        let mut f = fixture(
            &["1,1,10", "2,2,10", "3,3,10"],
            &["1,1", "2,2", "3,3"],
            &["1,1,1", "2,2,2"],
        );
        f.reader.read_aggregate().unwrap();
        f.reader.read_aggregate().unwrap();
        assert_eq!(open_counts(&f.handles), [1, 1, 1]);

        // parking 到头，三路一起从首行重来
        let r = f.reader.read_aggregate().unwrap();
        assert_eq!(r.accelerometer.x, 1.0);
        assert_eq!(r.gps.lon, 1.0);
        assert_eq!(r.parking.empty_count, 1);
        assert_eq!(f.reader.resync_count(), 1);
        assert_eq!(open_counts(&f.handles), [2, 2, 2]);
        assert_eq!(f.reader.state(), ReaderState::Aligned);
    }

    #[test]
    fn test_empty_stream_is_exhausted_after_one_resync() {
        let mut f = fixture(&["1,1,10"], &["1,1"], &[]);
        let err = f.reader.read_aggregate().unwrap_err();

        match err {
            ContractError::StreamExhausted { stream } => assert_eq!(stream, "parking"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(f.reader.resync_count(), 1);
        assert_eq!(open_counts(&f.handles), [2, 2, 2]);
        assert_eq!(f.reader.state(), ReaderState::Resyncing);
        assert_eq!(f.reader.metrics().snapshot().exhausted, 1);
    }

    #[test]
    fn test_rewritten_stream_recovers_on_resync() {
        let mut f = fixture(&["1,1,10"], &["1,1"], &["1,1,1"]);
        f.reader.read_aggregate().unwrap();

        // 生产者在读取器到达末尾前重写了 gps 文件
        f.handles[1].replace(["lon,lat", "9,9", "8,8"]);
        let r = f.reader.read_aggregate().unwrap();
        assert_eq!(r.gps.lon, 9.0);
        assert_eq!(f.reader.resync_count(), 1);
    }

    #[test]
    fn test_malformed_row_aborts_only_that_read() {
        let mut f = fixture(
            &["1,1,10", "2,oops,10", "3,3,10"],
            &["1,1", "2,2", "3,3"],
            &["1,1,1", "2,2,2", "3,3,3"],
        );
        f.reader.read_aggregate().unwrap();
        let err = f.reader.read_aggregate().unwrap_err();
        assert!(matches!(err, ContractError::MalformedRecord { .. }));

        // 对齐未被破坏：下一次读取的是第 3 行
        let r = f.reader.read_aggregate().unwrap();
        assert_eq!(r.accelerometer.x, 3.0);
        assert_eq!(r.gps.lon, 3.0);
        assert_eq!(r.parking.empty_count, 3);
        assert_eq!(f.reader.resync_count(), 0);

        let snapshot = f.reader.metrics().snapshot();
        assert_eq!(snapshot.rows_read, 2);
        assert_eq!(snapshot.malformed_rows, 1);
    }

    #[test]
    fn test_unavailable_stream_fails_resync() {
        let mut f = fixture(&["1,1,10"], &["1,1"], &["1,1,1"]);
        f.reader.read_aggregate().unwrap();
        f.handles[0].set_unavailable(true);

        let err = f.reader.read_aggregate().unwrap_err();
        assert!(matches!(err, ContractError::StreamOpen { .. }));
    }

    #[test]
    fn test_read_after_exhaustion_starts_with_resync() {
        let mut f = fixture(&["1,1,10"], &["1,1"], &[]);
        assert!(f.reader.read_aggregate().is_err());

        f.handles[2].replace(["emptyCount,lon,lat", "5,1,1"]);
        let r = f.reader.read_aggregate().unwrap();
        assert_eq!(r.parking.empty_count, 5);
        assert_eq!(f.reader.resync_count(), 2);
        assert_eq!(f.reader.state(), ReaderState::Aligned);
    }

    /// 打开正常，但每次读取都失败
    struct FaultySource;

    impl StreamSource for FaultySource {
        fn name(&self) -> &str {
            "parking"
        }

        fn kind(&self) -> StreamKind {
            StreamKind::Parking
        }

        fn open(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        fn next_record(&mut self) -> Result<ReadOutcome, ContractError> {
            Err(ContractError::stream_read("parking", "device not ready"))
        }

        fn close(&mut self) {}

        fn is_open(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_read_error_after_resync_is_exhaustion() {
        let acc = MemoryStreamSource::new(StreamKind::Accelerometer, ["x,y,z", "1,1,10"], true);
        let gps = MemoryStreamSource::new(StreamKind::Gps, ["lon,lat", "1,1"], true);
        let mut reader = MultiStreamReader::new(Box::new(acc), Box::new(gps), Box::new(FaultySource));

        let err = reader.read_aggregate().unwrap_err();
        match err {
            ContractError::StreamExhausted { stream } => assert_eq!(stream, "parking"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(reader.resync_count(), 1);
        assert_eq!(reader.metrics().snapshot().exhausted, 1);
    }
}
