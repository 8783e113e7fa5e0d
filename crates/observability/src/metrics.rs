//! 指标记录与统计
//!
//! 组件内的计数器直接通过 `metrics` facade 上报；这里提供跨组件的记录函数
//! 以及采集代理运行摘要的内存聚合。

use contracts::SurfaceState;
use metrics::{counter, histogram};

fn status_label(success: bool) -> &'static str {
    if success {
        "ok"
    } else {
        "failed"
    }
}

/// 记录一次批量转发 (含全部重试)
pub fn record_batch_forwarded(success: bool, latency_ms: f64) {
    counter!("roadwatch_batches_forwarded_total", "status" => status_label(success)).increment(1);
    histogram!("roadwatch_forward_latency_ms").record(latency_ms);
}

/// 记录一次批量持久化
pub fn record_batch_persisted(success: bool, records: usize, latency_ms: f64) {
    counter!("roadwatch_batches_persisted_total", "status" => status_label(success)).increment(1);
    if success {
        counter!("roadwatch_records_persisted_total").increment(records as u64);
    }
    histogram!("roadwatch_persist_latency_ms").record(latency_ms);
}

/// 采集代理指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct AgentMetricsAggregator {
    /// Smooth 读数
    pub smooth: u64,

    /// Bumpy 读数
    pub bumpy: u64,

    /// 成功转发的批次
    pub batches_forwarded: u64,

    /// 重试耗尽后丢弃的批次
    pub batches_failed: u64,

    /// 下游确认持久化的记录数
    pub records_persisted: u64,

    /// 每批尝试次数
    pub attempt_stats: RunningStats,

    /// 转发耗时 (毫秒，含重试)
    pub forward_latency_stats: RunningStats,
}

impl AgentMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_reading(&mut self, state: SurfaceState) {
        match state {
            SurfaceState::Smooth => self.smooth += 1,
            SurfaceState::Bumpy => self.bumpy += 1,
        }
    }

    /// 更新一批的转发结果
    pub fn update_forward(&mut self, persisted: Option<usize>, attempts: u32, latency_ms: f64) {
        match persisted {
            Some(records) => {
                self.batches_forwarded += 1;
                self.records_persisted += records as u64;
            }
            None => self.batches_failed += 1,
        }
        self.attempt_stats.push(attempts as f64);
        self.forward_latency_stats.push(latency_ms);
        record_batch_forwarded(persisted.is_some(), latency_ms);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> AgentSummary {
        let classified = self.smooth + self.bumpy;
        let batches = self.batches_forwarded + self.batches_failed;
        AgentSummary {
            smooth: self.smooth,
            bumpy: self.bumpy,
            bumpy_rate: if classified > 0 {
                self.bumpy as f64 / classified as f64 * 100.0
            } else {
                0.0
            },
            batches_forwarded: self.batches_forwarded,
            batches_failed: self.batches_failed,
            failure_rate: if batches > 0 {
                self.batches_failed as f64 / batches as f64 * 100.0
            } else {
                0.0
            },
            records_persisted: self.records_persisted,
            attempts: StatsSummary::from(&self.attempt_stats),
            forward_latency_ms: StatsSummary::from(&self.forward_latency_stats),
        }
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct AgentSummary {
    pub smooth: u64,
    pub bumpy: u64,
    pub bumpy_rate: f64,
    pub batches_forwarded: u64,
    pub batches_failed: u64,
    pub failure_rate: f64,
    pub records_persisted: u64,
    pub attempts: StatsSummary,
    pub forward_latency_ms: StatsSummary,
}

impl std::fmt::Display for AgentSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Agent Metrics Summary ===")?;
        writeln!(
            f,
            "Readings: {} smooth, {} bumpy ({:.2}% bumpy)",
            self.smooth, self.bumpy, self.bumpy_rate
        )?;
        writeln!(
            f,
            "Batches: {} forwarded, {} failed ({:.2}%)",
            self.batches_forwarded, self.batches_failed, self.failure_rate
        )?;
        writeln!(f, "Records persisted: {}", self.records_persisted)?;
        writeln!(f, "Attempts per batch: {}", self.attempts)?;
        writeln!(f, "Forward latency (ms): {}", self.forward_latency_ms)?;
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
