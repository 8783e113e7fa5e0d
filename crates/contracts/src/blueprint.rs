//! RoadwatchBlueprint - Config Loader 输出
//!
//! 描述完整的运行配置：数据流路径、分类阈值、转发策略、存储服务。

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::StreamKind;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的配置蓝图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadwatchBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 边缘采集代理
    pub agent: AgentConfig,

    /// 路面分类
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// 批量转发
    #[serde(default)]
    pub forwarder: ForwarderConfig,

    /// 存储服务
    #[serde(default)]
    pub store: StoreConfig,
}

/// 采集代理配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// 两次聚合读取之间的间隔 (ms)
    #[serde(default = "default_read_interval_ms")]
    pub read_interval_ms: u64,

    /// 单次聚合读取的最长等待 (ms)
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// 每批读数数量
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// 最多读取行数，0 表示不限
    #[serde(default)]
    pub max_rows: u64,

    /// 三路数据文件
    pub streams: StreamPaths,
}

fn default_read_interval_ms() -> u64 {
    100
}

fn default_read_timeout_ms() -> u64 {
    2000
}

fn default_batch_size() -> usize {
    5
}

impl AgentConfig {
    pub fn read_interval(&self) -> Duration {
        Duration::from_millis(self.read_interval_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// 三路数据文件路径
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamPaths {
    pub accelerometer: PathBuf,
    pub gps: PathBuf,
    pub parking: PathBuf,

    /// 文件首行是否为表头
    #[serde(default = "default_has_headers")]
    pub has_headers: bool,
}

fn default_has_headers() -> bool {
    true
}

impl StreamPaths {
    /// 按流类型取路径
    pub fn path(&self, kind: StreamKind) -> &PathBuf {
        match kind {
            StreamKind::Accelerometer => &self.accelerometer,
            StreamKind::Gps => &self.gps,
            StreamKind::Parking => &self.parking,
        }
    }
}

/// 分类阈值
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// 静止时 z 轴读数
    #[serde(default = "default_rest_value")]
    pub rest_value: f64,

    /// 容差；`|z - rest_value| > epsilon` 判为 Bumpy
    #[serde(default)]
    pub epsilon: f64,
}

fn default_rest_value() -> f64 {
    10.0
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            rest_value: default_rest_value(),
            epsilon: 0.0,
        }
    }
}

/// 转发配置 (含调用方的重试策略)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwarderConfig {
    /// 存储服务根地址
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// 单次请求超时 (ms)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// 每批最多尝试次数
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// 首次退避 (ms)，之后翻倍
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// 退避上限 (ms)
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_endpoint() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    200
}

fn default_max_backoff_ms() -> u64 {
    5000
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_ms: default_timeout_ms(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl ForwarderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

/// 存储服务配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// HTTP 监听地址
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// sqlx 连接串
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// 连接池大小
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// 每个订阅者的队列容量
    #[serde(default = "default_subscriber_queue_capacity")]
    pub subscriber_queue_capacity: usize,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_database_url() -> String {
    "sqlite://roadwatch.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_subscriber_queue_capacity() -> usize {
    64
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            database_url: default_database_url(),
            max_connections: default_max_connections(),
            subscriber_queue_capacity: default_subscriber_queue_capacity(),
        }
    }
}
