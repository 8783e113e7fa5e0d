//! SensorReading - MultiStreamReader 输出
//!
//! 三路对齐后的传感器读数，以及分类后的读数。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 加速度计读数
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Accelerometer {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// GPS 坐标 (度)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GpsPoint {
    /// 纬度
    pub lat: f64,

    /// 经度
    pub lon: f64,
}

/// 停车位读数
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parking {
    /// 空车位数量
    pub empty_count: u32,

    /// 停车场位置
    pub gps: GpsPoint,
}

/// 聚合行
///
/// 三个子读数来自三路流中同一行号 (行号对齐，而非时钟对齐)。
/// 构造后不可变。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// 加速度计
    pub accelerometer: Accelerometer,

    /// GPS
    pub gps: GpsPoint,

    /// 停车位
    pub parking: Parking,

    /// 聚合时刻 (采集时间，非文件内时间)
    pub timestamp: DateTime<Utc>,
}

/// 路面状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfaceState {
    Smooth,
    Bumpy,
}

impl SurfaceState {
    /// Storage / wire label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Smooth => "Smooth",
            Self::Bumpy => "Bumpy",
        }
    }

    /// Parse a storage label (case-insensitive)
    pub fn parse(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "smooth" => Some(Self::Smooth),
            "bumpy" => Some(Self::Bumpy),
            _ => None,
        }
    }
}

impl std::fmt::Display for SurfaceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 分类后的读数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedReading {
    /// 原始聚合读数
    pub reading: SensorReading,

    /// 路面状态
    pub surface_state: SurfaceState,
}

impl ClassifiedReading {
    pub fn new(reading: SensorReading, surface_state: SurfaceState) -> Self {
        Self {
            reading,
            surface_state,
        }
    }
}
