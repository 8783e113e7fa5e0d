//! 路面分类器
//!
//! 纯函数：`|z - rest_value| > epsilon` 判为 Bumpy，否则 Smooth。
//! `epsilon = 0` 时只有 z 恰好等于静止值才是 Smooth。

use contracts::{ClassifiedReading, ClassifierConfig, SensorReading, SurfaceState};

/// 基于 z 轴偏离量的分类器
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceClassifier {
    rest_value: f64,
    epsilon: f64,
}

impl Default for SurfaceClassifier {
    fn default() -> Self {
        Self::from_config(&ClassifierConfig::default())
    }
}

impl SurfaceClassifier {
    pub fn new(rest_value: f64, epsilon: f64) -> Self {
        Self {
            rest_value,
            epsilon,
        }
    }

    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(config.rest_value, config.epsilon)
    }

    pub fn rest_value(&self) -> f64 {
        self.rest_value
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// 分类一行读数
    ///
    /// z 为 NaN 时判为 Bumpy。
    pub fn classify(&self, reading: &SensorReading) -> SurfaceState {
        let deviation = (reading.accelerometer.z - self.rest_value).abs();
        // NaN 比较恒为 false
        if deviation <= self.epsilon {
            SurfaceState::Smooth
        } else {
            SurfaceState::Bumpy
        }
    }

    pub fn classify_reading(&self, reading: SensorReading) -> ClassifiedReading {
        let state = self.classify(&reading);
        metrics::counter!("roadwatch_readings_classified_total", "state" => state.as_str())
            .increment(1);
        ClassifiedReading::new(reading, state)
    }
}
