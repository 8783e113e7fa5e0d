//! # Sync Engine
//!
//! 三路流行号对齐读取器。
//!
//! 负责：
//! - 从 accelerometer / GPS / parking 三路各取一行组成聚合行
//! - 任一路到达末尾时整体重新同步 (恰好一次)
//! - 固定字段位置的行映射，严格数值解析
//!
//! ## 使用示例
//!
//! ```ignore
//! use ingestion::csv_sources;
//! use sync_engine::MultiStreamReader;
//!
//! let [acc, gps, parking] = csv_sources(&blueprint.agent.streams);
//! let mut reader = MultiStreamReader::new(Box::new(acc), Box::new(gps), Box::new(parking));
//! reader.open()?;
//!
//! loop {
//!     match reader.read_aggregate() {
//!         Ok(reading) => { /* classify */ }
//!         Err(e) if e.is_recoverable() => continue,
//!         Err(e) => break,
//!     }
//! }
//! ```

mod reader;
mod row;

pub use reader::{Clock, MultiStreamReader, ReaderState};
pub use row::{parse_accelerometer, parse_gps, parse_parking};

pub use contracts::SensorReading;
