//! # Store
//!
//! 中心存储服务。
//!
//! 负责：
//! - 以单事务原子写入批次 (`SqliteRecordStore`)
//! - 提交成功后再广播 (`IngestionService`)
//! - HTTP 接入与管理接口、WebSocket 订阅推送 (`api`)
//! - 进程内转发器 (`LocalForwarder`)

pub mod api;
mod db;
mod local;
mod service;

pub use api::{build_router, serve, ApiError, AppState};
pub use db::SqliteRecordStore;
pub use local::LocalForwarder;
pub use service::IngestionService;
