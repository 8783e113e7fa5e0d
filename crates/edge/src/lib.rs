//! # Edge
//!
//! 边缘采集代理。
//!
//! 负责：
//! - 路面状态分类 (`SurfaceClassifier`)
//! - 按批累积读数 (`BatchBuffer`)
//! - 通过 HTTP 转发批次 (`HttpForwarder`)，调用方重试 + 指数退避
//! - 顺序执行的采集主循环 (`AgentLoop`)
//!
//! ## 使用示例
//!
//! ```ignore
//! use edge::{AgentLoop, AgentSettings, HttpForwarder, SurfaceClassifier};
//!
//! let forwarder = HttpForwarder::new(&blueprint.forwarder)?;
//! let agent = AgentLoop::new(
//!     reader,
//!     SurfaceClassifier::from_config(&blueprint.classifier),
//!     forwarder,
//!     AgentSettings::from_blueprint(&blueprint),
//! );
//! let report = agent.run(tokio::signal::ctrl_c().map(|_| ())).await;
//! ```

mod agent;
mod batch;
mod classifier;
mod http;
mod retry;

pub use agent::{AgentLoop, AgentReport, AgentSettings, Termination};
pub use batch::BatchBuffer;
pub use classifier::SurfaceClassifier;
pub use http::{HttpForwarder, INGRESS_PATH};
pub use retry::{forward_with_retry, ForwardOutcome, RetryPolicy};
