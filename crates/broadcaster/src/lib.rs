//! # Broadcaster
//!
//! 持久化记录的实时分发模块。
//!
//! 负责：
//! - 维护在线订阅者集合
//! - Fan-out 到每个订阅者独立的有界队列
//! - 慢订阅者队列满时直接移除，不阻塞写入链路和其他订阅者

mod broadcaster;
mod metrics;
mod subscription;

pub use broadcaster::{Broadcaster, PublishReport};
pub use contracts::PersistedRecord;
pub use metrics::{BroadcastMetrics, DropReason, MetricsSnapshot};
pub use subscription::{Subscription, SubscriptionId, TryRecvError};
