//! 配置校验模块
//!
//! 校验规则：
//! - 三路数据文件路径非空且互不相同
//! - batch_size > 0, read_timeout_ms > 0
//! - rest_value 有限, epsilon 有限且 >= 0
//! - endpoint 为 http(s) 地址, max_attempts >= 1, 退避区间合法
//! - 存储服务参数合法 (监听地址、连接数、队列容量)

use std::collections::HashSet;
use std::net::SocketAddr;

use contracts::{ContractError, RoadwatchBlueprint, StreamKind};

/// 校验 RoadwatchBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &RoadwatchBlueprint) -> Result<(), ContractError> {
    validate_streams(blueprint)?;
    validate_agent(blueprint)?;
    validate_classifier(blueprint)?;
    validate_forwarder(blueprint)?;
    validate_store(blueprint)?;
    Ok(())
}

/// 收集非致命警告
///
/// 配置可用，但很可能不是用户想要的。
pub fn collect_warnings(blueprint: &RoadwatchBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.classifier.epsilon == 0.0 {
        warnings.push(
            "classifier.epsilon = 0: only an exact rest_value reading is Smooth, \
             any sensor noise classifies as Bumpy"
                .to_string(),
        );
    }
    if blueprint.agent.batch_size == 1 {
        warnings.push("agent.batch_size = 1: every reading is a separate request".to_string());
    }
    if blueprint.forwarder.max_attempts == 1 {
        warnings.push("forwarder.max_attempts = 1: failed batches are never retried".to_string());
    }

    warnings
}

/// 校验数据文件路径
fn validate_streams(blueprint: &RoadwatchBlueprint) -> Result<(), ContractError> {
    let streams = &blueprint.agent.streams;
    let mut seen = HashSet::new();

    for kind in StreamKind::ALL {
        let path = streams.path(kind);
        let field = format!("agent.streams.{kind}");
        if path.as_os_str().is_empty() {
            return Err(ContractError::config_validation(
                field,
                "stream path cannot be empty",
            ));
        }
        if !seen.insert(path) {
            return Err(ContractError::config_validation(
                field,
                format!("duplicate stream path '{}'", path.display()),
            ));
        }
    }
    Ok(())
}

/// 校验采集代理参数
fn validate_agent(blueprint: &RoadwatchBlueprint) -> Result<(), ContractError> {
    let agent = &blueprint.agent;

    if agent.batch_size == 0 {
        return Err(ContractError::config_validation(
            "agent.batch_size",
            "batch_size must be > 0",
        ));
    }
    if agent.read_timeout_ms == 0 {
        return Err(ContractError::config_validation(
            "agent.read_timeout_ms",
            "read_timeout_ms must be > 0",
        ));
    }
    Ok(())
}

/// 校验分类阈值
fn validate_classifier(blueprint: &RoadwatchBlueprint) -> Result<(), ContractError> {
    let classifier = &blueprint.classifier;

    if !classifier.rest_value.is_finite() {
        return Err(ContractError::config_validation(
            "classifier.rest_value",
            format!("rest_value must be finite, got {}", classifier.rest_value),
        ));
    }
    if !classifier.epsilon.is_finite() || classifier.epsilon < 0.0 {
        return Err(ContractError::config_validation(
            "classifier.epsilon",
            format!(
                "epsilon must be finite and >= 0, got {}",
                classifier.epsilon
            ),
        ));
    }
    Ok(())
}

/// 校验转发与重试策略
fn validate_forwarder(blueprint: &RoadwatchBlueprint) -> Result<(), ContractError> {
    let forwarder = &blueprint.forwarder;

    if !(forwarder.endpoint.starts_with("http://") || forwarder.endpoint.starts_with("https://"))
    {
        return Err(ContractError::config_validation(
            "forwarder.endpoint",
            format!(
                "endpoint must start with http:// or https://, got '{}'",
                forwarder.endpoint
            ),
        ));
    }
    if forwarder.max_attempts == 0 {
        return Err(ContractError::config_validation(
            "forwarder.max_attempts",
            "max_attempts must be >= 1",
        ));
    }
    if forwarder.initial_backoff_ms > forwarder.max_backoff_ms {
        return Err(ContractError::config_validation(
            "forwarder.initial_backoff_ms / forwarder.max_backoff_ms",
            format!(
                "initial_backoff_ms ({}) must be <= max_backoff_ms ({})",
                forwarder.initial_backoff_ms, forwarder.max_backoff_ms
            ),
        ));
    }
    Ok(())
}

/// 校验存储服务
fn validate_store(blueprint: &RoadwatchBlueprint) -> Result<(), ContractError> {
    let store = &blueprint.store;

    if store.listen_addr.parse::<SocketAddr>().is_err() {
        return Err(ContractError::config_validation(
            "store.listen_addr",
            format!("invalid socket address '{}'", store.listen_addr),
        ));
    }
    if store.max_connections == 0 {
        return Err(ContractError::config_validation(
            "store.max_connections",
            "max_connections must be > 0",
        ));
    }
    if store.subscriber_queue_capacity == 0 {
        return Err(ContractError::config_validation(
            "store.subscriber_queue_capacity",
            "subscriber_queue_capacity must be > 0",
        ));
    }
    Ok(())
}
