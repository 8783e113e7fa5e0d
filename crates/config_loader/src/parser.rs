//! 配置解析模块
//!
//! TOML 为主，JSON 为辅；格式由文件扩展名决定。
//! 解析错误带上出错位置 (行:列)，方便直接定位到配置文件。

use std::path::Path;

use contracts::{ContractError, RoadwatchBlueprint};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// 从路径推断格式
    pub fn detect(path: &Path) -> Result<Self, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse(format!(
                "cannot determine config format of '{}' (expected .toml or .json)",
                path.display()
            ))
        })?;

        Self::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
        }
    }

    /// 解析为蓝图 (不做校验)
    pub fn parse(&self, content: &str) -> Result<RoadwatchBlueprint, ContractError> {
        match self {
            Self::Toml => toml::from_str(content).map_err(|e| {
                let at = e.span().map(|span| Position::at_offset(content, span.start));
                parse_error(*self, at, e.message().to_string(), e)
            }),
            // serde_json 的消息自带 "at line X column Y"
            Self::Json => serde_json::from_str(content)
                .map_err(|e| parse_error(*self, None, e.to_string(), e)),
        }
    }
}

/// 1-based 行列位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Position {
    line: usize,
    column: usize,
}

impl Position {
    fn at_offset(content: &str, offset: usize) -> Self {
        let prefix = &content[..offset.min(content.len())];
        let line = prefix.matches('\n').count() + 1;
        let column = prefix.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
        Self { line, column }
    }
}

fn parse_error(
    format: ConfigFormat,
    at: Option<Position>,
    message: String,
    source: impl std::error::Error + Send + Sync + 'static,
) -> ContractError {
    let message = match at {
        Some(p) => format!(
            "{} parse error at {}:{}: {}",
            format.as_str(),
            p.line,
            p.column,
            message.trim_end()
        ),
        None => format!("{} parse error: {}", format.as_str(), message.trim_end()),
    };
    ContractError::ConfigParse {
        message,
        source: Some(Box::new(source)),
    }
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<RoadwatchBlueprint, ContractError> {
    format.parse(content)
}
