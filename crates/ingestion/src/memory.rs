//! 内存数据源
//!
//! 用于测试与演示。行缓冲可在数据源存活期间被改写，模拟外部生产者
//! 重写文件；`open` 次数可被观察，用于断言重新同步行为。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use contracts::{ContractError, RawRow, ReadOutcome, StreamKind, StreamSource};
use parking_lot::RwLock;

#[derive(Debug, Default)]
struct Shared {
    lines: RwLock<Vec<String>>,
    opens: AtomicUsize,
    unavailable: AtomicBool,
}

/// 内存数据源的外部句柄
///
/// 与数据源共享同一缓冲区。
#[derive(Debug, Clone, Default)]
pub struct MemoryStreamHandle {
    shared: Arc<Shared>,
}

impl MemoryStreamHandle {
    /// 替换全部内容 (含表头行，如有)
    pub fn replace<I, S>(&self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.shared.lines.write() = lines.into_iter().map(Into::into).collect();
    }

    /// 追加一行
    pub fn append(&self, line: impl Into<String>) {
        self.shared.lines.write().push(line.into());
    }

    /// `open` 被调用的次数
    pub fn open_count(&self) -> usize {
        self.shared.opens.load(Ordering::SeqCst)
    }

    /// 使后续 `open` 失败
    pub fn set_unavailable(&self, unavailable: bool) {
        self.shared.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

/// 内存数据源
pub struct MemoryStreamSource {
    name: String,
    kind: StreamKind,
    has_headers: bool,
    shared: Arc<Shared>,
    cursor: Option<usize>,
    line: u64,
}

impl MemoryStreamSource {
    /// 创建数据源，`lines` 为原始文本行
    pub fn new<I, S>(kind: StreamKind, lines: I, has_headers: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let handle = MemoryStreamHandle::default();
        handle.replace(lines);
        Self::from_handle(kind, &handle, has_headers)
    }

    /// 基于已有句柄创建数据源
    pub fn from_handle(kind: StreamKind, handle: &MemoryStreamHandle, has_headers: bool) -> Self {
        Self {
            name: kind.as_str().to_string(),
            kind,
            has_headers,
            shared: handle.shared.clone(),
            cursor: None,
            line: 0,
        }
    }

    /// 获取共享句柄
    pub fn handle(&self) -> MemoryStreamHandle {
        MemoryStreamHandle {
            shared: self.shared.clone(),
        }
    }
}

impl StreamSource for MemoryStreamSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StreamKind {
        self.kind
    }

    fn open(&mut self) -> Result<(), ContractError> {
        self.shared.opens.fetch_add(1, Ordering::SeqCst);
        self.cursor = None;

        if self.shared.unavailable.load(Ordering::SeqCst) {
            return Err(ContractError::StreamOpen {
                stream: self.name.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "stream unavailable"),
            });
        }

        let lines = self.shared.lines.read();
        let mut cursor = 0;
        if self.has_headers {
            // 跳过首个非空行
            while cursor < lines.len() && lines[cursor].trim().is_empty() {
                cursor += 1;
            }
            cursor = (cursor + 1).min(lines.len());
        }
        drop(lines);

        self.cursor = Some(cursor);
        self.line = 0;
        Ok(())
    }

    fn next_record(&mut self) -> Result<ReadOutcome, ContractError> {
        let Some(cursor) = self.cursor.as_mut() else {
            return Err(ContractError::stream_read(&self.name, "source not open"));
        };

        let lines = self.shared.lines.read();
        while *cursor < lines.len() {
            let raw = &lines[*cursor];
            *cursor += 1;
            if raw.trim().is_empty() {
                continue;
            }
            self.line += 1;
            let fields = raw.split(',').map(|f| f.trim().to_string()).collect();
            return Ok(ReadOutcome::Record(RawRow::new(self.line, fields)));
        }
        Ok(ReadOutcome::EndOfStream)
    }

    fn close(&mut self) {
        self.cursor = None;
    }

    fn is_open(&self) -> bool {
        self.cursor.is_some()
    }
}
