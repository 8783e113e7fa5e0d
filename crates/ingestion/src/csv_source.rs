//! CSV 文件数据源
//!
//! 每次 `open` 都从文件开头重新读取，外部生产者重写/轮转的文件在下一次
//! 重新打开时生效。

use std::fs::File;
use std::path::{Path, PathBuf};

use contracts::{ContractError, RawRow, ReadOutcome, StreamKind, StreamSource};
use tracing::{debug, trace};

/// CSV 文件数据源
pub struct CsvStreamSource {
    name: String,
    kind: StreamKind,
    path: PathBuf,
    has_headers: bool,
    reader: Option<csv::Reader<File>>,
    record: csv::StringRecord,
    line: u64,
}

impl CsvStreamSource {
    /// 创建数据源 (不打开文件)
    pub fn new(kind: StreamKind, path: impl Into<PathBuf>, has_headers: bool) -> Self {
        Self {
            name: kind.as_str().to_string(),
            kind,
            path: path.into(),
            has_headers,
            reader: None,
            record: csv::StringRecord::new(),
            line: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StreamSource for CsvStreamSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> StreamKind {
        self.kind
    }

    fn open(&mut self) -> Result<(), ContractError> {
        self.reader = None;
        let file = File::open(&self.path).map_err(|source| ContractError::StreamOpen {
            stream: self.name.clone(),
            source,
        })?;

        // 字段数校验交给行映射，这里不做
        let reader = csv::ReaderBuilder::new()
            .has_headers(self.has_headers)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        self.reader = Some(reader);
        self.line = 0;
        debug!(stream = %self.name, path = %self.path.display(), "Stream opened");
        Ok(())
    }

    fn next_record(&mut self) -> Result<ReadOutcome, ContractError> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| ContractError::stream_read(&self.name, "source not open"))?;

        loop {
            let more = reader
                .read_record(&mut self.record)
                .map_err(|e| ContractError::stream_read(&self.name, e.to_string()))?;
            if !more {
                trace!(stream = %self.name, rows = self.line, "End of stream");
                return Ok(ReadOutcome::EndOfStream);
            }

            // 仅含空白的行
            if self.record.iter().all(str::is_empty) {
                continue;
            }

            self.line += 1;
            let fields = self.record.iter().map(str::to_string).collect();
            return Ok(ReadOutcome::Record(RawRow::new(self.line, fields)));
        }
    }

    fn close(&mut self) {
        if self.reader.take().is_some() {
            debug!(stream = %self.name, "Stream closed");
        }
    }

    fn is_open(&self) -> bool {
        self.reader.is_some()
    }
}
