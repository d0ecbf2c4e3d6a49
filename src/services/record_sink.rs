//! 结果存储 - 业务能力层
//!
//! 接收案件记录（按去重键幂等写入）和每个查询的结果事件

use crate::error::SinkError;
use crate::models::{CaseRecord, SearchOutcomeEvent};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// 存储能力
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// 写入单条案件，返回是否为新记录
    async fn upsert_case(&self, record: &CaseRecord) -> Result<bool, SinkError> {
        Ok(self.upsert_cases(std::slice::from_ref(record)).await? > 0)
    }

    /// 写入一批案件，返回新写入的数量（重复的按去重键跳过）
    ///
    /// 一批记录作为整体写入
    async fn upsert_cases(&self, records: &[CaseRecord]) -> Result<usize, SinkError>;

    /// 写入一次查询的结果事件
    async fn record_outcome(&self, event: &SearchOutcomeEvent) -> Result<(), SinkError>;

    /// 刷新并关闭
    async fn close(&self) -> Result<(), SinkError>;
}

/// JSON Lines 文件存储
///
/// - `cases.jsonl`：案件记录
/// - `search_logs.jsonl`：查询结果事件
pub struct JsonlRecordSink {
    cases_path: PathBuf,
    logs_path: PathBuf,
    inner: Mutex<JsonlFiles>,
}

struct JsonlFiles {
    cases: File,
    logs: File,
    seen: HashSet<String>,
}

impl JsonlRecordSink {
    /// 打开（或创建）输出目录，并从已有文件中恢复去重键
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, SinkError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).await.map_err(|e| write_failed(dir, e))?;

        let cases_path = dir.join("cases.jsonl");
        let logs_path = dir.join("search_logs.jsonl");

        let seen = load_existing_keys(&cases_path).await;
        if !seen.is_empty() {
            info!("已从 {} 恢复 {} 条去重键", cases_path.display(), seen.len());
        }

        let cases = open_append(&cases_path).await?;
        let logs = open_append(&logs_path).await?;

        Ok(Self {
            cases_path,
            logs_path,
            inner: Mutex::new(JsonlFiles { cases, logs, seen }),
        })
    }

    pub fn cases_path(&self) -> &Path {
        &self.cases_path
    }
}

#[async_trait]
impl RecordSink for JsonlRecordSink {
    async fn upsert_cases(&self, records: &[CaseRecord]) -> Result<usize, SinkError> {
        let mut inner = self.inner.lock().await;

        // 先在内存中拼好整批，再一次写入
        let mut buffer = String::new();
        let mut fresh_keys = Vec::new();
        for record in records {
            let key = record.dedup_key();
            if inner.seen.contains(&key) || fresh_keys.contains(&key) {
                debug!("跳过重复案件: {}", record.case_number);
                continue;
            }
            buffer.push_str(&serde_json::to_string(record)?);
            buffer.push('\n');
            fresh_keys.push(key);
        }

        if fresh_keys.is_empty() {
            return Ok(0);
        }

        append_batch(&mut inner.cases, buffer.as_bytes())
            .await
            .map_err(|e| write_failed(&self.cases_path, e))?;

        let written = fresh_keys.len();
        inner.seen.extend(fresh_keys);
        Ok(written)
    }

    async fn record_outcome(&self, event: &SearchOutcomeEvent) -> Result<(), SinkError> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let mut inner = self.inner.lock().await;
        inner
            .logs
            .write_all(line.as_bytes())
            .await
            .map_err(|e| write_failed(&self.logs_path, e))
    }

    async fn close(&self) -> Result<(), SinkError> {
        let mut inner = self.inner.lock().await;
        inner
            .cases
            .flush()
            .await
            .map_err(|e| write_failed(&self.cases_path, e))?;
        inner
            .logs
            .flush()
            .await
            .map_err(|e| write_failed(&self.logs_path, e))?;
        info!("结果文件已关闭: {}", self.cases_path.display());
        Ok(())
    }
}

async fn open_append(path: &Path) -> Result<File, SinkError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| write_failed(path, e))
}

/// 整批追加并落盘；失败时截回写入前的长度，文件里不留半批记录
async fn append_batch(file: &mut File, bytes: &[u8]) -> std::io::Result<()> {
    let committed = file.metadata().await?.len();

    let result = match file.write_all(bytes).await {
        Ok(()) => file.flush().await,
        Err(e) => Err(e),
    };

    if result.is_err() {
        if let Err(e) = file.set_len(committed).await {
            warn!("⚠️ 无法回滚未完成的批次（截断到 {} 字节失败）: {}", committed, e);
        }
    }
    result
}

async fn load_existing_keys(path: &Path) -> HashSet<String> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashSet::new(),
        Err(e) => {
            warn!("⚠️ 无法读取 {}，本次运行不会跳过已有案件: {}", path.display(), e);
            return HashSet::new();
        }
    };

    // 逐行解码，个别损坏的行不影响其余去重键
    bytes
        .split(|b| *b == b'\n')
        .map(String::from_utf8_lossy)
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<CaseRecord>(&line) {
            Ok(record) => Some(record.dedup_key()),
            Err(e) => {
                warn!("⚠️ 忽略无法解析的案件行 ({}): {}", path.display(), e);
                None
            }
        })
        .collect()
}

fn write_failed(path: &Path, source: std::io::Error) -> SinkError {
    SinkError::WriteFailed {
        path: path.display().to_string(),
        source,
    }
}

/// 内存存储（测试与试运行）
#[derive(Default)]
pub struct MemoryRecordSink {
    inner: std::sync::Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    cases: Vec<CaseRecord>,
    outcomes: Vec<SearchOutcomeEvent>,
    seen: HashSet<String>,
}

impl MemoryRecordSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cases(&self) -> Vec<CaseRecord> {
        self.state().cases.clone()
    }

    pub fn outcomes(&self) -> Vec<SearchOutcomeEvent> {
        self.state().outcomes.clone()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // 锁内不会 panic，中毒时直接取回数据
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl RecordSink for MemoryRecordSink {
    async fn upsert_cases(&self, records: &[CaseRecord]) -> Result<usize, SinkError> {
        let mut state = self.state();
        let mut written = 0;
        for record in records {
            if state.seen.insert(record.dedup_key()) {
                state.cases.push(record.clone());
                written += 1;
            }
        }
        Ok(written)
    }

    async fn record_outcome(&self, event: &SearchOutcomeEvent) -> Result<(), SinkError> {
        self.state().outcomes.push(event.clone());
        Ok(())
    }

    async fn close(&self) -> Result<(), SinkError> {
        Ok(())
    }
}
