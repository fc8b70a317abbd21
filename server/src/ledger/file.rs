use super::{count_above, top_n, Ledger};
use crate::error::LedgerError;
use async_trait::async_trait;
use log::{debug, error, warn};
use shared::{GameMode, ScoreRecord};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};

/// Append handle plus the byte length of everything committed so far
struct Writer {
    file: File,
    committed_len: u64,
    /// Set when a failed write could not be rolled back. The file may end in
    /// a partial line, so nothing more is appended.
    poisoned: bool,
}

struct Shared {
    path: PathBuf,
    writer: Mutex<Writer>,
    records: RwLock<Vec<ScoreRecord>>,
}

/// Durable ledger stored as one JSON object per line.
///
/// The whole file is read into memory on open and every query is answered
/// from that index. Appends hit the disk (including `sync_data`) before the
/// record becomes visible to queries.
pub struct FileLedger {
    shared: Arc<Shared>,
}

/// Result of scanning an existing ledger file
#[derive(Debug)]
struct Loaded {
    records: Vec<ScoreRecord>,
    valid_len: u64,
    needs_newline: bool,
}

fn load_records(contents: &str) -> Result<Loaded, LedgerError> {
    let mut records = Vec::new();
    let mut offset = 0usize;
    let mut needs_newline = false;

    for (index, chunk) in contents.split_inclusive('\n').enumerate() {
        let terminated = chunk.ends_with('\n');
        let line = chunk.trim_end();

        if line.is_empty() {
            offset += chunk.len();
            continue;
        }

        match serde_json::from_str::<ScoreRecord>(line) {
            Ok(record) => {
                records.push(record);
                offset += chunk.len();
                needs_newline = !terminated;
            }
            // An unterminated final line is a write that never completed
            Err(e) if !terminated => {
                warn!(
                    "Discarding truncated ledger record on line {}: {}",
                    index + 1,
                    e
                );
                break;
            }
            Err(source) => {
                return Err(LedgerError::Corrupt {
                    line: index + 1,
                    source,
                })
            }
        }
    }

    Ok(Loaded {
        records,
        valid_len: offset as u64,
        needs_newline,
    })
}

impl FileLedger {
    /// Opens (or creates) the ledger file at `path` and loads its records.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let loaded = load_records(&contents)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        let mut committed_len = loaded.valid_len;
        if committed_len < contents.len() as u64 {
            file.set_len(committed_len).await?;
        }
        if loaded.needs_newline {
            file.write_all(b"\n").await?;
            committed_len += 1;
        }
        file.flush().await?;
        file.sync_data().await?;

        debug!(
            "Loaded {} score records from {}",
            loaded.records.len(),
            path.display()
        );

        Ok(Self {
            shared: Arc::new(Shared {
                path,
                writer: Mutex::new(Writer {
                    file,
                    committed_len,
                    poisoned: false,
                }),
                records: RwLock::new(loaded.records),
            }),
        })
    }
}

impl Shared {
    async fn write_line(writer: &mut Writer, line: &[u8]) -> std::io::Result<()> {
        writer.file.write_all(line).await?;
        writer.file.flush().await?;
        writer.file.sync_data().await
    }

    /// Writes, syncs and publishes one record while holding the writer.
    async fn commit(&self, record: ScoreRecord, line: Vec<u8>) -> Result<(), LedgerError> {
        let mut writer = self.writer.lock().await;
        if writer.poisoned {
            return Err(LedgerError::Poisoned(self.path.display().to_string()));
        }

        if let Err(e) = Self::write_line(&mut writer, &line).await {
            // Roll the file back so a partial line never reaches a later reader
            let committed_len = writer.committed_len;
            if let Err(trunc_err) = writer.file.set_len(committed_len).await {
                error!(
                    "Rollback of ledger {} failed, refusing further appends: {}",
                    self.path.display(),
                    trunc_err
                );
                writer.poisoned = true;
            }
            return Err(e.into());
        }

        writer.committed_len += line.len() as u64;
        self.records.write().await.push(record);
        Ok(())
    }
}

#[async_trait]
impl Ledger for FileLedger {
    async fn append(&self, record: ScoreRecord) -> Result<(), LedgerError> {
        let mut line = serde_json::to_vec(&record).map_err(LedgerError::Encode)?;
        line.push(b'\n');

        // Detached so a caller that stops waiting cannot leave a synced line
        // on disk that the index and committed length never saw
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move { shared.commit(record, line).await }).await?
    }

    async fn count_greater_than(
        &self,
        score: u32,
        mode: Option<GameMode>,
    ) -> Result<u64, LedgerError> {
        let records = self.shared.records.read().await;
        Ok(count_above(&records, score, mode))
    }

    async fn query_top_n(
        &self,
        mode: Option<GameMode>,
        limit: usize,
    ) -> Result<Vec<ScoreRecord>, LedgerError> {
        let records = self.shared.records.read().await;
        Ok(top_n(&records, mode, limit))
    }

    async fn len(&self) -> Result<u64, LedgerError> {
        Ok(self.shared.records.read().await.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn record(id: &str, score: u32, mode: GameMode) -> ScoreRecord {
        ScoreRecord::new(
            id.to_string(),
            "user-1",
            "Tester",
            score,
            mode,
            NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scores.jsonl");

        {
            let ledger = FileLedger::open(&path).await.unwrap();
            ledger.append(record("a", 120, GameMode::Walls)).await.unwrap();
            ledger
                .append(record("b", 300, GameMode::PassThrough))
                .await
                .unwrap();
        }

        let reopened = FileLedger::open(&path).await.unwrap();
        assert_eq!(reopened.len().await.unwrap(), 2);

        let top = reopened.query_top_n(None, 10).await.unwrap();
        assert_eq!(top[0].id, "b");
        assert_eq!(top[1].id, "a");
        assert_eq!(top[1].date, NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
    }

    #[tokio::test]
    async fn test_creates_missing_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger").join("scores.jsonl");

        let ledger = FileLedger::open(&path).await.unwrap();
        ledger.append(record("a", 1, GameMode::Walls)).await.unwrap();

        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_abandoned_append_still_commits() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scores.jsonl");
        let ledger = FileLedger::open(&path).await.unwrap();

        // Stop waiting right after the first poll
        let abandoned = tokio::time::timeout(
            std::time::Duration::ZERO,
            ledger.append(record("a", 90, GameMode::Walls)),
        )
        .await;
        assert!(abandoned.is_err());

        // Appends are serialized on the writer, so this one lands after "a"
        ledger.append(record("b", 40, GameMode::Walls)).await.unwrap();
        assert_eq!(ledger.len().await.unwrap(), 2);
        drop(ledger);

        let reopened = FileLedger::open(&path).await.unwrap();
        let ids: Vec<String> = reopened
            .query_top_n(None, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_poisoned_writer_refuses_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scores.jsonl");
        let ledger = FileLedger::open(&path).await.unwrap();
        ledger.append(record("a", 10, GameMode::Walls)).await.unwrap();
        let size = std::fs::metadata(&path).unwrap().len();

        ledger.shared.writer.lock().await.poisoned = true;

        match ledger.append(record("b", 20, GameMode::Walls)).await {
            Err(LedgerError::Poisoned(p)) => assert!(p.ends_with("scores.jsonl")),
            other => panic!("Expected poisoned ledger, got {:?}", other),
        }
        assert_eq!(ledger.len().await.unwrap(), 1);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), size);
    }

    #[tokio::test]
    async fn test_truncated_tail_is_discarded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scores.jsonl");

        let good = serde_json::to_string(&record("a", 50, GameMode::Walls)).unwrap();
        std::fs::write(&path, format!("{}\n{{\"id\":\"b\",\"sco", good)).unwrap();

        let ledger = FileLedger::open(&path).await.unwrap();
        assert_eq!(ledger.len().await.unwrap(), 1);

        ledger.append(record("c", 70, GameMode::Walls)).await.unwrap();
        drop(ledger);

        let reopened = FileLedger::open(&path).await.unwrap();
        let ids: Vec<String> = reopened
            .query_top_n(None, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["c".to_string(), "a".to_string()]);
    }

    #[tokio::test]
    async fn test_unterminated_valid_tail_is_kept() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scores.jsonl");

        let good = serde_json::to_string(&record("a", 50, GameMode::Walls)).unwrap();
        std::fs::write(&path, &good).unwrap();

        let ledger = FileLedger::open(&path).await.unwrap();
        ledger.append(record("b", 10, GameMode::Walls)).await.unwrap();
        drop(ledger);

        let reopened = FileLedger::open(&path).await.unwrap();
        assert_eq!(reopened.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_middle_line_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scores.jsonl");

        let good = serde_json::to_string(&record("a", 50, GameMode::Walls)).unwrap();
        std::fs::write(&path, format!("{}\nnot json\n{}\n", good, good)).unwrap();

        match FileLedger::open(&path).await {
            Err(LedgerError::Corrupt { line, .. }) => assert_eq!(line, 2),
            Err(other) => panic!("Expected corrupt error, got {}", other),
            Ok(_) => panic!("Expected corrupt error, got a ledger"),
        }
    }

    #[test]
    fn test_load_skips_blank_lines() {
        let good = serde_json::to_string(&record("a", 5, GameMode::Walls)).unwrap();
        let contents = format!("\n{}\n\n", good);

        let loaded = load_records(&contents).unwrap();
        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.valid_len, contents.len() as u64);
        assert!(!loaded.needs_newline);
    }
}
