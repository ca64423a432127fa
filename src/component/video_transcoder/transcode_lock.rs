use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// 鎖定檔內容
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    pub owner: String,
    pub pid: u32,
    /// Unix 時間（秒）
    pub created_at: u64,
    /// 最後一次心跳的 Unix 時間（毫秒）；0 表示沒有心跳，改用建立時間
    #[serde(default)]
    pub refreshed_at_ms: u64,
}

impl LockRecord {
    fn new(owner: &str) -> Self {
        let now_ms = unix_now_ms();
        Self {
            owner: owner.to_string(),
            pid: std::process::id(),
            created_at: now_ms / 1000,
            refreshed_at_ms: now_ms,
        }
    }

    fn last_seen_ms(&self) -> u64 {
        if self.refreshed_at_ms > 0 {
            self.refreshed_at_ms
        } else {
            self.created_at.saturating_mul(1000)
        }
    }
}

/// 建議性鎖定：標示某個程序正在寫入此輸出檔
///
/// 以 `create_new` 建立鎖定檔，同時只有一個程序能取得。
/// 持有者必須定期呼叫 [`TranscodeLock::refresh`]；超過 `stale_after`
/// 沒有心跳的鎖定檔視為崩潰殘留，移除後重試一次。
/// Drop 時只在鎖定檔仍屬於自己時才刪除。
#[derive(Debug)]
pub struct TranscodeLock {
    path: PathBuf,
    owner: String,
}

impl TranscodeLock {
    /// 取得鎖定；被其他程序持有時回傳 `None`
    pub fn acquire(path: &Path, owner: &str, stale_after: Duration) -> Result<Option<Self>> {
        if let Some(lock) = Self::try_create(path, owner)? {
            return Ok(Some(lock));
        }

        if !Self::is_stale(path, stale_after)? {
            debug!("鎖定檔仍有效，其他程序處理中: {}", path.display());
            return Ok(None);
        }

        warn!("移除過期的鎖定檔: {}", path.display());
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to remove stale lock {}", path.display()));
            }
        }

        Self::try_create(path, owner)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 鎖定檔是否仍屬於自己
    #[must_use]
    pub fn is_held(&self) -> bool {
        matches!(Self::read_record(&self.path), Ok(Some(record)) if record.owner == self.owner)
    }

    /// 更新心跳時間；鎖定已被其他程序接手時回傳錯誤且不覆寫
    pub fn refresh(&self) -> Result<()> {
        let created_at = match Self::read_record(&self.path) {
            Ok(Some(record)) if record.owner == self.owner => record.created_at,
            _ => anyhow::bail!("Lock is no longer held: {}", self.path.display()),
        };

        let mut record = LockRecord::new(&self.owner);
        record.created_at = created_at;
        let content = serde_json::to_vec(&record).context("Failed to serialize lock record")?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to refresh lock {}", self.path.display()))
    }

    fn try_create(path: &Path, owner: &str) -> Result<Option<Self>> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to create lock {}", path.display()));
            }
        };

        let record = LockRecord::new(owner);
        let lock = Self {
            path: path.to_path_buf(),
            owner: owner.to_string(),
        };

        // 寫入失敗時 lock 被 drop，鎖定檔會被清除
        let content = serde_json::to_vec(&record).context("Failed to serialize lock record")?;
        file.write_all(&content)
            .with_context(|| format!("Failed to write lock {}", path.display()))?;

        debug!("取得鎖定: {}", path.display());
        Ok(Some(lock))
    }

    /// 依最後心跳判斷是否過期；內容無法解析時改用修改時間
    fn is_stale(path: &Path, stale_after: Duration) -> Result<bool> {
        let last_seen_ms = match Self::read_record(path) {
            Ok(Some(record)) => record.last_seen_ms(),
            Ok(None) => return Ok(true),
            Err(_) => match fs::metadata(path).and_then(|m| m.modified()) {
                Ok(modified) => modified
                    .duration_since(UNIX_EPOCH)
                    .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
                    .unwrap_or(0),
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("Failed to read lock metadata {}", path.display()));
                }
            },
        };

        let age_ms = unix_now_ms().saturating_sub(last_seen_ms);
        Ok(u128::from(age_ms) >= stale_after.as_millis())
    }

    /// 鎖定檔已不存在時回傳 `None`
    fn read_record(path: &Path) -> Result<Option<LockRecord>> {
        let content = match fs::read(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).context("Failed to read lock"),
        };
        let record = serde_json::from_slice(&content).context("Invalid lock record")?;
        Ok(Some(record))
    }
}

impl Drop for TranscodeLock {
    fn drop(&mut self) {
        match Self::read_record(&self.path) {
            Ok(Some(record)) if record.owner == self.owner => {
                if let Err(e) = fs::remove_file(&self.path) {
                    warn!("無法移除鎖定檔 {}: {e}", self.path.display());
                }
            }
            Ok(Some(record)) => {
                info!(
                    "鎖定檔已被其他程序接手 (pid {}), 保留: {}",
                    record.pid,
                    self.path.display()
                );
            }
            Ok(None) => {}
            // 內容寫入未完成，檔案仍是自己建立的
            Err(_) => {
                let _ = fs::remove_file(&self.path);
            }
        }
    }
}

fn unix_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const STALE: Duration = Duration::from_secs(3600);

    fn now_secs() -> u64 {
        unix_now_ms() / 1000
    }

    fn write_record(path: &Path, owner: &str, created_at: u64) {
        let record = LockRecord {
            owner: owner.to_string(),
            pid: 1,
            created_at,
            refreshed_at_ms: 0,
        };
        fs::write(path, serde_json::to_vec(&record).unwrap()).unwrap();
    }

    #[test]
    fn test_acquire_and_release() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("clip.mp4.lock");

        let lock = TranscodeLock::acquire(&path, "me", STALE).unwrap().unwrap();
        assert!(path.exists());
        let record = TranscodeLock::read_record(&path).unwrap().unwrap();
        assert_eq!(record.owner, "me");
        assert_eq!(record.pid, std::process::id());

        drop(lock);
        assert!(!path.exists());
    }

    #[test]
    fn test_fresh_foreign_lock_means_busy() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("clip.mp4.lock");
        write_record(&path, "other", now_secs());

        assert!(TranscodeLock::acquire(&path, "me", STALE).unwrap().is_none());
        assert!(path.exists());
    }

    #[test]
    fn test_second_acquire_in_same_process_is_busy() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("clip.mp4.lock");

        let _first = TranscodeLock::acquire(&path, "a", STALE).unwrap().unwrap();
        assert!(TranscodeLock::acquire(&path, "b", STALE).unwrap().is_none());
    }

    #[test]
    fn test_stale_lock_is_taken_over() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("clip.mp4.lock");
        write_record(&path, "crashed", now_secs() - 2 * STALE.as_secs());

        let lock = TranscodeLock::acquire(&path, "me", STALE).unwrap().unwrap();
        let record = TranscodeLock::read_record(lock.path()).unwrap().unwrap();
        assert_eq!(record.owner, "me");
    }

    #[test]
    fn test_garbage_lock_uses_modified_time() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("clip.mp4.lock");
        fs::write(&path, b"not json").unwrap();

        // 剛寫入的檔案，修改時間很新
        assert!(TranscodeLock::acquire(&path, "me", STALE).unwrap().is_none());
        // 過期門檻為 0 時立即視為過期
        assert!(
            TranscodeLock::acquire(&path, "me", Duration::ZERO)
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn test_drop_keeps_lock_taken_over_by_other_owner() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("clip.mp4.lock");

        let lock = TranscodeLock::acquire(&path, "me", STALE).unwrap().unwrap();
        write_record(&path, "other", now_secs());
        drop(lock);

        assert!(path.exists());
    }

    #[test]
    fn test_refresh_keeps_old_lock_alive() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("clip.mp4.lock");
        let lock = TranscodeLock::acquire(&path, "me", STALE).unwrap().unwrap();

        // 模擬長時間轉檔：建立時間早已超過門檻
        let created_at = now_secs() - 2 * STALE.as_secs();
        write_record(&path, "me", created_at);
        assert!(TranscodeLock::is_stale(&path, STALE).unwrap());

        lock.refresh().unwrap();
        assert!(!TranscodeLock::is_stale(&path, STALE).unwrap());
        assert!(TranscodeLock::acquire(&path, "other", STALE).unwrap().is_none());

        let record = TranscodeLock::read_record(&path).unwrap().unwrap();
        assert_eq!(record.owner, "me");
        assert_eq!(record.created_at, created_at);
    }

    #[test]
    fn test_refresh_does_not_overwrite_new_owner() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("clip.mp4.lock");
        let lock = TranscodeLock::acquire(&path, "me", STALE).unwrap().unwrap();
        assert!(lock.is_held());

        write_record(&path, "other", now_secs());
        assert!(!lock.is_held());
        assert!(lock.refresh().is_err());

        let record = TranscodeLock::read_record(&path).unwrap().unwrap();
        assert_eq!(record.owner, "other");
    }

    #[test]
    fn test_record_without_heartbeat_uses_created_at() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("clip.mp4.lock");
        fs::write(&path, br#"{"owner":"old","pid":1,"created_at":1}"#).unwrap();

        assert!(TranscodeLock::is_stale(&path, STALE).unwrap());
    }
}
