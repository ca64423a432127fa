use crate::config::types::dotted_extension;
use log::{debug, warn};
use std::collections::HashSet;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// 隱藏檔案前綴
const HIDDEN_PREFIX: char = '.';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    /// 小寫且含前置點，例如 `.mov`
    pub extension: Option<String>,
    pub relative_path: PathBuf,
}

/// 無法列出的資料夾（不中止掃描）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkFailure {
    pub relative_path: PathBuf,
    pub message: String,
}

#[derive(Debug)]
pub enum WalkEvent {
    File(FileEntry),
    Failure(WalkFailure),
}

/// 深度優先掃描根目錄下的一般檔案
///
/// - 名稱以 `.` 開頭的項目連同其子項目一律略過
/// - 第一層名稱在排除清單內的資料夾整個略過
/// - 無法讀取的資料夾回報為 [`WalkEvent::Failure`]，繼續掃描其他資料夾
///
/// 每次呼叫 [`FileScanner::events`] 都會重新開始一次掃描。
pub struct FileScanner {
    root: PathBuf,
    excluded_dirs: HashSet<String>,
}

impl FileScanner {
    #[must_use]
    pub fn new(root: &Path, excluded_dirs: HashSet<String>) -> Self {
        Self {
            root: root.to_path_buf(),
            excluded_dirs,
        }
    }

    pub fn events(&self) -> impl Iterator<Item = WalkEvent> + '_ {
        WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| self.is_visible(entry))
            .filter_map(move |result| match result {
                Ok(entry) if entry.file_type().is_file() => {
                    Some(WalkEvent::File(self.to_file_entry(entry)))
                }
                Ok(_) => None,
                Err(err) => Some(WalkEvent::Failure(self.to_failure(&err))),
            })
    }

    /// 將每個事件交給 handler；handler 回傳 `Break` 時停止掃描
    pub fn walk<F>(&self, mut handler: F)
    where
        F: FnMut(WalkEvent) -> ControlFlow<()>,
    {
        for event in self.events() {
            if handler(event).is_break() {
                debug!("掃描提前結束: {}", self.root.display());
                break;
            }
        }
    }

    fn is_visible(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return true;
        }

        let name = entry.file_name().to_string_lossy();
        if name.starts_with(HIDDEN_PREFIX) {
            return false;
        }

        let excluded = entry.depth() == 1
            && entry.file_type().is_dir()
            && self.excluded_dirs.contains(name.as_ref());
        if excluded {
            debug!("略過排除的資料夾: {}", entry.path().display());
        }
        !excluded
    }

    fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root).unwrap_or(path).to_path_buf()
    }

    fn to_file_entry(&self, entry: DirEntry) -> FileEntry {
        let path = entry.into_path();
        FileEntry {
            extension: dotted_extension(&path),
            relative_path: self.relative(&path),
            path,
        }
    }

    fn to_failure(&self, err: &walkdir::Error) -> WalkFailure {
        let relative_path = err
            .path()
            .map_or_else(PathBuf::new, |path| self.relative(path));
        let message = err
            .io_error()
            .map_or_else(|| err.to_string(), ToString::to_string);

        warn!("無法讀取資料夾 {}: {message}", relative_path.display());

        WalkFailure {
            relative_path,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    fn visited(scanner: &FileScanner) -> Vec<PathBuf> {
        scanner
            .events()
            .filter_map(|event| match event {
                WalkEvent::File(entry) => Some(entry.relative_path),
                WalkEvent::Failure(_) => None,
            })
            .collect()
    }

    fn excluded(names: &[&str]) -> HashSet<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_scan_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let scanner = FileScanner::new(temp_dir.path(), HashSet::new());
        assert!(visited(&scanner).is_empty());
    }

    #[test]
    fn test_hidden_entries_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "a/clip.mov");
        touch(temp_dir.path(), "a/.secret.mov");
        touch(temp_dir.path(), ".hidden/deep/clip.mov");
        touch(temp_dir.path(), ".thumb/a/clip.jpg");

        let scanner = FileScanner::new(temp_dir.path(), HashSet::new());
        assert_eq!(visited(&scanner), vec![PathBuf::from("a/clip.mov")]);
    }

    #[test]
    fn test_excluded_top_level_directories_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "tags/funny/clip.mov");
        touch(temp_dir.path(), "b/tags/clip.mov");
        touch(temp_dir.path(), "tags.mov");

        let scanner = FileScanner::new(temp_dir.path(), excluded(&["tags"]));
        assert_eq!(
            visited(&scanner),
            vec![PathBuf::from("b/tags/clip.mov"), PathBuf::from("tags.mov")]
        );
    }

    #[test]
    fn test_file_entry_fields() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "a/Clip.MOV");

        let scanner = FileScanner::new(temp_dir.path(), HashSet::new());
        let entries: Vec<FileEntry> = scanner
            .events()
            .filter_map(|event| match event {
                WalkEvent::File(entry) => Some(entry),
                WalkEvent::Failure(_) => None,
            })
            .collect();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, temp_dir.path().join("a/Clip.MOV"));
        assert_eq!(entries[0].extension.as_deref(), Some(".mov"));
        assert_eq!(entries[0].relative_path, PathBuf::from("a/Clip.MOV"));
    }

    #[test]
    fn test_walk_is_restartable() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "a/one.mov");
        touch(temp_dir.path(), "b/two.mov");

        let scanner = FileScanner::new(temp_dir.path(), HashSet::new());
        assert_eq!(visited(&scanner), visited(&scanner));
    }

    #[test]
    fn test_walk_handler_can_stop_early() {
        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "a/one.mov");
        touch(temp_dir.path(), "b/two.mov");
        touch(temp_dir.path(), "c/three.mov");

        let scanner = FileScanner::new(temp_dir.path(), HashSet::new());
        let mut seen = 0;
        scanner.walk(|event| {
            if matches!(event, WalkEvent::File(_)) {
                seen += 1;
            }
            if seen == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(seen, 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_is_reported_and_walk_continues() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        touch(temp_dir.path(), "locked/clip.mov");
        touch(temp_dir.path(), "open/clip.mov");
        let locked = temp_dir.path().join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // root 使用者不受權限限制，無法模擬
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let scanner = FileScanner::new(temp_dir.path(), HashSet::new());
        let events: Vec<WalkEvent> = scanner.events().collect();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let failures: Vec<&WalkFailure> = events
            .iter()
            .filter_map(|event| match event {
                WalkEvent::Failure(failure) => Some(failure),
                WalkEvent::File(_) => None,
            })
            .collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].relative_path, PathBuf::from("locked"));
        assert!(events.iter().any(|event| matches!(
            event,
            WalkEvent::File(entry) if entry.relative_path == Path::new("open/clip.mov")
        )));
    }
}
