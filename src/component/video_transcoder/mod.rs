//! 影片標準化轉檔元件
//!
//! 使用 ffmpeg 將舊格式影片（.mov/.wmv/.flv）轉為 H.264/AAC MP4，
//! 透過暫存檔與 rename 確保輸出完整，鎖定檔協調同時執行的程序。

mod main;
mod progress;
mod transcode_lock;

pub use main::{SkipReason, TranscodeJob, TranscodeOutcome, TranscodeStatus, VideoTranscoder};
pub use progress::{ProgressUpdate, parse_progress_line};
pub use transcode_lock::{LockRecord, TranscodeLock};
