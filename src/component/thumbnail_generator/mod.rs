//! 預覽縮圖生成元件
//!
//! 1. 以 ffprobe 取得影片長度
//! 2. 取影片中點為擷取時間點
//! 3. 以 ffmpeg 擷取單一畫面並縮放為固定寬度

mod main;
mod thumbnail_extractor;

pub use main::{ThumbnailGenerator, ThumbnailJob, ThumbnailOutcome, ThumbnailStatus};
pub use thumbnail_extractor::{ThumbnailTask, extract_thumbnail, sample_timestamp};
