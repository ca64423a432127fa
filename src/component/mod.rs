//! 功能元件模組
//!
//! 每個子模組實現一個獨立的功能，包含主要邏輯和專用工具

pub mod media_normalizer;
pub mod run_report;
pub mod thumbnail_generator;
pub mod video_transcoder;

pub use media_normalizer::MediaNormalizer;
pub use run_report::RunResult;
pub use thumbnail_generator::ThumbnailGenerator;
pub use video_transcoder::VideoTranscoder;
