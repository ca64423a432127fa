//! 執行結果彙整與摘要輸出
//!
//! 單一檔案失敗只會記錄，不會中止整個批次。

mod run_result;
mod summary;

pub use run_result::{FailureRecord, Phase, RunResult, TranscodeRecord};
pub use summary::{print_summary, render_summary};
