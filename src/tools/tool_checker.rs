use crate::config::UserSettings;
use crate::error::NormalizeError;
use log::{debug, error};
use std::path::Path;
use std::process::{Command, Stdio};

/// 確認外部工具可執行（`<tool> -version` 成功結束）
pub fn check_tool(program: &Path) -> Result<(), NormalizeError> {
    let tool = program.display().to_string();
    let output = Command::new(program)
        .arg("-version")
        .stdin(Stdio::null())
        .output()
        .map_err(|e| NormalizeError::ToolMissing {
            tool: tool.clone(),
            detail: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(NormalizeError::ToolMissing {
            tool,
            detail: format!("-version exited with {}", output.status),
        });
    }

    debug!("已找到工具: {tool}");
    Ok(())
}

/// 執行前確認 ffmpeg 與 ffprobe 皆已安裝
pub fn check_media_tools(settings: &UserSettings) -> Result<(), NormalizeError> {
    for program in [&settings.ffmpeg_bin, &settings.ffprobe_bin] {
        if let Err(e) = check_tool(program) {
            error!("{e}");
            return Err(e);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_missing_tool_is_fatal() {
        let err = check_tool(Path::new("/definitely/not/here/ffmpeg")).unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, NormalizeError::ToolMissing { .. }));
    }

    #[test]
    fn test_check_media_tools_reports_first_missing() {
        let settings = UserSettings {
            ffmpeg_bin: PathBuf::from("/definitely/not/here/ffmpeg"),
            ..UserSettings::default()
        };
        match check_media_tools(&settings) {
            Err(NormalizeError::ToolMissing { tool, .. }) => {
                assert_eq!(tool, "/definitely/not/here/ffmpeg");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
