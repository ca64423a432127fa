mod ffmpeg_command;
mod ffprobe_info;
mod file_scanner;
mod path_validator;
mod tool_checker;

pub use ffmpeg_command::{FfmpegCommand, file_url};
pub use ffprobe_info::probe_duration;
pub use file_scanner::{FileEntry, FileScanner, WalkEvent, WalkFailure};
pub use path_validator::{
    append_suffix, ensure_directory_exists, relative_to_root, validate_directory_exists,
};
pub use tool_checker::{check_media_tools, check_tool};
