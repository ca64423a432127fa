pub mod file_type;
pub mod load;
pub mod save;
pub mod types;

pub use types::{Config, EncodingSettings, Language, MediaExtensionTable, UserSettings};
