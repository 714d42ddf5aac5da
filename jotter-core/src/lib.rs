//! Shared configuration and path resolution for jotter.

pub mod config;
pub mod paths;

pub use config::{
    Config, ConfigError, KnowledgeSettings, LoggingSettings, MigrateSettings, NotesSettings,
    SearchSettings, Settings, SettingsError, load_dotenv,
};
pub use paths::{HostDirs, PathError, ResolvedRoot, RootSource};
