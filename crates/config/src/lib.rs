// Configuration loading

pub mod error;
pub mod settings;

pub use error::ConfigError;
pub use settings::{
    CompareSettings, ConfigSource, CONFIG_ENV, RemoteSettings, RenameSettings, Settings, SheetFormat, SheetSettings,
};
