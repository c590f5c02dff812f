pub mod config;
pub mod error;
pub mod load;
pub mod merge;
pub mod validate;

pub use config::{Config, LogConfig, LogLevel, PollConfig, ProjectConfig, ServerConfig};
pub use error::{ConfigError, FieldError};
pub use load::{load_config, load_from_file, load_from_str};
pub use validate::validate;
