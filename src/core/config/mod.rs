pub mod data;
pub mod io;
pub mod printing;


pub use data::{Config, SettingError, Settings, TypewriterSettings};
pub use io::ConfigError;
