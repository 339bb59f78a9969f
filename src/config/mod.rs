pub mod env;
mod loader;

pub use env::{AppConfig, ClassifierConfig, DirectoryConfig};
pub use loader::load_config;
