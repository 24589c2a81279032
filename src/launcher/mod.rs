/*!
 * Launcher Module
 * Application description and graph assembly
 */

pub mod config;
mod app;

pub use config::{ActivityConfig, AppConfig, ComponentConfig, LibraryConfig};
pub use app::Launcher;
