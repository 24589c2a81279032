/*!
 * Error Types
 * Centralized error handling with thiserror and miette
 */

use crate::core::types::CoreId;
use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Real-time scheduling setup errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ScheduleError {
    #[error("Failed to set affinity on cores {cores:?}: {reason}")]
    #[diagnostic(
        code(schedule::affinity_failed),
        help("Check that the requested cores exist and are allowed for this process (cgroups/cpusets).")
    )]
    AffinityFailed { cores: Vec<CoreId>, reason: String },

    #[error("Core {0} cannot be represented in a CPU set")]
    #[diagnostic(code(schedule::invalid_core))]
    InvalidCore(CoreId),

    #[error("Failed to apply {policy} scheduling: {reason}")]
    #[diagnostic(
        code(schedule::policy_failed),
        help("Real-time policies require CAP_SYS_NICE or an adequate RLIMIT_RTPRIO.")
    )]
    PolicyFailed { policy: String, reason: String },

    #[error("Invalid schedule policy: {0}")]
    #[diagnostic(code(schedule::invalid_policy))]
    InvalidPolicy(String),
}

/// Activity lifecycle errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ActivityError {
    #[error("Failed to spawn thread for activity {id}: {reason}")]
    #[diagnostic(code(activity::spawn_failed))]
    SpawnFailed { id: u32, reason: String },

    #[error("Activity {0} thread panicked")]
    #[diagnostic(
        code(activity::panicked),
        help("A runnable panicked inside init/step/finalize. See the log for the panic message.")
    )]
    Panicked(u32),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Schedule(#[from] ScheduleError),
}

/// Dynamic module loading errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum LibraryError {
    #[error("Library file not found: {0}")]
    #[diagnostic(code(library::not_found), help("Check the library name and search paths."))]
    NotFound(PathBuf),

    #[error("Error opening library {path}: {reason}")]
    #[diagnostic(code(library::open_failed))]
    OpenFailed { path: PathBuf, reason: String },

    #[error("Library {path} does not export {symbol}")]
    #[diagnostic(
        code(library::missing_symbol),
        help("Component modules must invoke `rtgraph::export_module!`.")
    )]
    MissingSymbol { path: PathBuf, symbol: String },
}

/// Application launcher errors
#[derive(Error, Debug, Diagnostic)]
pub enum LauncherError {
    #[error("Failed to read configuration {path}: {source}")]
    #[diagnostic(code(launcher::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    #[diagnostic(code(launcher::config), help("The application description must be valid JSON."))]
    Config(#[from] serde_json::Error),

    #[error("Unknown component {component} for instance {instance}")]
    #[diagnostic(
        code(launcher::unknown_component),
        help("Load the library providing the component or register an alias.")
    )]
    UnknownComponent { component: String, instance: String },

    #[error("Library {0} could not be loaded from any search path")]
    #[diagnostic(code(launcher::library))]
    Library(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Activity(#[from] ActivityError),
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;
pub type ActivityResult<T> = Result<T, ActivityError>;
pub type LibraryResult<T> = Result<T, LibraryError>;
pub type LauncherResult<T> = Result<T, LauncherError>;
