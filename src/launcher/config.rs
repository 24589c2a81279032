/*!
 * Application Description
 * JSON description of libraries, search paths and activities
 */

use crate::activity::ExecutionMode;
use crate::core::errors::{LauncherError, LauncherResult};
use crate::scheduler::SchedulePolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub name: String,
    pub profiling: bool,
    pub libraries: Vec<LibraryConfig>,
    /// Directories searched for libraries without an explicit path
    pub library_paths: Vec<PathBuf>,
    pub resource_paths: Vec<PathBuf>,
    /// New name -> existing component name
    pub aliases: BTreeMap<String, String>,
    pub activities: Vec<ActivityConfig>,

    /// Directory relative paths are resolved against
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityConfig {
    pub mode: ExecutionMode,
    pub schedule: SchedulePolicy,
    pub components: Vec<ComponentConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentConfig {
    /// Registered component (spec) name
    pub component: String,
    /// Instance name; defaults to the component name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub peers: Vec<ComponentConfig>,
}

impl ComponentConfig {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            name: None,
            peers: Vec::new(),
        }
    }

    pub fn instance_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.component)
    }
}

impl AppConfig {
    pub fn from_json(json: &str) -> LauncherResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a description; relative paths inside resolve against its directory
    pub fn from_file(path: impl AsRef<Path>) -> LauncherResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| LauncherError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::from_json(&json)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Starting point listing every component of a library in one activity
    pub fn skeleton<I>(library: &str, components: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut components: Vec<ComponentConfig> = components.into_iter().map(ComponentConfig::new).collect();
        components.sort_by(|a, b| a.component.cmp(&b.component));

        Self {
            name: library.to_string(),
            libraries: vec![LibraryConfig {
                name: library.to_string(),
                path: None,
            }],
            activities: vec![ActivityConfig {
                mode: ExecutionMode::Dedicated,
                schedule: SchedulePolicy::periodic(100),
                components,
            }],
            ..Self::default()
        }
    }

    pub fn to_json(&self) -> LauncherResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{RealtimePolicy, TimingMode};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_full_description() {
        let config = AppConfig::from_json(
            r#"{
                "name": "echo_app",
                "profiling": true,
                "libraries": [{"name": "echo", "path": "build"}],
                "library_paths": ["/opt/rtgraph"],
                "aliases": {"Repeater": "Echo"},
                "activities": [{
                    "mode": "parallel",
                    "schedule": {"timing_mode": "hard", "period_ms": 10, "realtime": "fifo", "priority": 80},
                    "components": [
                        {"component": "Echo", "name": "echo1", "peers": [{"component": "Logger"}]}
                    ]
                }]
            }"#,
        )
        .unwrap();

        assert_eq!(config.name, "echo_app");
        assert!(config.profiling);
        assert_eq!(config.libraries[0].path, Some(PathBuf::from("build")));
        assert_eq!(config.aliases.get("Repeater").map(String::as_str), Some("Echo"));

        let activity = &config.activities[0];
        assert_eq!(activity.mode, ExecutionMode::Dedicated);
        assert_eq!(activity.schedule.timing_mode, TimingMode::Hard);
        assert_eq!(activity.schedule.realtime, RealtimePolicy::Fifo);

        let echo = &activity.components[0];
        assert_eq!(echo.instance_name(), "echo1");
        assert_eq!(echo.peers[0].instance_name(), "Logger");
    }

    #[test]
    fn test_relative_paths_follow_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("app.json");
        std::fs::write(&file, r#"{"resource_paths": ["data"]}"#).unwrap();

        let config = AppConfig::from_file(&file).unwrap();
        assert_eq!(config.resolve(&config.resource_paths[0]), dir.path().join("data"));
        assert_eq!(config.resolve(Path::new("/abs")), PathBuf::from("/abs"));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(AppConfig::from_json("{"), Err(LauncherError::Config(_))));
        assert!(matches!(
            AppConfig::from_file("/nonexistent/app.json"),
            Err(LauncherError::Io { .. })
        ));
    }

    #[test]
    fn test_skeleton_round_trips() {
        let skeleton = AppConfig::skeleton("echo", vec!["B".to_string(), "A".to_string()]);
        let parsed = AppConfig::from_json(&skeleton.to_json().unwrap()).unwrap();
        assert_eq!(parsed, skeleton);
        assert_eq!(parsed.activities[0].components[0].component, "A");
    }
}
