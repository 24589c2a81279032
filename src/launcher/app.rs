/*!
 * Launcher
 * Builds an application graph from an [`AppConfig`] and drives its lifecycle
 */

use super::config::{AppConfig, ComponentConfig, LibraryConfig};
use crate::activity::{Activity, ExecutionMode};
use crate::core::errors::{LauncherError, LauncherResult};
use crate::execution::ExecutionEngine;
use crate::monitoring::GraphSnapshot;
use crate::registry::ComponentRegistry;
use crate::task::TaskContext;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub struct Launcher {
    registry: Arc<ComponentRegistry>,
    config: AppConfig,
    activities: Vec<Arc<Activity>>,
    engines: Vec<Arc<ExecutionEngine>>,
    /// Set by `kill_app`; activities are only started while it is false
    killed: Mutex<bool>,
}

impl Launcher {
    pub fn new(registry: Arc<ComponentRegistry>, config: AppConfig) -> Self {
        Self {
            registry,
            config,
            activities: Vec::new(),
            engines: Vec::new(),
            killed: Mutex::new(false),
        }
    }

    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn activities(&self) -> &[Arc<Activity>] {
        &self.activities
    }

    pub fn engines(&self) -> &[Arc<ExecutionEngine>] {
        &self.engines
    }

    /// Load libraries, instantiate tasks and assemble activities
    pub fn create_app(&mut self) -> LauncherResult<()> {
        info!(app = %self.config.name, "Creating application");

        if self.config.profiling {
            self.registry.enable_profiling(true);
        }

        let resources: Vec<PathBuf> = self
            .config
            .resource_paths
            .iter()
            .map(|dir| self.config.resolve(dir))
            .collect();
        if !resources.is_empty() {
            self.registry.set_resources_path(resources);
        }

        for library in &self.config.libraries {
            self.load_library(library)?;
        }

        for (new_name, old_name) in &self.config.aliases {
            self.registry.alias(new_name, old_name);
        }

        let configs = self.config.activities.clone();
        for config in configs {
            config.schedule.validate()?;

            let activity = Arc::new(Activity::new(config.schedule, config.mode));
            for component in &config.components {
                let task = self.instantiate(component, false)?;
                let engine = ExecutionEngine::new(task, Arc::clone(&self.registry));
                activity.add_runnable(engine.clone());
                self.engines.push(engine);
            }

            debug!(
                activity = activity.id(),
                mode = %activity.mode(),
                tasks = config.components.len(),
                "Activity assembled"
            );
            self.activities.push(activity);
        }

        info!(
            activities = self.activities.len(),
            tasks = self.engines.len(),
            "Application created"
        );
        Ok(())
    }

    /// Explicit path first, then every library path, then the bare name
    fn load_library(&self, library: &LibraryConfig) -> LauncherResult<()> {
        let mut candidates: Vec<Option<PathBuf>> = Vec::new();
        if let Some(path) = &library.path {
            candidates.push(Some(self.config.resolve(path)));
        }
        candidates.extend(
            self.config
                .library_paths
                .iter()
                .map(|dir| Some(self.config.resolve(dir))),
        );
        candidates.push(None);

        for dir in &candidates {
            if self.registry.add_library(&library.name, dir.as_deref()) {
                return Ok(());
            }
        }

        Err(LauncherError::Library(library.name.clone()))
    }

    /// Create the task of `config` and its peers; peers are never scheduled
    fn instantiate(&self, config: &ComponentConfig, peer: bool) -> LauncherResult<Arc<TaskContext>> {
        let instance = config.instance_name();
        let task = if peer {
            self.registry.create_peer(&config.component, instance)
        } else {
            self.registry.create(&config.component, instance)
        }
        .ok_or_else(|| LauncherError::UnknownComponent {
            component: config.component.clone(),
            instance: instance.to_string(),
        })?;

        for peer in &config.peers {
            let peer = self.instantiate(peer, true)?;
            task.add_peer(peer);
        }

        Ok(task)
    }

    /// Spawn every dedicated activity
    pub fn start_dedicated(&self) -> LauncherResult<()> {
        let killed = self.killed.lock();
        if *killed {
            warn!(app = %self.config.name, "Application was killed; not starting");
            return Ok(());
        }
        for activity in self.by_mode(ExecutionMode::Dedicated) {
            activity.start()?;
        }
        Ok(())
    }

    /// Run inline activities one after the other on the calling thread
    ///
    /// Returns once `kill_app` has stopped the running one; the remaining
    /// activities are skipped.
    pub fn run_inline(&self) -> LauncherResult<()> {
        for activity in self.by_mode(ExecutionMode::Inline) {
            {
                let killed = self.killed.lock();
                if *killed {
                    debug!(activity = activity.id(), "Skipping inline activity after kill");
                    break;
                }
                activity.arm_inline();
            }
            activity.drive_inline();
        }
        Ok(())
    }

    /// Start dedicated activities, then run inline ones (blocks while they run)
    pub fn start_app(&self) -> LauncherResult<()> {
        info!(app = %self.config.name, "Starting application");
        self.start_dedicated()?;
        self.run_inline()
    }

    /// Wait for every scheduled task to finish configuring
    pub fn wait_configured(&self, timeout: Duration) -> bool {
        let done = self.registry.wait_configured(timeout);
        if done {
            info!(tasks = self.registry.num_tasks(), "All tasks configured");
        } else {
            warn!(
                completed = self.registry.num_config_completed(),
                tasks = self.registry.num_tasks(),
                "Timed out waiting for task configuration"
            );
        }
        done
    }

    /// Stop every activity, then join the dedicated ones
    pub fn kill_app(&self) {
        info!(app = %self.config.name, "Stopping application");
        {
            let mut killed = self.killed.lock();
            *killed = true;
            for activity in &self.activities {
                activity.stop();
            }
        }
        for activity in &self.activities {
            if let Err(e) = activity.join() {
                error!(activity = activity.id(), error = %e, "Activity did not stop cleanly");
            }
        }
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot::capture(&self.registry, &self.activities)
    }

    fn by_mode(&self, mode: ExecutionMode) -> impl Iterator<Item = &Arc<Activity>> {
        self.activities.iter().filter(move |a| a.mode() == mode)
    }
}

impl Drop for Launcher {
    fn drop(&mut self) {
        for activity in &self.activities {
            activity.stop();
        }
    }
}
