//! Scenario runner implementation

use crate::action::ActionDriver;
use crate::environment::TestEnvironment;
use crate::session::UiSession;
use crate::types::{Scenario, ScenarioStep};
use anyhow::{Context as _, Result, bail, ensure};
use cadence_core::{CadenceConfig, Clock, Collection, Predicate, WaitTier};
use cadence_mediastore::Mutation;
use serde_json::from_str;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::time::timeout;

/// Directory holding the JSON scenario fixtures.
pub fn scenarios_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("scenarios")
}

/// Suite configuration file. Missing means defaults; either way
/// `CADENCE_TIME_UNIT_MS` applies on top.
pub fn config_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("cadence.toml")
}

/// Scenario runner that executes end-to-end scenarios
#[derive(Debug)]
pub struct ScenarioRunner {
    scenario: Scenario,
    config: CadenceConfig,
}

impl ScenarioRunner {
    /// Load a scenario by name from the fixtures directory
    ///
    /// # Errors
    /// Returns error if scenario file cannot be loaded or parsed
    pub fn load(scenario_name: &str) -> Result<Self> {
        Self::from_path(&scenarios_dir().join(format!("{scenario_name}.json")))
    }

    /// Load a scenario from a JSON file, timed by the suite configuration
    /// at [`config_path`]
    ///
    /// # Errors
    /// Returns error if scenario file cannot be loaded or parsed
    pub fn from_path(scenario_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(scenario_path).with_context(|| {
            format!("Failed to read scenario file: {}", scenario_path.display())
        })?;
        let scenario: Scenario = from_str(&content)
            .with_context(|| format!("Failed to parse scenario: {}", scenario_path.display()))?;

        Ok(Self::new(scenario).with_config(CadenceConfig::load_or_default(&config_path())))
    }

    /// Runner for an already parsed scenario with default timing
    pub fn new(scenario: Scenario) -> Self {
        Self {
            scenario,
            config: CadenceConfig::default(),
        }
    }

    /// Replace the timing configuration
    #[must_use]
    pub fn with_config(mut self, config: CadenceConfig) -> Self {
        self.config = config;
        self
    }

    /// The loaded scenario
    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// Timing the scenario will run with
    pub fn config(&self) -> &CadenceConfig {
        &self.config
    }

    /// Run the scenario, stopping at the first failed step
    ///
    /// # Errors
    /// Returns error if any step fails
    pub async fn run(self) -> Result<()> {
        let environment = TestEnvironment::new(self.config.clone())?;
        environment
            .create_files(&self.scenario.setup.storage_files)
            .context("Failed to create storage files")?;

        let app = environment.launch_app(self.scenario.setup.launch);
        let session = UiSession::acquire(Arc::new(app));
        let driver = ActionDriver::new(
            &session,
            environment.clock().clone(),
            self.config.ui.clone(),
        );

        for (step_index, step) in self.scenario.steps.iter().enumerate() {
            tracing::info!("{} step {}: {}", self.scenario.name, step_index + 1, describe(step));
            self.execute_step(&environment, &driver, step)
                .await
                .with_context(|| {
                    format!(
                        "Failed to execute step {} in scenario '{}'",
                        step_index + 1,
                        self.scenario.name
                    )
                })?;
        }

        tracing::info!("{} passed", self.scenario.name);
        Ok(())
    }

    /// Execute a single scenario step
    ///
    /// # Errors
    /// Returns error if step execution or its assertion fails
    async fn execute_step(
        &self,
        environment: &TestEnvironment,
        driver: &ActionDriver<'_>,
        step: &ScenarioStep,
    ) -> Result<()> {
        match step {
            ScenarioStep::Actions { actions } => driver.perform_sequence(actions).await?,
            ScenarioStep::Await {
                collection,
                predicate,
                expect,
            } => {
                environment
                    .poller(*collection)?
                    .await_state(predicate, *expect)
                    .await?
                    .ensure(format!("{collection} where {predicate} {expect}"))?;
            }
            ScenarioStep::AwaitCount {
                collection,
                predicate,
                count,
            } => {
                environment
                    .poller(*collection)?
                    .await_count(predicate, *count)
                    .await?
                    .ensure(format!("{count} {collection} where {predicate}"))?;
            }
            ScenarioStep::Observe {
                collection,
                predicate,
                order_by,
                expected,
            } => {
                let observed = environment
                    .poller(*collection)?
                    .observe(predicate, *order_by)?
                    .into_names();
                ensure!(
                    observed == *expected,
                    "{collection} where {predicate}: expected {expected:?}, observed {observed:?}"
                );
            }
            ScenarioStep::SeedPlaylists { names } => {
                for name in names {
                    environment
                        .writer()
                        .submit(Mutation::InsertPlaylist { name: name.clone() })?;
                }
            }
            ScenarioStep::CopyFile { from, to } => {
                let source = environment.resolve(from);
                let destination = environment.resolve(to);
                fs::copy(&source, &destination).with_context(|| {
                    format!("Failed to copy {} to {}", source.display(), destination.display())
                })?;
            }
            ScenarioStep::AssertFile { path, exists } => {
                let actual = probe_file(environment.clock(), &environment.resolve(path)).await;
                if actual != *exists {
                    bail!("expected {path} to {}exist", if *exists { "" } else { "not " });
                }
            }
            ScenarioStep::Rescan => rescan(environment).await,
            ScenarioStep::Cleanup {
                collection,
                predicate,
            } => cleanup(environment, *collection, predicate).await?,
        }
        Ok(())
    }
}

/// Whether `path` exists. An existing file is checked again after a long
/// wait, since a pending delete may still remove it.
pub async fn probe_file(clock: &Clock, path: &Path) -> bool {
    if path.exists() {
        clock.sleep(WaitTier::Long).await;
    }
    path.exists()
}

/// Broadcast a media mount and wait, at most a very long wait, for the
/// scanner to report. A missing report is logged, not fatal.
pub async fn rescan(environment: &TestEnvironment) {
    let scanner = environment.scanner();
    let mut finished = scanner.subscribe();
    scanner.broadcast_mounted();

    let patience = environment.clock().tiers().duration(WaitTier::VeryLong);
    match timeout(patience, finished.recv()).await {
        Ok(Ok(report)) => tracing::info!(
            "scanner finished {} ({} track(s))",
            report.root.display(),
            report.tracks
        ),
        Ok(Err(error)) => tracing::warn!("scanner completion lost: {error}"),
        Err(_) => tracing::warn!("scanner did not finish within {patience:?}"),
    }
}

/// Delete matching records and wait for the delete to land.
///
/// # Errors
/// Returns error if the writer has stopped
pub async fn cleanup(
    environment: &TestEnvironment,
    collection: Collection,
    predicate: &Predicate,
) -> Result<()> {
    environment.writer().submit(Mutation::Delete {
        collection,
        predicate: predicate.clone(),
    })?;
    environment.writer().flush().await?;
    Ok(())
}

fn describe(step: &ScenarioStep) -> String {
    match step {
        ScenarioStep::Actions { actions } => format!("{} action(s)", actions.len()),
        ScenarioStep::Await {
            collection,
            predicate,
            expect,
        } => format!("await {collection} where {predicate} {expect}"),
        ScenarioStep::AwaitCount {
            collection, count, ..
        } => format!("await {count} {collection}"),
        ScenarioStep::Observe { collection, .. } => format!("observe {collection}"),
        ScenarioStep::SeedPlaylists { names } => format!("seed {} playlist(s)", names.len()),
        ScenarioStep::CopyFile { from, to } => format!("copy {from} -> {to}"),
        ScenarioStep::AssertFile { path, exists } => format!("file {path} exists={exists}"),
        ScenarioStep::Rescan => "rescan external storage".to_owned(),
        ScenarioStep::Cleanup { collection, .. } => format!("cleanup {collection}"),
    }
}
