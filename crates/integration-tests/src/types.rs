//! Types for declarative scenario fixtures

use crate::action::ActionSpec;
use crate::app::LaunchScreen;
use crate::environment::StorageFile;
use cadence_core::{Collection, Expectation, Field, Predicate};
use serde::{Deserialize, Serialize};

/// Complete end-to-end scenario
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Scenario {
    /// Scenario name
    pub name: String,
    /// Description of what this scenario tests
    pub description: String,
    /// Initial setup before scenario runs
    #[serde(default)]
    pub setup: ScenarioSetup,
    /// Ordered list of steps to execute
    pub steps: Vec<ScenarioStep>,
}

/// Initial setup for a scenario
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ScenarioSetup {
    /// Screen the app starts on
    #[serde(default)]
    pub launch: LaunchScreen,
    /// Files to create on external storage before the app starts
    #[serde(default)]
    pub storage_files: Vec<StorageFile>,
}

/// A single step in the scenario
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScenarioStep {
    /// Perform one UI gesture; the driver settles once at the end
    Actions {
        /// Actions making up the gesture
        actions: Vec<ActionSpec>,
    },
    /// Wait for records to appear or disappear
    Await {
        /// Collection to poll
        collection: Collection,
        /// Records of interest
        #[serde(rename = "where")]
        predicate: Predicate,
        /// State to wait for
        expect: Expectation,
    },
    /// Wait for an exact number of matching records
    AwaitCount {
        /// Collection to poll
        collection: Collection,
        /// Records of interest
        #[serde(rename = "where", default = "Predicate::all")]
        predicate: Predicate,
        /// Number of records expected
        count: usize,
    },
    /// Query once and compare names
    Observe {
        /// Collection to query
        collection: Collection,
        /// Records of interest
        #[serde(rename = "where", default = "Predicate::all")]
        predicate: Predicate,
        /// Sort column
        #[serde(default)]
        order_by: Option<Field>,
        /// Names expected, in order
        expected: Vec<String>,
    },
    /// Queue playlist inserts directly against the store, in order
    SeedPlaylists {
        /// Playlist names
        names: Vec<String>,
    },
    /// Copy a file within external storage
    CopyFile {
        /// Source path relative to external storage
        from: String,
        /// Destination path relative to external storage
        to: String,
    },
    /// Check whether a file exists on external storage
    AssertFile {
        /// Path relative to external storage
        path: String,
        /// Whether the file should exist
        exists: bool,
    },
    /// Ask the media scanner to rescan external storage
    Rescan,
    /// Delete matching records from the store
    Cleanup {
        /// Collection to clean
        collection: Collection,
        /// Records to delete
        #[serde(rename = "where")]
        predicate: Predicate,
    },
}
