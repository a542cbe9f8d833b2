//! Checkpointed sessions for resumable long-running conversions.
//!
//! A conversion is decomposed into stage boundaries (parse → classify →
//! mutate → augment → validate/generate). The [`CheckpointStore`] is the
//! only stateful shared resource in the system; it is keyed by operation
//! id, so operations with different ids never contend. A resumed
//! operation continues from the checkpointed tree and produces
//! byte-identical output to an uninterrupted run, because every stage is
//! a deterministic pure function of the tree.

use std::{
    collections::HashMap,
    fmt,
    sync::Mutex,
    time::{Duration, SystemTime},
};

use serde::{Deserialize, Serialize};

use scena_core::{diagnostic::Diagnostic, document::Document};

/// The last completed pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Parsed,
    Classified,
    Mutated,
    Augmented,
    Validated,
}

impl Stage {
    /// Percentage of the pipeline completed at this stage boundary.
    pub fn progress(&self) -> u8 {
        match self {
            Stage::Parsed => 20,
            Stage::Classified => 40,
            Stage::Mutated => 60,
            Stage::Augmented => 80,
            Stage::Validated => 100,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Parsed => "parsed",
            Stage::Classified => "classified",
            Stage::Mutated => "mutated",
            Stage::Augmented => "augmented",
            Stage::Validated => "validated",
        };
        write!(f, "{name}")
    }
}

/// What the operation is ultimately producing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Convert,
    Validate,
    Enhance { hint: Option<String> },
}

/// Richness bookkeeping carried by enhancement checkpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhanceStats {
    pub score_before: u8,
    pub score_after: u8,
    pub needs_rework: bool,
}

/// Persisted partial progress for one operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Unique key for the operation.
    pub operation_id: String,
    /// Human-readable project label.
    pub project_name: String,
    /// What the operation produces on completion.
    pub intent: Intent,
    /// Last completed stage.
    pub stage: Stage,
    /// Completion percentage, 0–100.
    pub progress: u8,
    /// The original input text, kept for the snapshot-before-mutate
    /// contract.
    pub snapshot: String,
    /// The tree as of the last stage boundary.
    pub partial_tree: Option<Document>,
    /// Accumulated change descriptions.
    pub changes: Vec<String>,
    /// Diagnostics accumulated by analysis stages.
    pub diagnostics: Vec<Diagnostic>,
    /// Richness bookkeeping, for enhancement operations.
    pub stats: Option<EnhanceStats>,
    /// When the checkpoint was created.
    pub created_at: SystemTime,
    /// When the checkpoint last advanced a stage.
    pub updated_at: SystemTime,
}

impl Checkpoint {
    /// Create a checkpoint for a freshly parsed operation.
    pub fn new(
        operation_id: impl Into<String>,
        project_name: impl Into<String>,
        intent: Intent,
        snapshot: impl Into<String>,
        tree: Document,
    ) -> Self {
        let now = SystemTime::now();
        Self {
            operation_id: operation_id.into(),
            project_name: project_name.into(),
            intent,
            stage: Stage::Parsed,
            progress: Stage::Parsed.progress(),
            snapshot: snapshot.into(),
            partial_tree: Some(tree),
            changes: Vec::new(),
            diagnostics: Vec::new(),
            stats: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a completed stage boundary.
    pub fn advance(&mut self, stage: Stage) {
        self.stage = stage;
        self.progress = stage.progress();
        self.updated_at = SystemTime::now();
    }

    /// Age of the checkpoint since creation.
    pub fn age(&self) -> Duration {
        SystemTime::now()
            .duration_since(self.created_at)
            .unwrap_or(Duration::ZERO)
    }
}

/// The keyed, mutex-guarded checkpoint store.
///
/// Supports create-if-absent, read, update-at-stage-boundary, delete, and
/// a bulk sweep of entries older than a given age.
#[derive(Debug, Default)]
pub struct CheckpointStore {
    entries: Mutex<HashMap<String, Checkpoint>>,
}

impl CheckpointStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a checkpoint unless one already exists for its operation.
    ///
    /// Returns `false` when an entry was already present.
    pub fn create_if_absent(&self, checkpoint: Checkpoint) -> bool {
        let mut entries = self.lock();
        if entries.contains_key(&checkpoint.operation_id) {
            return false;
        }
        entries.insert(checkpoint.operation_id.clone(), checkpoint);
        true
    }

    /// Read a checkpoint by operation id.
    pub fn get(&self, operation_id: &str) -> Option<Checkpoint> {
        self.lock().get(operation_id).cloned()
    }

    /// Upsert a checkpoint at a stage boundary.
    pub fn update(&self, checkpoint: Checkpoint) {
        self.lock()
            .insert(checkpoint.operation_id.clone(), checkpoint);
    }

    /// Remove a checkpoint. Returns whether an entry existed.
    pub fn remove(&self, operation_id: &str) -> bool {
        self.lock().remove(operation_id).is_some()
    }

    /// All live checkpoints, ordered by operation id.
    pub fn list(&self) -> Vec<Checkpoint> {
        let mut out: Vec<Checkpoint> = self.lock().values().cloned().collect();
        out.sort_by(|a, b| a.operation_id.cmp(&b.operation_id));
        out
    }

    /// Remove every checkpoint older than `max_age`, returning the
    /// removed operation ids in sorted order.
    pub fn sweep_older_than(&self, max_age: Duration) -> Vec<String> {
        let mut entries = self.lock();
        let mut removed: Vec<String> = entries
            .iter()
            .filter(|(_, cp)| cp.age() > max_age)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &removed {
            entries.remove(id);
        }
        removed.sort();
        removed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Checkpoint>> {
        self.entries.lock().expect("checkpoint store lock poisoned")
    }
}
