//! Scena - transformation and static validation for declarative motion
//! composition documents.
//!
//! A composition document describes a tree of nested, attributed visual
//! elements animated off a single timeline clock. This crate parses such
//! documents into a typed tree, runs semantics-aware rewrite passes over
//! the tree, statically validates the result across five diagnostic
//! layers, and regenerates text. Long conversions checkpoint at stage
//! boundaries and resume deterministically.
//!
//! The [`Studio`] facade exposes the public operations:
//!
//! ```
//! use scena::{Studio, config::AppConfig};
//!
//! let studio = Studio::new(AppConfig::default());
//!
//! let report = studio
//!     .validate("<composition><title>Hi</title></composition>")
//!     .expect("document parses");
//! assert!(report.is_valid());
//!
//! let conversion = studio
//!     .convert("<composition><title>Hi</title></composition>")
//!     .expect("conversion succeeds");
//! assert!(conversion.text.contains("<title>"));
//! ```

pub mod config;
pub mod generate;
pub mod motion;
pub mod mutate;
pub mod richness;
pub mod select;
pub mod session;
pub mod transitions;
pub mod validate;

mod error;

pub use scena_core::{diagnostic, document, identifier, role, span, timeline};
pub use scena_parser::{ParseError, parse};

pub use error::ScenaError;

use std::{
    hash::{DefaultHasher, Hash, Hasher},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Instant,
};

use log::{debug, info};

use scena_core::{diagnostic::ValidationReport, document::Document};

use config::AppConfig;
use session::{Checkpoint, CheckpointStore, EnhanceStats, Intent, Stage};

/// The result of a conversion operation.
#[derive(Debug, Clone)]
pub struct Conversion {
    /// Operation id, usable with [`Studio::resume`] bookkeeping.
    pub operation_id: String,
    /// The regenerated composition text.
    pub text: String,
    /// The original input text, for caller-side retention.
    pub snapshot: String,
    /// Human-readable change descriptions.
    pub changes: Vec<String>,
    /// The final validation report.
    pub report: ValidationReport,
}

/// The result of an enhancement operation.
#[derive(Debug, Clone)]
pub struct Enhancement {
    pub operation_id: String,
    /// The regenerated composition text.
    pub text: String,
    /// The original input text, for caller-side retention.
    pub snapshot: String,
    /// Human-readable change descriptions.
    pub changes: Vec<String>,
    /// Residual transition defects plus the final validation report.
    pub report: ValidationReport,
    /// Richness score before augmentation.
    pub score_before: u8,
    /// Richness score after augmentation.
    pub score_after: u8,
    /// The content still needs non-automatic rework.
    pub needs_rework: bool,
}

/// The outcome of resuming an interrupted operation: the same shape the
/// original call would have produced.
#[derive(Debug, Clone)]
pub enum Resumed {
    Converted(Conversion),
    Validated(ValidationReport),
    Enhanced(Enhancement),
}

/// The informational result of a cancellation. Cancelling twice, or
/// cancelling an unknown operation, degrades to a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cancellation {
    pub operation_id: String,
    /// Whether a checkpoint actually existed.
    pub removed: bool,
}

/// The pipeline facade: parsing, rewriting, validation, generation, and
/// checkpointed sessions behind one API.
///
/// All tree work is synchronous and side-effect-free; the only shared
/// state is the checkpoint store, which is keyed by operation id.
pub struct Studio {
    config: AppConfig,
    store: Arc<CheckpointStore>,
    op_counter: AtomicU64,
}

impl Default for Studio {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

impl Studio {
    /// Create a studio with the given configuration and a fresh
    /// checkpoint store.
    pub fn new(config: AppConfig) -> Self {
        Self::with_store(config, Arc::new(CheckpointStore::new()))
    }

    /// Create a studio sharing an existing checkpoint store.
    pub fn with_store(config: AppConfig, store: Arc<CheckpointStore>) -> Self {
        Self {
            config,
            store,
            op_counter: AtomicU64::new(0),
        }
    }

    /// The studio's configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The shared checkpoint store.
    pub fn store(&self) -> Arc<CheckpointStore> {
        self.store.clone()
    }

    /// Convert a composition document: rewrite collection builders into
    /// timeline-driven generators, validate, and regenerate text.
    ///
    /// # Errors
    ///
    /// Returns [`ScenaError::Parse`] for malformed input,
    /// [`ScenaError::ResumableTimeout`] when the stage budget expires, and
    /// [`ScenaError::Validation`] under strict validation.
    pub fn convert(&self, source: &str) -> Result<Conversion, ScenaError> {
        match self.begin(Intent::Convert, source)? {
            Resumed::Converted(conversion) => Ok(conversion),
            _ => Err(ScenaError::System(
                "conversion produced an unexpected outcome".to_string(),
            )),
        }
    }

    /// Run the five-layer validation pipeline over a document.
    ///
    /// Critical diagnostics are reported, not thrown: the caller decides
    /// whether to accept the document.
    pub fn validate(&self, source: &str) -> Result<ValidationReport, ScenaError> {
        // A parse failure is still a report here, matching the pipeline's
        // layer-1 short-circuit.
        if let Err(err) = scena_parser::parse(source) {
            return Ok(ValidationReport::new(err.into_diagnostics()));
        }
        match self.begin(Intent::Validate, source)? {
            Resumed::Validated(report) => Ok(report),
            _ => Err(ScenaError::System(
                "validation produced an unexpected outcome".to_string(),
            )),
        }
    }

    /// Enhance a document: repair transition defects, augment low-richness
    /// content keyed to `project_hint`, validate, and regenerate text.
    pub fn enhance(
        &self,
        source: &str,
        project_hint: Option<&str>,
    ) -> Result<Enhancement, ScenaError> {
        let intent = Intent::Enhance {
            hint: project_hint.map(str::to_string),
        };
        match self.begin(intent, source)? {
            Resumed::Enhanced(enhancement) => Ok(enhancement),
            _ => Err(ScenaError::System(
                "enhancement produced an unexpected outcome".to_string(),
            )),
        }
    }

    /// Resume an interrupted operation from its checkpoint.
    ///
    /// Given the same original text, the final output is byte-identical
    /// to an uninterrupted run.
    pub fn resume(&self, operation_id: &str) -> Result<Resumed, ScenaError> {
        if self.store.get(operation_id).is_none() {
            return Err(ScenaError::UnknownOperation(operation_id.to_string()));
        }
        info!(operation = operation_id; "Resuming operation");
        self.run_stages(operation_id, 0)
    }

    /// Checkpoints of every interrupted operation.
    pub fn list_interrupted(&self) -> Vec<Checkpoint> {
        self.store.list()
    }

    /// Cancel an operation, removing its checkpoint. Idempotent.
    pub fn cancel(&self, operation_id: &str) -> Cancellation {
        let removed = self.store.remove(operation_id);
        info!(operation = operation_id, removed = removed; "Cancelled operation");
        Cancellation {
            operation_id: operation_id.to_string(),
            removed,
        }
    }

    /// Remove checkpoints older than the configured TTL, returning the
    /// swept operation ids.
    pub fn sweep_stale(&self) -> Vec<String> {
        self.store
            .sweep_older_than(self.config.session().checkpoint_ttl())
    }

    fn begin(&self, intent: Intent, source: &str) -> Result<Resumed, ScenaError> {
        let operation_id = self.next_operation_id(source);
        let doc = scena_parser::parse(source)
            .map_err(|err| ScenaError::new_parse_error(err, source))?;
        let project = project_name(&doc, &intent);
        info!(
            operation = operation_id,
            project = project,
            intent:? = intent;
            "Pipeline started"
        );
        let checkpoint = Checkpoint::new(operation_id.as_str(), project, intent, source, doc);
        self.store.create_if_absent(checkpoint);
        // Parsing counts as the first completed stage of this invocation.
        self.run_stages(&operation_id, 1)
    }

    /// Drive the stage machine until completion or budget expiry.
    ///
    /// At least one stage always completes per invocation, so a
    /// zero-budget caller still makes progress on every resume.
    fn run_stages(&self, operation_id: &str, mut stages_done: usize) -> Result<Resumed, ScenaError> {
        let started = Instant::now();
        let budget = self.config.session().stage_budget();

        loop {
            let mut checkpoint = self
                .store
                .get(operation_id)
                .ok_or_else(|| ScenaError::UnknownOperation(operation_id.to_string()))?;

            if stages_done > 0 {
                if let Some(budget) = budget {
                    if started.elapsed() >= budget {
                        debug!(
                            operation = operation_id,
                            stage:? = checkpoint.stage;
                            "Stage budget expired; checkpoint persisted"
                        );
                        return Err(ScenaError::ResumableTimeout {
                            operation_id: operation_id.to_string(),
                        });
                    }
                }
            }

            let mut doc = checkpoint.partial_tree.take().ok_or_else(|| {
                ScenaError::System(format!(
                    "checkpoint for `{operation_id}` is missing its partial tree"
                ))
            })?;

            match checkpoint.stage {
                Stage::Parsed => {
                    if !matches!(checkpoint.intent, Intent::Validate) {
                        let changes = motion::rewrite_collections(&mut doc);
                        checkpoint.changes.extend(changes);
                    }
                    checkpoint.partial_tree = Some(doc);
                    checkpoint.advance(Stage::Classified);
                }
                Stage::Classified => {
                    if matches!(checkpoint.intent, Intent::Enhance { .. }) {
                        let policy = self.config.transitions();
                        let (_, fixes) = transitions::apply_fixes(&mut doc, policy);
                        checkpoint.changes.extend(fixes);
                        let residual = transitions::analyze(&doc, policy);
                        checkpoint
                            .diagnostics
                            .extend(transitions::defects_to_diagnostics(&residual, policy));
                    }
                    checkpoint.partial_tree = Some(doc);
                    checkpoint.advance(Stage::Mutated);
                }
                Stage::Mutated => {
                    if let Intent::Enhance { hint } = &checkpoint.intent {
                        let hint = hint.clone();
                        let before = richness::score(&doc).total();
                        if before < self.config.richness().augment_threshold {
                            let changes = richness::augment(&mut doc, hint.as_deref());
                            checkpoint.changes.extend(changes);
                        }
                        let after = richness::score(&doc).total();
                        checkpoint.stats = Some(EnhanceStats {
                            score_before: before,
                            score_after: after,
                            needs_rework: after < self.config.richness().accept_threshold,
                        });
                    }
                    checkpoint.partial_tree = Some(doc);
                    checkpoint.advance(Stage::Augmented);
                }
                Stage::Augmented => {
                    let result = self.finalize(&checkpoint, doc);
                    self.store.remove(operation_id);
                    if result.is_ok() {
                        info!(operation = operation_id; "Pipeline completed");
                    }
                    return result;
                }
                Stage::Validated => {
                    return Err(ScenaError::System(format!(
                        "operation `{operation_id}` already completed"
                    )));
                }
            }

            self.store.update(checkpoint);
            stages_done += 1;
        }
    }

    /// Validate and assemble the final outcome. The validation pipeline
    /// always runs before any text is returned as final.
    fn finalize(&self, checkpoint: &Checkpoint, doc: Document) -> Result<Resumed, ScenaError> {
        let options = &self.config.validation().options;
        match &checkpoint.intent {
            Intent::Validate => {
                let report = validate::validate_document(&doc, &checkpoint.snapshot, options);
                Ok(Resumed::Validated(report))
            }
            Intent::Convert => {
                let text = generate::generate(&doc);
                let report = validate::validate_text(&text, options);
                if self.config.validation().strict && !report.is_valid() {
                    return Err(ScenaError::Validation { report });
                }
                Ok(Resumed::Converted(Conversion {
                    operation_id: checkpoint.operation_id.clone(),
                    text,
                    snapshot: checkpoint.snapshot.clone(),
                    changes: checkpoint.changes.clone(),
                    report,
                }))
            }
            Intent::Enhance { .. } => {
                let text = generate::generate(&doc);
                let mut report = ValidationReport::new(checkpoint.diagnostics.clone());
                report.extend(
                    validate::validate_text(&text, options)
                        .diagnostics()
                        .iter()
                        .cloned(),
                );
                if self.config.validation().strict && !report.is_valid() {
                    return Err(ScenaError::Validation { report });
                }
                let stats = checkpoint.stats.unwrap_or(EnhanceStats {
                    score_before: 0,
                    score_after: 0,
                    needs_rework: true,
                });
                Ok(Resumed::Enhanced(Enhancement {
                    operation_id: checkpoint.operation_id.clone(),
                    text,
                    snapshot: checkpoint.snapshot.clone(),
                    changes: checkpoint.changes.clone(),
                    report,
                    score_before: stats.score_before,
                    score_after: stats.score_after,
                    needs_rework: stats.needs_rework,
                }))
            }
        }
    }

    fn next_operation_id(&self, source: &str) -> String {
        let n = self.op_counter.fetch_add(1, Ordering::Relaxed) + 1;
        let mut hasher = DefaultHasher::new();
        source.hash(&mut hasher);
        format!("op{n:04}-{:08x}", hasher.finish() as u32)
    }
}

/// Derive a project label from the hint, the root id, or the root tag.
fn project_name(doc: &Document, intent: &Intent) -> String {
    if let Intent::Enhance { hint: Some(hint) } = intent {
        return hint.clone();
    }
    doc.root()
        .id_attr()
        .map(str::to_string)
        .unwrap_or_else(|| doc.root().tag().to_string())
}
