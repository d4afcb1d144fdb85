//! Two-phase unique-field normalization sweep
//!
//! The sweep MUST follow:
//!
//! 1. Find forms with a top-level unique field and fix each one
//! 2. Find forms not yet fixed whose unique field sits one grouping level
//!    down (column cells, row cells, component groups) and fix each one
//!
//! Fixing a form:
//!
//! 1. Collect the data path of every unique field
//! 2. Snapshot the form's records
//! 3. Issue one partial update per record whose values need lowercasing,
//!    at most `worker_limit` at a time
//! 4. Mark the form fixed
//!
//! A form is marked only after every one of its records was handled. A
//! failed update stops the run unless `continue_on_error` is set; updates
//! already handed to the store are always awaited.

use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{NormalizeError, NormalizeResult};
use super::progress::{AbortHandle, FixedForms, NormalizeReport, RecordFailure};
use super::rewrite::{plan_rewrite, unique_paths};
use crate::form::Form;
use crate::observability::{Event, Logger, ObservationScope};
use crate::store::{Cursor, FormSource, PartialUpdate, Query, RecordStore, StoreError};

fn default_worker_limit() -> usize {
    8
}

/// Normalizer settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Concurrent record updates per form
    #[serde(default = "default_worker_limit")]
    pub worker_limit: usize,
    /// Record update failures are collected instead of ending the run
    #[serde(default)]
    pub continue_on_error: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            worker_limit: default_worker_limit(),
            continue_on_error: false,
        }
    }
}

impl NormalizerConfig {
    /// `worker_limit`, never less than one.
    pub fn effective_worker_limit(&self) -> usize {
        self.worker_limit.max(1)
    }
}

/// Forms declaring a unique field at the top level.
pub fn top_level_unique_query() -> Query {
    unique_child()
}

/// Forms outside `fixed` with a unique field one grouping level down.
pub fn nested_unique_query(fixed: &FixedForms) -> Query {
    Query::and(vec![
        Query::not_in("_id", fixed.to_values()),
        Query::or(vec![
            Query::elem_match("components", Query::elem_match("columns", unique_child())),
            Query::elem_match("components", Query::elem_match("rows", unique_child())),
            Query::elem_match("components", unique_child()),
        ]),
    ])
}

fn unique_child() -> Query {
    Query::elem_match("components", Query::eq("unique", Value::Bool(true)))
}

enum Outcome {
    Rewritten,
    Vanished,
    Skipped,
    Failed(StoreError),
}

/// Rewrites stored unique values into lowercase.
#[derive(Debug, Default)]
pub struct Normalizer {
    config: NormalizerConfig,
    abort: AbortHandle,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self {
            config,
            abort: AbortHandle::new(),
        }
    }

    /// Handle that stops this normalizer between records.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Runs both phases over every form of `forms`.
    ///
    /// # Errors
    ///
    /// - `NormalizeError::Store`: a form query, record scan or (fail-fast)
    ///   record update failed
    /// - `NormalizeError::Aborted`: the abort handle was raised
    pub async fn run<F, S>(&self, forms: &F, store: &S) -> NormalizeResult<NormalizeReport>
    where
        F: FormSource,
        S: RecordStore,
    {
        let worker_limit = self.config.effective_worker_limit().to_string();
        let continue_on_error = self.config.continue_on_error.to_string();
        Logger::event(
            Event::NormalizeBegin,
            &[
                ("worker_limit", worker_limit.as_str()),
                ("continue_on_error", continue_on_error.as_str()),
            ],
        );

        let mut fixed = FixedForms::new();
        let mut report = NormalizeReport::default();

        match self.sweep(forms, store, &mut fixed, &mut report).await {
            Ok(()) => {
                report.forms_fixed = fixed.iter().map(String::from).collect();
                let forms_fixed = fixed.len().to_string();
                let scanned = report.records_scanned.to_string();
                let rewritten = report.records_rewritten.to_string();
                let failures = report.failures.len().to_string();
                Logger::event(
                    Event::NormalizeComplete,
                    &[
                        ("forms_fixed", forms_fixed.as_str()),
                        ("records_scanned", scanned.as_str()),
                        ("records_rewritten", rewritten.as_str()),
                        ("failures", failures.as_str()),
                    ],
                );
                Ok(report)
            }
            Err(err) => {
                let forms_fixed = fixed.len().to_string();
                let reason = err.to_string();
                let event = match &err {
                    NormalizeError::Aborted { .. } => Event::NormalizeAborted,
                    NormalizeError::Store(_) => Event::NormalizeFailed,
                };
                Logger::event(
                    event,
                    &[("forms_fixed", forms_fixed.as_str()), ("reason", reason.as_str())],
                );
                Err(err)
            }
        }
    }

    async fn sweep<F, S>(
        &self,
        forms: &F,
        store: &S,
        fixed: &mut FixedForms,
        report: &mut NormalizeReport,
    ) -> NormalizeResult<()>
    where
        F: FormSource,
        S: RecordStore,
    {
        let top_level = forms.find_forms(&top_level_unique_query()).await?;
        self.fix_all(top_level, store, fixed, report).await?;

        // Built after phase one so the exclusion list is complete.
        let nested = forms.find_forms(&nested_unique_query(fixed)).await?;
        self.fix_all(nested, store, fixed, report).await
    }

    async fn fix_all<S: RecordStore>(
        &self,
        cursor: Cursor<Form>,
        store: &S,
        fixed: &mut FixedForms,
        report: &mut NormalizeReport,
    ) -> NormalizeResult<()> {
        for form in cursor {
            if fixed.contains(&form.id) {
                continue;
            }
            self.check_abort(fixed)?;

            let scope = ObservationScope::with_fields("NORMALIZE_FORM", &[("form_id", form.id.as_str())]);
            match self.fix_form(&form, store, fixed, report).await {
                Ok(rewritten) => {
                    let rewritten = rewritten.to_string();
                    scope.complete_with_fields(&[("records_rewritten", rewritten.as_str())]);
                }
                Err(err) => {
                    scope.fail(&err.to_string());
                    return Err(err);
                }
            }

            fixed.mark(&form.id);
            Logger::event(Event::NormalizeFormFixed, &[("form_id", form.id.as_str())]);
        }
        Ok(())
    }

    /// Rewrites one form's records. Returns the number rewritten.
    async fn fix_form<S: RecordStore>(
        &self,
        form: &Form,
        store: &S,
        fixed: &FixedForms,
        report: &mut NormalizeReport,
    ) -> NormalizeResult<usize> {
        let paths = unique_paths(form);
        let records = store
            .find(&Query::eq("form", Value::String(form.id.clone())))
            .await?;
        report.records_scanned += records.remaining();

        let plans: Vec<(String, PartialUpdate)> = records
            .filter_map(|record| {
                let update = plan_rewrite(&record, &paths);
                (!update.is_empty()).then_some((record.id, update))
            })
            .collect();

        let halted = AtomicBool::new(false);
        let halted = &halted;
        let abort = &self.abort;

        let mut outcomes = stream::iter(plans)
            .map(|(id, update)| async move {
                if abort.is_aborted() || halted.load(Ordering::SeqCst) {
                    return (id, Outcome::Skipped);
                }
                let outcome = match store.update(&id, &update).await {
                    Ok(true) => Outcome::Rewritten,
                    Ok(false) => Outcome::Vanished,
                    Err(err) => Outcome::Failed(err),
                };
                (id, outcome)
            })
            .buffer_unordered(self.config.effective_worker_limit());

        let mut rewritten = 0;
        let mut skipped = 0;
        let mut fatal = None;

        while let Some((id, outcome)) = outcomes.next().await {
            match outcome {
                Outcome::Rewritten => {
                    rewritten += 1;
                    Logger::event(
                        Event::NormalizeRecordRewritten,
                        &[("form_id", form.id.as_str()), ("record_id", id.as_str())],
                    );
                }
                Outcome::Vanished => {
                    report.records_vanished += 1;
                    Logger::event(
                        Event::NormalizeRecordVanished,
                        &[("form_id", form.id.as_str()), ("record_id", id.as_str())],
                    );
                }
                Outcome::Skipped => skipped += 1,
                Outcome::Failed(err) if self.config.continue_on_error => {
                    let reason = err.to_string();
                    Logger::event(
                        Event::NormalizeRecordFailed,
                        &[
                            ("form_id", form.id.as_str()),
                            ("record_id", id.as_str()),
                            ("reason", reason.as_str()),
                        ],
                    );
                    report.failures.push(RecordFailure {
                        form_id: form.id.clone(),
                        record_id: id,
                        error: err,
                    });
                }
                Outcome::Failed(err) => {
                    halted.store(true, Ordering::SeqCst);
                    fatal.get_or_insert(err);
                }
            }
        }
        report.records_rewritten += rewritten;

        if let Some(err) = fatal {
            return Err(NormalizeError::Store(err));
        }
        if skipped > 0 {
            return Err(NormalizeError::Aborted {
                forms_fixed: fixed.len(),
            });
        }
        Ok(rewritten)
    }

    fn check_abort(&self, fixed: &FixedForms) -> NormalizeResult<()> {
        if self.abort.is_aborted() {
            return Err(NormalizeError::Aborted {
                forms_fixed: fixed.len(),
            });
        }
        Ok(())
    }
}

/// Runs a default-configured normalizer over a store that also serves
/// form definitions.
pub async fn normalize<S>(store: &S) -> NormalizeResult<NormalizeReport>
where
    S: RecordStore + FormSource,
{
    Normalizer::default().run(store, store).await
}
