//! Record validation pipeline
//!
//! custom scripts -> uniqueness -> structural. Each stage runs only when
//! the previous one passed, and the first two stop at their first failure.

use std::sync::Arc;

use super::errors::{ValidationError, ValidationResult};
use super::unique::UniquenessChecker;
use crate::form::Form;
use crate::observability::{Event, Logger};
use crate::sandbox::{Sandbox, Verdict};
use crate::schema::{CompiledValidator, ErrorDetail};
use crate::store::{RecordData, RecordStore};
use crate::submission::Submission;

/// Caller-supplied hook that may rewrite an error before it is returned.
pub type ErrorAugmenter = Arc<dyn Fn(ValidationError) -> ValidationError + Send + Sync>;

/// Validates records of any form against one store.
///
/// Holds no per-record state; one instance may serve concurrent callers.
pub struct SubmissionValidator<'a, S: RecordStore> {
    store: &'a S,
    sandbox: Sandbox,
    augmenter: Option<ErrorAugmenter>,
}

impl<'a, S: RecordStore> SubmissionValidator<'a, S> {
    pub fn new(store: &'a S, sandbox: Sandbox) -> Self {
        Self {
            store,
            sandbox,
            augmenter: None,
        }
    }

    pub fn with_augmenter<F>(mut self, augmenter: F) -> Self
    where
        F: Fn(ValidationError) -> ValidationError + Send + Sync + 'static,
    {
        self.augmenter = Some(Arc::new(augmenter));
        self
    }

    /// Validates `data` and returns the canonical record.
    ///
    /// `record_id` identifies the record being updated, if any; a unique
    /// value held by that same record is not a conflict.
    ///
    /// # Errors
    ///
    /// - `FORM_CUSTOM_VALIDATION_FAILED`: first failing custom script
    /// - `FORM_UNIQUE_REQUIRED` / `FORM_UNIQUE_CONFLICT`: first failing unique field
    /// - `FORM_STRUCTURAL_VALIDATION_FAILED`: every structural violation
    /// - `FORM_STORE_FAILED`: the store's error, unchanged
    pub async fn validate(
        &self,
        validator: &CompiledValidator,
        data: &RecordData,
        record_id: Option<&str>,
    ) -> ValidationResult<RecordData> {
        let form_id = validator.form_id();
        let record = record_id.unwrap_or("");
        Logger::event(
            Event::ValidationBegin,
            &[("form_id", form_id), ("record_id", record)],
        );

        match self.run_stages(validator, data, record_id).await {
            Ok(output) => {
                Logger::event(
                    Event::ValidationComplete,
                    &[("form_id", form_id), ("record_id", record)],
                );
                Ok(output)
            }
            Err(err) => {
                Logger::event(
                    Event::ValidationRejected,
                    &[
                        ("form_id", form_id),
                        ("record_id", record),
                        ("code", err.code().code()),
                    ],
                );
                Err(match &self.augmenter {
                    Some(augment) => augment(err),
                    None => err,
                })
            }
        }
    }

    /// Validates the envelope's data in place.
    ///
    /// An envelope without data is returned unchanged.
    pub async fn validate_submission(
        &self,
        validator: &CompiledValidator,
        mut submission: Submission,
    ) -> ValidationResult<Submission> {
        let Some(data) = submission.data.take() else {
            return Ok(submission);
        };
        let output = self
            .validate(validator, &data, submission.id.as_deref())
            .await?;
        submission.data = Some(output);
        Ok(submission)
    }

    async fn run_stages(
        &self,
        validator: &CompiledValidator,
        data: &RecordData,
        record_id: Option<&str>,
    ) -> ValidationResult<RecordData> {
        self.run_custom(validator, data)?;

        UniquenessChecker::new(self.store)
            .check_all(validator, data, record_id)
            .await?;

        validator.apply(data).map_err(ValidationError::structural)
    }

    /// Evaluates custom scripts for the keys present in `data`, stopping at
    /// the first field that is not valid.
    pub fn run_custom(&self, validator: &CompiledValidator, data: &RecordData) -> ValidationResult<()> {
        for (key, check) in validator.custom_checks() {
            if !data.contains_key(key) {
                continue;
            }
            if let Verdict::Invalid(reason) =
                self.sandbox.evaluate(&check.source, key, data, &check.field)
            {
                Logger::event(
                    Event::CustomValidationFailed,
                    &[
                        ("form_id", validator.form_id()),
                        ("field", key.as_str()),
                        ("reason", reason.as_str()),
                    ],
                );
                let detail_type = format!("{}.custom", check.field.field_type);
                return Err(ValidationError::custom_failed(ErrorDetail::new(
                    reason,
                    key.as_str(),
                    detail_type,
                )));
            }
        }
        Ok(())
    }
}

/// Compiles `form` and validates `data` with default sandbox limits.
pub async fn validate<S: RecordStore>(
    data: &RecordData,
    form: &Form,
    store: &S,
    record_id: Option<&str>,
) -> ValidationResult<RecordData> {
    let validator = CompiledValidator::compile(form)?;
    SubmissionValidator::new(store, Sandbox::default())
        .validate(&validator, data, record_id)
        .await
}
