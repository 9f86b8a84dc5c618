use super::format::{format, has_sequence_token};
use crate::core::{EngineError, EngineResult, ValidationIssue};
use crate::orders::traits::{BucketKey, SequenceSource};
use chrono::NaiveDate;
use shared::models::{AppSettings, NumberAssignment, NumberingMode};
use std::sync::Arc;

/// Numbering parameters taken from settings
#[derive(Debug, Clone, PartialEq)]
pub struct NumberingRules {
    pub pattern: String,
    pub mode: NumberingMode,
    pub daily_reset: bool,
    pub custom_prefix: String,
    pub default_width: usize,
}

impl NumberingRules {
    pub fn from_settings(settings: &AppSettings) -> Self {
        Self {
            pattern: settings.order_number_format.clone(),
            mode: effective_mode(settings),
            daily_reset: settings.order_number_reset_daily,
            custom_prefix: settings.order_number_prefix.clone(),
            default_width: settings.order_number_digits as usize,
        }
    }
}

/// Explicit mode from settings, else inferred from the pattern
pub fn effective_mode(settings: &AppSettings) -> NumberingMode {
    settings.numbering_mode.unwrap_or_else(|| {
        if has_sequence_token(&settings.order_number_format) {
            NumberingMode::Sequential
        } else {
            NumberingMode::Manual
        }
    })
}

/// Issues order numbers from persistent per-bucket counters
///
/// Each allocation is one atomic increment; a failed increment surfaces as
/// [`EngineError::Allocation`] and is not retried.
#[derive(Clone)]
pub struct NumberAllocator {
    source: Arc<dyn SequenceSource>,
    default_width: usize,
}

impl NumberAllocator {
    pub fn new(source: Arc<dyn SequenceSource>) -> Self {
        Self {
            source,
            default_width: 6,
        }
    }

    /// Width used by a bare `{SEQ}`
    pub fn with_default_width(mut self, width: usize) -> Self {
        self.default_width = width;
        self
    }

    /// Consume the next value of the order's bucket and render the pattern
    pub fn allocate(
        &self,
        pattern: &str,
        order_date: NaiveDate,
        daily_reset: bool,
        custom_prefix: &str,
    ) -> EngineResult<String> {
        if !has_sequence_token(pattern) {
            return Err(ValidationIssue::MissingSequenceToken {
                pattern: pattern.to_string(),
            }
            .into());
        }

        let key = BucketKey::resolve(pattern, order_date, daily_reset);
        let seq = self
            .source
            .next_value(&key)
            .map_err(EngineError::Allocation)?;
        let number = format(pattern, Some(seq), order_date, custom_prefix, self.default_width);

        tracing::info!(number = %number, bucket = %key.bucket, seq, "Order number allocated");
        Ok(number)
    }

    /// Number the next allocation would produce, without consuming it
    pub fn peek(
        &self,
        pattern: &str,
        order_date: NaiveDate,
        daily_reset: bool,
        custom_prefix: &str,
    ) -> EngineResult<String> {
        if !has_sequence_token(pattern) {
            return Ok(format(pattern, None, order_date, custom_prefix, self.default_width));
        }

        let key = BucketKey::resolve(pattern, order_date, daily_reset);
        let current = self.source.current_value(&key)?;
        Ok(format(
            pattern,
            Some(current + 1),
            order_date,
            custom_prefix,
            self.default_width,
        ))
    }

    /// Number for a draft under `rules`
    ///
    /// Sequential mode allocates and yields a `Sequenced` number; manual mode
    /// renders the pattern without a counter and yields a `Derived` one.
    pub fn assign(
        &self,
        rules: &NumberingRules,
        order_date: NaiveDate,
    ) -> EngineResult<NumberAssignment> {
        let allocator = self.clone().with_default_width(rules.default_width);
        match rules.mode {
            NumberingMode::Sequential => allocator
                .allocate(&rules.pattern, order_date, rules.daily_reset, &rules.custom_prefix)
                .map(NumberAssignment::sequenced),
            NumberingMode::Manual => Ok(NumberAssignment::derived(format(
                &rules.pattern,
                None,
                order_date,
                &rules.custom_prefix,
                rules.default_width,
            ))),
        }
    }
}
