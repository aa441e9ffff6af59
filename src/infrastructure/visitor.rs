//! Field visitor for turning `tracing` events into error occurrences.
//!
//! Only the fields that can affect a signature or its routing are kept:
//!
//! | field | becomes |
//! |---|---|
//! | `message` | error message |
//! | `error` | error message when there is no `message` |
//! | `error_name` | error name |
//! | `stack` | stack text |
//! | `component`, `action`, `url` | context |
//! | `category` | limiter category |
//!
//! Everything else is skipped without being formatted.

use crate::domain::signature::{ErrorContext, ErrorLike, SIGNATURE_CONTEXT_KEYS};
use std::fmt;
use tracing::field::{Field, Visit};

const MESSAGE: &str = "message";
const ERROR: &str = "error";
const ERROR_NAME: &str = "error_name";
const STACK: &str = "stack";
const CATEGORY: &str = "category";

/// Collects the occurrence-relevant fields of one event.
#[derive(Debug, Default)]
pub(crate) struct OccurrenceVisitor {
    message: Option<String>,
    error: Option<String>,
    error_name: Option<String>,
    stack: Option<String>,
    category: Option<String>,
    context: ErrorContext,
}

/// An event translated into limiter inputs.
#[derive(Debug)]
pub(crate) struct Occurrence {
    pub error: ErrorLike<'static>,
    pub context: ErrorContext,
    pub category: Option<String>,
}

impl OccurrenceVisitor {
    /// Create a new visitor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the occurrence; `fallback_message` is used when the event has
    /// neither a `message` nor an `error` field.
    pub fn into_occurrence(self, fallback_message: &str) -> Occurrence {
        let message = self
            .message
            .or(self.error)
            .unwrap_or_else(|| fallback_message.to_string());

        let error = match self.error_name {
            Some(name) => ErrorLike::new(name, message),
            None => ErrorLike::plain(message),
        };
        let error = match self.stack {
            Some(stack) => error.with_stack(stack),
            None => error,
        };

        Occurrence {
            error,
            context: self.context,
            category: self.category,
        }
    }

    fn wants(name: &str) -> bool {
        matches!(name, MESSAGE | ERROR | ERROR_NAME | STACK | CATEGORY)
            || SIGNATURE_CONTEXT_KEYS.contains(&name)
    }

    fn record(&mut self, field: &Field, value: String) {
        match field.name() {
            MESSAGE => self.message = Some(value),
            ERROR => self.error = Some(value),
            ERROR_NAME => self.error_name = Some(value),
            STACK => self.stack = Some(value),
            CATEGORY => self.category = Some(value),
            name => self.context.insert(name, value),
        }
    }
}

impl Visit for OccurrenceVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        if Self::wants(field.name()) {
            self.record(field, value.to_string());
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        if Self::wants(field.name()) {
            self.record(field, value.to_string());
        }
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        if Self::wants(field.name()) {
            self.record(field, value.to_string());
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        if Self::wants(field.name()) {
            self.record(field, value.to_string());
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if Self::wants(field.name()) {
            self.record(field, value.to_string());
        }
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        if Self::wants(field.name()) {
            self.record(field, value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if Self::wants(field.name()) {
            self.record(field, format!("{:?}", value));
        }
    }
}
