//! Error signature computation for occurrence grouping.
//!
//! An error signature identifies a class of error occurrences based on:
//! - Error name (defaults to `"Error"` for plain messages)
//! - Error message
//! - The first three lines of the stack trace, if any
//! - The allow-listed context fields `component`, `action` and `url`
//!
//! Occurrences with the same signature share rate limiting state.
//!
//! The hash is a 32-bit polynomial rolling hash over UTF-16 code units. It is
//! fast and stable within a process, and it is not collision free: two
//! unrelated errors can land on the same signature. A collision only makes
//! suppression of that pair slightly more aggressive, it never corrupts state.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Number of stack trace lines that take part in the signature.
pub const STACK_HEAD_LINES: usize = 3;

/// Context keys that take part in the signature, in hashing order.
///
/// Any other context key is ignored so that high-cardinality or sensitive
/// values (user ids, request ids, free-form payloads) cannot split a group.
pub const SIGNATURE_CONTEXT_KEYS: [&str; 3] = ["component", "action", "url"];

const DEFAULT_ERROR_NAME: &str = "Error";

/// A grouping key identifying a class of error occurrences.
///
/// Displays as the lowercase base-36 rendering of the folded hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ErrorSignature(u32);

impl ErrorSignature {
    /// Derive the signature of an occurrence.
    ///
    /// # Example
    /// ```
    /// use error_throttle::{ErrorContext, ErrorLike, ErrorSignature};
    ///
    /// let ctx = ErrorContext::new().with_component("checkout");
    /// let a = ErrorSignature::derive(&ErrorLike::plain("timeout"), Some(&ctx));
    /// let b = ErrorSignature::derive(&ErrorLike::plain("timeout"), Some(&ctx));
    /// assert_eq!(a, b);
    /// ```
    pub fn derive(error: &ErrorLike<'_>, context: Option<&ErrorContext>) -> Self {
        let mut hasher = SignatureHasher::new();

        hasher.write_str(error.name());
        hasher.write_str(":");
        hasher.write_str(error.message());
        hasher.write_str(":");

        if let Some(stack) = error.stack() {
            for (i, line) in stack.lines().take(STACK_HEAD_LINES).enumerate() {
                if i > 0 {
                    hasher.write_str("\n");
                }
                hasher.write_str(line);
            }
        }
        hasher.write_str(":");

        if let Some(ctx) = context {
            for key in SIGNATURE_CONTEXT_KEYS {
                if let Some(value) = ctx.get(key) {
                    hasher.write_str(key);
                    hasher.write_str("=");
                    hasher.write_str(value);
                    hasher.write_str(";");
                }
            }
        }

        hasher.finish()
    }

    /// Signature of a bare message with no context.
    pub fn simple(message: &str) -> Self {
        Self::derive(&ErrorLike::plain(message), None)
    }

    /// Create a signature from a raw hash value.
    pub fn from_hash(hash: u32) -> Self {
        ErrorSignature(hash)
    }

    /// Get the raw hash value.
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ErrorSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // u32::MAX is 7 digits in base 36
        let mut buf = [0u8; 7];
        let mut pos = buf.len();
        let mut n = self.0;
        loop {
            pos -= 1;
            buf[pos] = b"0123456789abcdefghijklmnopqrstuvwxyz"[(n % 36) as usize];
            n /= 36;
            if n == 0 {
                break;
            }
        }
        // Only ASCII digits were written
        f.write_str(std::str::from_utf8(&buf[pos..]).map_err(|_| fmt::Error)?)
    }
}

/// Incremental polynomial rolling hash (`h = h * 31 + unit`) over UTF-16
/// code units, with 32-bit signed wrapping arithmetic.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureHasher {
    state: i32,
}

impl SignatureHasher {
    /// Create a hasher with a zero state.
    pub fn new() -> Self {
        Self { state: 0 }
    }

    /// Feed a string into the hash.
    pub fn write_str(&mut self, s: &str) {
        for unit in s.encode_utf16() {
            self.state = self.state.wrapping_mul(31).wrapping_add(i32::from(unit));
        }
    }

    /// Fold the state into a signature (absolute value of the signed state).
    pub fn finish(&self) -> ErrorSignature {
        ErrorSignature(self.state.unsigned_abs())
    }
}

/// An error occurrence as seen by the deriver.
///
/// Either a plain message (name `"Error"`) or a structured error with a name,
/// a message and optional stack text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLike<'a> {
    name: Cow<'a, str>,
    message: Cow<'a, str>,
    stack: Option<Cow<'a, str>>,
}

impl<'a> ErrorLike<'a> {
    /// A structured error with a name and message.
    pub fn new(name: impl Into<Cow<'a, str>>, message: impl Into<Cow<'a, str>>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            stack: None,
        }
    }

    /// A plain message; the name defaults to `"Error"`.
    pub fn plain(message: impl Into<Cow<'a, str>>) -> Self {
        Self::new(DEFAULT_ERROR_NAME, message)
    }

    /// Attach stack text. Only its first three lines affect the signature.
    pub fn with_stack(mut self, stack: impl Into<Cow<'a, str>>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Build an occurrence from a Rust error.
    ///
    /// The `source()` chain is rendered as stack lines (`caused by: ...`).
    pub fn from_error(error: &(dyn std::error::Error + 'static)) -> ErrorLike<'static> {
        let mut stack = String::new();
        let mut source = error.source();
        while let Some(cause) = source {
            if !stack.is_empty() {
                stack.push('\n');
            }
            stack.push_str("caused by: ");
            stack.push_str(&cause.to_string());
            source = cause.source();
        }

        let occurrence = ErrorLike::plain(error.to_string());
        if stack.is_empty() {
            occurrence
        } else {
            occurrence.with_stack(stack)
        }
    }

    /// Error name; empty names read as `"Error"`.
    pub fn name(&self) -> &str {
        if self.name.is_empty() {
            DEFAULT_ERROR_NAME
        } else {
            &self.name
        }
    }

    /// Error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Stack text, if present.
    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }
}

impl<'a> From<&'a str> for ErrorLike<'a> {
    fn from(message: &'a str) -> Self {
        ErrorLike::plain(message)
    }
}

impl From<String> for ErrorLike<'static> {
    fn from(message: String) -> Self {
        ErrorLike::plain(message)
    }
}

impl<'a, 'b: 'a> From<&'a ErrorLike<'b>> for ErrorLike<'a> {
    fn from(error: &'a ErrorLike<'b>) -> Self {
        Self {
            name: Cow::Borrowed(error.name.as_ref()),
            message: Cow::Borrowed(error.message.as_ref()),
            stack: error.stack.as_deref().map(Cow::Borrowed),
        }
    }
}

/// Context attached to an occurrence.
///
/// Callers may put anything here; only [`SIGNATURE_CONTEXT_KEYS`] are used
/// for grouping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    fields: BTreeMap<String, String>,
}

impl ErrorContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an arbitrary field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Set a field in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Set the `component` field.
    pub fn with_component(self, component: impl Into<String>) -> Self {
        self.with_field("component", component)
    }

    /// Set the `action` field.
    pub fn with_action(self, action: impl Into<String>) -> Self {
        self.with_field("action", action)
    }

    /// Set the `url` field.
    pub fn with_url(self, url: impl Into<String>) -> Self {
        self.with_field("url", url)
    }

    /// Look up a field.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Number of fields, including ones ignored for grouping.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the context has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for ErrorContext
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
