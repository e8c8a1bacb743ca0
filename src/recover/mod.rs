//! Response recovery — turning raw model output into usable code fragments.
//!
//! The model is asked for a single JSON object `{"html": ..., "css": ...,
//! "js": ...}`, but what comes back is frequently fenced, truncated at the
//! token budget, or wrapped in prose. This domain recovers whatever it can:
//!
//!   - extract.rs  — candidate selection + structured parse + marker fallback
//!   - repair.rs   — ordered JSON repair strategies (clean, balance, permissive)
//!   - sanitize.rs — fence/wrapper stripping + JS auto-repair
//!   - validate.rs — per-kind structural validation
//!
//! Nothing in here returns an error for malformed input: extraction always
//! yields a `RecoveredFragments`, possibly with empty fields, and the
//! validator reports pass/fail with a reason. The orchestrator decides what
//! a failure means for the lesson.

pub mod extract;
pub mod repair;
pub mod sanitize;
pub mod validate;

pub use extract::extract;
pub use sanitize::{repair_js, sanitize, FragmentKind};
pub use validate::{validate, ValidationResult};

use serde::{Deserialize, Serialize};

/// The three code fragments recovered from one model response.
///
/// Every field is always a valid (possibly empty) string — extraction
/// degrades, it never fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveredFragments {
    pub html: String,
    pub css: String,
    pub js: String,
}

impl RecoveredFragments {
    /// True when nothing at all was recovered.
    pub fn is_empty(&self) -> bool {
        self.html.is_empty() && self.css.is_empty() && self.js.is_empty()
    }
}
