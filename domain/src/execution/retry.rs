//! The dispatcher's retry predicate.
//!
//! There is exactly one retry path and it is deliberately narrow:
//!
//! | Response | Retry? |
//! |----------|--------|
//! | 400/422 with a non-policy code (or none), and the secondary cleanup changes the payload | once |
//! | 400 with a policy code (`read_only_violation`, `unknown_database`, ...) | no |
//! | 403 | no |
//! | 408 / 429 / 503 / other 5xx | no, surfaced as a classified backend error |
//! | transport failure (refused, DNS, timeout) | no, surfaced as a dispatch error |
//!
//! Waiting and retrying on rate limits is left to the caller.

use super::codes::is_policy_code;
use crate::action::{ParsedAction, secondary_cleanup};
use crate::tool::ToolSpec;

/// Retries allowed per action.
pub const MAX_RETRIES: usize = 1;

/// Whether a rejection is the malformed-request kind a cleanup might fix.
pub fn is_retryable_rejection(status: u16, code: Option<&str>) -> bool {
    matches!(status, 400 | 422) && !code.is_some_and(is_policy_code)
}

/// The payload to resubmit after a rejection, or `None` for no retry.
pub fn retry_action(
    action: &ParsedAction,
    spec: &ToolSpec,
    status: u16,
    code: Option<&str>,
) -> Option<ParsedAction> {
    if !is_retryable_rejection(status, code) {
        return None;
    }
    secondary_cleanup(action, spec)
}
