//! Action domain module
//!
//! Turns the primary-action section of a [`Plan`](crate::plan::Plan) into
//! one [`ParsedAction`], or a diagnostic explaining why not.
//!
//! ```text
//! primary-action text
//!   ├─ fenced ```sql / ```bash / ```python block  → tool from label
//!   ├─ prose ("Rationale: ...", "None")           → NoExecutableAction
//!   ├─ bare tool name / alias (SHELL_COMMAND: ..) → tool from token
//!   └─ otherwise                                  → UnknownFormat{raw}
//! ```

pub mod cleanup;
pub mod entities;
pub mod extractor;

pub use cleanup::secondary_cleanup;
pub use entities::{ExtractionOutcome, ParsedAction};
pub use extractor::ActionExtractor;
