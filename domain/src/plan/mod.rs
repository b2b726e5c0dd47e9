//! Plan domain module
//!
//! A [`Plan`] is the Plan Generator's text split into its two sections:
//! the primary action (the only part ever executed) and the optional
//! fallback steps (kept for display and logging).
//!
//! ```text
//! ### PRIMARY ACTION (Executable):      ─┐
//! ```sql                                 │ primary_action
//! SELECT path FROM file_metadata;        │
//! ```                                   ─┘
//! ### FALLBACK STEPS (Hierarchy):       ─┐
//! 1. Check the server logs              │ fallback
//!                                       ─┘
//! ```

pub mod entities;
pub mod parser;
pub mod prompt;

pub use entities::Plan;
pub use parser::{FALLBACK_MARKER, PRIMARY_ACTION_MARKER, split_plan};
pub use prompt::system_prompt;
