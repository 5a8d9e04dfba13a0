//! # tsf-quiz
//!
//! Two-level study programme quiz client:
//! - Level 1 narrows the catalog by programme type
//! - Level 2 scores yes/no/skip answers per RIASEC trait and asks the query
//!   service for programmes matching the user's top three traits
//!
//! Results of guests are cached locally and attached to the account on the
//! next login.

pub mod client;
pub mod error;
pub mod flow;
pub mod guest_cache;
pub mod session;

pub use client::{HttpBackend, QuizBackend};
pub use error::{QuizError, QuizResult};
pub use guest_cache::GuestCache;
pub use session::{Answer, Level1Choice, QuizPhase, QuizSession};
