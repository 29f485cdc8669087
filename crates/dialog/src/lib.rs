//! # Slotwise Dialog
//!
//! The per-turn pipeline: entities and intent feed the [`SlotFiller`], whose
//! output the [`DialogStateTracker`] turns into a state snapshot and a list
//! of conflicts, after which the [`DialogStrategy`] decides between asking
//! for one more slot and handing off to answer generation.
//!
//! [`DialogEngine`] wires these together around one `DialogMemory`;
//! [`SessionStore`] serializes turns per session for concurrent hosts.

pub mod engine;
pub mod filler;
pub mod resolver;
pub mod session;
pub mod strategy;
pub mod tracker;

pub use engine::{DialogEngine, TurnOutcome};
pub use filler::SlotFiller;
pub use resolver::{ResolveContext, ResolverScope, SlotResolver};
pub use session::SessionStore;
pub use strategy::DialogStrategy;
pub use tracker::DialogStateTracker;
