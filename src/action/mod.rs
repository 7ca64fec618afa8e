//! CI host plumbing
//!
//! Inputs, outputs, phase-crossing state and repository context, as exposed
//! by a GitHub Actions compatible runner.

mod command;
pub mod context;
pub mod env;
pub mod inputs;
pub mod output;
pub mod state;

pub use context::Repository;
pub use env::ActionEnv;
pub use inputs::Inputs;
pub use output::{ActionOutput, MemoryOutput, OutputSink, CACHE_HIT};
pub use state::{ActionState, FileState, MemoryState, StateSlot, StateStore};
