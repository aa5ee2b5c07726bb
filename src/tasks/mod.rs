pub mod run_deck;

pub use run_deck::{run, RunOutput};
