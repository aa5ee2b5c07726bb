pub mod memory;
pub mod node;
pub mod trace;

pub use memory::{SolverMemory, SparseEntry};
pub use node::{Node, NodeKind, Switch};
pub use trace::{FinalState, Probe, ProbeKind, TraceRow, TraceTable};
