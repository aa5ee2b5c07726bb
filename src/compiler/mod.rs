/// ==============================================================================================
/// ===================================== Compiled Circuit =======================================
/// ==============================================================================================

pub mod compile;

pub use compile::compile;

use serde::{Deserialize, Serialize};

use crate::state::{Node, Probe};

/// Deck statement kind a block was emitted by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    Rcg,
    Rls,
    Switch,
    Trl,
}

/// Compiler-level unit emitted by one deck statement. Resolves subsequent
/// INITIAL / TXT statements and supplies tail anchors for branch calls.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Block {
    pub kind: BlockKind,
    pub first: usize,
    pub last: usize,
    pub branch: usize,
}

/// Contiguous series chain in the global node vector. Branch 0 is the main
/// branch; later branches bind to prior TOPBRANCH/ENDBRANCH calls in FIFO
/// order and are laid out after their parents.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Branch {
    pub id: usize,
    pub level: usize,
    pub node_offset: usize,
    pub node_count: usize,
}

impl Branch {
    /// Global index of this branch's last node.
    #[inline]
    pub fn last_node(&self) -> usize {
        self.node_offset + self.node_count - 1
    }

    /// Whether the global node index falls inside this branch.
    #[inline]
    pub fn contains(&self, g: usize) -> bool {
        g >= self.node_offset && g < self.node_offset + self.node_count
    }
}

/// Parent-side anchor of a branch attachment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttachKind {
    /// Child hangs off one parent node: couples that node's KCL to the
    /// child's first current, child's first KCL becomes voltage continuity.
    End { parent_node: usize },
    /// Child hangs across two adjacent parent nodes: couples both KCLs
    /// with opposite sign, child's first KCL becomes voltage difference.
    Top { parent_left: usize, parent_right: usize },
}

/// Linkage between a parent-branch anchor and a child branch's first node,
/// realized at assembly time as a small set of sparse matrix edits.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Attachment {
    pub kind: AttachKind,
    pub parent_branch: usize,
    pub child_branch: usize,
    pub(crate) parent_block: usize,
    pub line: usize,
}

/// Fixed-step timing scalars from the deck.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Timing {
    pub dt: f64,
    pub t_end: f64,
}

impl Timing {
    /// Number of steps in a full run.
    #[inline]
    pub fn steps(&self) -> usize {
        (self.t_end / self.dt).round() as usize
    }
}

/// Everything the solver consumes for the duration of a run.
#[derive(Clone, Debug, Serialize)]
pub struct Circuit {
    pub nodes: Vec<Node>,
    pub blocks: Vec<Block>,
    pub branches: Vec<Branch>,
    pub attachments: Vec<Attachment>,
    pub probes: Vec<Probe>,
    pub timing: Timing,
}

impl Circuit {
    /// Total node count N (matrix size is 2N).
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Branch owning the global node index.
    pub fn branch_of(&self, g: usize) -> Option<&Branch> {
        self.branches.iter().find(|b| b.contains(g))
    }

    /// `(branch id, local node index)` for error reporting.
    pub fn locate(&self, g: usize) -> (usize, usize) {
        match self.branch_of(g) {
            Some(b) => (b.id, g - b.node_offset),
            None => (0, g),
        }
    }

    /// Probe registered under the given deduplicated label.
    pub fn probe(&self, label: &str) -> Option<&Probe> {
        self.probes.iter().find(|p| p.label == label)
    }
}
