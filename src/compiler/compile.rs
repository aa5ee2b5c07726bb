/// ==============================================================================================
/// ====================================== Deck Compiler =========================================
/// ==============================================================================================

use std::collections::{HashMap, HashSet, VecDeque};

use once_cell::sync::Lazy;
use tracing::{debug, warn};

use crate::error::{CompileError, TopologyError};
use crate::state::{Node, NodeKind, Probe, ProbeKind, Switch};

use super::{AttachKind, Attachment, Block, BlockKind, Branch, Circuit, Timing};

/// Recognized deck commands. Lookup is case-insensitive; anything absent
/// from this table is ignored (forward-compatible).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Cmd {
    TimeStep,
    EndTime,
    ResolutionTime,
    TrlineResolution,
    Branch,
    Rcg,
    Rls,
    Switch,
    Trl,
    Topbranch,
    Endbranch,
    Initial,
    Txt,
}

static COMMANDS: Lazy<HashMap<&'static str, Cmd>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("TIME-STEP", Cmd::TimeStep);
    m.insert("END-TIME", Cmd::EndTime);
    m.insert("RESOLUTION-TIME", Cmd::ResolutionTime);
    m.insert("TRLINE-RESOLUTION", Cmd::TrlineResolution);
    m.insert("BRANCH", Cmd::Branch);
    m.insert("RCG", Cmd::Rcg);
    m.insert("RLS", Cmd::Rls);
    m.insert("SWITCH", Cmd::Switch);
    m.insert("TRL", Cmd::Trl);
    m.insert("TOPBRANCH", Cmd::Topbranch);
    m.insert("ENDBRANCH", Cmd::Endbranch);
    m.insert("INITIAL", Cmd::Initial);
    m.insert("TXT", Cmd::Txt);
    m
});

/// A TOPBRANCH/ENDBRANCH call waiting for the next BRANCH to bind to.
#[derive(Clone, Copy, Debug)]
struct PendingCall {
    kind: AttachKind,
    parent_branch: usize,
    parent_block: usize,
    line: usize,
}

/// Compile a deck into a `Circuit`. One statement per line, whitespace
/// tokens, `!` comment lines, case-insensitive commands.
pub fn compile(deck: &str) -> Result<Circuit, CompileError> {
    let mut c = Compiler::default();
    for (idx, raw) in deck.lines().enumerate() {
        c.statement(idx + 1, raw)?;
    }
    c.finish()
}

#[derive(Default)]
struct Compiler {
    nodes: Vec<Node>,
    blocks: Vec<Block>,
    branches: Vec<Branch>,
    branch_lines: Vec<usize>,
    attachments: Vec<Attachment>,
    pending: VecDeque<PendingCall>,
    probes: Vec<Probe>,
    used_labels: HashSet<String>,
    label_suffix: HashMap<String, usize>,
    dt: Option<f64>,
    t_end: Option<f64>,
    resolution: Option<f64>,
    trl_resolution: Option<f64>,
}

fn num(line: usize, tok: &str) -> Result<f64, CompileError> {
    tok.parse::<f64>().map_err(|_| CompileError::BadNumber {
        line,
        token: tok.to_string(),
    })
}

fn arg<'a>(line: usize, command: &str, toks: &[&'a str], i: usize) -> Result<&'a str, CompileError> {
    toks.get(i).copied().ok_or_else(|| CompileError::MissingArgument {
        line,
        command: command.to_string(),
    })
}

impl Compiler {
    fn statement(&mut self, line: usize, raw: &str) -> Result<(), CompileError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('!') {
            return Ok(());
        }

        let toks: Vec<&str> = trimmed.split_whitespace().collect();
        let upper = toks[0].to_ascii_uppercase();
        let Some(&cmd) = COMMANDS.get(upper.as_str()) else {
            debug!(line, command = %toks[0], "ignoring unknown deck command");
            return Ok(());
        };

        match cmd {
            Cmd::TimeStep => self.dt = Some(num(line, arg(line, &upper, &toks, 1)?)?),
            Cmd::EndTime => self.t_end = Some(num(line, arg(line, &upper, &toks, 1)?)?),
            Cmd::ResolutionTime => {
                self.resolution = Some(num(line, arg(line, &upper, &toks, 1)?)?)
            }
            Cmd::TrlineResolution => {
                self.trl_resolution = Some(num(line, arg(line, &upper, &toks, 1)?)?)
            }
            Cmd::Branch => self.open_branch(line)?,
            Cmd::Rcg => {
                let r = num(line, arg(line, &upper, &toks, 1)?)?;
                let c = match toks.get(2) {
                    Some(tok) => num(line, tok)?,
                    None => 0.0,
                };
                self.emit(line, BlockKind::Rcg, vec![Node::rc_ground(r, c), Node::phantom_rl()])?;
            }
            Cmd::Rls => {
                let r = num(line, arg(line, &upper, &toks, 1)?)?;
                let l = match toks.get(2) {
                    Some(tok) => num(line, tok)?,
                    None => 0.0,
                };
                self.emit(line, BlockKind::Rls, vec![Node::phantom_rc(), Node::rl_series(r, l)])?;
            }
            Cmd::Switch => self.switch(line, &upper, &toks)?,
            Cmd::Trl => self.trl(line, &upper, &toks)?,
            Cmd::Topbranch => self.branch_call(line, true)?,
            Cmd::Endbranch => self.branch_call(line, false)?,
            Cmd::Initial => {
                let _label = arg(line, &upper, &toks, 1)?;
                let v = num(line, arg(line, &upper, &toks, 2)?)?;
                self.initial(line, v)?;
            }
            Cmd::Txt => {
                let label = arg(line, &upper, &toks, 1)?.to_string();
                self.txt(line, label)?;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Block emission
    // ------------------------------------------------------------------

    fn current_branch(&self, line: usize) -> Result<usize, CompileError> {
        if self.branches.is_empty() {
            return Err(CompileError::StatementOutsideBranch { line });
        }
        Ok(self.branches.len() - 1)
    }

    fn emit(&mut self, line: usize, kind: BlockKind, nodes: Vec<Node>) -> Result<(), CompileError> {
        let branch = self.current_branch(line)?;
        let first = self.nodes.len();
        self.nodes.extend(nodes);
        self.blocks.push(Block {
            kind,
            first,
            last: self.nodes.len() - 1,
            branch,
        });
        Ok(())
    }

    fn switch(&mut self, line: usize, upper: &str, toks: &[&str]) -> Result<(), CompileError> {
        let sub = arg(line, upper, toks, 1)?;
        let switch = match sub.to_ascii_uppercase().as_str() {
            "INSTANT" => Switch::Instant {
                r_open: num(line, arg(line, upper, toks, 2)?)?,
                r_close: num(line, arg(line, upper, toks, 3)?)?,
                t_switch: num(line, arg(line, upper, toks, 4)?)?,
            },
            "EXPONENTIAL" => Switch::Exponential {
                r1: num(line, arg(line, upper, toks, 2)?)?,
                r2: num(line, arg(line, upper, toks, 3)?)?,
                k: num(line, arg(line, upper, toks, 4)?)?,
                t_switch: num(line, arg(line, upper, toks, 5)?)?,
            },
            _ => {
                return Err(CompileError::UnknownSwitchKind {
                    line,
                    token: sub.to_string(),
                })
            }
        };
        self.emit(
            line,
            BlockKind::Switch,
            vec![Node::phantom_rc(), Node::switch_rl(switch)],
        )
    }

    fn trl(&mut self, line: usize, upper: &str, toks: &[&str]) -> Result<(), CompileError> {
        let sub = arg(line, upper, toks, 1)?;
        if !sub.eq_ignore_ascii_case("LINEAR") {
            debug!(line, kind = %sub, "ignoring unknown TRL kind");
            return Ok(());
        }
        let delay = num(line, arg(line, upper, toks, 2)?)?;
        let z = num(line, arg(line, upper, toks, 3)?)?;
        let res = match toks.get(4) {
            Some(tok) => Some(num(line, tok)?),
            None => None,
        };

        // Resolution precedence: per-line, TRLINE-RESOLUTION, RESOLUTION-TIME/2.
        let res = res
            .or(self.trl_resolution)
            .or(self.resolution.map(|r| r / 2.0))
            .ok_or(CompileError::NoResolution { line })?;
        if !(res > 0.0) || !(delay / res).is_finite() {
            return Err(CompileError::NoResolution { line });
        }

        let segments = (delay / res).round().max(1.0) as usize;
        let c_seg = (delay / z) / segments as f64;
        let l_seg = (z * delay) / segments as f64;

        let mut nodes = Vec::with_capacity(4 * segments);
        for _ in 0..segments {
            nodes.push(Node::trl_rc(c_seg));
            nodes.push(Node::trl_phantom_rl());
            nodes.push(Node::trl_phantom_rc());
            nodes.push(Node::rl_series(0.0, l_seg));
        }
        self.emit(line, BlockKind::Trl, nodes)
    }

    // ------------------------------------------------------------------
    // Initial conditions & probes
    // ------------------------------------------------------------------

    fn last_block(&self, line: usize) -> Result<Block, CompileError> {
        self.current_branch(line)?;
        self.blocks
            .last()
            .copied()
            .ok_or(CompileError::Topology(TopologyError::AnchorMissing { line }))
    }

    fn initial(&mut self, line: usize, v: f64) -> Result<(), CompileError> {
        let block = self.last_block(line)?;
        if block.kind == BlockKind::Trl {
            for node in &mut self.nodes[block.first..=block.last] {
                if node.initial_v.is_none() {
                    node.initial_v = Some(v);
                }
            }
            return Ok(());
        }

        // Lumped blocks: walk last-to-first. Phantoms passed on the way pick
        // up the voltage; the first non-phantom ends the walk, receiving it
        // only if it is the shunt node (no current initial conditions).
        for idx in (block.first..=block.last).rev() {
            if self.nodes[idx].phantom {
                self.nodes[idx].initial_v = Some(v);
                continue;
            }
            if self.nodes[idx].kind == NodeKind::RcGround {
                self.nodes[idx].initial_v = Some(v);
                for j in (block.first..idx).rev() {
                    if !self.nodes[j].phantom {
                        break;
                    }
                    self.nodes[j].initial_v = Some(v);
                }
            }
            break;
        }
        Ok(())
    }

    fn dedup_label(&mut self, label: &str) -> String {
        if self.used_labels.insert(label.to_string()) {
            return label.to_string();
        }
        let mut n = self.label_suffix.get(label).copied().unwrap_or(1);
        loop {
            let candidate = format!("{label}_{n}");
            n += 1;
            if self.used_labels.insert(candidate.clone()) {
                self.label_suffix.insert(label.to_string(), n);
                return candidate;
            }
        }
    }

    fn txt(&mut self, line: usize, label: String) -> Result<(), CompileError> {
        let block = self.last_block(line)?;
        let is_current = label.chars().next().is_some_and(|c| c.eq_ignore_ascii_case(&'i'));
        let (kind, node) = if is_current {
            // Current entering the block: the node just before its start.
            let node = if block.first == 0 { 0 } else { block.first - 1 };
            (ProbeKind::Current, node)
        } else {
            let node = (block.first..=block.last)
                .rev()
                .find(|&g| !self.nodes[g].phantom)
                .unwrap_or(block.last);
            (ProbeKind::Voltage, node)
        };
        let label = self.dedup_label(&label);
        self.probes.push(Probe { kind, node, label });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Branch structure
    // ------------------------------------------------------------------

    fn close_current_branch(&mut self) {
        if let Some(b) = self.branches.last_mut() {
            b.node_count = self.nodes.len() - b.node_offset;
        }
    }

    fn open_branch(&mut self, line: usize) -> Result<(), CompileError> {
        if self.branches.is_empty() {
            self.branches.push(Branch {
                id: 0,
                level: 0,
                node_offset: 0,
                node_count: 0,
            });
            self.branch_lines.push(line);
            return Ok(());
        }

        let call = self
            .pending
            .pop_front()
            .ok_or(TopologyError::NoPendingCall { line })?;
        self.close_current_branch();

        let id = self.branches.len();
        let level = self.branches[call.parent_branch].level + 1;
        self.branches.push(Branch {
            id,
            level,
            node_offset: self.nodes.len(),
            node_count: 0,
        });
        self.branch_lines.push(line);
        self.attachments.push(Attachment {
            kind: call.kind,
            parent_branch: call.parent_branch,
            child_branch: id,
            parent_block: call.parent_block,
            line: call.line,
        });
        Ok(())
    }

    fn branch_call(&mut self, line: usize, top: bool) -> Result<(), CompileError> {
        let branch = self.current_branch(line)?;
        let (block_index, block) = self
            .blocks
            .iter()
            .enumerate()
            .rev()
            .find(|(_, b)| b.branch == branch)
            .map(|(i, b)| (i, *b))
            .ok_or(TopologyError::AnchorMissing { line })?;

        let kind = if top {
            // The pair straddles the anchor block's tail: the child hangs
            // across the block's series element, whose drop spans the
            // block's last node and the following one. Existence of the
            // right node is validated once the branch is closed.
            AttachKind::Top {
                parent_left: block.last,
                parent_right: block.last + 1,
            }
        } else {
            AttachKind::End {
                parent_node: block.last,
            }
        };
        self.pending.push_back(PendingCall {
            kind,
            parent_branch: branch,
            parent_block: block_index,
            line,
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Finalization
    // ------------------------------------------------------------------

    fn finish(mut self) -> Result<Circuit, CompileError> {
        if !self.pending.is_empty() {
            return Err(TopologyError::UnboundBranch {
                pending: self.pending.len(),
            }
            .into());
        }
        self.close_current_branch();

        for (branch, &line) in self.branches.iter().zip(&self.branch_lines) {
            if branch.node_count == 0 {
                return Err(TopologyError::AnchorMissing { line }.into());
            }
        }

        // A TOP anchor pair must lie inside the parent branch: a TOPBRANCH
        // on a branch's final block has no right-hand node.
        for att in &self.attachments {
            if let AttachKind::Top { parent_right, .. } = att.kind {
                if parent_right > self.branches[att.parent_branch].last_node() {
                    return Err(TopologyError::AnchorMissing { line: att.line }.into());
                }
            }
        }

        // An END attachment may not hang off the main branch's final block.
        if let Some(last_main_block) = self.blocks.iter().rposition(|b| b.branch == 0) {
            for att in &self.attachments {
                if matches!(att.kind, AttachKind::End { .. })
                    && att.parent_branch == 0
                    && att.parent_block == last_main_block
                {
                    return Err(TopologyError::EndbranchOnFinalBlock { line: att.line }.into());
                }
            }
        }

        // An attached branch whose first node carries a real shunt loses it
        // to the continuity row.
        for att in &self.attachments {
            let first = self.branches[att.child_branch].node_offset;
            let node = &self.nodes[first];
            if !node.phantom && node.kind == NodeKind::RcGround && (node.g != 0.0 || node.c != 0.0) {
                warn!(
                    line = att.line,
                    branch = att.child_branch,
                    "attached branch starts with a real shunt; its KCL row is overwritten"
                );
            }
        }

        let (dt, t_end) = match (self.dt, self.t_end) {
            (Some(dt), Some(t_end)) if dt > 0.0 && t_end > 0.0 => (dt, t_end),
            _ => return Err(CompileError::BadTiming),
        };

        debug!(
            nodes = self.nodes.len(),
            blocks = self.blocks.len(),
            branches = self.branches.len(),
            attachments = self.attachments.len(),
            probes = self.probes.len(),
            "deck compiled"
        );

        Ok(Circuit {
            nodes: self.nodes,
            blocks: self.blocks,
            branches: self.branches,
            attachments: self.attachments,
            probes: self.probes,
            timing: Timing { dt, t_end },
        })
    }
}
