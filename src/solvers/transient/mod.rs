/// ==============================================================================================
/// ==================================== Transient Solver ========================================
/// ==============================================================================================

pub(crate) mod elim;
pub(crate) mod stencil;

use tracing::debug;

use crate::compiler::Circuit;
use crate::error::SolveError;
use crate::state::{FinalState, ProbeKind, SolverMemory};

use elim::DenseWorkspace;

/// Default theta weight: trapezoidal-leaning, mildly dissipative.
pub const THETA: f64 = 0.55;

/// Owns a compiled circuit and its solve-time buffers for one run.
///     Per step: resolve switch schedules at the new solution time, clear
///     and repopulate the coefficient memory, apply branch edits, run the
///     banded sweep (or the dense fallback when attachments exist), and
///     commit the interleaved solution into the new V/I buffers.
///     Strictly sequential; nothing here is thread-safe or needs to be.
#[derive(Debug)]
pub struct TransientSolver {
    circuit: Circuit,
    mem: SolverMemory,
    dense: Option<DenseWorkspace>,
    theta: f64,
    t: f64,
    steps_done: u64,
}

impl TransientSolver {
    pub fn new(circuit: Circuit) -> Self {
        Self::with_theta(circuit, THETA)
    }

    /// Override theta (0.5 gives the energy-conserving debug scheme).
    pub fn with_theta(circuit: Circuit, theta: f64) -> Self {
        let mem = SolverMemory::new(&circuit.nodes);
        let dense = if circuit.attachments.is_empty() {
            None
        } else {
            debug!(
                n = mem.n,
                attachments = circuit.attachments.len(),
                "attachments present, using dense elimination"
            );
            Some(DenseWorkspace::new(mem.n))
        };
        Self {
            circuit,
            mem,
            dense,
            theta,
            t: 0.0,
            steps_done: 0,
        }
    }

    #[inline]
    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    #[inline]
    pub fn memory(&self) -> &SolverMemory {
        &self.mem
    }

    /// Solution time of the last completed step (0 before the first).
    #[inline]
    pub fn time(&self) -> f64 {
        self.t
    }

    #[inline]
    pub fn steps_done(&self) -> u64 {
        self.steps_done
    }

    /// Assemble the system for the step ending at `t + dt` without solving.
    /// Separated from `step` so the populated coefficients can be inspected.
    pub(crate) fn prepare(&mut self) -> Result<f64, SolveError> {
        // Retire the previous step's result into the old buffers. Kept out
        // of the first step so V_old still holds the initial conditions.
        if self.steps_done > 0 {
            self.mem.swap();
        }

        let dt = self.circuit.timing.dt;
        let t_next = self.t + dt;
        self.mem.clear();
        stencil::assemble_base(&self.circuit, &mut self.mem, self.theta, dt, t_next);
        if !self.circuit.attachments.is_empty() {
            stencil::apply_attachments(&self.circuit, &mut self.mem);
        }
        self.check_finite()?;
        Ok(t_next)
    }

    /// Advance one fixed timestep. Returns the new solution time.
    pub fn step(&mut self) -> Result<f64, SolveError> {
        let t_next = self.prepare()?;
        match &mut self.dense {
            None => elim::solve_banded(&mut self.mem),
            Some(ws) => elim::solve_dense(ws, &mut self.mem, &self.circuit)?,
        }
        self.mem.commit_solution();
        self.t = t_next;
        self.steps_done += 1;
        Ok(t_next)
    }

    /// Read a registered probe from the post-step new buffers.
    pub fn probe(&self, label: &str) -> Option<f64> {
        let p = self.circuit.probe(label)?;
        Some(self.probe_node(p.node, p.kind))
    }

    /// Read one unknown from the post-step new buffers.
    #[inline]
    pub fn probe_node(&self, node: usize, kind: ProbeKind) -> f64 {
        match kind {
            ProbeKind::Voltage => self.mem.v_new[node],
            ProbeKind::Current => self.mem.i_new[node],
        }
    }

    /// Read a probe from the initial conditions (the old buffers). This is
    /// the `t = 0` record; `probe()` is only meaningful after a step.
    pub fn probe_initial(&self, label: &str) -> Option<f64> {
        let p = self.circuit.probe(label)?;
        Some(match p.kind {
            ProbeKind::Voltage => self.mem.v_old[p.node],
            ProbeKind::Current => self.mem.i_old[p.node],
        })
    }

    /// Snapshot of the most recent state.
    pub fn final_state(&self) -> FinalState {
        if self.steps_done == 0 {
            FinalState {
                v: self.mem.v_old.clone(),
                i: self.mem.i_old.clone(),
            }
        } else {
            FinalState {
                v: self.mem.v_new.clone(),
                i: self.mem.i_new.clone(),
            }
        }
    }

    fn check_finite(&self) -> Result<(), SolveError> {
        let bad_row = (0..self.mem.n).find(|&r| {
            !(self.mem.d[r].is_finite()
                && self.mem.l1[r].is_finite()
                && self.mem.u1[r].is_finite()
                && self.mem.l2[r].is_finite()
                && self.mem.u2[r].is_finite()
                && self.mem.b[r].is_finite())
        });
        let bad_row = bad_row.or_else(|| {
            self.mem
                .edits
                .iter()
                .find(|e| !e.value.is_finite())
                .map(|e| e.row)
        });
        if let Some(row) = bad_row {
            let (branch, node) = self.circuit.locate(row / 2);
            return Err(SolveError::NonFinite { branch, node });
        }
        Ok(())
    }
}
