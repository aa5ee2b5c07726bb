/// ==============================================================================================
/// ==================================== Node & Element Model ====================================
/// ==============================================================================================

use serde::{Deserialize, Serialize};

/// Short-circuit conductance substituted when a deck writes `R = 0` on a shunt.
pub const SHORT_CIRCUIT_G: f64 = 1e9;
/// Parasitic series resistance of a phantom RL spacer.
pub const PHANTOM_R: f64 = 1e-7;
/// Parasitic series inductance of a phantom RL spacer.
pub const PHANTOM_L: f64 = 1e-11;
/// Parasitic series inductance of a switch element.
pub const SWITCH_L: f64 = 1e-9;
/// Leak conductance on the phantom shunt node inside a TRL segment.
pub const TRL_LEAK_G: f64 = 1e-9;

/// Which equation is primary for a node:
///     - `RcGround`: KCL with a shunt (G, C) to ground,
///     - `RlSeries`: voltage drop across a series (R, L) to the next node.
/// Block expansion alternates the two to form the pi-section chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    RcGround,
    RlSeries,
}

/// Time-scheduled switch resistance, one variant per deck switch kind.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Switch {
    /// R jumps from `r_open` to `r_close` at `t_switch`.
    Instant { r_open: f64, r_close: f64, t_switch: f64 },
    /// R relaxes from `r1 + r2` toward `r2` with rate `k` after `t_switch`.
    Exponential { r1: f64, r2: f64, k: f64, t_switch: f64 },
}

impl Switch {
    /// Resistance at solution time `t`.
    #[inline]
    pub fn resistance_at(&self, t: f64) -> f64 {
        match *self {
            Switch::Instant { r_open, r_close, t_switch } => {
                if t < t_switch { r_open } else { r_close }
            }
            Switch::Exponential { r1, r2, k, t_switch } => {
                r2 + r1 * (-k * (t - t_switch).max(0.0)).exp()
            }
        }
    }

    /// Resistance before the first step, consistent with `resistance_at(0)`.
    #[inline]
    pub fn initial_resistance(&self) -> f64 {
        match *self {
            Switch::Instant { r_open, .. } => r_open,
            Switch::Exponential { r1, r2, .. } => r1 + r2,
        }
    }
}

/// One physical unknown pair (V_i, I_i) in the global chain.
///     Every node carries all four element values; the kind decides which
///     pair dominates its primary equation. Phantom nodes only keep the
///     RC/RL alternation intact and carry parasitic floors.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub r: f64,
    pub l: f64,
    pub g: f64,
    pub c: f64,
    pub phantom: bool,
    pub initial_v: Option<f64>,
    pub switch: Option<Switch>,
}

impl Node {
    /// Real shunt node: `G = 1/R` (capped for a dead short), capacitance C.
    #[inline]
    pub fn rc_ground(r: f64, c: f64) -> Self {
        let g = if r == 0.0 { SHORT_CIRCUIT_G } else { 1.0 / r };
        Self {
            kind: NodeKind::RcGround,
            r: 0.0,
            l: 0.0,
            g,
            c,
            phantom: false,
            initial_v: None,
            switch: None,
        }
    }

    /// Real series node with the given R and L.
    #[inline]
    pub fn rl_series(r: f64, l: f64) -> Self {
        Self {
            kind: NodeKind::RlSeries,
            r,
            l,
            g: 0.0,
            c: 0.0,
            phantom: false,
            initial_v: None,
            switch: None,
        }
    }

    /// Real shunt node inside a TRL segment: pure capacitance, no leak.
    #[inline]
    pub fn trl_rc(c: f64) -> Self {
        Self {
            kind: NodeKind::RcGround,
            r: 0.0,
            l: 0.0,
            g: 0.0,
            c,
            phantom: false,
            initial_v: None,
            switch: None,
        }
    }

    /// Phantom spacer after a real shunt: tiny parasitic series element.
    #[inline]
    pub fn phantom_rl() -> Self {
        Self {
            kind: NodeKind::RlSeries,
            r: PHANTOM_R,
            l: PHANTOM_L,
            g: 0.0,
            c: 0.0,
            phantom: true,
            initial_v: None,
            switch: None,
        }
    }

    /// Phantom spacer before a real series element: all-zero shunt.
    #[inline]
    pub fn phantom_rc() -> Self {
        Self {
            kind: NodeKind::RcGround,
            r: 0.0,
            l: 0.0,
            g: 0.0,
            c: 0.0,
            phantom: true,
            initial_v: None,
            switch: None,
        }
    }

    /// Phantom shunt inside a TRL segment, with the leak floor.
    #[inline]
    pub fn trl_phantom_rc() -> Self {
        let mut n = Self::phantom_rc();
        n.g = TRL_LEAK_G;
        n
    }

    /// Phantom series spacer inside a TRL segment (`L = 0`).
    #[inline]
    pub fn trl_phantom_rl() -> Self {
        let mut n = Self::phantom_rl();
        n.l = 0.0;
        n
    }

    /// Switch element: real series node on the given schedule.
    #[inline]
    pub fn switch_rl(switch: Switch) -> Self {
        let mut n = Self::rl_series(switch.initial_resistance(), SWITCH_L);
        n.switch = Some(switch);
        n
    }

    /// Series resistance at solution time `t` (switch schedule applied).
    #[inline]
    pub fn resistance_at(&self, t: f64) -> f64 {
        match self.switch {
            Some(sw) => sw.resistance_at(t),
            None => self.r,
        }
    }

    /// Row index of this node's KCL equation, given its global index.
    ///     RcGround nodes keep the voltage equation at `2g` and the KCL at
    ///     `2g + 1`; RlSeries nodes the other way around. This is the
    ///     assignment that places every branch's terminal `I = 0` row on the
    ///     matrix diagonal.
    #[inline]
    pub fn kcl_row(&self, g: usize) -> usize {
        match self.kind {
            NodeKind::RcGround => 2 * g + 1,
            NodeKind::RlSeries => 2 * g,
        }
    }

    /// Row index of this node's voltage equation, given its global index.
    #[inline]
    pub fn voltage_row(&self, g: usize) -> usize {
        match self.kind {
            NodeKind::RcGround => 2 * g,
            NodeKind::RlSeries => 2 * g + 1,
        }
    }
}
