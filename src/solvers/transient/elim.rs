/// ==============================================================================================
/// ================================== Elimination Back-Ends =====================================
/// ==============================================================================================

use ndarray::Array2;

use crate::compiler::Circuit;
use crate::error::SolveError;
use crate::state::SolverMemory;

/// Near-zero diagonals are floored to `sign * 1e-25` before use as pivots.
pub const PIVOT_FLOOR: f64 = 1e-25;

/// A column whose partial-pivot maximum falls below this is singular.
const SINGULAR_PIVOT: f64 = 1e-100;

#[inline]
fn floored(x: f64) -> f64 {
    if x.abs() < PIVOT_FLOOR {
        if x < 0.0 { -PIVOT_FLOOR } else { PIVOT_FLOOR }
    } else {
        x
    }
}

/// Pentadiagonal elimination for the pure-series case: one forward sweep
/// clearing the two sub-diagonals, then back-substitution. The solution is
/// left in `mem.b`. Diagonals are floored at the moment they are used as
/// pivots; zero diagonals at assembly time fill in from the sweep before
/// they are reached.
pub(crate) fn solve_banded(mem: &mut SolverMemory) {
    let n = mem.n;
    if n == 0 {
        return;
    }

    for i in 0..n - 1 {
        mem.d[i] = floored(mem.d[i]);
        if mem.l1[i + 1] != 0.0 {
            let f = mem.l1[i + 1] / mem.d[i];
            mem.d[i + 1] -= f * mem.u1[i];
            mem.u1[i + 1] -= f * mem.u2[i];
            mem.b[i + 1] -= f * mem.b[i];
        }
        if i + 2 < n && mem.l2[i + 2] != 0.0 {
            let f = mem.l2[i + 2] / mem.d[i];
            mem.l1[i + 2] -= f * mem.u1[i];
            mem.d[i + 2] -= f * mem.u2[i];
            mem.b[i + 2] -= f * mem.b[i];
        }
    }

    mem.d[n - 1] = floored(mem.d[n - 1]);
    mem.b[n - 1] /= mem.d[n - 1];
    if n >= 2 {
        mem.b[n - 2] = (mem.b[n - 2] - mem.u1[n - 2] * mem.b[n - 1]) / mem.d[n - 2];
        for i in (0..n - 2).rev() {
            mem.b[i] = (mem.b[i] - mem.u1[i] * mem.b[i + 1] - mem.u2[i] * mem.b[i + 2]) / mem.d[i];
        }
    }
}

/// Preallocated dense fallback used whenever attachments exist: the sparse
/// edits break the band, and N stays modest in branched decks.
#[derive(Debug)]
pub(crate) struct DenseWorkspace {
    a: Array2<f64>,
}

impl DenseWorkspace {
    pub(crate) fn new(n: usize) -> Self {
        Self {
            a: Array2::zeros((n, n)),
        }
    }

    /// Scatter the band and the sparse edits into the dense matrix.
    /// Diagonals keep the flooring policy except on constraint rows, whose
    /// band was deliberately zeroed.
    pub(crate) fn scatter(&mut self, mem: &SolverMemory) {
        let n = mem.n;
        self.a.fill(0.0);
        for r in 0..n {
            if r >= 2 {
                self.a[[r, r - 2]] = mem.l2[r];
            }
            if r >= 1 {
                self.a[[r, r - 1]] = mem.l1[r];
            }
            self.a[[r, r]] = if mem.overwritten.contains(&r) {
                mem.d[r]
            } else {
                floored(mem.d[r])
            };
            if r + 1 < n {
                self.a[[r, r + 1]] = mem.u1[r];
            }
            if r + 2 < n {
                self.a[[r, r + 2]] = mem.u2[r];
            }
        }
        for e in &mem.edits {
            self.a[[e.row, e.col]] += e.value;
        }
    }
}

/// Gaussian elimination with partial pivoting on the scattered dense
/// matrix, solving into `mem.b`.
pub(crate) fn solve_dense(
    ws: &mut DenseWorkspace,
    mem: &mut SolverMemory,
    circuit: &Circuit,
) -> Result<(), SolveError> {
    let n = mem.n;
    ws.scatter(mem);

    for k in 0..n {
        let mut p = k;
        let mut best = ws.a[[k, k]].abs();
        for r in k + 1..n {
            let cand = ws.a[[r, k]].abs();
            if cand > best {
                best = cand;
                p = r;
            }
        }
        if best < SINGULAR_PIVOT {
            let (branch, node) = circuit.locate(k / 2);
            return Err(SolveError::Singular { branch, node });
        }
        if p != k {
            for c in k..n {
                let tmp = ws.a[[k, c]];
                ws.a[[k, c]] = ws.a[[p, c]];
                ws.a[[p, c]] = tmp;
            }
            mem.b.swap(k, p);
        }

        let pivot = ws.a[[k, k]];
        for r in k + 1..n {
            let f = ws.a[[r, k]] / pivot;
            if f != 0.0 {
                for c in k + 1..n {
                    ws.a[[r, c]] -= f * ws.a[[k, c]];
                }
                mem.b[r] -= f * mem.b[k];
            }
            ws.a[[r, k]] = 0.0;
        }
    }

    for k in (0..n).rev() {
        let mut acc = mem.b[k];
        for c in k + 1..n {
            acc -= ws.a[[k, c]] * mem.b[c];
        }
        mem.b[k] = acc / ws.a[[k, k]];
    }
    Ok(())
}
