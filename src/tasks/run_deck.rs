/// ==============================================================================================
/// ====================================== Deck Run Task =========================================
/// ==============================================================================================

use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::compiler;
use crate::solvers::TransientSolver;
use crate::state::{FinalState, ProbeKind, TraceTable};

/// Everything a run produces: the full-fidelity sampled table and the
/// post-run state snapshot.
pub struct RunOutput {
    pub table: TraceTable,
    pub final_state: FinalState,
    pub t_end: f64,
}

/// Compile and run a deck end-to-end, sampling every probe at every step.
///     The `t = 0` row is read from the initial-condition buffers, not from
///     a zero-duration step. When `output_path` is given, the trace (JSON),
///     the dense text table, and the final state are persisted there.
pub fn run(deck: &str, output_path: Option<&Path>, show_progress: bool) -> Result<RunOutput> {
    let circuit = compiler::compile(deck).context("deck compilation failed")?;
    let steps = circuit.timing.steps();
    let labels: Vec<String> = circuit.probes.iter().map(|p| p.label.clone()).collect();
    let mut solver = TransientSolver::new(circuit);

    let mut table = TraceTable::empty(labels);

    // t = 0 record straight from the old buffers (initial conditions).
    let row0: Vec<f64> = solver
        .circuit()
        .probes
        .iter()
        .map(|p| match p.kind {
            ProbeKind::Voltage => solver.memory().v_old[p.node],
            ProbeKind::Current => solver.memory().i_old[p.node],
        })
        .collect();
    table.add(0.0, row0);

    let pb = if show_progress {
        let pb = ProgressBar::new(steps as u64);
        pb.set_style(
            ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {pos}/{len}")
                .unwrap()
                .progress_chars("=>-"),
        );
        pb.set_message("stepping");
        Some(pb)
    } else {
        None
    };

    for step in 1..=steps {
        let t = solver
            .step()
            .with_context(|| format!("solver failed at step {step}"))?;
        let row: Vec<f64> = solver
            .circuit()
            .probes
            .iter()
            .map(|p| solver.probe_node(p.node, p.kind))
            .collect();
        table.add(t, row);
        if let Some(pb) = &pb {
            pb.inc(1);
        }
    }
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let final_state = solver.final_state();
    let t_end = solver.time();

    if let Some(out) = output_path {
        table
            .save(out, "trace")
            .with_context(|| format!("writing trace to {}", out.display()))?;
        table
            .save_table(out, "table")
            .with_context(|| format!("writing table to {}", out.display()))?;
        let json = serde_json::to_string_pretty(&final_state).context("serializing final state")?;
        std::fs::write(out.join("final_state.json"), json)
            .with_context(|| format!("writing final state to {}", out.display()))?;
    }

    info!(
        steps,
        t_end,
        probes = table.labels.len(),
        "deck run complete"
    );

    Ok(RunOutput {
        table,
        final_state,
        t_end,
    })
}
