/// ==============================================================================================
/// ================================= Per-Step Matrix Population =================================
/// ==============================================================================================

use crate::compiler::{AttachKind, Circuit};
use crate::state::SolverMemory;

/// Populate the band structure and RHS for the step whose solution time is
/// `t`. Per-node coefficients:
///     AV = theta*G + C/dt        (shunt admittance, KCL row)
///     AI = theta*R + L/dt        (series impedance, voltage row)
/// Rows follow the node-kind placement (`Node::kcl_row` / `voltage_row`);
/// the last node of each branch gets the terminal `I = 0` row instead of a
/// voltage drop. Switch schedules are resolved at `t` before stamping.
pub(crate) fn assemble_base(circuit: &Circuit, mem: &mut SolverMemory, theta: f64, dt: f64, t: f64) {
    let omt = 1.0 - theta;
    for branch in &circuit.branches {
        let last = branch.last_node();
        for g in branch.node_offset..=last {
            let node = &circuit.nodes[g];
            let r = node.resistance_at(t);
            let av = theta * node.g + node.c / dt;
            let ai = theta * r + node.l / dt;
            let r_i = node.kcl_row(g);
            let r_v = node.voltage_row(g);

            // KCL: AV*V_i + theta*(I_i - I_{i-1}) = history.
            mem.band_set(r_i, 2 * g, av);
            mem.band_set(r_i, 2 * g + 1, theta);
            let mut rhs = (node.c / dt - omt * node.g) * mem.v_old[g] - omt * mem.i_old[g];
            if g > 0 {
                mem.band_set(r_i, 2 * g - 1, -theta);
                rhs += omt * mem.i_old[g - 1];
            }
            mem.b[r_i] = rhs;

            // Voltage drop: theta*(V_i - V_{i+1}) - AI*I_i = history,
            // or the terminal current constraint at the branch tail.
            if g == last {
                mem.band_set(r_v, 2 * g + 1, 1.0);
                mem.b[r_v] = 0.0;
            } else {
                mem.band_set(r_v, 2 * g, theta);
                mem.band_set(r_v, 2 * g + 1, -ai);
                mem.band_set(r_v, 2 * g + 2, -theta);
                mem.b[r_v] = omt * (mem.v_old[g + 1] - mem.v_old[g])
                    - (node.l / dt - omt * r) * mem.i_old[g];
            }
        }
    }
}

/// Branch-coupling edits, applied after base assembly. The coupling
/// coefficient is K = 1 uniformly: the child current carries no old-time
/// complement on the RHS, so it is treated fully implicitly and must enter
/// with its whole steady-state weight. K = theta here would leave the
/// parent KCL seeing only theta of the child draw at a fixed point.
pub(crate) fn apply_attachments(circuit: &Circuit, mem: &mut SolverMemory) {
    let k = 1.0;
    for att in &circuit.attachments {
        let g_c = circuit.branches[att.child_branch].node_offset;
        let rck = circuit.nodes[g_c].kcl_row(g_c);
        match att.kind {
            AttachKind::End { parent_node: g_p } => {
                // Child current leaves the parent node; child's first KCL
                // becomes voltage continuity V_child = V_parent.
                let rpk = circuit.nodes[g_p].kcl_row(g_p);
                mem.push_edit(rpk, 2 * g_c + 1, k);
                mem.zero_row_band(rck);
                mem.push_edit(rck, 2 * g_c, 1.0);
                mem.push_edit(rck, 2 * g_p, -1.0);
            }
            AttachKind::Top {
                parent_left: g_l,
                parent_right: g_r,
            } => {
                // Child current leaves the left node and returns at the
                // right node; child's first KCL becomes V_child = V_L - V_R.
                let rlk = circuit.nodes[g_l].kcl_row(g_l);
                let rrk = circuit.nodes[g_r].kcl_row(g_r);
                mem.push_edit(rlk, 2 * g_c + 1, k);
                mem.push_edit(rrk, 2 * g_c + 1, -k);
                mem.zero_row_band(rck);
                mem.push_edit(rck, 2 * g_c, 1.0);
                mem.push_edit(rck, 2 * g_l, -1.0);
                mem.push_edit(rck, 2 * g_r, 1.0);
            }
        }
    }
}
