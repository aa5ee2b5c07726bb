//src/tests/branches.rs

use crate::compiler::compile;
use crate::solvers::TransientSolver;
use crate::state::SparseEntry;

fn has_edit(edits: &[SparseEntry], row: usize, col: usize, value: f64) -> bool {
    edits
        .iter()
        .any(|e| e.row == row && e.col == col && (e.value - value).abs() < 1e-12)
}

#[test]
fn endbranch_coupling_entries() {
    // Main: two RCG blocks; child bound to an END call anchored at node 1
    // (the first block's last node). Child nodes start at global index 4.
    let deck = "TIME-STEP 1e-9\nEND-TIME 1e-6\nBRANCH\nRCG 1 1e-9\nENDBRANCH\nRCG 1 1e-9\nBRANCH\nRLS 1 1e-9\n";
    let circuit = compile(deck).expect("compile");
    assert_eq!(circuit.branches[1].node_offset, 4);

    let mut solver = TransientSolver::new(circuit);
    solver.prepare().expect("prepare");
    let mem = solver.memory();

    // Parent KCL row of node 1 (series node: row 2g) picks up the child's
    // first current with +K.
    assert!(has_edit(&mem.edits, 2, 9, 1.0));

    // The child's first KCL row (node 4, shunt node: row 2g+1 = 9) becomes
    // voltage continuity: exactly (+1, -1) in the voltage columns, RHS 0.
    assert_eq!(mem.overwritten, vec![9]);
    assert!(has_edit(&mem.edits, 9, 8, 1.0));
    assert!(has_edit(&mem.edits, 9, 2, -1.0));
    assert_eq!(mem.edits.iter().filter(|e| e.row == 9).count(), 2);
    assert_eq!(mem.b[9], 0.0);
    for col in 7..=11 {
        assert_eq!(mem.band_get(9, col), 0.0);
    }
}

#[test]
fn topbranch_coupling_entries() {
    // TOP call anchored on the first block: the pair straddles the block
    // boundary at nodes (1, 2). Child nodes start at global index 4.
    let deck = "TIME-STEP 1e-9\nEND-TIME 1e-6\nBRANCH\nRCG 1 1e-9\nTOPBRANCH\nRCG 1 1e-9\nBRANCH\nRLS 1 1e-9\n";
    let circuit = compile(deck).expect("compile");

    let mut solver = TransientSolver::new(circuit);
    solver.prepare().expect("prepare");
    let mem = solver.memory();

    // +K in the left parent's KCL row, -K in the right parent's, both in
    // the child's first-current column.
    assert!(has_edit(&mem.edits, 2, 9, 1.0));
    assert!(has_edit(&mem.edits, 5, 9, -1.0));

    // Child's first KCL row becomes the voltage difference
    // V_child - V_left + V_right = 0.
    assert_eq!(mem.overwritten, vec![9]);
    assert!(has_edit(&mem.edits, 9, 8, 1.0));
    assert!(has_edit(&mem.edits, 9, 2, -1.0));
    assert!(has_edit(&mem.edits, 9, 4, 1.0));
    assert_eq!(mem.edits.iter().filter(|e| e.row == 9).count(), 3);
    assert_eq!(mem.b[9], 0.0);
}

#[test]
fn endbranch_child_conducts_to_ground() {
    // 100 V source cap; an END child of 2 Ohm series + 1 Ohm shunt hangs
    // off the source node, so the child current settles near 100/3 A.
    let deck = "TIME-STEP 1e-9\nEND-TIME 1e-7\nBRANCH\nRCG 1e9 1e-6\nINITIAL VC1 100\nENDBRANCH\nRCG 1e12 1e-12\nBRANCH\nRLS 2 1e-9\nRCG 1 0\n";
    let circuit = compile(deck).expect("compile");
    let g_c = circuit.branches[1].node_offset;
    assert_eq!(g_c, 4);

    let mut solver = TransientSolver::new(circuit);
    for _ in 0..50 {
        solver.step().expect("step");
    }
    let mem = solver.memory();

    let i_child = mem.i_new[g_c];
    let expected = 100.0 / 3.0;
    assert!(
        (i_child - expected).abs() / expected < 0.05,
        "child current {i_child}, expected about {expected}"
    );

    // Voltage continuity across the attachment.
    let v_parent = mem.v_new[1];
    let v_child = mem.v_new[g_c];
    assert!(
        (v_child - v_parent).abs() < 1e-6 * v_parent.abs().max(1.0),
        "continuity violated: {v_child} vs {v_parent}"
    );
}

#[test]
fn topbranch_child_parallels_the_anchor_element() {
    // 100 V source, 10 Ohm series element, 5 Ohm load. The TOP child (10
    // Ohm, shorted tail) parallels the series element: 5 Ohm effective,
    // 10 A total, 5 A through each path, 50 V across the pair.
    let deck = "TIME-STEP 1e-9\nEND-TIME 1e-7\nBRANCH\nRCG 1e9 1e-6\nINITIAL VC1 100\nRLS 10 1e-9\nTOPBRANCH\nRCG 5 0\nBRANCH\nRLS 10 1e-9\nRCG 0 0\n";
    let circuit = compile(deck).expect("compile");
    let g_c = circuit.branches[1].node_offset;
    assert_eq!(g_c, 6);

    let mut solver = TransientSolver::new(circuit);
    for _ in 0..50 {
        solver.step().expect("step");
    }
    let mem = solver.memory();

    let i_main = mem.i_new[3];
    let i_child = mem.i_new[g_c];
    assert!((i_main - 5.0).abs() < 0.25, "main-path current {i_main}");
    assert!((i_child - 5.0).abs() < 0.25, "child-path current {i_child}");

    // The child's first voltage is the difference across the anchor pair.
    let diff = mem.v_new[3] - mem.v_new[4];
    assert!(
        (mem.v_new[g_c] - diff).abs() < 1e-6 * diff.abs().max(1.0),
        "difference row violated: {} vs {diff}",
        mem.v_new[g_c]
    );

    // Everything stays finite through the dense path.
    assert!(mem.v_new.iter().all(|v| v.is_finite()));
    assert!(mem.i_new.iter().all(|i| i.is_finite()));
}
