pub fn run() {
    use std::path::Path;

    // 1 ohm || 100 nF precharged to 100 V: V decays with tau = 100 ns.
    let deck = "\
TIME-STEP 1e-8
END-TIME 5e-6
BRANCH
RCG 1 100e-9
INITIAL VC1 100
TXT VC1
";

    let output_path = Path::new("output/rc_discharge");
    if let Err(err) = crate::tasks::run_deck::run(deck, Some(output_path), true) {
        eprintln!("rc_discharge failed: {err:#}");
        std::process::exit(1);
    }
}
