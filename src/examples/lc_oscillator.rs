pub fn run() {
    use std::path::Path;

    // Two grounded 1 nF capacitors coupled by 1 uH: rings near 140 ns.
    let deck = "\
TIME-STEP 1e-10
END-TIME 2e-7
BRANCH
RCG 1e12 1e-9
INITIAL VC1 100
TXT VC1
RLS 0 1e-6
RCG 1e12 1e-9
TXT VC2
";

    let output_path = Path::new("output/lc_oscillator");
    if let Err(err) = crate::tasks::run_deck::run(deck, Some(output_path), true) {
        eprintln!("lc_oscillator failed: {err:#}");
        std::process::exit(1);
    }
}
