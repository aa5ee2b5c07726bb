pub fn run() {
    use std::path::Path;

    // Precharged source into a 50 ohm series element, a 10 ns 50 ohm line,
    // and a matched load: the steady source current is V / 100.
    let deck = "\
TIME-STEP 5e-11
END-TIME 1e-7
TRLINE-RESOLUTION 5e-10
BRANCH
RCG 1e12 1e-6
INITIAL VS 100
RLS 50 0
TXT ISRC
TRL LINEAR 10e-9 50
RCG 50 0
TXT VLOAD
";

    let output_path = Path::new("output/matched_line");
    if let Err(err) = crate::tasks::run_deck::run(deck, Some(output_path), true) {
        eprintln!("matched_line failed: {err:#}");
        std::process::exit(1);
    }
}
