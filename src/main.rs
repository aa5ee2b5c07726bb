use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let name = std::env::args().nth(1).unwrap_or_else(|| "rc-discharge".to_string());
    match name.as_str() {
        "rc-discharge" => pulse_circuit_rs::examples::rc_discharge::run(),
        "lc-oscillator" => pulse_circuit_rs::examples::lc_oscillator::run(),
        "matched-line" => pulse_circuit_rs::examples::matched_line::run(),
        other => {
            eprintln!("unknown demo `{other}` (rc-discharge | lc-oscillator | matched-line)");
            std::process::exit(2);
        }
    }
}
