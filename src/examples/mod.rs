pub mod lc_oscillator;
pub mod matched_line;
pub mod rc_discharge;
