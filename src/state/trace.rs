/// ==============================================================================================
/// ================================== Probe & Trace Container ===================================
/// ==============================================================================================

use std::fs::{create_dir_all, File};
use std::io::{Error, ErrorKind, Result, Write};
use std::path::Path;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Which unknown a probe samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeKind {
    Voltage,
    Current,
}

/// A registered TXT probe: deduplicated label plus the global node it reads.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Probe {
    pub kind: ProbeKind,
    pub node: usize,
    pub label: String,
}

/// One sampled row: solution time plus one value per probe, probe order.
#[derive(Clone, Debug, Serialize)]
pub struct TraceRow {
    pub t: f64,
    pub values: Vec<f64>,
}

/// Post-run V/I snapshot, serialized alongside the trace.
#[derive(Clone, Debug, Serialize)]
pub struct FinalState {
    pub v: Array1<f64>,
    pub i: Array1<f64>,
}

/// Full-fidelity sampled output: every probe at every step, `t = 0` first.
#[derive(Clone, Debug, Serialize)]
pub struct TraceTable {
    pub labels: Vec<String>,
    pub samples: Vec<TraceRow>,
}

impl TraceTable {
    /// Empty table over the given probe labels.
    #[inline]
    pub fn empty(labels: Vec<String>) -> Self {
        Self {
            labels,
            samples: Vec::new(),
        }
    }

    /// Append one sampled row.
    #[inline]
    pub fn add(&mut self, t: f64, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.labels.len(), "row width must match labels");
        self.samples.push(TraceRow { t, values });
    }

    /// Column of samples for one label, if present.
    pub fn column(&self, label: &str) -> Option<Vec<f64>> {
        let idx = self.labels.iter().position(|l| l == label)?;
        Some(self.samples.iter().map(|row| row.values[idx]).collect())
    }

    /// Render the dense text table: header `Time(s), <labels...>`, one row
    /// per sample, scientific notation with six significant digits.
    pub fn format_table(&self) -> String {
        let mut out = String::new();
        out.push_str("Time(s)");
        for label in &self.labels {
            out.push_str(", ");
            out.push_str(label);
        }
        out.push('\n');
        for row in &self.samples {
            out.push_str(&format!("{:.5e}", row.t));
            for v in &row.values {
                out.push_str(&format!(", {:.5e}", v));
            }
            out.push('\n');
        }
        out
    }

    /// Write `{output_path}/{name}.json` (pretty-printed trace).
    pub fn save(&self, output_path: &Path, name: &str) -> Result<()> {
        create_dir_all(output_path).map_err(|e| {
            Error::new(
                e.kind(),
                format!("TraceTable::save: create dir {}: {e}", output_path.display()),
            )
        })?;

        let file_path = output_path.join(format!("{name}.json"));
        let json = serde_json::to_string_pretty(&self).map_err(|e| {
            Error::new(
                ErrorKind::InvalidData,
                format!("TraceTable::save: serialize {}: {e}", file_path.display()),
            )
        })?;

        let mut file = File::create(&file_path).map_err(|e| {
            Error::new(
                e.kind(),
                format!("TraceTable::save: create {}: {e}", file_path.display()),
            )
        })?;

        file.write_all(json.as_bytes()).map_err(|e| {
            Error::new(
                e.kind(),
                format!("TraceTable::save: write {}: {e}", file_path.display()),
            )
        })?;

        Ok(())
    }

    /// Write `{output_path}/{name}.txt` (the dense text table).
    pub fn save_table(&self, output_path: &Path, name: &str) -> Result<()> {
        create_dir_all(output_path).map_err(|e| {
            Error::new(
                e.kind(),
                format!("TraceTable::save_table: create dir {}: {e}", output_path.display()),
            )
        })?;

        let file_path = output_path.join(format!("{name}.txt"));
        let mut file = File::create(&file_path).map_err(|e| {
            Error::new(
                e.kind(),
                format!("TraceTable::save_table: create {}: {e}", file_path.display()),
            )
        })?;

        file.write_all(self.format_table().as_bytes()).map_err(|e| {
            Error::new(
                e.kind(),
                format!("TraceTable::save_table: write {}: {e}", file_path.display()),
            )
        })
    }
}
