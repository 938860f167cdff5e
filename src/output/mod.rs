// mod.rs - Tabular export of variants and co-occurrence pairs

use crate::core::cooccurrence::CooccurrencePair;
use crate::core::records::MutationRecordSet;
use crate::core::variant::VariantKind;
use crate::error::{MutationScanError, Result};
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

/// One called variant as a table row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantRow {
    pub gene: String,
    pub genome_id: String,
    pub position: usize,
    pub reference_aa: String,
    pub mutated_aa: String,
    pub mutation_type: VariantKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CooccurrenceRow {
    pub signature_a: String,
    pub signature_b: String,
    pub count: usize,
    pub frequency: f64,
    pub p_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Tsv,
    Csv,
    Json,
}

impl FromStr for TableFormat {
    type Err = MutationScanError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "tsv" => Ok(TableFormat::Tsv),
            "csv" => Ok(TableFormat::Csv),
            "json" => Ok(TableFormat::Json),
            _ => Err(MutationScanError::InvalidConfig(format!(
                "Unsupported output format: {}. Use: tsv, csv, json",
                s
            ))),
        }
    }
}

pub fn variant_rows(records: &MutationRecordSet) -> Vec<VariantRow> {
    records
        .variants()
        .iter()
        .map(|v| VariantRow {
            gene: v.gene.clone(),
            genome_id: v.genome_id.clone(),
            position: v.position,
            reference_aa: v.reference_residue.clone(),
            mutated_aa: v.observed_residue.clone(),
            mutation_type: v.kind,
        })
        .collect()
}

pub fn cooccurrence_rows(pairs: &[CooccurrencePair]) -> Vec<CooccurrenceRow> {
    pairs
        .iter()
        .map(|p| CooccurrenceRow {
            signature_a: p.signature_a.to_string(),
            signature_b: p.signature_b.to_string(),
            count: p.count,
            frequency: p.frequency,
            p_value: p.p_value,
        })
        .collect()
}

/// Ensure parent directory exists before creating file
fn ensure_parent_dir(file_path: &Path) -> Result<()> {
    if let Some(parent) = file_path.parent() {
        create_dir_all(parent)?;
    }
    Ok(())
}

/// Serialize `rows` to `writer`. Delimited formats start with `#` comment
/// lines carrying the generation time and crate version.
pub fn write_rows<W: Write, R: Serialize>(mut writer: W, rows: &[R], format: TableFormat) -> Result<()> {
    let delimiter = match format {
        TableFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, rows)?;
            writeln!(writer)?;
            writer.flush()?;
            return Ok(());
        }
        TableFormat::Tsv => b'\t',
        TableFormat::Csv => b',',
    };

    writeln!(writer, "# Generated: {}", chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC"))?;
    writeln!(writer, "# mutationscan v{}", env!("CARGO_PKG_VERSION"))?;

    let mut table = csv::WriterBuilder::new().delimiter(delimiter).from_writer(writer);
    for row in rows {
        table.serialize(row)?;
    }
    table.flush()?;
    Ok(())
}

/// Write a table file, creating parent directories as needed
pub fn write_table<R: Serialize>(file_path: &Path, rows: &[R], format: TableFormat) -> Result<()> {
    ensure_parent_dir(file_path)?;
    let writer = BufWriter::new(File::create(file_path)?);
    write_rows(writer, rows, format)
}
