
use anyhow::Context;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::ops::AddAssign;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::comparators::JavaRuntime;
use crate::reconciler::AugmentedPartition;
use crate::util::json_io::load_json;

/// Variant types tabulated when the user does not narrow the taxonomy
pub const DEFAULT_VARIANT_TYPES: [&str; 4] = ["SNP", "Insertion", "Complex", "Deletion"];

/// Which portion of the per-type counts a summary slice draws from
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CountSlice {
    /// Totals minus the SV-only counts
    NonSv,
    /// SV-only counts
    SvOnly,
    /// The raw totals
    Overall
}

impl CountSlice {
    fn label(&self) -> &'static str {
        match self {
            CountSlice::NonSv => "NonSV",
            CountSlice::SvOnly => "SV",
            CountSlice::Overall => "Overall"
        }
    }
}

/// The structured report emitted by the results-parser collaborator
#[derive(Debug, Deserialize)]
pub struct ComparisonReport {
    num_true_correct: TypeTally
}

#[derive(Debug, Deserialize)]
struct TypeTally {
    /// Per-variant-type count blobs, keyed by the taxonomy name
    data: HashMap<String, TypeCounts>
}

#[derive(Debug, Deserialize)]
struct TypeCounts {
    /// Counts over all variants of this type
    sum_count: CategoryCounts,
    /// Counts over the SV-length subset
    #[serde(rename = "svSumCount", default)]
    sv_sum_count: CategoryCounts
}

/// TP/FP/T/FN counts for one variant type, as reported by the collaborator
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct CategoryCounts {
    #[serde(default)]
    pub tp: i64,
    #[serde(default)]
    pub fp: i64,
    #[serde(default)]
    pub t: i64,
    #[serde(rename = "fn", default)]
    pub fn_count: i64
}

impl AddAssign for CategoryCounts {
    // Enables += with counts
    fn add_assign(&mut self, rhs: Self) {
        self.tp += rhs.tp;
        self.fp += rhs.fp;
        self.t += rhs.t;
        self.fn_count += rhs.fn_count;
    }
}

impl CategoryCounts {
    /// Recall relative to truth, absent when the truth count is zero
    pub fn recall(&self) -> Option<f64> {
        if self.t > 0 {
            Some(self.tp as f64 / self.t as f64)
        } else {
            None
        }
    }

    /// Precision relative to calls, absent when no calls were classified
    pub fn precision(&self) -> Option<f64> {
        let denom = self.tp + self.fp;
        if denom > 0 {
            Some(self.tp as f64 / denom as f64)
        } else {
            None
        }
    }

    /// F1 score, absent when either component is absent or both are zero
    pub fn f1(&self) -> Option<f64> {
        match (self.recall(), self.precision()) {
            (Some(recall), Some(precision)) if recall + precision > 0.0 => {
                Some(2.0 * recall * precision / (recall + precision))
            },
            _ => None
        }
    }
}

/// Accumulates the counts for one slice of the report across the requested taxonomy.
/// Types absent from the report tabulate as zeros.
/// # Arguments
/// * `report` - the parsed collaborator report
/// * `var_types` - the variant-type taxonomy to tabulate
/// * `slice` - which portion of the counts to draw
pub fn tally_report(report: &ComparisonReport, var_types: &[String], slice: CountSlice) -> BTreeMap<String, CategoryCounts> {
    let mut tallies: BTreeMap<String, CategoryCounts> = var_types.iter()
        .map(|vt| (vt.clone(), CategoryCounts::default()))
        .collect();

    for (var_type, tally) in tallies.iter_mut() {
        if let Some(counts) = report.num_true_correct.data.get(var_type) {
            match slice {
                CountSlice::NonSv => {
                    *tally += counts.sum_count;
                    tally.tp -= counts.sv_sum_count.tp;
                    tally.fp -= counts.sv_sum_count.fp;
                    tally.t -= counts.sv_sum_count.t;
                    tally.fn_count -= counts.sv_sum_count.fn_count;
                },
                CountSlice::SvOnly => *tally += counts.sv_sum_count,
                CountSlice::Overall => *tally += counts.sum_count
            }
        }
    }
    tallies
}

/// One row of the summary table
#[derive(Serialize)]
struct SummaryRow {
    /// Which count slice this row belongs to
    slice: String,
    /// The variant type represented by this row
    variant_type: String,
    /// Recall = TP / T
    metric_recall: Option<f64>,
    /// Precision = TP / (TP + FP)
    metric_precision: Option<f64>,
    /// F1 = combination score of recall and precision
    metric_f1: Option<f64>,
    tp: i64,
    t: i64,
    fp: i64,
    #[serde(rename = "fn")]
    fn_count: i64
}

/// Runs the external results-parser collaborator over the reconciled partition,
/// ingests its JSON report, and writes the per-type summary table. The parser
/// also rewrites the four collections under the given prefix; the refreshed
/// handles are returned for the downstream pairing passes.
/// # Arguments
/// * `runtime` - java invocation settings
/// * `jar` - the jar carrying the results-parser tool
/// * `prefix` - output prefix for the parser and its report
/// * `partition` - the reconciled collections to summarize
/// * `var_types` - variant-type taxonomy to tabulate
/// * `sv_length` - SV length cutoff for the SV/non-SV split
/// * `regions` - optional BED restriction pass-through
/// * `bed_either` - if true, region filtering uses either break-end
/// * `bin_breaks` - optional user-defined size bins pass-through
/// * `summary_fn` - the TSV (or CSV) summary table destination
/// # Errors
/// * if the collaborator fails or does not produce its expected outputs
/// * if the report JSON cannot be parsed or the table cannot be written
#[allow(clippy::too_many_arguments)]
pub fn summarize_partition(
    runtime: &JavaRuntime,
    jar: &Path,
    prefix: &Path,
    partition: &AugmentedPartition,
    var_types: &[String],
    sv_length: u32,
    regions: Option<&Path>,
    bed_either: bool,
    bin_breaks: Option<&str>,
    summary_fn: &Path
) -> anyhow::Result<AugmentedPartition> {
    let mut command = Command::new(&runtime.java);
    command.args([
        format!("-Xmx{}", runtime.max_memory),
        "-jar".to_string(), jar.display().to_string(),
        "vcfcompareresultsparser".to_string(),
        "-prefix".to_string(), prefix.display().to_string(),
        "-tp".to_string(), partition.true_positive.display().to_string(),
        "-fn".to_string(), partition.false_negative.display().to_string(),
        "-fp".to_string(), partition.false_positive.display().to_string(),
        "-t".to_string(), partition.truth.display().to_string(),
        "-sv_length".to_string(), sv_length.to_string()
    ]);
    if let Some(bed_fn) = regions {
        command.arg("-bed");
        command.arg(bed_fn);
    }
    if bed_either {
        command.arg("-bed_either");
    }
    if let Some(breaks) = bin_breaks {
        command.args(["-bin_breaks", breaks]);
    }
    crate::comparators::run_engine(command)
        .context("Error while running the results-parser collaborator:")?;

    let base = prefix.display().to_string();
    let refreshed = AugmentedPartition {
        true_positive: PathBuf::from(format!("{base}_tp.vcf")),
        truth: PathBuf::from(format!("{base}_t.vcf")),
        false_negative: PathBuf::from(format!("{base}_fn.vcf")),
        false_positive: PathBuf::from(format!("{base}_fp.vcf"))
    };
    for path in [&refreshed.true_positive, &refreshed.truth, &refreshed.false_negative, &refreshed.false_positive] {
        crate::comparators::check_output_exists(path)?;
    }

    let report_fn = PathBuf::from(format!("{base}_report.json"));
    let report: ComparisonReport = load_json(&report_fn)?;

    write_summary(&report, var_types, summary_fn)?;
    Ok(refreshed)
}

/// Writes the three-slice summary table for a parsed report.
/// A ".csv" extension switches the delimiter from tab to comma.
/// # Arguments
/// * `report` - the parsed collaborator report
/// * `var_types` - variant-type taxonomy to tabulate
/// * `summary_fn` - the table destination
pub fn write_summary(report: &ComparisonReport, var_types: &[String], summary_fn: &Path) -> anyhow::Result<()> {
    let is_csv: bool = summary_fn.extension().unwrap_or_default() == "csv";
    let delimiter: u8 = if is_csv { b',' } else { b'\t' };
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(summary_fn)
        .with_context(|| format!("Error while opening {summary_fn:?}:"))?;

    for slice in [CountSlice::NonSv, CountSlice::SvOnly, CountSlice::Overall] {
        let tallies = tally_report(report, var_types, slice);
        for (variant_type, counts) in tallies.iter() {
            let row = SummaryRow {
                slice: slice.label().to_string(),
                variant_type: variant_type.clone(),
                metric_recall: counts.recall(),
                metric_precision: counts.precision(),
                metric_f1: counts.f1(),
                tp: counts.tp,
                t: counts.t,
                fp: counts.fp,
                fn_count: counts.fn_count
            };
            csv_writer.serialize(&row)?;
        }
    }
    csv_writer.flush()?;

    info!("Summary table saved to {summary_fn:?}");
    Ok(())
}
