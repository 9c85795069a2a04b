
use anyhow::Context;
use log::info;
use std::path::{Path, PathBuf};

use crate::combiner::{DuplicateHandling, combine_files};

/// Handles to the four reconciled collection files
#[derive(Clone, Debug)]
pub struct AugmentedPartition {
    /// Variants recognized by either comparator, first occurrence wins
    pub true_positive: PathBuf,
    /// The full truth set as seen by the primary comparator (TP union FN)
    pub truth: PathBuf,
    /// Truth minus augmented TP
    pub false_negative: PathBuf,
    /// Primary FP minus the secondary's call-side TP
    pub false_positive: PathBuf
}

/// Reconciles the raw outputs of the two comparators into the augmented
/// TP/T/FN/FP partition via four combine steps, in that fixed order:
/// * augmented_tp = primary_tp + secondary_tp (keep first)
/// * augmented_t  = primary_tp + primary_fn (keep first)
/// * augmented_fn = augmented_t - augmented_tp (keep none of duplicates)
/// * augmented_fp = primary_fp - secondary_tp_predict (keep none of duplicates)
///
/// Any combine failure propagates immediately; partial outputs already written
/// to `out_dir` are left in place for the caller to inspect or discard.
/// # Arguments
/// * `out_dir` - where the four merged collections are written
/// * `primary_tp`/`primary_fn`/`primary_fp` - the allele-level comparator partition
/// * `secondary_tp` - truth-side TP of the genotype/region-aware comparator
/// * `secondary_tp_predict` - call-side TP of the genotype/region-aware comparator
pub fn reconcile_partitions(
    out_dir: &Path,
    primary_tp: &Path, primary_fn: &Path, primary_fp: &Path,
    secondary_tp: &Path, secondary_tp_predict: &Path
) -> anyhow::Result<AugmentedPartition> {
    let augmented_tp = out_dir.join("merge_tp.vcf");
    let augmented_t = out_dir.join("merge_t.vcf");
    let augmented_fn = out_dir.join("merge_fn.vcf");
    let augmented_fp = out_dir.join("merge_fp.vcf");

    // retain any variant recognized by the primary comparator even when the
    // secondary does not model it (e.g. symbolic alleles); identity is always
    // chrom+pos+ref+alt
    info!("Merging true positives...");
    combine_files(
        &augmented_tp,
        &[primary_tp.to_path_buf(), secondary_tp.to_path_buf()],
        DuplicateHandling::KeepFirst
    ).context("Error while merging the augmented TP collection:")?;

    info!("Merging the truth collection...");
    combine_files(
        &augmented_t,
        &[primary_tp.to_path_buf(), primary_fn.to_path_buf()],
        DuplicateHandling::KeepFirst
    ).context("Error while merging the augmented T collection:")?;

    // assumption: augmented_tp is a subset of augmented_t
    info!("Deriving false negatives...");
    combine_files(
        &augmented_fn,
        &[augmented_t.clone(), augmented_tp.clone()],
        DuplicateHandling::KeepNoneOfDuplicate
    ).context("Error while deriving the augmented FN collection:")?;

    // assumption: secondary_tp_predict is a subset of primary_fp
    info!("Deriving false positives...");
    combine_files(
        &augmented_fp,
        &[primary_fp.to_path_buf(), secondary_tp_predict.to_path_buf()],
        DuplicateHandling::KeepNoneOfDuplicate
    ).context("Error while deriving the augmented FP collection:")?;

    Ok(AugmentedPartition {
        true_positive: augmented_tp,
        truth: augmented_t,
        false_negative: augmented_fn,
        false_positive: augmented_fp
    })
}
