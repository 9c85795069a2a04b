
use anyhow::Context;
use indexmap::IndexSet;
use log::debug;
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};

use crate::data_types::collection::VariantCollection;
use crate::data_types::variant_record::VariantKey;

/// Policy for records whose identity key appears more than once across the inputs
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, clap::ValueEnum, serde::Serialize)]
pub enum DuplicateHandling {
    /// Union of all inputs; the first-encountered copy of each identity key wins
    #[default]
    KeepFirst,
    /// Set difference: records of the first input whose key is absent from the second
    KeepNoneOfDuplicate
}

#[derive(thiserror::Error, Debug)]
pub enum CombineError {
    #[error("no input collections were provided")]
    EmptyInput,
    #[error("keep-none-of-duplicate requires exactly 2 input collections, got {count}")]
    UnsupportedInputShape { count: usize }
}

/// Merges an ordered list of collections into one according to the duplicate policy.
/// Header lines are unioned across all inputs and deduplicated by exact text.
/// # Arguments
/// * `inputs` - the source collections; order determines which copy is kept
///   (KeepFirst) or which side is the minuend (KeepNoneOfDuplicate)
/// * `mode` - the duplicate-handling policy
/// # Errors
/// * if no inputs are provided
/// * if KeepNoneOfDuplicate is invoked with anything other than two inputs
pub fn combine(inputs: &[VariantCollection], mode: DuplicateHandling) -> Result<VariantCollection, CombineError> {
    if inputs.is_empty() {
        return Err(CombineError::EmptyInput);
    }

    // header union, first occurrence order, exact-text dedup
    let mut header: IndexSet<String> = Default::default();
    for collection in inputs.iter() {
        header.extend(collection.header().iter().cloned());
    }
    let header: Vec<String> = header.into_iter().collect();

    let records = match mode {
        DuplicateHandling::KeepFirst => {
            let mut seen: FxHashSet<VariantKey> = Default::default();
            inputs.iter()
                .flat_map(|collection| collection.records().iter())
                .filter(|record| seen.insert(record.identity_key()))
                .cloned()
                .collect()
        },
        DuplicateHandling::KeepNoneOfDuplicate => {
            // behavior for 3+ inputs is deliberately unsupported
            if inputs.len() != 2 {
                return Err(CombineError::UnsupportedInputShape { count: inputs.len() });
            }

            let subtrahend: FxHashSet<VariantKey> = inputs[1].records().iter()
                .map(|record| record.identity_key())
                .collect();
            inputs[0].records().iter()
                .filter(|record| !subtrahend.contains(&record.identity_key()))
                .cloned()
                .collect()
        }
    };

    Ok(VariantCollection::new(header, records))
}

/// File-level wrapper around `combine`: loads the inputs, merges them, and
/// writes the result before returning it.
/// # Arguments
/// * `output_fn` - where the merged collection is written
/// * `input_fns` - the source collections on disk, in priority order
/// * `mode` - the duplicate-handling policy
/// # Errors
/// * if any input is unreadable or unparseable
/// * if the combine itself is rejected
/// * if the output cannot be written
pub fn combine_files(output_fn: &Path, input_fns: &[PathBuf], mode: DuplicateHandling) -> anyhow::Result<VariantCollection> {
    debug!("Combining {input_fns:?} -> {output_fn:?} with {mode:?}");
    let inputs: Vec<VariantCollection> = input_fns.iter()
        .map(|filename| VariantCollection::from_path(filename))
        .collect::<anyhow::Result<_>>()?;

    let combined = combine(&inputs, mode)
        .with_context(|| format!("Error while combining inputs for {output_fn:?}:"))?;
    combined.write(output_fn)
        .with_context(|| format!("Error while writing {output_fn:?}:"))?;
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::variant_record::VariantRecord;

    fn record(chrom: &str, pos: u64, ref_allele: &str, alt: &str, filter: &str) -> VariantRecord {
        let line = format!("{chrom}\t{pos}\t.\t{ref_allele}\t{alt}\t50\t{filter}\t.");
        VariantRecord::parse_line(&line).unwrap()
    }

    fn collection(header_line: &str, records: Vec<VariantRecord>) -> VariantCollection {
        VariantCollection::new(vec![header_line.to_string()], records)
    }

    #[test]
    fn test_keep_first_union() {
        // v1 appears in both with different FILTER text; A's copy must win
        let a = collection("##source=A", vec![
            record("chr1", 100, "A", "T", "PASS"),
            record("chr1", 200, "C", "G", "PASS")
        ]);
        let b = collection("##source=B", vec![
            record("chr1", 100, "A", "T", "q10"),
            record("chr2", 300, "G", "A", "PASS")
        ]);

        let combined = combine(&[a, b], DuplicateHandling::KeepFirst).unwrap();
        assert_eq!(combined.len(), 3);
        assert_eq!(combined.records()[0].format_line(), "chr1\t100\t.\tA\tT\t50\tPASS\t.");
        assert_eq!(combined.header(), ["##source=A".to_string(), "##source=B".to_string()]);
    }

    #[test]
    fn test_keep_first_idempotent() {
        let a = collection("##source=A", vec![
            record("chr1", 100, "A", "T", "PASS"),
            record("chr1", 200, "C", "G", "PASS")
        ]);
        let combined = combine(std::slice::from_ref(&a), DuplicateHandling::KeepFirst).unwrap();
        assert_eq!(combined, a);
    }

    #[test]
    fn test_keep_none_of_duplicate() {
        let a = collection("##source=A", vec![
            record("chr1", 100, "A", "T", "PASS"),
            record("chr1", 200, "C", "G", "PASS"),
            record("chr2", 300, "G", "A", "PASS")
        ]);
        let b = collection("##source=B", vec![
            record("chr1", 200, "C", "G", "q10"),
            record("chr3", 400, "T", "C", "PASS")
        ]);

        let combined = combine(&[a, b], DuplicateHandling::KeepNoneOfDuplicate).unwrap();
        assert_eq!(combined.len(), 2);
        assert_eq!(combined.records()[0].position(), 100);
        assert_eq!(combined.records()[1].position(), 300);
        // nothing from the subtrahend side appears
        assert!(combined.records().iter().all(|r| r.chromosome() != "chr3"));
    }

    #[test]
    fn test_keep_none_rejects_other_shapes() {
        let a = collection("##source=A", vec![]);
        let b = collection("##source=B", vec![]);
        let c = collection("##source=C", vec![]);

        assert!(matches!(
            combine(&[a.clone(), b, c], DuplicateHandling::KeepNoneOfDuplicate),
            Err(CombineError::UnsupportedInputShape { count: 3 })
        ));
        assert!(matches!(
            combine(&[a], DuplicateHandling::KeepNoneOfDuplicate),
            Err(CombineError::UnsupportedInputShape { count: 1 })
        ));
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(
            combine(&[], DuplicateHandling::KeepFirst),
            Err(CombineError::EmptyInput)
        ));
    }

    #[test]
    fn test_header_dedup_by_exact_text() {
        let a = VariantCollection::new(
            vec!["##fileformat=VCFv4.2".to_string(), "##source=A".to_string()],
            vec![]
        );
        let b = VariantCollection::new(
            vec!["##fileformat=VCFv4.2".to_string(), "##source=B".to_string()],
            vec![]
        );
        let combined = combine(&[a, b], DuplicateHandling::KeepFirst).unwrap();
        assert_eq!(combined.header(), [
            "##fileformat=VCFv4.2".to_string(),
            "##source=A".to_string(),
            "##source=B".to_string()
        ]);
    }

    #[test]
    fn test_combine_files_round_trip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let a_fn = temp_dir.path().join("a.vcf");
        let b_fn = temp_dir.path().join("b.vcf");
        let out_fn = temp_dir.path().join("out.vcf");

        collection("##source=A", vec![record("chr1", 100, "A", "T", "PASS")]).write(&a_fn).unwrap();
        collection("##source=B", vec![record("chr1", 100, "A", "T", "q10")]).write(&b_fn).unwrap();

        let combined = combine_files(&out_fn, &[a_fn, b_fn], DuplicateHandling::KeepFirst).unwrap();
        assert_eq!(combined.len(), 1);

        let reloaded = VariantCollection::from_path(&out_fn).unwrap();
        assert_eq!(reloaded, combined);
    }

    #[test]
    fn test_combine_files_missing_input() {
        let temp_dir = tempfile::tempdir().unwrap();
        let out_fn = temp_dir.path().join("out.vcf");
        let missing = temp_dir.path().join("missing.vcf");
        assert!(combine_files(&out_fn, &[missing], DuplicateHandling::KeepFirst).is_err());
    }
}
