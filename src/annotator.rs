
use anyhow::Context;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use crate::comparators::{ComparatorOptionsBuilder, GenotypeAwareComparator};
use crate::data_types::collection::VariantCollection;
use crate::data_types::depth_fields::DepthLayout;
use crate::data_types::variant_record::VariantRecord;
use crate::matcher::{find_closest, find_matching_alleles};

/// Everything a pairing pass needs beyond the false calls themselves
pub struct PairingContext<'a> {
    /// The engine used for the per-query genotype-insensitive sub-runs
    pub comparator: &'a GenotypeAwareComparator,
    /// SDF-formatted reference folder for the engine
    pub sdf: &'a Path,
    /// Where scratch files and the annotated output land
    pub out_dir: &'a Path,
    /// Optional sample selector pass-through
    pub sample: Option<String>,
    /// Extra engine arguments pass-through
    pub extra_args: Vec<String>
}

/// Pairs every false call in a collection against an ordered list of candidate
/// collections and writes an annotated copy of the collection.
///
/// Pairing index determines the derived annotation segments (conventionally the
/// candidates are [call collection, master/whitelist, cross-check FN set]):
/// * index 0 - allele fractions and total depth of the matched record
/// * index 1 - identity string of the matched record
/// * index 2 - "pure" when unmatched (a genuinely absent event), "not" otherwise
///
/// Each query spawns one synchronous engine sub-run per candidate collection,
/// so wall-clock cost is linear in the number of false calls. A per-record
/// failure does not abort the pass: the record is emitted unannotated with a
/// warning.
/// # Arguments
/// * `ctx` - shared pairing inputs
/// * `false_calls_fn` - the residual FN or FP collection to annotate
/// * `pair_with_fns` - the ordered candidate collections
/// # Errors
/// * if the false-call collection or a candidate collection cannot be loaded
/// * if the annotated output cannot be written
pub fn annotate_false_calls(
    ctx: &PairingContext,
    false_calls_fn: &Path,
    pair_with_fns: &[PathBuf]
) -> anyhow::Result<PathBuf> {
    let false_calls = VariantCollection::from_path(false_calls_fn)
        .with_context(|| format!("Error while loading {false_calls_fn:?}:"))?;

    let candidates: Vec<(String, VariantCollection)> = pair_with_fns.iter()
        .map(|filename| {
            let collection = VariantCollection::from_path(filename)
                .with_context(|| format!("Error while loading {filename:?}:"))?;
            Ok((filename.display().to_string(), collection))
        })
        .collect::<anyhow::Result<_>>()?;

    info!("Pairing {} false calls from {:?} against {} candidate collections...",
        false_calls.len(), false_calls_fn, candidates.len());

    let mut annotated_records = Vec::with_capacity(false_calls.len());
    for record in false_calls.records().iter() {
        match annotate_record(ctx, record, false_calls.header(), &candidates) {
            Ok(annotated) => annotated_records.push(annotated),
            Err(e) => {
                // isolate per-record failures; the record passes through untouched
                warn!("Error while annotating {}: {e:#}; emitting record unannotated",
                    record.identity_string());
                annotated_records.push(record.clone());
            }
        }
    }

    let annotated_fn = ctx.out_dir.join(format!("{}_annotated.vcf", collection_stem(false_calls_fn)));
    VariantCollection::new(false_calls.header().to_vec(), annotated_records)
        .write(&annotated_fn)
        .with_context(|| format!("Error while writing {annotated_fn:?}:"))?;
    info!("Annotated collection saved to {annotated_fn:?}");
    Ok(annotated_fn)
}

/// Builds the annotated copy of one false call.
fn annotate_record(
    ctx: &PairingContext,
    record: &VariantRecord,
    header: &[String],
    candidates: &[(String, VariantCollection)]
) -> anyhow::Result<VariantRecord> {
    let mut annotation = String::new();
    for (pair_index, (name, collection)) in candidates.iter().enumerate() {
        let matched = match pair_candidate(ctx, record, header, collection) {
            Ok(m) => m,
            Err(e) => {
                // a failed search degrades to "no match" rather than aborting
                warn!("Match search failed for {} against {name}: {e:#}; treating as no match",
                    record.identity_string());
                None
            }
        };
        annotation.push_str(&annotation_segment(pair_index, matched.as_ref()));
    }

    let mut annotated = record.clone();
    annotated.set_annotation(annotation);
    Ok(annotated)
}

/// Runs one genotype-insensitive engine sub-run for a single query against one
/// candidate collection and searches its output for the closest match.
/// Scratch files are removed on every exit path.
fn pair_candidate(
    ctx: &PairingContext,
    record: &VariantRecord,
    header: &[String],
    candidates: &VariantCollection
) -> anyhow::Result<Option<VariantRecord>> {
    // scope the candidates to the query chromosome before comparing
    let filtered = candidates.filter_chromosome(record.chromosome());

    let single_fn = ctx.out_dir.join("single.vcf");
    let filtered_fn = ctx.out_dir.join("filtered.vcf");
    let compare_prefix = ctx.out_dir.join("pairing_compare_results");
    let _scratch = ScratchGuard {
        files: vec![single_fn.clone(), filtered_fn.clone()],
        folders: vec![compare_prefix.clone()]
    };

    VariantCollection::single(header, record.clone()).write(&single_fn)?;
    filtered.write(&filtered_fn)?;

    let options = ComparatorOptionsBuilder::default()
        .prefix(compare_prefix)
        .truth_vcf(filtered_fn)
        .reference(ctx.sdf.to_path_buf())
        .calls(vec![single_fn])
        .sample(ctx.sample.clone())
        .extra_args(ctx.extra_args.clone())
        .build()?;
    debug!("Pairing sub-run for {}...", record.identity_string());
    let outputs = ctx.comparator.run(&options)?;

    let engine_matched = VariantCollection::from_path(&outputs.tp)?;
    let matched = find_closest(record, &engine_matched).cloned()
        // the engine will not pair a homozygous-reference call even with
        // genotype matching off; an identical-allele record at the locus
        // still counts as a match
        .or_else(|| find_matching_alleles(record, &filtered).cloned());
    Ok(matched)
}

/// Derives the annotation segment(s) for one pairing slot.
/// # Arguments
/// * `pair_index` - position of the candidate collection in the pairing list
/// * `matched` - the match found there, if any
fn annotation_segment(pair_index: usize, matched: Option<&VariantRecord>) -> String {
    let mut segment = String::new();
    match pair_index {
        0 => {
            match matched.and_then(DepthLayout::resolve) {
                Some(layout) => segment.push_str(&layout.fraction_field()),
                None => segment.push_str("N/A")
            }
            segment.push(';');
            segment.push_str(matched.and_then(|m| m.annotation_value("DP")).unwrap_or("N/A"));
            segment.push(';');
        },
        1 => {
            match matched {
                Some(m) => segment.push_str(&m.identity_string()),
                None => segment.push_str("N/A")
            }
            segment.push(';');
        },
        2 => {
            segment.push_str(if matched.is_none() { "pure" } else { "not" });
            segment.push(';');
        },
        _ => {
            // pairing slots past the purity check carry no annotation
        }
    }
    segment
}

/// Strips the collection extensions off a path for output naming.
fn collection_stem(path: &Path) -> String {
    let name = path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    let name = name.strip_suffix(".vcf").unwrap_or(name);
    name.to_string()
}

/// Removes per-query scratch files when the pairing attempt ends, successful
/// or not. Cleanup problems are logged, never fatal.
struct ScratchGuard {
    files: Vec<PathBuf>,
    folders: Vec<PathBuf>
}

impl Drop for ScratchGuard {
    fn drop(&mut self) {
        for filename in self.files.iter() {
            if filename.is_file() {
                if let Err(e) = std::fs::remove_file(filename) {
                    warn!("Error while removing scratch file {filename:?}: {e}");
                }
            } else {
                warn!("Expected scratch file missing during cleanup: {filename:?}");
            }
        }
        for folder in self.folders.iter() {
            if folder.is_dir() {
                if let Err(e) = std::fs::remove_dir_all(folder) {
                    warn!("Error while removing scratch folder {folder:?}: {e}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparators::JavaRuntime;

    fn matched_record(tail: &str) -> VariantRecord {
        let line = format!("chr1\t100\trs1\tA\tT\t50\tPASS\t.\t{tail}");
        VariantRecord::parse_line(&line).unwrap()
    }

    #[test]
    fn test_depth_segment_with_match() {
        // RO=10, one AO=5 via the combined layout
        let matched = matched_record("GT:AD:DP\t0/1:10,5:15");
        assert_eq!(annotation_segment(0, Some(&matched)), "0.3333333333333333;15;");
    }

    #[test]
    fn test_depth_segment_without_layout() {
        let matched = matched_record("GT\t0/1");
        assert_eq!(annotation_segment(0, Some(&matched)), "N/A;N/A;");
        assert_eq!(annotation_segment(0, None), "N/A;N/A;");
    }

    #[test]
    fn test_identity_segment() {
        let matched = matched_record("GT\t0/1");
        assert_eq!(annotation_segment(1, Some(&matched)), "chr1_100_A_T_0/1;");
        assert_eq!(annotation_segment(1, None), "N/A;");
    }

    #[test]
    fn test_purity_segment() {
        let matched = matched_record("GT\t0/1");
        assert_eq!(annotation_segment(2, Some(&matched)), "not;");
        assert_eq!(annotation_segment(2, None), "pure;");
    }

    #[test]
    fn test_extra_slots_are_silent() {
        let matched = matched_record("GT\t0/1");
        assert_eq!(annotation_segment(3, Some(&matched)), "");
    }

    #[test]
    fn test_collection_stem() {
        assert_eq!(collection_stem(Path::new("/out/merge_fp.vcf")), "merge_fp");
        assert_eq!(collection_stem(Path::new("/out/merge_fn.vcf.gz")), "merge_fn");
    }

    /// With no candidates on the query chromosome the engine sub-run takes the
    /// empty-truth shortcut, so the whole pass runs without a real engine and
    /// every slot reports unmatched.
    #[test]
    fn test_unmatched_pass_end_to_end() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path();

        let header = vec!["##fileformat=VCFv4.2".to_string()];
        let false_call = VariantRecord::parse_line("chr1\t100\t.\tA\tT\t50\tPASS\t.\tGT\t0/1").unwrap();
        let false_calls_fn = dir.join("merge_fp.vcf");
        VariantCollection::new(header.clone(), vec![false_call]).write(&false_calls_fn).unwrap();

        // candidate records all live on another chromosome
        let other = VariantRecord::parse_line("chr9\t900\t.\tG\tC\t50\tPASS\t.\tGT\t0/1").unwrap();
        let candidate_fn = dir.join("calls.vcf");
        VariantCollection::new(header, vec![other]).write(&candidate_fn).unwrap();

        let comparator = GenotypeAwareComparator::new(JavaRuntime::default(), PathBuf::from("/no/such.jar"));
        let ctx = PairingContext {
            comparator: &comparator,
            sdf: Path::new("/no/such.sdf"),
            out_dir: dir,
            sample: None,
            extra_args: vec![]
        };

        let annotated_fn = annotate_false_calls(
            &ctx, &false_calls_fn,
            &[candidate_fn.clone(), candidate_fn.clone(), candidate_fn]
        ).unwrap();
        assert_eq!(annotated_fn, dir.join("merge_fp_annotated.vcf"));

        let annotated = VariantCollection::from_path(&annotated_fn).unwrap();
        assert_eq!(annotated.len(), 1);
        assert_eq!(
            annotated.records()[0].format_line(),
            "chr1\t100\t.\tA\tT\t50\tN/A;N/A;N/A;pure;\t.\tGT\t0/1"
        );

        // scratch files must be gone
        assert!(!dir.join("single.vcf").exists());
        assert!(!dir.join("filtered.vcf").exists());
        assert!(!dir.join("pairing_compare_results").exists());
    }
}
