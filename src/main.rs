
use log::{LevelFilter, error, info};
use std::path::PathBuf;
use std::time::Instant;

use varrec::annotator::{PairingContext, annotate_false_calls};
use varrec::cli::combine::{CombineSettings, check_combine_settings};
use varrec::cli::core::{Commands, get_cli};
use varrec::cli::reconcile::{ReconcileSettings, check_reconcile_settings};
use varrec::combiner::combine_files;
use varrec::comparators::{
    AlleleComparator, ComparatorOptionsBuilder, GenotypeAwareComparator, JavaRuntime, ensure_sdf
};
use varrec::reconciler::reconcile_partitions;
use varrec::util::json_io::save_json;
use varrec::writers::report_summary::summarize_partition;

/// Sets up env_logger from the shared verbosity flag
fn init_logging(verbosity: u8) {
    let filter_level: LevelFilter = match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace
    };
    env_logger::builder()
        .format_timestamp_millis()
        .filter_level(filter_level)
        .init();
}

/// Splits a verbatim engine-option string into arguments
fn split_engine_options(options: Option<&str>) -> Vec<String> {
    options.map(|s| s.split_whitespace().map(String::from).collect())
        .unwrap_or_default()
}

fn run_reconcile(settings: ReconcileSettings) {
    // start the timer
    let start_time = Instant::now();

    // set up logging before we check the other settings
    init_logging(settings.verbosity);

    let settings = match check_reconcile_settings(settings) {
        Ok(s) => s,
        Err(e) => {
            error!("Error while verifying settings: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };

    // create the primary output folder
    info!("Creating output folder at {:?}...", settings.output_folder);
    match std::fs::create_dir_all(&settings.output_folder) {
        Ok(()) => {},
        Err(e) => {
            error!("Error while creating output folder: {e}");
            std::process::exit(exitcode::IOERR);
        }
    }

    // create a debug folder if specified, files might get created in sub-routines
    if let Some(debug_folder) = settings.debug_folder.as_ref() {
        info!("Creating debug folder at {debug_folder:?}...");
        match std::fs::create_dir_all(debug_folder) {
            Ok(()) => {},
            Err(e) => {
                error!("Error while creating debug folder: {e}");
                std::process::exit(exitcode::IOERR);
            }
        }

        // save the CLI options
        let cli_json = debug_folder.join("cli_settings.json");
        info!("Saving CLI options to {cli_json:?}...");
        if let Err(e) = save_json(&settings, &cli_json) {
            error!("Error while saving CLI options: {e}");
            std::process::exit(exitcode::IOERR);
        }
    }

    let runtime = JavaRuntime {
        java: settings.java.clone(),
        max_memory: settings.java_max_mem.clone()
    };

    // first pass: the allele-level engine partitions the calls into TP/FN/FP
    info!("Running the allele-level comparison...");
    let allele_engine = AlleleComparator::new(
        runtime.clone(), settings.allele_jar.clone(),
        settings.disallow_partial_fp, settings.sv_length
    );
    let allele_options = match ComparatorOptionsBuilder::default()
        .prefix(settings.output_folder.join("allele_compare"))
        .truth_vcf(settings.truth_vcf_filename.clone())
        .reference(settings.reference_fn.clone())
        .calls(settings.call_vcf_filenames.clone())
        .regions(settings.regions.clone())
        .sample(settings.sample.clone())
        .exclude_filtered(settings.exclude_filtered)
        .match_genotype(settings.match_genotype)
        .extra_args(split_engine_options(settings.allele_options.as_deref()))
        .build() {
        Ok(o) => o,
        Err(e) => {
            error!("Error while building allele engine options: {e}");
            std::process::exit(exitcode::CONFIG);
        }
    };
    let allele_outputs = match allele_engine.run(&allele_options) {
        Ok(o) => o,
        Err(e) => {
            error!("Error while running the allele-level comparison: {e:#}");
            std::process::exit(exitcode::SOFTWARE);
        }
    };

    // the genotype-aware engine wants the reference in SDF form
    let sdf: PathBuf = match settings.sdf.clone() {
        Some(sdf) => sdf,
        None => match ensure_sdf(&settings.reference_fn, &runtime, &settings.genotype_jar) {
            Ok(sdf) => sdf,
            Err(e) => {
                error!("Error while preparing the SDF reference: {e:#}");
                std::process::exit(exitcode::SOFTWARE);
            }
        }
    };

    // second pass: re-evaluate the disagreements, with the allele-level FN as
    // truth and the allele-level FP as calls
    info!("Running the genotype-aware comparison on the residual calls...");
    let genotype_engine = GenotypeAwareComparator::new(runtime.clone(), settings.genotype_jar.clone());
    let genotype_options = match ComparatorOptionsBuilder::default()
        .prefix(settings.output_folder.join("genotype_compare_results"))
        .truth_vcf(allele_outputs.false_negative.clone())
        .reference(sdf.clone())
        .calls(vec![allele_outputs.false_positive.clone()])
        .regions(settings.regions.clone())
        .sample(settings.sample.clone())
        .exclude_filtered(settings.exclude_filtered)
        .match_genotype(settings.match_genotype)
        .extra_args(split_engine_options(settings.genotype_options.as_deref()))
        .build() {
        Ok(o) => o,
        Err(e) => {
            error!("Error while building genotype engine options: {e}");
            std::process::exit(exitcode::CONFIG);
        }
    };
    let genotype_outputs = match genotype_engine.run(&genotype_options) {
        Ok(o) => o,
        Err(e) => {
            error!("Error while running the genotype-aware comparison: {e:#}");
            std::process::exit(exitcode::SOFTWARE);
        }
    };
    let secondary_tp_predict = match genotype_outputs.tp_predict.as_deref() {
        Some(p) => p,
        None => {
            error!("The genotype-aware engine did not produce a call-side TP collection");
            std::process::exit(exitcode::SOFTWARE);
        }
    };

    // fold the two partitions together
    info!("Reconciling the comparator partitions...");
    let partition = match reconcile_partitions(
        &settings.output_folder,
        &allele_outputs.tp, &allele_outputs.false_negative, &allele_outputs.false_positive,
        &genotype_outputs.tp, secondary_tp_predict
    ) {
        Ok(p) => p,
        Err(e) => {
            error!("Error while reconciling the comparator partitions: {e:#}");
            std::process::exit(exitcode::SOFTWARE);
        }
    };

    // re-classify and tabulate the augmented partition
    info!("Summarizing the augmented partition...");
    let summary_fn = settings.output_folder.join("summary.tsv");
    let partition = match summarize_partition(
        &runtime, &settings.allele_jar,
        &settings.output_folder.join("augmented"),
        &partition,
        &settings.var_types, settings.sv_length,
        settings.regions.as_deref(), settings.bed_either,
        settings.bin_breaks.as_deref(),
        &summary_fn
    ) {
        Ok(p) => p,
        Err(e) => {
            error!("Error while summarizing the augmented partition: {e:#}");
            std::process::exit(exitcode::SOFTWARE);
        }
    };

    // optionally pair the residual false calls with the candidate collections
    if let (Some(master_fn), Some(pairing_fn)) = (settings.master_vcf.as_ref(), settings.pairing_vcf.as_ref()) {
        let ctx = PairingContext {
            comparator: &genotype_engine,
            sdf: &sdf,
            out_dir: &settings.output_folder,
            sample: settings.sample.clone(),
            extra_args: split_engine_options(settings.genotype_options.as_deref())
        };

        info!("Annotating the residual false positives...");
        let fp_candidates = vec![
            pairing_fn.clone(), master_fn.clone(), partition.false_negative.clone()
        ];
        let annotated_fp = match annotate_false_calls(&ctx, &partition.false_positive, &fp_candidates) {
            Ok(p) => p,
            Err(e) => {
                error!("Error while annotating false positives: {e:#}");
                std::process::exit(exitcode::SOFTWARE);
            }
        };

        info!("Annotating the residual false negatives...");
        let annotated_fn = match annotate_false_calls(&ctx, &partition.false_negative, &[pairing_fn.clone()]) {
            Ok(p) => p,
            Err(e) => {
                error!("Error while annotating false negatives: {e:#}");
                std::process::exit(exitcode::SOFTWARE);
            }
        };

        info!("Annotated false positives: {annotated_fp:?}");
        info!("Annotated false negatives: {annotated_fn:?}");
    }

    info!("Augmented true positives: {:?}", partition.true_positive);
    info!("Augmented false negatives: {:?}", partition.false_negative);
    info!("Augmented false positives: {:?}", partition.false_positive);
    info!("Summary table: {summary_fn:?}");
    info!("Reconciliation completed in {} seconds.", start_time.elapsed().as_secs_f64());
}

fn run_combine(settings: CombineSettings) {
    // set up logging before we check the other settings
    init_logging(settings.verbosity);

    let settings = match check_combine_settings(settings) {
        Ok(s) => s,
        Err(e) => {
            error!("Error while verifying settings: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };

    let combined = match combine_files(&settings.output_filename, &settings.input_filenames, settings.mode) {
        Ok(c) => c,
        Err(e) => {
            error!("Error while combining the collections: {e:#}");
            std::process::exit(exitcode::SOFTWARE);
        }
    };
    info!("Wrote {} records to {:?}", combined.len(), settings.output_filename);
}

fn main() {
    let cli = get_cli();
    match cli.command {
        Commands::Reconcile(settings) => {
            run_reconcile(*settings);
        },
        Commands::Combine(settings) => {
            run_combine(*settings);
        }
    }

    info!("Process finished successfully.");
}
