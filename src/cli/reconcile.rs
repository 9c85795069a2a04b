
use anyhow::bail;
use clap::Args;
use log::info;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::core::{check_optional_filename, check_required_filename, AFTER_HELP, FULL_VERSION};
use crate::writers::report_summary::DEFAULT_VARIANT_TYPES;

#[derive(Args, Clone, Default, Serialize)]
#[clap(author, about,
    after_help = &**AFTER_HELP
)]
pub struct ReconcileSettings {
    #[clap(default_value = "")]
    #[clap(hide = true)]
    varrec_version: String,

    /// Reference FASTA file
    #[clap(required = true)]
    #[clap(short = 'r')]
    #[clap(long = "reference")]
    #[clap(value_name = "FASTA")]
    #[clap(help_heading = Some("Input/Output"))]
    pub reference_fn: PathBuf,

    /// SDF-formatted reference folder [default: generated next to the FASTA]
    #[clap(long = "sdf")]
    #[clap(value_name = "SDF")]
    #[clap(help_heading = Some("Input/Output"))]
    pub sdf: Option<PathBuf>,

    /// Truth variant call file (VCF)
    #[clap(required = true)]
    #[clap(short = 't')]
    #[clap(long = "truth-vcf")]
    #[clap(value_name = "VCF")]
    #[clap(help_heading = Some("Input/Output"))]
    pub truth_vcf_filename: PathBuf,

    /// Variant calls to be evaluated (VCF); exactly one collection is supported
    #[clap(required = true)]
    #[clap(short = 'q')]
    #[clap(long = "call-vcf")]
    #[clap(value_name = "VCF")]
    #[clap(help_heading = Some("Input/Output"))]
    pub call_vcf_filenames: Vec<PathBuf>,

    /// Master whitelist collection for false-call pairing, if applicable
    #[clap(long = "master-vcf")]
    #[clap(value_name = "VCF")]
    #[clap(help_heading = Some("Input/Output"))]
    pub master_vcf: Option<PathBuf>,

    /// The original caller output for false-call pairing, if applicable
    #[clap(long = "pairing-vcf")]
    #[clap(value_name = "VCF")]
    #[clap(help_heading = Some("Input/Output"))]
    pub pairing_vcf: Option<PathBuf>,

    /// BED file to restrict the summary counting
    #[clap(short = 'b')]
    #[clap(long = "regions")]
    #[clap(value_name = "BED")]
    #[clap(help_heading = Some("Input/Output"))]
    pub regions: Option<PathBuf>,

    /// Output directory containing the reconciled and annotated collections
    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output-dir")]
    #[clap(value_name = "DIR")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_folder: PathBuf,

    /// Optional output debug folder
    #[clap(long = "output-debug")]
    #[clap(value_name = "DIR")]
    #[clap(help_heading = Some("Input/Output"))]
    pub debug_folder: Option<PathBuf>,

    /// The sample name to use in multi-sample collections
    #[clap(long = "sample")]
    #[clap(value_name = "SAMPLE")]
    #[clap(help_heading = Some("Input/Output"))]
    pub sample: Option<String>,

    /// Variant types tabulated in the summary
    #[clap(long = "var-types")]
    #[clap(value_name = "TYPE")]
    #[clap(help_heading = Some("Summary"))]
    pub var_types: Vec<String>,

    /// Length cutoff for SVs; only affects counting, not comparison
    #[clap(long = "sv-length")]
    #[clap(value_name = "BP")]
    #[clap(help_heading = Some("Summary"))]
    #[clap(default_value = "100")]
    pub sv_length: u32,

    /// Use either break-end of a variant for region filtering instead of both
    #[clap(long = "bed-either")]
    #[clap(help_heading = Some("Summary"))]
    pub bed_either: bool,

    /// User-defined size bin breaks for the summary
    #[clap(long = "bin-breaks")]
    #[clap(value_name = "STR")]
    #[clap(help_heading = Some("Summary"))]
    pub bin_breaks: Option<String>,

    /// Only consider records with PASS or "." in the FILTER column
    #[clap(long = "exclude-filtered")]
    #[clap(help_heading = Some("Comparison"))]
    pub exclude_filtered: bool,

    /// Compare genotypes in addition to alleles
    #[clap(long = "match-genotype")]
    #[clap(help_heading = Some("Comparison"))]
    pub match_genotype: bool,

    /// For a partially-matched false negative, output all matching calls as false positive
    #[clap(long = "disallow-partial-fp")]
    #[clap(help_heading = Some("Comparison"))]
    pub disallow_partial_fp: bool,

    /// Jar file for the allele-level comparator engine
    #[clap(required = true)]
    #[clap(long = "allele-jar")]
    #[clap(value_name = "JAR")]
    #[clap(help_heading = Some("Engines"))]
    pub allele_jar: PathBuf,

    /// Jar file for the genotype-aware comparator engine
    #[clap(required = true)]
    #[clap(long = "genotype-jar")]
    #[clap(value_name = "JAR")]
    #[clap(help_heading = Some("Engines"))]
    pub genotype_jar: PathBuf,

    /// Path to the java executable
    #[clap(long = "java")]
    #[clap(value_name = "PATH")]
    #[clap(help_heading = Some("Engines"))]
    #[clap(default_value = "java")]
    pub java: PathBuf,

    /// Maximum java heap for every engine invocation
    #[clap(long = "java-max-mem")]
    #[clap(value_name = "XMX")]
    #[clap(help_heading = Some("Engines"))]
    #[clap(default_value = "10g")]
    pub java_max_mem: String,

    /// Additional options for the allele-level engine
    #[clap(long = "allele-options")]
    #[clap(value_name = "OPT")]
    #[clap(help_heading = Some("Engines"))]
    pub allele_options: Option<String>,

    /// Additional options for the genotype-aware engine
    #[clap(long = "genotype-options")]
    #[clap(value_name = "OPT")]
    #[clap(help_heading = Some("Engines"))]
    pub genotype_options: Option<String>,

    /// Enable verbose output.
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

pub fn check_reconcile_settings(mut settings: ReconcileSettings) -> anyhow::Result<ReconcileSettings> {
    // hard code the version in
    settings.varrec_version = FULL_VERSION.clone();
    info!("Varrec version: {:?}", &settings.varrec_version);
    info!("Sub-command: reconcile");
    info!("Inputs:");

    // check for all the required input files
    check_required_filename(&settings.reference_fn, "Reference FASTA")?;
    check_required_filename(&settings.truth_vcf_filename, "Truth VCF")?;
    for call_fn in settings.call_vcf_filenames.iter() {
        check_required_filename(call_fn, "Call VCF")?;
    }
    check_optional_filename(settings.sdf.as_deref(), "SDF reference")?;
    check_optional_filename(settings.master_vcf.as_deref(), "Master VCF")?;
    check_optional_filename(settings.pairing_vcf.as_deref(), "Pairing VCF")?;
    check_optional_filename(settings.regions.as_deref(), "Regions")?;
    check_required_filename(&settings.allele_jar, "Allele engine jar")?;
    check_required_filename(&settings.genotype_jar, "Genotype engine jar")?;

    // the downstream engines only handle a single call collection
    if settings.call_vcf_filenames.len() != 1 {
        bail!("Exactly one call VCF is supported, got {}", settings.call_vcf_filenames.len());
    }

    // the pairing inputs only make sense together
    if settings.master_vcf.is_some() != settings.pairing_vcf.is_some() {
        bail!("--master-vcf and --pairing-vcf must be provided together");
    }

    // dump stuff to the logger
    info!("\tReference: {:?}", &settings.reference_fn);
    if let Some(sdf) = settings.sdf.as_deref() {
        info!("\tSDF reference: {sdf:?}");
    } else {
        info!("\tSDF reference: None, will be generated");
    }
    info!("\tTruth VCF: {:?}", &settings.truth_vcf_filename);
    info!("\tCall VCF: {:?}", &settings.call_vcf_filenames[0]);
    if let Some(master_fn) = settings.master_vcf.as_deref() {
        info!("\tMaster VCF: {master_fn:?}");
    }
    if let Some(pairing_fn) = settings.pairing_vcf.as_deref() {
        info!("\tPairing VCF: {pairing_fn:?}");
    }
    if let Some(sample) = settings.sample.as_deref() {
        info!("\tSample: {sample:?}");
    }
    if let Some(bed_fn) = settings.regions.as_deref() {
        info!("\tRegions: {bed_fn:?}");
    } else {
        info!("\tRegions: None");
    }

    if settings.var_types.is_empty() {
        settings.var_types = DEFAULT_VARIANT_TYPES.iter().map(|s| s.to_string()).collect();
    }

    // outputs
    info!("Outputs:");
    info!("\tOutput folder: {:?}", &settings.output_folder);
    if let Some(debug_folder) = settings.debug_folder.as_ref() {
        info!("\tDebug folder: {debug_folder:?}");
    }

    info!("Comparison parameters:");
    info!("\tExclude filtered: {}", if settings.exclude_filtered { "ENABLED" } else { "DISABLED" });
    info!("\tGenotype matching: {}", if settings.match_genotype { "ENABLED" } else { "DISABLED" });
    info!("\tDisallow partial FP: {}", if settings.disallow_partial_fp { "ENABLED" } else { "DISABLED" });

    info!("Summary parameters:");
    info!("\tVariant types: {:?}", settings.var_types);
    info!("\tSV length cutoff: {}", settings.sv_length);

    info!("Engine parameters:");
    info!("\tJava: {:?}", settings.java);
    info!("\tJava max heap: {:?}", settings.java_max_mem);
    info!("\tAllele engine jar: {:?}", settings.allele_jar);
    info!("\tGenotype engine jar: {:?}", settings.genotype_jar);

    Ok(settings)
}
