
use anyhow::bail;
use clap::Args;
use log::info;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::core::{check_required_filename, AFTER_HELP, FULL_VERSION};
use crate::combiner::DuplicateHandling;

#[derive(Args, Clone, Default, Serialize)]
#[clap(author, about,
    after_help = &**AFTER_HELP
)]
pub struct CombineSettings {
    #[clap(default_value = "")]
    #[clap(hide = true)]
    varrec_version: String,

    /// Input variant call files (VCF), in priority order
    #[clap(required = true)]
    #[clap(short = 'i')]
    #[clap(long = "input-vcf")]
    #[clap(value_name = "VCF")]
    #[clap(help_heading = Some("Input/Output"))]
    pub input_filenames: Vec<PathBuf>,

    /// Output variant call file (VCF)
    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output-vcf")]
    #[clap(value_name = "VCF")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_filename: PathBuf,

    /// Duplicate key handling while combining
    #[clap(short = 'm')]
    #[clap(long = "mode")]
    #[clap(value_enum)]
    #[clap(value_name = "MODE")]
    #[clap(default_value = "keep-first")]
    pub mode: DuplicateHandling,

    /// Enable verbose output.
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

pub fn check_combine_settings(mut settings: CombineSettings) -> anyhow::Result<CombineSettings> {
    // hard code the version in
    settings.varrec_version = FULL_VERSION.clone();
    info!("Varrec version: {:?}", &settings.varrec_version);
    info!("Sub-command: combine");
    info!("Inputs:");

    for input_fn in settings.input_filenames.iter() {
        check_required_filename(input_fn, "Input VCF")?;
    }

    // the subtraction mode is defined pairwise only
    if settings.mode == DuplicateHandling::KeepNoneOfDuplicate && settings.input_filenames.len() != 2 {
        bail!(
            "Mode {:?} requires exactly two inputs, got {}",
            settings.mode, settings.input_filenames.len()
        );
    }

    for input_fn in settings.input_filenames.iter() {
        info!("\tInput VCF: {input_fn:?}");
    }
    info!("Outputs:");
    info!("\tOutput VCF: {:?}", &settings.output_filename);
    info!("Parameters:");
    info!("\tMode: {:?}", settings.mode);

    Ok(settings)
}
