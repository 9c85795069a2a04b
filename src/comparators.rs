
use anyhow::Context;
use derive_builder::Builder;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::data_types::collection::VariantCollection;

#[derive(thiserror::Error, Debug)]
pub enum ComparatorError {
    #[error("expected comparator output was not produced: {path:?}")]
    OutputMissing { path: PathBuf },
    #[error("the genotype-aware comparator takes exactly 1 call collection, got {count}")]
    UnsupportedInputShape { count: usize },
    #[error("comparator engine exited with {status}")]
    EngineFailure { status: std::process::ExitStatus }
}

/// Java invocation settings, threaded explicitly through every engine call.
#[derive(Clone, Debug)]
pub struct JavaRuntime {
    /// Path to the java executable
    pub java: PathBuf,
    /// Maximum heap, e.g. "10g"
    pub max_memory: String
}

impl Default for JavaRuntime {
    fn default() -> Self {
        Self {
            java: PathBuf::from("java"),
            max_memory: "10g".to_string()
        }
    }
}

impl JavaRuntime {
    /// The heap argument handed to every engine invocation
    fn xmx_arg(&self) -> String {
        format!("-Xmx{}", self.max_memory)
    }
}

/// Inputs shared by both comparator engines for a single run
#[derive(Builder, Clone, Debug)]
pub struct ComparatorOptions {
    /// Output prefix; a file-name prefix for the allele engine, a directory for the genotype-aware engine
    pub prefix: PathBuf,
    /// The truth collection
    pub truth_vcf: PathBuf,
    /// The reference; FASTA for the allele engine, SDF folder for the genotype-aware engine
    pub reference: PathBuf,
    /// The call collections under evaluation
    pub calls: Vec<PathBuf>,
    /// Optional BED region restriction
    #[builder(default)]
    pub regions: Option<PathBuf>,
    /// Optional sample selector for multi-sample collections
    #[builder(default)]
    pub sample: Option<String>,
    /// If true, only unfiltered records are considered
    #[builder(default)]
    pub exclude_filtered: bool,
    /// If true, genotypes must match in addition to alleles
    #[builder(default)]
    pub match_genotype: bool,
    /// Additional engine-specific arguments, passed through verbatim
    #[builder(default)]
    pub extra_args: Vec<String>
}

/// The classified collections an engine run produces.
/// `tp_predict` is only populated by engines that emit a call-side copy of
/// their true positives.
#[derive(Clone, Debug)]
pub struct ComparatorOutputs {
    /// True positives, truth-side representation
    pub tp: PathBuf,
    /// True positives, call-side representation, when the engine produces one
    pub tp_predict: Option<PathBuf>,
    /// False negatives
    pub false_negative: PathBuf,
    /// False positives
    pub false_positive: PathBuf
}

/// The two external engines we know how to drive. Both consume a truth
/// collection and call collections and deterministically produce TP/FN/FP
/// files; only the genotype-aware engine also produces a call-side TP.
pub enum VariantComparator {
    /// Allele-level comparison, tolerant of representations the other engine rejects
    Allele(AlleleComparator),
    /// Genotype/region-aware comparison with a call-side TP output
    GenotypeAware(GenotypeAwareComparator)
}

impl VariantComparator {
    /// Runs the underlying engine synchronously and verifies its outputs.
    /// There is no timeout: a hung engine blocks the pipeline indefinitely.
    /// # Arguments
    /// * `options` - the inputs for this run
    /// # Errors
    /// * if the engine cannot be spawned, fails, or does not produce an expected output
    pub fn run(&self, options: &ComparatorOptions) -> anyhow::Result<ComparatorOutputs> {
        match self {
            VariantComparator::Allele(engine) => engine.run(options),
            VariantComparator::GenotypeAware(engine) => engine.run(options)
        }
    }
}

/// Wrapper for the allele-level engine (a VarSim-style `vcfcompare` jar).
pub struct AlleleComparator {
    runtime: JavaRuntime,
    jar: PathBuf,
    /// If true, partially-matched false negatives emit all their matching calls as FP
    disallow_partial_fp: bool,
    /// Length cutoff separating small variants from SVs
    sv_length: u32
}

impl AlleleComparator {
    /// Constructor
    /// # Arguments
    /// * `runtime` - java invocation settings
    /// * `jar` - the engine jar file
    /// * `disallow_partial_fp` - engine flag pass-through
    /// * `sv_length` - SV length cutoff
    pub fn new(runtime: JavaRuntime, jar: PathBuf, disallow_partial_fp: bool, sv_length: u32) -> Self {
        Self {
            runtime,
            jar,
            disallow_partial_fp,
            sv_length
        }
    }

    /// Builds the full argument list for one run; separated out for testability.
    fn command_args(&self, options: &ComparatorOptions) -> Vec<String> {
        let mut args = vec![
            self.runtime.xmx_arg(),
            "-jar".to_string(), self.jar.display().to_string(),
            "vcfcompare".to_string(),
            "-prefix".to_string(), options.prefix.display().to_string(),
            "-true_vcf".to_string(), options.truth_vcf.display().to_string(),
            "-reference".to_string(), options.reference.display().to_string()
        ];
        if options.exclude_filtered {
            args.push("-exclude_filtered".to_string());
        }
        if options.match_genotype {
            args.push("-match_geno".to_string());
        }
        if let Some(sample) = options.sample.as_deref() {
            args.push("-sample".to_string());
            args.push(sample.to_string());
        }
        if let Some(regions) = options.regions.as_deref() {
            args.push("-bed".to_string());
            args.push(regions.display().to_string());
        }
        if self.disallow_partial_fp {
            args.push("-disallow_partial_fp".to_string());
        }
        args.push("-sv_length".to_string());
        args.push(self.sv_length.to_string());
        args.extend(options.extra_args.iter().cloned());
        args.extend(options.calls.iter().map(|c| c.display().to_string()));
        args
    }

    /// Runs the engine and checks for the three expected output collections.
    pub fn run(&self, options: &ComparatorOptions) -> anyhow::Result<ComparatorOutputs> {
        let mut command = Command::new(&self.runtime.java);
        command.args(self.command_args(options));
        run_engine(command)?;

        let prefix = options.prefix.display().to_string();
        let tp = PathBuf::from(format!("{prefix}_TP.vcf"));
        let false_negative = PathBuf::from(format!("{prefix}_FN.vcf"));
        let false_positive = PathBuf::from(format!("{prefix}_FP.vcf"));
        for path in [&tp, &false_negative, &false_positive] {
            check_output_exists(path)?;
        }

        Ok(ComparatorOutputs {
            tp,
            tp_predict: None, // this engine has no call-side TP output
            false_negative,
            false_positive
        })
    }
}

/// Wrapper for the genotype/region-aware engine (an RTG-style `vcfeval` jar).
pub struct GenotypeAwareComparator {
    runtime: JavaRuntime,
    jar: PathBuf
}

impl GenotypeAwareComparator {
    /// Constructor
    /// # Arguments
    /// * `runtime` - java invocation settings
    /// * `jar` - the engine jar file
    pub fn new(runtime: JavaRuntime, jar: PathBuf) -> Self {
        Self {
            runtime,
            jar
        }
    }

    /// Builds the full argument list for one run; separated out for testability.
    fn command_args(&self, options: &ComparatorOptions) -> Vec<String> {
        let mut args = vec![
            self.runtime.xmx_arg(),
            "-jar".to_string(), self.jar.display().to_string(),
            "vcfeval".to_string(),
            "-o".to_string(), options.prefix.display().to_string(),
            "--baseline".to_string(), options.truth_vcf.display().to_string(),
            "-t".to_string(), options.reference.display().to_string()
        ];
        if !options.exclude_filtered {
            args.push("--all-records".to_string());
        }
        if !options.match_genotype {
            args.push("--squash-ploidy".to_string());
        }
        if let Some(sample) = options.sample.as_deref() {
            args.push("--sample".to_string());
            args.push(sample.to_string());
        }
        if let Some(regions) = options.regions.as_deref() {
            args.push("--bed-regions".to_string());
            args.push(regions.display().to_string());
        }
        args.extend(options.extra_args.iter().cloned());
        args.push("--calls".to_string());
        args.push(options.calls[0].display().to_string());
        args
    }

    /// Runs the engine and checks for the four expected output collections.
    /// The engine refuses to run over an empty truth set, so that case is
    /// short-circuited here by synthesizing the trivially-correct outputs.
    pub fn run(&self, options: &ComparatorOptions) -> anyhow::Result<ComparatorOutputs> {
        if options.calls.len() != 1 {
            return Err(ComparatorError::UnsupportedInputShape { count: options.calls.len() }.into());
        }

        // the engine itself refuses to reuse an output folder
        if options.prefix.exists() {
            warn!("{:?} exists, removing...", options.prefix);
            std::fs::remove_dir_all(&options.prefix)
                .with_context(|| format!("Error while removing {:?}:", options.prefix))?;
        }

        let tp = options.prefix.join("tp-baseline.vcf.gz");
        let tp_predict = options.prefix.join("tp.vcf.gz");
        let false_negative = options.prefix.join("fn.vcf.gz");
        let false_positive = options.prefix.join("fp.vcf.gz");

        let truth = VariantCollection::from_path(&options.truth_vcf)
            .with_context(|| format!("Error while loading {:?}:", options.truth_vcf))?;
        if truth.is_empty() {
            // zero ground-truth records: TP and FN are empty, every call is FP,
            // and the call-side TP is just the call header
            debug!("Truth collection {:?} is empty, synthesizing outputs...", options.truth_vcf);
            std::fs::create_dir_all(&options.prefix)
                .with_context(|| format!("Error while creating {:?}:", options.prefix))?;
            truth.write(&tp)?;
            truth.write(&false_negative)?;

            let calls = VariantCollection::from_path(&options.calls[0])
                .with_context(|| format!("Error while loading {:?}:", options.calls[0]))?;
            calls.write(&false_positive)?;
            VariantCollection::new(calls.header().to_vec(), vec![]).write(&tp_predict)?;
        } else {
            let mut command = Command::new(&self.runtime.java);
            command.args(self.command_args(options));
            run_engine(command)?;
        }

        for path in [&tp, &tp_predict, &false_negative, &false_positive] {
            check_output_exists(path)?;
        }

        Ok(ComparatorOutputs {
            tp,
            tp_predict: Some(tp_predict),
            false_negative,
            false_positive
        })
    }
}

/// Ensures an SDF-formatted copy of the reference exists next to it, running
/// the formatter collaborator when it does not.
/// # Arguments
/// * `reference` - the reference FASTA
/// * `runtime` - java invocation settings
/// * `jar` - the engine jar carrying the `format` subcommand
pub fn ensure_sdf(reference: &Path, runtime: &JavaRuntime, jar: &Path) -> anyhow::Result<PathBuf> {
    let sdf = PathBuf::from(format!("{}.sdf", reference.display()));
    if sdf.exists() {
        info!("{sdf:?} exists, reusing it");
        info!("to rerun SDF generation, remove or rename {sdf:?}");
        return Ok(sdf);
    }

    let mut command = Command::new(&runtime.java);
    command.args([
        runtime.xmx_arg(),
        "-jar".to_string(), jar.display().to_string(),
        "format".to_string(),
        "-o".to_string(), sdf.display().to_string(),
        reference.display().to_string()
    ]);
    run_engine(command)?;
    check_output_exists(&sdf)?;
    Ok(sdf)
}

/// Spawns an engine command and blocks until it finishes.
pub(crate) fn run_engine(mut command: Command) -> anyhow::Result<()> {
    debug!("Invoking engine: {command:?}");
    let status = command.status()
        .with_context(|| format!("Error while spawning {:?}:", command.get_program()))?;
    if !status.success() {
        return Err(ComparatorError::EngineFailure { status }.into());
    }
    Ok(())
}

/// Verifies a required engine output file exists.
pub(crate) fn check_output_exists(path: &Path) -> Result<(), ComparatorError> {
    if !path.exists() {
        return Err(ComparatorError::OutputMissing { path: path.to_path_buf() });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::variant_record::VariantRecord;

    fn base_options(prefix: PathBuf) -> ComparatorOptions {
        ComparatorOptionsBuilder::default()
            .prefix(prefix)
            .truth_vcf(PathBuf::from("truth.vcf"))
            .reference(PathBuf::from("ref.fa"))
            .calls(vec![PathBuf::from("calls.vcf")])
            .build()
            .unwrap()
    }

    #[test]
    fn test_allele_command_args() {
        let engine = AlleleComparator::new(
            JavaRuntime::default(), PathBuf::from("varsim.jar"), true, 100
        );
        let mut options = base_options(PathBuf::from("out/allele"));
        options.sample = Some("HG002".to_string());
        options.exclude_filtered = true;

        let args = engine.command_args(&options);
        assert_eq!(args[..3], ["-Xmx10g", "-jar", "varsim.jar"].map(String::from));
        assert!(args.contains(&"vcfcompare".to_string()));
        assert!(args.contains(&"-exclude_filtered".to_string()));
        assert!(args.contains(&"-disallow_partial_fp".to_string()));
        let sv_index = args.iter().position(|a| a == "-sv_length").unwrap();
        assert_eq!(args[sv_index + 1], "100");
        // calls go last
        assert_eq!(args.last().unwrap(), "calls.vcf");
    }

    #[test]
    fn test_genotype_aware_command_args() {
        let engine = GenotypeAwareComparator::new(JavaRuntime::default(), PathBuf::from("rtg.jar"));
        let options = base_options(PathBuf::from("out/gt"));

        let args = engine.command_args(&options);
        assert!(args.contains(&"vcfeval".to_string()));
        // filtered records included and ploidy squashed by default
        assert!(args.contains(&"--all-records".to_string()));
        assert!(args.contains(&"--squash-ploidy".to_string()));

        let mut strict = base_options(PathBuf::from("out/gt"));
        strict.exclude_filtered = true;
        strict.match_genotype = true;
        let args = engine.command_args(&strict);
        assert!(!args.contains(&"--all-records".to_string()));
        assert!(!args.contains(&"--squash-ploidy".to_string()));
    }

    #[test]
    fn test_genotype_aware_rejects_multiple_calls() {
        let engine = GenotypeAwareComparator::new(JavaRuntime::default(), PathBuf::from("rtg.jar"));
        let mut options = base_options(PathBuf::from("out/gt"));
        options.calls = vec![PathBuf::from("a.vcf"), PathBuf::from("b.vcf")];

        let err = engine.run(&options).unwrap_err();
        let comparator_err = err.downcast_ref::<ComparatorError>().unwrap();
        assert!(matches!(comparator_err, ComparatorError::UnsupportedInputShape { count: 2 }));
    }

    #[test]
    fn test_empty_truth_synthesis() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path();

        let truth_fn = dir.join("truth.vcf");
        VariantCollection::new(vec!["##empty".to_string()], vec![]).write(&truth_fn).unwrap();

        let calls_fn = dir.join("calls.vcf");
        let call_record = VariantRecord::parse_line("chr1\t100\t.\tA\tT\t50\tPASS\t.").unwrap();
        VariantCollection::new(vec!["##calls".to_string()], vec![call_record]).write(&calls_fn).unwrap();

        // the engine jar does not exist; the empty-truth path must never invoke it
        let engine = GenotypeAwareComparator::new(JavaRuntime::default(), PathBuf::from("/no/such.jar"));
        let mut options = base_options(dir.join("gt_out"));
        options.truth_vcf = truth_fn;
        options.calls = vec![calls_fn];

        let outputs = engine.run(&options).unwrap();
        assert!(VariantCollection::from_path(&outputs.tp).unwrap().is_empty());
        assert!(VariantCollection::from_path(&outputs.false_negative).unwrap().is_empty());
        assert_eq!(VariantCollection::from_path(&outputs.false_positive).unwrap().len(), 1);

        let tp_predict = VariantCollection::from_path(&outputs.tp_predict.unwrap()).unwrap();
        assert!(tp_predict.is_empty());
        assert_eq!(tp_predict.header(), ["##calls".to_string()]);
    }

    #[test]
    fn test_missing_output_detected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("never_written.vcf");
        assert!(matches!(
            check_output_exists(&missing),
            Err(ComparatorError::OutputMissing { .. })
        ));
    }
}
