
use crate::data_types::variant_record::VariantRecord;

/// The depth-field layouts we know how to read from a matched record.
/// The layout is resolved once per record; each variant carries the counts it
/// needs for its own fraction computation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DepthLayout {
    /// A single combined allele-depth field (AD): first value is the reference
    /// observation count, remaining values are per-alt counts
    CombinedAlleleDepth {
        ref_count: u64,
        alt_counts: Vec<u64>
    },
    /// A split observation pair (AO + RO): per-alt counts in AO, reference
    /// count in RO
    SplitObservations {
        ref_count: u64,
        alt_counts: Vec<u64>
    }
}

impl DepthLayout {
    /// Inspects a record and resolves which depth layout it carries, if any.
    /// The combined allele-depth field takes priority over the split pair.
    /// Returns None when neither layout is present or the counts do not parse.
    /// # Arguments
    /// * `record` - the matched record to inspect
    pub fn resolve(record: &VariantRecord) -> Option<DepthLayout> {
        if let Some(ad) = record.annotation_value("AD") {
            let counts = parse_counts(ad)?;
            if counts.len() >= 2 {
                return Some(DepthLayout::CombinedAlleleDepth {
                    ref_count: counts[0],
                    alt_counts: counts[1..].to_vec()
                });
            }
        }

        if let (Some(ao), Some(ro)) = (record.annotation_value("AO"), record.annotation_value("RO")) {
            let alt_counts = parse_counts(ao)?;
            let ref_count = ro.parse().ok()?;
            if !alt_counts.is_empty() {
                return Some(DepthLayout::SplitObservations {
                    ref_count,
                    alt_counts
                });
            }
        }

        None
    }

    /// Computes the per-alt allele fractions: alt / (alt + ref), one per alternate
    /// allele, clamped to 0.0 when the denominator is zero.
    pub fn allele_fractions(&self) -> Vec<f64> {
        match self {
            DepthLayout::CombinedAlleleDepth { ref_count, alt_counts } |
            DepthLayout::SplitObservations { ref_count, alt_counts } => {
                alt_counts.iter()
                    .map(|&alt| {
                        let denominator = alt + ref_count;
                        if denominator == 0 {
                            0.0
                        } else {
                            alt as f64 / denominator as f64
                        }
                    })
                    .collect()
            }
        }
    }

    /// Renders the comma-joined fraction field that goes into the annotation string.
    pub fn fraction_field(&self) -> String {
        let fractions: Vec<String> = self.allele_fractions().iter()
            .map(|&f| format_fraction(f))
            .collect();
        fractions.join(",")
    }
}

/// Formats one allele fraction. Integral values keep a trailing decimal
/// ("0.0", "1.0"); everything else uses the shortest round-trip form.
pub fn format_fraction(fraction: f64) -> String {
    if fraction.fract() == 0.0 {
        format!("{fraction:.1}")
    } else {
        fraction.to_string()
    }
}

/// Parses a comma-delimited list of counts; any unparseable entry voids the layout.
fn parse_counts(field: &str) -> Option<Vec<u64>> {
    field.split(',')
        .map(|v| v.parse().ok())
        .collect()
}
