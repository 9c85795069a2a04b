
use itertools::Itertools;

/// Marker character for header/metadata lines
pub const HEADER_MARKER: char = '#';
/// The minimum number of leading columns a record line must carry (through INFO)
pub const MANDATORY_COLUMNS: usize = 8;

/// Column index that annotation strings get written into (the 7th tab-delimited field)
const ANNOTATION_COLUMN: usize = 6;
/// Column index of the FORMAT keys, when present
const FORMAT_COLUMN: usize = 8;
/// Column index of the first sample, when present
const SAMPLE_COLUMN: usize = 9;

#[derive(thiserror::Error, Debug)]
pub enum RecordError {
    #[error("line has {found} columns, expected at least {MANDATORY_COLUMNS}")]
    TooFewColumns { found: usize },
    #[error("POS column is not an integer: {value:?}")]
    InvalidPosition { value: String },
    #[error("header lines cannot be parsed as variant records")]
    HeaderLine
}

/// The identity of a variant for deduplication and matching purposes.
/// Two records are the same variant iff their keys are equal, regardless of
/// QUAL, FILTER, INFO, or genotype content.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct VariantKey {
    /// Chromosome name, exact string match
    pub chromosome: String,
    /// 1-based position as written in the file
    pub position: u64,
    /// Reference allele
    pub ref_allele: String,
    /// Alternate alleles as written, comma-joined
    pub alt_alleles: String
}

/// One non-header line of a variant collection.
/// The full column set is retained so that formatting a record back out is lossless.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VariantRecord {
    /// All whitespace-delimited columns of the line, in order
    columns: Vec<String>,
    /// Parsed copy of the POS column
    position: u64
}

impl VariantRecord {
    /// Parses a single record line into its columns.
    /// # Arguments
    /// * `line` - one non-header line, whitespace-delimited
    /// # Errors
    /// * if the line is a header line
    /// * if fewer than the mandatory leading columns are present
    /// * if the POS column does not parse as an integer
    pub fn parse_line(line: &str) -> Result<VariantRecord, RecordError> {
        if line.starts_with(HEADER_MARKER) {
            return Err(RecordError::HeaderLine);
        }

        let columns: Vec<String> = line.split_whitespace()
            .map(|c| c.to_string())
            .collect();
        if columns.len() < MANDATORY_COLUMNS {
            return Err(RecordError::TooFewColumns { found: columns.len() });
        }

        let position: u64 = columns[1].parse()
            .map_err(|_| RecordError::InvalidPosition { value: columns[1].clone() })?;

        Ok(VariantRecord {
            columns,
            position
        })
    }

    /// Returns the identity key for this record: (chromosome, position, REF, joined ALTs).
    pub fn identity_key(&self) -> VariantKey {
        VariantKey {
            chromosome: self.columns[0].clone(),
            position: self.position,
            ref_allele: self.columns[3].clone(),
            alt_alleles: self.columns[4].clone()
        }
    }

    /// Formats the record back into a single tab-delimited line.
    pub fn format_line(&self) -> String {
        self.columns.join("\t")
    }

    /// Overwrites the annotation slot (7th column) with the provided text.
    pub fn set_annotation(&mut self, annotation: String) {
        self.columns[ANNOTATION_COLUMN] = annotation;
    }

    /// Looks up a key/value style annotation for this record.
    /// The FORMAT/sample pair is searched first; failing that, the INFO column
    /// is scanned for a `KEY=value` entry. Returns None if the key is absent
    /// in both layouts.
    /// # Arguments
    /// * `key` - the annotation key, e.g. "AD" or "DP"
    pub fn annotation_value(&self, key: &str) -> Option<&str> {
        if let Some(value) = self.sample_value(key) {
            return Some(value);
        }
        self.info_value(key)
    }

    /// Looks up a FORMAT key in the first sample column.
    fn sample_value(&self, key: &str) -> Option<&str> {
        let format = self.columns.get(FORMAT_COLUMN)?;
        let sample = self.columns.get(SAMPLE_COLUMN)?;
        let key_index = format.split(':').position(|k| k == key)?;
        sample.split(':').nth(key_index)
    }

    /// Looks up a `KEY=value` entry in the INFO column.
    fn info_value(&self, key: &str) -> Option<&str> {
        self.columns[7].split(';')
            .find_map(|entry| {
                let (k, v) = entry.split_once('=')?;
                (k == key).then_some(v)
            })
    }

    /// A readable identity string used for pairing annotations:
    /// `chrom_pos_ref_alt_<lastcolumn>`.
    pub fn identity_string(&self) -> String {
        [
            &self.columns[0],
            &self.columns[1],
            &self.columns[3],
            &self.columns[4],
            self.columns.last().unwrap() // columns is never empty by construction
        ].iter().join("_")
    }

    // getters
    pub fn chromosome(&self) -> &str {
        &self.columns[0]
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn ref_allele(&self) -> &str {
        &self.columns[3]
    }

    /// The ALT column as written (comma-joined when multi-allelic)
    pub fn alt_alleles(&self) -> &str {
        &self.columns[4]
    }
}

/// Returns true if the line is a header/metadata line.
/// # Arguments
/// * `line` - the candidate line
pub fn is_header_line(line: &str) -> bool {
    line.starts_with(HEADER_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_line() -> &'static str {
        "chr1\t100\trs123\tA\tT\t50\tPASS\tDP=15\tGT:AD:DP\t0/1:10,5:15"
    }

    #[test]
    fn test_parse_and_round_trip() {
        let record = VariantRecord::parse_line(example_line()).unwrap();
        assert_eq!(record.chromosome(), "chr1");
        assert_eq!(record.position(), 100);
        assert_eq!(record.ref_allele(), "A");
        assert_eq!(record.alt_alleles(), "T");
        assert_eq!(record.format_line(), example_line());
    }

    #[test]
    fn test_identity_key_ignores_other_fields() {
        let r1 = VariantRecord::parse_line("chr1\t100\t.\tA\tT\t50\tPASS\t.").unwrap();
        let r2 = VariantRecord::parse_line("chr1\t100\trs1\tA\tT\t99\tq10\tDP=3\tGT\t1/1").unwrap();
        assert_eq!(r1.identity_key(), r2.identity_key());

        let r3 = VariantRecord::parse_line("chr1\t100\t.\tA\tG\t50\tPASS\t.").unwrap();
        assert_ne!(r1.identity_key(), r3.identity_key());
    }

    #[test]
    fn test_header_rejected() {
        assert!(matches!(
            VariantRecord::parse_line("##fileformat=VCFv4.2"),
            Err(RecordError::HeaderLine)
        ));
        assert!(is_header_line("#CHROM\tPOS"));
        assert!(!is_header_line("chr1\t100"));
    }

    #[test]
    fn test_too_few_columns() {
        assert!(matches!(
            VariantRecord::parse_line("chr1\t100\t.\tA\tT"),
            Err(RecordError::TooFewColumns { found: 5 })
        ));
    }

    #[test]
    fn test_invalid_position() {
        assert!(matches!(
            VariantRecord::parse_line("chr1\txyz\t.\tA\tT\t50\tPASS\t."),
            Err(RecordError::InvalidPosition { .. })
        ));
    }

    #[test]
    fn test_set_annotation() {
        let mut record = VariantRecord::parse_line(example_line()).unwrap();
        record.set_annotation("0.5;15;N/A;not;".to_string());
        assert_eq!(
            record.format_line(),
            "chr1\t100\trs123\tA\tT\t50\t0.5;15;N/A;not;\tDP=15\tGT:AD:DP\t0/1:10,5:15"
        );
    }

    #[test]
    fn test_annotation_value_lookup() {
        let record = VariantRecord::parse_line(example_line()).unwrap();
        // FORMAT/sample layout
        assert_eq!(record.annotation_value("AD"), Some("10,5"));
        assert_eq!(record.annotation_value("GT"), Some("0/1"));
        assert_eq!(record.annotation_value("DP"), Some("15"));
        assert_eq!(record.annotation_value("AO"), None);
    }

    #[test]
    fn test_info_only_lookup() {
        let record = VariantRecord::parse_line("chr1\t5\t.\tC\tG\t10\tPASS\tAO=5;RO=10;DP=15").unwrap();
        assert_eq!(record.annotation_value("AO"), Some("5"));
        assert_eq!(record.annotation_value("RO"), Some("10"));
        assert_eq!(record.annotation_value("AD"), None);
    }

    #[test]
    fn test_identity_string() {
        let record = VariantRecord::parse_line(example_line()).unwrap();
        assert_eq!(record.identity_string(), "chr1_100_A_T_0/1:10,5:15");
    }
}
