
use anyhow::Context;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::data_types::variant_record::{VariantRecord, is_header_line};

/// An immutable snapshot of one variant file: the header block plus the
/// ordered record set. Pipeline stages never mutate a collection in place;
/// each stage writes a new one.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct VariantCollection {
    /// Header lines, verbatim
    header: Vec<String>,
    /// Records in file order
    records: Vec<VariantRecord>
}

impl VariantCollection {
    /// Direct constructor from pre-built parts.
    pub fn new(header: Vec<String>, records: Vec<VariantRecord>) -> Self {
        Self {
            header,
            records
        }
    }

    /// A collection holding a single record under a borrowed header block,
    /// used as the per-query scratch input for pairing runs.
    pub fn single(header: &[String], record: VariantRecord) -> Self {
        Self {
            header: header.to_vec(),
            records: vec![record]
        }
    }

    /// Loads a collection from a file, transparently decoding gzip inputs.
    /// # Arguments
    /// * `filename` - the collection to read; ".gz" extensions are decoded
    /// # Errors
    /// * if the file cannot be opened or read
    /// * if a non-header line cannot be parsed into a record
    pub fn from_path(filename: &Path) -> anyhow::Result<Self> {
        let reader = open_text_reader(filename)?;

        let mut header = vec![];
        let mut records = vec![];
        for (line_number, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Error while reading {filename:?}:"))?;
            if line.trim().is_empty() {
                continue;
            }

            if is_header_line(&line) {
                header.push(line);
            } else {
                let record = VariantRecord::parse_line(&line)
                    .with_context(|| format!("Error while parsing {filename:?} line {}:", line_number + 1))?;
                records.push(record);
            }
        }

        Ok(Self {
            header,
            records
        })
    }

    /// Writes the collection to a file: header block first, then records.
    /// A ".gz" extension selects gzip output.
    /// # Arguments
    /// * `filename` - the output path, which is fully overwritten
    pub fn write(&self, filename: &Path) -> anyhow::Result<()> {
        let file: Box<dyn Write> = if filename.extension().unwrap_or_default() == "gz" {
            Box::new(GzEncoder::new(
                File::create(filename)?,
                flate2::Compression::default()
            ))
        } else {
            Box::new(File::create(filename)?)
        };

        let mut writer = BufWriter::new(file);
        for line in self.header.iter() {
            writeln!(writer, "{line}")?;
        }
        for record in self.records.iter() {
            writeln!(writer, "{}", record.format_line())?;
        }
        writer.flush()
            .with_context(|| format!("Error while flushing output to {filename:?}:"))?;
        Ok(())
    }

    /// Returns a new collection restricted to records on the given chromosome.
    /// The header block carries over unchanged.
    /// # Arguments
    /// * `chromosome` - exact chromosome name to keep
    pub fn filter_chromosome(&self, chromosome: &str) -> VariantCollection {
        let records = self.records.iter()
            .filter(|r| r.chromosome() == chromosome)
            .cloned()
            .collect();
        VariantCollection {
            header: self.header.clone(),
            records
        }
    }

    // getters
    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn records(&self) -> &[VariantRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Opens a text file for buffered reading, decoding gzip when the extension says so.
/// # Arguments
/// * `filename` - the file to open
fn open_text_reader(filename: &Path) -> anyhow::Result<Box<dyn BufRead>> {
    let file = File::open(filename)
        .with_context(|| format!("Error while opening {filename:?}:"))?;
    let reader: Box<dyn BufRead> = if filename.extension().unwrap_or_default() == "gz" {
        Box::new(BufReader::new(MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    Ok(reader)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_collection() -> VariantCollection {
        let header = vec![
            "##fileformat=VCFv4.2".to_string(),
            "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO".to_string()
        ];
        let records = vec![
            VariantRecord::parse_line("chr1\t100\t.\tA\tT\t50\tPASS\t.").unwrap(),
            VariantRecord::parse_line("chr2\t200\t.\tC\tG\t50\tPASS\t.").unwrap(),
            VariantRecord::parse_line("chr1\t300\t.\tG\tA\t50\tPASS\t.").unwrap()
        ];
        VariantCollection::new(header, records)
    }

    #[test]
    fn test_write_and_reload() {
        let collection = test_collection();
        let temp_dir = tempfile::tempdir().unwrap();
        let out_fn = temp_dir.path().join("collection.vcf");
        collection.write(&out_fn).unwrap();

        let reloaded = VariantCollection::from_path(&out_fn).unwrap();
        assert_eq!(reloaded, collection);
    }

    #[test]
    fn test_gzip_round_trip() {
        let collection = test_collection();
        let temp_dir = tempfile::tempdir().unwrap();
        let out_fn = temp_dir.path().join("collection.vcf.gz");
        collection.write(&out_fn).unwrap();

        let reloaded = VariantCollection::from_path(&out_fn).unwrap();
        assert_eq!(reloaded, collection);
    }

    #[test]
    fn test_filter_chromosome() {
        let collection = test_collection();
        let filtered = collection.filter_chromosome("chr1");
        assert_eq!(filtered.len(), 2);
        assert!(filtered.records().iter().all(|r| r.chromosome() == "chr1"));
        assert_eq!(filtered.header(), collection.header());

        let empty = collection.filter_chromosome("chrX");
        assert!(empty.is_empty());
    }

    #[test]
    fn test_parse_failure_reports_line() {
        let temp_dir = tempfile::tempdir().unwrap();
        let bad_fn = temp_dir.path().join("bad.vcf");
        std::fs::write(&bad_fn, "##header\nchr1\t100\tshort\n").unwrap();

        let err = VariantCollection::from_path(&bad_fn).unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }

    #[test]
    fn test_single() {
        let collection = test_collection();
        let single = VariantCollection::single(collection.header(), collection.records()[1].clone());
        assert_eq!(single.len(), 1);
        assert_eq!(single.records()[0].chromosome(), "chr2");
    }
}
