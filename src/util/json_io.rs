
use anyhow::Context;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Loads and deserializes a JSON file, decoding gzip when the extension says so.
/// Used for ingesting collaborator reports.
/// # Arguments
/// * `filename` - the JSON (or JSON.gz) file to parse
/// # Errors
/// * if the file cannot be opened
/// * if deserialization fails
pub fn load_json<T: serde::de::DeserializeOwned>(filename: &Path) -> anyhow::Result<T> {
    let file = File::open(filename)
        .with_context(|| format!("Error while opening {filename:?}:"))?;
    let reader: Box<dyn Read> = if filename.extension().unwrap_or_default() == "gz" {
        Box::new(flate2::read::MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };
    let result: T = serde_json::from_reader(BufReader::new(reader))
        .with_context(|| format!("Error while deserializing {filename:?}:"))?;
    Ok(result)
}

/// Serializes a value to pretty-printed JSON on disk. Used for dumping the
/// effective CLI settings into the debug folder.
/// # Arguments
/// * `data` - the value to serialize
/// * `out_filename` - where it goes
/// # Errors
/// * if the file cannot be created or written
/// * if serialization fails
pub fn save_json<T: serde::Serialize>(data: &T, out_filename: &Path) -> anyhow::Result<()> {
    let file = File::create(out_filename)
        .with_context(|| format!("Error while creating {out_filename:?}:"))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, data)
        .with_context(|| format!("Error while serializing {out_filename:?}:"))?;
    writer.flush()
        .with_context(|| format!("Error while flushing output to {out_filename:?}:"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_json_round_trip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let json_fn = temp_dir.path().join("settings.json");

        let data: BTreeMap<String, u64> = [("tp".to_string(), 10), ("fp".to_string(), 2)].into_iter().collect();
        save_json(&data, &json_fn).unwrap();
        let reloaded: BTreeMap<String, u64> = load_json(&json_fn).unwrap();
        assert_eq!(reloaded, data);
    }
}
