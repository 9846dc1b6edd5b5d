
use anyhow::Context;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Opens an output file, gzip compressed when the name ends in .gz
fn create_output(out_filename: &Path) -> std::io::Result<Box<dyn Write>> {
    let file = File::create(out_filename)?;
    if out_filename.extension().unwrap_or_default() == "gz" {
        Ok(Box::new(flate2::write::GzEncoder::new(file, flate2::Compression::best())))
    } else {
        Ok(Box::new(file))
    }
}

/// Saves any serializable value as pretty-printed JSON, used for the debug outputs.
/// # Arguments
/// * `data` - the data in memory
/// * `out_filename` - user provided path to write to, gzip compressed if it ends in .gz
/// # Errors
/// * if opening or writing to the file throw errors
/// * if JSON serialization throws errors
pub fn save_json<T: serde::Serialize>(data: &T, out_filename: &Path) -> anyhow::Result<()> {
    let file = create_output(out_filename)
        .with_context(|| format!("Error while creating {out_filename:?}:"))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, data)
        .with_context(|| format!("Error while serializing {out_filename:?}:"))?;
    writer.flush()
        .with_context(|| format!("Error while flushing output to {out_filename:?}:"))?;
    Ok(())
}
