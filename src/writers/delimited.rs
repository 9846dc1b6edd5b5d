
use std::fs::File;
use std::path::Path;

/// Opens a table writer for the given file, comma delimited if the name ends in .csv and tab delimited otherwise
/// # Arguments
/// * `filename` - the output path
/// # Errors
/// * if the file cannot be created
pub fn open_delimited_writer(filename: &Path) -> csv::Result<csv::Writer<File>> {
    // modify the delimiter to "," if it ends with .csv
    let is_csv: bool = filename.extension().unwrap_or_default() == "csv";
    let delimiter: u8 = if is_csv { b',' } else { b'\t' };
    csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Row {
        name: &'static str,
        value: u32
    }

    #[test]
    fn test_delimiter_from_extension() {
        let temp_dir = tempfile::tempdir().unwrap();
        for (name, expected) in [("rows.csv", "name,value\na,1\n"), ("rows.tsv", "name\tvalue\na\t1\n")] {
            let filename = temp_dir.path().join(name);
            let mut writer = open_delimited_writer(&filename).unwrap();
            writer.serialize(Row { name: "a", value: 1 }).unwrap();
            writer.flush().unwrap();
            drop(writer);
            assert_eq!(std::fs::read_to_string(&filename).unwrap(), expected);
        }
    }
}
