use crate::domain::model::Table;
use crate::utils::error::{EtlError, Result};

/// Encodes a table (header first) into delimited text.
pub fn encode_table(table: &Table, delimiter: u8) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer.write_record(&table.header)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }

    writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))
}

/// Reads every record of a delimited file, header included.
pub fn decode_records(data: &[u8], delimiter: u8) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        records.push(record.iter().map(str::to_string).collect());
    }
    Ok(records)
}

/// Values of one named column, header row skipped.
pub fn read_column(data: &[u8], column: &str) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_reader(data);
    let index = reader
        .headers()?
        .iter()
        .position(|name| name.trim() == column)
        .ok_or_else(|| EtlError::processing(format!("column '{}' not found", column)))?;

    let mut values = Vec::new();
    for record in reader.records() {
        if let Some(value) = record?.get(index) {
            values.push(value.to_string());
        }
    }
    Ok(values)
}
