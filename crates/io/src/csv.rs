// CSV/TSV import/export

use stockmerge_recon::model::{CellValue, Table};

use crate::layout::ArrangedTable;

/// Parse CSV bytes into a table, sniffing the delimiter.
pub fn import_bytes(bytes: &[u8]) -> Result<Table, String> {
    let content = decode_utf8(bytes);
    let delimiter = sniff_delimiter(&content);
    import_from_string(&content, delimiter)
}

pub fn import_tsv_bytes(bytes: &[u8]) -> Result<Table, String> {
    let content = decode_utf8(bytes);
    import_from_string(&content, b'\t')
}

/// Delimiters tried when sniffing, in tie-break order.
const DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];
const SNIFF_RECORDS: usize = 10;

/// Pick the delimiter that splits the header into at least two columns and
/// keeps that width over the most of the following records. Ties go to the
/// wider header. Comma when nothing splits.
fn sniff_delimiter(content: &str) -> u8 {
    let mut best = (b',', 0usize, 0usize);
    for delimiter in DELIMITERS {
        let widths = record_widths(content, delimiter);
        let Some(&width) = widths.first() else { continue };
        if width < 2 {
            continue;
        }
        let agreeing = widths.iter().filter(|&&w| w == width).count();
        if (agreeing, width) > (best.1, best.2) {
            best = (delimiter, agreeing, width);
        }
    }
    best.0
}

/// Field counts of the first non-blank records read with `delimiter`.
/// Quoted fields may span lines.
fn record_widths(content: &str, delimiter: u8) -> Vec<usize> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes())
        .records()
        .map_while(Result::ok)
        .filter(|r| r.iter().any(|f| !f.trim().is_empty()))
        .take(SNIFF_RECORDS)
        .map(|r| r.len())
        .collect()
}

/// Convert bytes to UTF-8, falling back to Windows-1252 (common for
/// Excel-exported CSVs). A leading byte-order mark is dropped.
pub fn decode_utf8(bytes: &[u8]) -> String {
    let text = match String::from_utf8(bytes.to_vec()) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    };
    match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    }
}

fn import_from_string(content: &str, delimiter: u8) -> Result<Table, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut grid: Vec<Vec<CellValue>> = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| e.to_string())?;
        grid.push(record.iter().map(CellValue::text).collect());
    }

    log::debug!("csv: {} raw rows, delimiter {:?}", grid.len(), delimiter as char);
    Table::from_grid(grid).ok_or_else(|| "file has no header row".to_string())
}

/// Write an arranged table as CSV. Stock and other integral numbers are
/// written without a decimal part.
pub fn export_to_buffer(table: &ArrangedTable, delimiter: u8) -> Result<Vec<u8>, String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_writer(Vec::new());

    writer.write_record(&table.headers).map_err(|e| e.to_string())?;
    for row in &table.rows {
        let record: Vec<String> = row.iter().map(CellValue::display).collect();
        writer.write_record(&record).map_err(|e| e.to_string())?;
    }

    writer.into_inner().map_err(|e| e.to_string())
}
