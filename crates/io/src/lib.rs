// File I/O operations

pub mod csv;
pub mod layout;
pub mod xlsx;

use std::path::Path;

use stockmerge_recon::model::Table;

use crate::layout::ArrangedTable;

/// Input file formats, chosen by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Tsv,
    Excel,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> Result<Self, String> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" | "txt" => Ok(Self::Csv),
            "tsv" | "tab" => Ok(Self::Tsv),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(Self::Excel),
            "" => Err(format!("{}: file has no extension", path.display())),
            other => Err(format!("{}: unsupported file type '.{}'", path.display(), other)),
        }
    }
}

/// Read the first sheet (or the named one, for Excel) of a file into a table.
pub fn read_table(path: &Path, sheet: Option<&str>) -> Result<Table, String> {
    let format = FileFormat::from_path(path)?;
    let bytes = std::fs::read(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    read_table_bytes(&bytes, format, sheet).map_err(|e| format!("{}: {}", path.display(), e))
}

pub fn read_table_bytes(bytes: &[u8], format: FileFormat, sheet: Option<&str>) -> Result<Table, String> {
    match format {
        FileFormat::Csv => csv::import_bytes(bytes),
        FileFormat::Tsv => csv::import_tsv_bytes(bytes),
        FileFormat::Excel => xlsx::import_bytes(bytes, sheet),
    }
}

/// Output file formats. Excel is the report format; CSV and TSV drop styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Xlsx,
    Csv,
    Tsv,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Result<Self, String> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "xlsx" => Ok(Self::Xlsx),
            "csv" => Ok(Self::Csv),
            "tsv" => Ok(Self::Tsv),
            _ => Err(format!("{}: output must be .xlsx, .csv or .tsv", path.display())),
        }
    }
}

/// What was written.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteResult {
    pub format: OutputFormat,
    pub rows_written: usize,
    pub bytes_written: usize,
    pub groups_colored: usize,
}

/// Render the table in memory, then write the file in one call so that a
/// failed render never leaves a partial report.
pub fn write_table(path: &Path, table: &ArrangedTable, sheet_name: &str) -> Result<WriteResult, String> {
    let format = OutputFormat::from_path(path)?;
    let (bytes, groups_colored) = match format {
        OutputFormat::Xlsx => {
            let (bytes, result) = xlsx::export_to_buffer(table, sheet_name)?;
            log::debug!(
                "xlsx: {} cells in {} ms",
                result.cells_exported,
                result.export_duration_ms
            );
            (bytes, result.groups_colored)
        }
        OutputFormat::Csv => (csv::export_to_buffer(table, b',')?, 0),
        OutputFormat::Tsv => (csv::export_to_buffer(table, b'\t')?, 0),
    };

    std::fs::write(path, &bytes).map_err(|e| format!("{}: {}", path.display(), e))?;
    log::info!("wrote {} rows to {}", table.rows.len(), path.display());

    Ok(WriteResult {
        format,
        rows_written: table.rows.len(),
        bytes_written: bytes.len(),
        groups_colored,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_formats_by_extension() {
        assert_eq!(FileFormat::from_path(Path::new("a.CSV")).unwrap(), FileFormat::Csv);
        assert_eq!(FileFormat::from_path(Path::new("a.tsv")).unwrap(), FileFormat::Tsv);
        assert_eq!(FileFormat::from_path(Path::new("dir/Stock.xlsx")).unwrap(), FileFormat::Excel);
        assert_eq!(FileFormat::from_path(Path::new("old.xls")).unwrap(), FileFormat::Excel);
        assert!(FileFormat::from_path(Path::new("notes.pdf")).is_err());
        assert!(FileFormat::from_path(Path::new("README")).is_err());
    }

    #[test]
    fn output_formats_by_extension() {
        assert_eq!(OutputFormat::from_path(Path::new("Inventory_Report.xlsx")).unwrap(), OutputFormat::Xlsx);
        assert_eq!(OutputFormat::from_path(Path::new("out.csv")).unwrap(), OutputFormat::Csv);
        assert!(OutputFormat::from_path(Path::new("out.xls")).is_err());
    }
}
