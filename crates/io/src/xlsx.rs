// Excel import (calamine) and export (rust_xlsxwriter)

use std::io::Cursor;
use std::time::Instant;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use rust_xlsxwriter::{Color, Format, Workbook, Worksheet};
use stockmerge_recon::model::{CellValue, Table};

use crate::layout::{column_widths, ArrangedTable};

/// Fill colours cycled across order groups.
pub const GROUP_FILLS: [u32; 5] = [0xDAE8FC, 0xFFF2CC, 0xE2EFDA, 0xF8CECC, 0xE4DFEC];

/// Import one worksheet (the first, unless `sheet` names another) from an
/// in-memory Excel file (xlsx, xlsm, xls, xlsb, ods).
pub fn import_bytes(bytes: &[u8], sheet: Option<&str>) -> Result<Table, String> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| format!("Failed to open Excel file: {}", e))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let sheet_name = match sheet {
        Some(wanted) => sheet_names
            .iter()
            .find(|n| n.eq_ignore_ascii_case(wanted))
            .cloned()
            .ok_or_else(|| format!("Excel file has no sheet named '{}'", wanted))?,
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| "Excel file contains no sheets".to_string())?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;

    let grid: Vec<Vec<CellValue>> = range
        .rows()
        .map(|row| row.iter().map(cell_value).collect())
        .collect();

    log::debug!("xlsx: sheet '{}', {} raw rows", sheet_name, grid.len());
    Table::from_grid(grid).ok_or_else(|| format!("sheet '{}' has no header row", sheet_name))
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::text(s.as_str()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        // Stored as TRUE/FALSE text, the way Excel displays them
        Data::Bool(b) => CellValue::text(if *b { "TRUE" } else { "FALSE" }),
        Data::Error(e) => CellValue::text(format!("#{:?}", e)),
        // Serial number; the 1900 date system is assumed
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) => CellValue::text(s.as_str()),
        Data::DurationIso(s) => CellValue::text(s.as_str()),
    }
}

/// Export statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportResult {
    pub rows_exported: usize,
    pub cells_exported: usize,
    pub groups_colored: usize,
    pub export_duration_ms: u128,
}

/// Build the workbook in memory. Nothing touches disk, so a failure never
/// leaves a partial file behind.
pub fn export_to_buffer(table: &ArrangedTable, sheet_name: &str) -> Result<(Vec<u8>, ExportResult), String> {
    let start_time = Instant::now();
    let mut result = ExportResult::default();
    let mut workbook = Workbook::new();

    {
        let worksheet = workbook
            .add_worksheet()
            .set_name(sheet_name)
            .map_err(|e| format!("Failed to create sheet '{}': {}", sheet_name, e))?;
        export_sheet(table, worksheet, &mut result)?;
    }

    let bytes = workbook
        .save_to_buffer()
        .map_err(|e| format!("Failed to build XLSX file: {}", e))?;

    result.export_duration_ms = start_time.elapsed().as_millis();
    Ok((bytes, result))
}

fn export_sheet(table: &ArrangedTable, worksheet: &mut Worksheet, result: &mut ExportResult) -> Result<(), String> {
    let header_format = Format::new().set_bold();
    for (col, header) in table.headers.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, header, &header_format)
            .map_err(|e| format!("Failed to write header '{}': {}", header, e))?;
    }

    let fills: Vec<Format> = GROUP_FILLS
        .iter()
        .map(|rgb| Format::new().set_background_color(Color::RGB(*rgb)))
        .collect();
    let plain = Format::new();

    for (idx, row) in table.rows.iter().enumerate() {
        let row32 = idx as u32 + 1;
        let fill = match table.groups.get(idx).copied().flatten() {
            Some(group) if table.colored() => Some(&fills[group % fills.len()]),
            _ => None,
        };
        let format = fill.unwrap_or(&plain);

        for (col, cell) in row.iter().enumerate() {
            let col16 = col as u16;
            match cell {
                CellValue::Empty => {
                    if fill.is_some() {
                        worksheet
                            .write_blank(row32, col16, format)
                            .map_err(|e| format!("Failed to write cell ({}, {}): {}", row32, col, e))?;
                    }
                    continue;
                }
                CellValue::Text(s) => {
                    worksheet
                        .write_string_with_format(row32, col16, s, format)
                        .map_err(|e| format!("Failed to write cell ({}, {}): {}", row32, col, e))?;
                }
                CellValue::Number(n) => {
                    worksheet
                        .write_number_with_format(row32, col16, *n, format)
                        .map_err(|e| format!("Failed to write cell ({}, {}): {}", row32, col, e))?;
                }
            }
            result.cells_exported += 1;
        }
        result.rows_exported += 1;
    }

    if table.colored() {
        result.groups_colored = table.group_count;
    }

    for (col, width) in column_widths(table).into_iter().enumerate() {
        worksheet
            .set_column_width(col as u16, width)
            .map_err(|e| format!("Failed to set column {} width: {}", col, e))?;
    }

    worksheet
        .set_freeze_panes(1, 0)
        .map_err(|e| format!("Failed to set freeze panes: {}", e))?;

    Ok(())
}
