//! XLSX output for report sheets, with optional copies of the source sheets

use super::{ReportBlock, ReportCell, ReportSheet, UNAVAILABLE, display_number};
use crate::error::{CohortError, Result};
use crate::reader::{CellValue, Sheet, Workbook};
use rust_xlsxwriter::{
    Format, FormatAlign, FormatBorder, Formula, Workbook as XlsxWorkbook, Worksheet, XlsxError,
};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// How report sheets are written
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WriteOptions {
    /// Emit formula cells; when false their cached values are written instead
    pub formulas: bool,
    /// Copy the source workbook's sheets (as values) before the report sheets
    pub copy_sources: bool,
    /// Upper bound for auto-sized column widths, in characters
    pub max_column_width: f64,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            formulas: true,
            copy_sources: true,
            max_column_width: 50.0,
        }
    }
}

struct Styles {
    title: Format,
    header: Format,
    total: Format,
    cell: Format,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Format::new().set_bold().set_font_size(14),
            header: Format::new()
                .set_bold()
                .set_align(FormatAlign::Center)
                .set_background_color(0x4472C4)
                .set_font_color(0xFFFFFF)
                .set_border(FormatBorder::Thin),
            total: Format::new()
                .set_bold()
                .set_background_color(0xD9E1F2)
                .set_border(FormatBorder::Thin),
            cell: Format::new().set_border(FormatBorder::Thin),
        }
    }
}

/// Write report sheets to `path`.
///
/// When `options.copy_sources` is set, every sheet of `source` is copied
/// first, except those a report sheet replaces (same name, ignoring case
/// and surrounding whitespace).
pub fn write_report<P: AsRef<Path>>(
    path: P,
    source: Option<&Workbook>,
    sheets: &[ReportSheet],
    options: &WriteOptions,
) -> Result<()> {
    let path = path.as_ref();
    let mut workbook = XlsxWorkbook::new();

    if let Some(source) = source.filter(|_| options.copy_sources) {
        for sheet in &source.sheets {
            if sheets.iter().any(|r| same_sheet_name(&r.name, &sheet.name)) {
                debug!(sheet = %sheet.name, "source sheet replaced by report");
                continue;
            }
            copy_sheet(workbook.add_worksheet(), sheet).map_err(|source| {
                CohortError::Render {
                    sheet: sheet.name.clone(),
                    source,
                }
            })?;
        }
    }

    let styles = Styles::new();
    for sheet in sheets {
        render_sheet(workbook.add_worksheet(), sheet, &styles, options).map_err(|source| {
            CohortError::Render {
                sheet: sheet.name.clone(),
                source,
            }
        })?;
    }

    workbook.save(path).map_err(|source| CohortError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    info!(path = %path.display(), sheets = sheets.len(), "report written");
    Ok(())
}

fn same_sheet_name(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

fn copy_sheet(worksheet: &mut Worksheet, sheet: &Sheet) -> std::result::Result<(), XlsxError> {
    worksheet.set_name(&sheet.name)?;
    let mut cells: Vec<_> = sheet.all_cells().collect();
    cells.sort_by_key(|c| (c.row, c.col));
    for cell in cells {
        let Ok(col) = u16::try_from(cell.col) else {
            continue;
        };
        match &cell.value {
            CellValue::Empty => {}
            CellValue::Number(n) => {
                worksheet.write_number(cell.row, col, *n)?;
            }
            CellValue::Text(s) => {
                worksheet.write_string(cell.row, col, s)?;
            }
            CellValue::Boolean(b) => {
                worksheet.write_boolean(cell.row, col, *b)?;
            }
            CellValue::Error(e) => {
                worksheet.write_string(cell.row, col, e)?;
            }
        }
    }
    Ok(())
}

fn render_sheet(
    worksheet: &mut Worksheet,
    sheet: &ReportSheet,
    styles: &Styles,
    options: &WriteOptions,
) -> std::result::Result<(), XlsxError> {
    worksheet.set_name(&sheet.name)?;

    let mut widths: BTreeMap<u16, usize> = BTreeMap::new();
    let mut row: u32 = 0;
    for block in &sheet.blocks {
        row = render_block(worksheet, block, row, styles, options, &mut widths)?;
        // blank separator
        row += 1;
    }

    for (col, width) in widths {
        let width = ((width + 2) as f64).min(options.max_column_width);
        worksheet.set_column_width(col, width)?;
    }
    Ok(())
}

/// Render one block starting at `row`; returns the row after its last line
fn render_block(
    worksheet: &mut Worksheet,
    block: &ReportBlock,
    mut row: u32,
    styles: &Styles,
    options: &WriteOptions,
    widths: &mut BTreeMap<u16, usize>,
) -> std::result::Result<u32, XlsxError> {
    let mut track = |col: u16, text: &str| {
        let len = text.chars().count();
        let entry = widths.entry(col).or_insert(0);
        *entry = (*entry).max(len);
    };

    if let Some(title) = &block.title {
        let last_col = block.width().saturating_sub(1) as u16;
        if last_col > 0 {
            worksheet.merge_range(row, 0, row, last_col, title, &styles.title)?;
        } else {
            worksheet.write_string_with_format(row, 0, title, &styles.title)?;
        }
        row += 1;
    }

    if !block.header_groups.is_empty() {
        let mut col: u16 = 0;
        for group in &block.header_groups {
            let last = col + group.span.saturating_sub(1);
            if group.span > 1 {
                worksheet.merge_range(row, col, row, last, &group.label, &styles.header)?;
            } else {
                worksheet.write_string_with_format(row, col, &group.label, &styles.header)?;
            }
            col = last + 1;
        }
        row += 1;
    }

    for (col, header) in block.headers.iter().enumerate() {
        let col = col as u16;
        worksheet.write_string_with_format(row, col, header, &styles.header)?;
        track(col, header);
    }
    row += 1;

    let last_index = block.rows.len().saturating_sub(1);
    for (index, cells) in block.rows.iter().enumerate() {
        let format = if block.emphasize_last_row && index == last_index {
            &styles.total
        } else {
            &styles.cell
        };
        for (col, cell) in cells.iter().enumerate() {
            let col = col as u16;
            write_cell(worksheet, row, col, cell, format, options)?;
            track(col, &cell_width_text(cell));
        }
        row += 1;
    }

    Ok(row)
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &ReportCell,
    format: &Format,
    options: &WriteOptions,
) -> std::result::Result<(), XlsxError> {
    match cell {
        ReportCell::Empty => {
            worksheet.write_blank(row, col, format)?;
        }
        ReportCell::Text(s) => {
            worksheet.write_string_with_format(row, col, s, format)?;
        }
        ReportCell::Number(n) => {
            worksheet.write_number_with_format(row, col, *n, format)?;
        }
        ReportCell::Formula {
            formula,
            result,
            needs_sources,
        } => {
            if emits_formula(options, *needs_sources) {
                let formula = Formula::new(formula).set_result(result.to_string());
                worksheet.write_formula_with_format(row, col, formula, format)?;
            } else {
                worksheet.write_number_with_format(row, col, *result, format)?;
            }
        }
        ReportCell::Unavailable(_) => {
            worksheet.write_string_with_format(row, col, UNAVAILABLE, format)?;
        }
    }
    Ok(())
}

fn emits_formula(options: &WriteOptions, needs_sources: bool) -> bool {
    options.formulas && (options.copy_sources || !needs_sources)
}

fn cell_width_text(cell: &ReportCell) -> String {
    match cell {
        ReportCell::Formula { result, .. } => display_number(*result),
        _ => cell.display(),
    }
}
