use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook};

use crate::domain::AccessRecord;
use crate::error::Result;
use crate::output::table::{row_values, COLUMNS, SCORE_COLUMNS};

pub const SHEET_NAME: &str = "IAM Identity Center";

const MAX_COLUMN_WIDTH: usize = 50;

/// Build the single-sheet workbook: styled header, wrapped cells, widths
/// fitted to content, frozen first row and column, autofilter.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn excel_workbook(records: &[AccessRecord]) -> Result<Workbook> {
    let mut workbook = Workbook::new();

    let header = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(0x4472C4))
        .set_text_wrap();
    let wrapped = Format::new().set_text_wrap().set_align(FormatAlign::Top);

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    let mut widths: Vec<usize> = COLUMNS.iter().map(|c| c.chars().count()).collect();

    for (col, title) in COLUMNS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &header)?;
    }

    for (idx, record) in records.iter().enumerate() {
        let row = (idx + 1) as u32;
        let values = row_values(record);
        for (col, value) in values.iter().enumerate() {
            widths[col] = widths[col].max(value.chars().count());
            if SCORE_COLUMNS.contains(&col) {
                let number = value.parse::<f64>().unwrap_or_default();
                sheet.write_number_with_format(row, col as u16, number, &wrapped)?;
            } else {
                sheet.write_string_with_format(row, col as u16, value, &wrapped)?;
            }
        }
    }

    for (col, width) in widths.iter().enumerate() {
        let width = (width + 2).min(MAX_COLUMN_WIDTH);
        sheet.set_column_width(col as u16, width as f64)?;
    }

    sheet.set_freeze_panes(1, 1)?;
    sheet.autofilter(0, 0, records.len() as u32, (COLUMNS.len() - 1) as u16)?;

    Ok(workbook)
}
