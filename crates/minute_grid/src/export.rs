use chrono::{Datelike, NaiveDateTime, Timelike};
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

use crate::error::Result;
use crate::grid::NormalizedGrid;

pub const HEADERS: [&str; 5] = ["timestamp", "time", "open", "close", "volume"];

fn excel_datetime(ts: NaiveDateTime) -> Result<ExcelDateTime> {
    let datetime = ExcelDateTime::from_ymd(ts.year() as u16, ts.month() as u8, ts.day() as u8)?
        .and_hms(ts.hour() as u16, ts.minute() as u8, ts.second() as u8)?;
    Ok(datetime)
}

/// Single sheet, header row plus one row per grid minute. Missing values stay blank.
pub fn export_xlsx(grid: &NormalizedGrid) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let timestamp_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(grid.date.format("%Y-%m-%d").to_string())?;
    worksheet.set_column_width(0, 20)?;

    for (col, header) in HEADERS.iter().enumerate() {
        worksheet.write_string(0, col as u16, *header)?;
    }

    for (i, row) in grid.rows.iter().enumerate() {
        let r = i as u32 + 1;
        let timestamp = excel_datetime(row.timestamp)?;
        worksheet.write_datetime_with_format(r, 0, &timestamp, &timestamp_format)?;
        worksheet.write_string(r, 1, row.time_label.as_str())?;
        if let Some(open) = row.open {
            worksheet.write_number(r, 2, open)?;
        }
        if let Some(close) = row.close {
            worksheet.write_number(r, 3, close)?;
        }
        if let Some(volume) = row.volume {
            worksheet.write_number(r, 4, volume as f64)?;
        }
    }

    let buffer = workbook.save_to_buffer()?;
    Ok(buffer)
}
