// LearnHub
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use crate::error::CoreResult;
use crate::reports::{Cell, Report};
use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook, Worksheet};

const MAX_SHEET_NAME: usize = 31;

/// Workbook with the report rows, a summary sheet and the chart series
pub(super) fn render(report: &Report) -> CoreResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold().set_background_color(Color::RGB(0xD9E1F2)).set_align(FormatAlign::Center);
    let bold = Format::new().set_bold();
    let decimal = Format::new().set_num_format("0.0");

    let data = workbook.add_worksheet();
    data.set_name(sheet_name(&report.title))?;
    for (col, column) in report.columns.iter().enumerate() {
        let col = col as u16;
        data.write_string_with_format(0, col, &column.label, &header)?;
        data.set_column_width(col, f64::from(column.width) + 2.0)?;
    }
    for (index, row) in report.rows.iter().enumerate() {
        write_row(data, index as u32 + 1, row, &decimal)?;
    }
    data.set_freeze_panes(1, 0)?;

    let summary = workbook.add_worksheet();
    summary.set_name("Summary")?;
    summary.write_string_with_format(0, 0, &report.title, &bold)?;
    summary.write_string(1, 0, "Generated")?;
    summary.write_string(1, 1, report.generated_at.format("%Y-%m-%d %H:%M UTC").to_string())?;
    for (index, (label, value)) in report.summary.entries().into_iter().enumerate() {
        let row = index as u32 + 3;
        summary.write_string_with_format(row, 0, label, &bold)?;
        summary.write_string(row, 1, value)?;
    }
    summary.set_column_width(0, 24)?;
    summary.set_column_width(1, 18)?;

    let charts = workbook.add_worksheet();
    charts.set_name("Charts")?;
    let series = [
        &report.charts.status_distribution,
        &report.charts.completions_by_month,
        &report.charts.progress_distribution,
        &report.charts.course_completion_rate,
    ];
    for (index, chart) in series.into_iter().enumerate() {
        let col = (index * 3) as u16;
        charts.write_string_with_format(0, col, &chart.name, &bold)?;
        charts.set_column_width(col, 22)?;
        for (offset, (label, value)) in chart.labels.iter().zip(&chart.values).enumerate() {
            let row = offset as u32 + 1;
            charts.write_string(row, col, label)?;
            charts.write_number(row, col + 1, *value)?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn write_row(sheet: &mut Worksheet, row: u32, cells: &[Cell], decimal: &Format) -> CoreResult<()> {
    for (col, cell) in cells.iter().enumerate() {
        let col = col as u16;
        match cell {
            Cell::Integer(v) => {
                sheet.write_number(row, col, *v as f64)?;
            }
            Cell::Number(v) => {
                sheet.write_number_with_format(row, col, *v, decimal)?;
            }
            Cell::Text(v) => {
                sheet.write_string(row, col, v)?;
            }
            Cell::Empty => {}
        }
    }
    Ok(())
}

/// Excel limits sheet names to 31 characters and forbids a few symbols
fn sheet_name(title: &str) -> String {
    title
        .chars()
        .map(|c| if matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\') { '-' } else { c })
        .take(MAX_SHEET_NAME)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::tests::sample_report;

    #[test]
    fn test_workbook_is_a_zip_container() {
        let bytes = render(&sample_report()).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_sheet_name_is_sanitized() {
        assert_eq!(sheet_name("Q1/Q2: Progress"), "Q1-Q2- Progress");
        assert_eq!(sheet_name(&"x".repeat(40)).len(), MAX_SHEET_NAME);
    }
}
