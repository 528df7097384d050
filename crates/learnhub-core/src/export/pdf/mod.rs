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

//! Minimal PDF 1.4 writer for tabular reports
//!
//! Pages are A4 landscape. Cell values wrap onto extra lines inside their
//! column and a row taller than a page continues on the next one, so every
//! value is printed in full.

mod font;

use crate::error::CoreResult;
use crate::reports::Report;
use font::PdfFont;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::Path;

const PAGE_WIDTH: f64 = 842.0;
const PAGE_HEIGHT: f64 = 595.0;
const MARGIN: f64 = 36.0;
const TABLE_FONT_SIZE: f64 = 7.0;
const LINE_HEIGHT: f64 = 9.0;
/// Space above the first and below the last line of a table row
const ROW_PADDING: f64 = 3.0;
const CELL_INSET: f64 = 2.0;
const EMPTY_MESSAGE: &str = "No rows match the selected filters.";

pub(super) fn render(report: &Report, font: Option<&Path>) -> CoreResult<Vec<u8>> {
    let font = PdfFont::select(&report_chars(report), font)?;
    Ok(render_with(report, &font))
}

fn render_with(report: &Report, font: &PdfFont) -> Vec<u8> {
    let pages = Layout::new(report, font).run();
    let total = pages.len();
    let contents: Vec<String> = pages
        .into_iter()
        .enumerate()
        .map(|(index, mut content)| {
            let footer = format!("Page {} of {}", index + 1, total);
            text(&mut content, font, false, 8.0, PAGE_WIDTH - MARGIN - 60.0, MARGIN / 2.0, &footer);
            content
        })
        .collect();
    assemble(&contents, font)
}

/// Every character the document will show
fn report_chars(report: &Report) -> BTreeSet<char> {
    let mut chars: BTreeSet<char> = (' '..='~').collect();
    let mut add = |value: &str| chars.extend(value.chars().filter(|c| !c.is_control()));
    add(&report.title);
    add(EMPTY_MESSAGE);
    for (label, value) in report.summary.entries() {
        add(label);
        add(&value);
    }
    for column in &report.columns {
        add(&column.label);
    }
    for cell in report.rows.iter().flatten() {
        add(&cell.to_string());
    }
    chars
}

/// Lays out title, summary and table rows into page content streams
struct Layout<'a> {
    report: &'a Report,
    font: &'a PdfFont,
    widths: Vec<f64>,
    pages: Vec<String>,
    page: String,
    y: f64,
    rows_on_page: usize,
}

impl<'a> Layout<'a> {
    fn new(report: &'a Report, font: &'a PdfFont) -> Self {
        Self {
            report,
            font,
            widths: column_widths(report),
            pages: Vec::new(),
            page: String::new(),
            y: PAGE_HEIGHT - MARGIN,
            rows_on_page: 0,
        }
    }

    fn run(mut self) -> Vec<String> {
        let (report, font) = (self.report, self.font);
        self.heading();
        self.header_row();

        if report.rows.is_empty() {
            text(&mut self.page, font, false, 9.0, MARGIN, self.y - 9.0, EMPTY_MESSAGE);
        }

        for row in &report.rows {
            let lines: Vec<Vec<String>> = row
                .iter()
                .zip(&self.widths)
                .map(|(cell, width)| wrap(&cell.to_string(), width - 2.0 * CELL_INSET, |s| font.width(s, TABLE_FONT_SIZE, false)))
                .collect();
            self.row(&lines);
        }

        self.pages.push(self.page);
        self.pages
    }

    fn heading(&mut self) {
        let report = self.report;
        text(&mut self.page, self.font, true, 16.0, MARGIN, self.y - 16.0, &report.title);
        self.y -= 30.0;
        let generated = format!("Generated {}", report.generated_at.format("%Y-%m-%d %H:%M UTC"));
        text(&mut self.page, self.font, false, 9.0, MARGIN, self.y, &generated);
        self.y -= 18.0;

        let entries = report.summary.entries();
        for pair in entries.chunks(2) {
            for (slot, (label, value)) in pair.iter().enumerate() {
                let x = MARGIN + slot as f64 * 260.0;
                text(&mut self.page, self.font, true, 9.0, x, self.y, &format!("{}:", label));
                text(&mut self.page, self.font, false, 9.0, x + 130.0, self.y, value);
            }
            self.y -= 12.0;
        }
        self.y -= 12.0;
    }

    /// Shaded header with wrapped column labels
    fn header_row(&mut self) {
        let lines: Vec<Vec<String>> = self
            .report
            .columns
            .iter()
            .zip(&self.widths)
            .map(|(column, width)| wrap(&column.label, width - 2.0 * CELL_INSET, |s| self.font.width(s, TABLE_FONT_SIZE, true)))
            .collect();
        let count = lines.iter().map(Vec::len).max().unwrap_or(0).max(1);
        let height = count as f64 * LINE_HEIGHT + ROW_PADDING;

        let table_width: f64 = self.widths.iter().sum();
        let _ = writeln!(self.page, "0.85 0.88 0.95 rg {:.2} {:.2} {:.2} {:.2} re f 0 g", MARGIN, self.y - height, table_width, height);
        self.draw_lines(&lines, 0..count, true);
        self.y -= height;
    }

    /// Lines that still fit above the bottom margin
    fn room(&self) -> usize {
        ((self.y - MARGIN - ROW_PADDING) / LINE_HEIGHT).floor().max(0.0) as usize
    }

    fn break_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.page));
        self.y = PAGE_HEIGHT - MARGIN;
        self.rows_on_page = 0;
        self.header_row();
    }

    fn row(&mut self, lines: &[Vec<String>]) {
        let count = lines.iter().map(Vec::len).max().unwrap_or(0).max(1);
        let mut start = 0;
        loop {
            let remaining = count - start;
            let room = self.room();
            if remaining <= room {
                self.draw_block(lines, start..count);
                self.rows_on_page += 1;
                return;
            }
            if self.rows_on_page > 0 {
                self.break_page();
                continue;
            }
            // Taller than a whole page: fill this one and carry on
            let take = room.max(1);
            self.draw_block(lines, start..start + take);
            start += take;
            self.break_page();
        }
    }

    fn draw_block(&mut self, lines: &[Vec<String>], range: std::ops::Range<usize>) {
        let height = range.len() as f64 * LINE_HEIGHT + ROW_PADDING;
        self.draw_lines(lines, range, false);
        self.y -= height;

        let table_width: f64 = self.widths.iter().sum();
        let _ = writeln!(self.page, "0.8 G 0.3 w {:.2} {:.2} m {:.2} {:.2} l S 0 G", MARGIN, self.y, MARGIN + table_width, self.y);
    }

    /// Draw lines `range` of every cell, one cell after another
    fn draw_lines(&mut self, lines: &[Vec<String>], range: std::ops::Range<usize>, bold: bool) {
        let mut x = MARGIN;
        for (cell, width) in lines.iter().zip(&self.widths) {
            for (offset, line) in cell.iter().enumerate().skip(range.start).take(range.len()) {
                let baseline = self.y - (offset - range.start + 1) as f64 * LINE_HEIGHT + 1.5;
                text(&mut self.page, self.font, bold, TABLE_FONT_SIZE, x + CELL_INSET, baseline, line);
            }
            x += width;
        }
    }
}

/// Split the printable width proportionally to the column width hints
fn column_widths(report: &Report) -> Vec<f64> {
    let available = PAGE_WIDTH - 2.0 * MARGIN;
    let total: f64 = report.columns.iter().map(|c| f64::from(c.width.max(1))).sum();
    report
        .columns
        .iter()
        .map(|c| if total > 0.0 { available * f64::from(c.width.max(1)) / total } else { 0.0 })
        .collect()
}

/// Break `value` into lines no wider than `width`.
///
/// Lines break after spaces where possible and inside a word only when the
/// word alone is too wide. Breaks keep every character, so the lines joined
/// together give back `value`.
fn wrap(value: &str, width: f64, measure: impl Fn(&str) -> f64) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in value.split_inclusive([' ', '\n']) {
        let candidate = format!("{}{}", line, word);
        if line.is_empty() || measure(candidate.trim_end()) <= width {
            line = candidate;
        } else {
            lines.push(std::mem::take(&mut line));
            line.push_str(word);
        }

        if measure(line.trim_end()) > width {
            let mut piece = String::new();
            for c in std::mem::take(&mut line).chars() {
                piece.push(c);
                if piece.chars().count() > 1 && measure(piece.trim_end()) > width {
                    piece.pop();
                    lines.push(std::mem::replace(&mut piece, c.to_string()));
                }
            }
            line = piece;
        }

        if line.ends_with('\n') {
            lines.push(std::mem::take(&mut line));
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

fn text(page: &mut String, font: &PdfFont, bold: bool, size: f64, x: f64, y: f64, value: &str) {
    let resource = if bold { "F2" } else { "F1" };
    let _ = writeln!(page, "BT /{} {} Tf {:.2} {:.2} Td {} Tj ET", resource, size, x, y, font.encode(value));
}

/// Write the object graph, cross-reference table and trailer
fn assemble(contents: &[String], font: &PdfFont) -> Vec<u8> {
    // 1: catalog, 2: page tree, then the fonts, then a page and a content stream per page
    let (font_objects, regular, bold) = font.objects(3);
    let first_page = 3 + font_objects.len();
    let page_ids: Vec<usize> = (0..contents.len()).map(|i| first_page + i * 2).collect();

    let mut objects: Vec<Vec<u8>> = Vec::with_capacity(2 + font_objects.len() + contents.len() * 2);
    objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());
    let kids: Vec<String> = page_ids.iter().map(|id| format!("{} 0 R", id)).collect();
    objects.push(format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), contents.len()).into_bytes());
    objects.extend(font_objects);

    for (content, page_id) in contents.iter().zip(&page_ids) {
        objects.push(
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] /Resources << /Font << /F1 {} 0 R /F2 {} 0 R >> >> /Contents {} 0 R >>",
                PAGE_WIDTH,
                PAGE_HEIGHT,
                regular,
                bold,
                page_id + 1
            )
            .into_bytes(),
        );
        objects.push(format!("<< /Length {} >>\nstream\n{}endstream", content.len(), content).into_bytes());
    }

    let mut out: Vec<u8> = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (index, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", index + 1).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_at = out.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        let _ = write!(xref, "{:010} 00000 n \n", offset);
    }
    let _ = write!(xref, "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n", objects.len() + 1, xref_at);
    out.extend_from_slice(xref.as_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::font::EmbeddedFont;
    use super::font::tests::synthetic_font;
    use super::*;
    use crate::export::tests::sample_report;
    use crate::reports::Cell;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn as_text(bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }

    /// Literal strings shown with `Tj`, in drawing order
    fn shown_literals(text: &str) -> Vec<String> {
        text.match_indices(") Tj")
            .filter_map(|(end, _)| text[..end].rfind('(').map(|start| text[start + 1..end].to_string()))
            .collect()
    }

    /// Hex strings shown with `Tj`, decoded through the document's ToUnicode map
    fn shown_unicode(text: &str) -> Vec<String> {
        let mut map: HashMap<String, String> = HashMap::new();
        for block in text.split("beginbfchar").skip(1) {
            let body = block.split("endbfchar").next().unwrap();
            for line in body.lines().filter(|l| l.starts_with('<')) {
                let (glyph, unicode) = line.split_once(' ').unwrap();
                let units: Vec<u16> = unicode
                    .trim_matches(['<', '>'])
                    .as_bytes()
                    .chunks(4)
                    .map(|h| u16::from_str_radix(std::str::from_utf8(h).unwrap(), 16).unwrap())
                    .collect();
                map.insert(glyph.trim_matches(['<', '>']).to_string(), String::from_utf16(&units).unwrap());
            }
        }

        text.match_indices("> Tj")
            .filter_map(|(end, _)| text[..end].rfind('<').map(|start| &text[start + 1..end]))
            .map(|hex| hex.as_bytes().chunks(4).map(|g| map[std::str::from_utf8(g).unwrap()].clone()).collect())
            .collect()
    }

    #[test]
    fn test_document_structure() {
        let bytes = render(&sample_report(), None).unwrap();
        let text = as_text(&bytes);
        assert!(text.starts_with("%PDF-1.4"));
        assert!(text.ends_with("%%EOF\n"));
        assert!(text.contains("/Count 1"));
        assert!(text.contains("(Page 1 of 1) Tj"));
        assert!(text.contains("/BaseFont /Helvetica "));
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let bytes = render(&sample_report(), None).unwrap();
        let text = as_text(&bytes);
        let start: usize = text.rsplit("startxref\n").next().unwrap().lines().next().unwrap().parse().unwrap();
        let xref = String::from_utf8(bytes[start..].to_vec()).unwrap();
        assert!(xref.starts_with("xref"));

        for (index, line) in xref.lines().skip(3).take_while(|l| l.ends_with(" n ")).enumerate() {
            let offset: usize = line[..10].parse().unwrap();
            assert!(bytes[offset..].starts_with(format!("{} 0 obj", index + 1).as_bytes()));
        }
    }

    #[test]
    fn test_long_tables_repeat_headers_on_each_page() {
        let mut report = sample_report();
        let row = report.rows[0].clone();
        report.rows = vec![row; 100];

        let text = as_text(&render(&report, None).unwrap());
        assert!(text.contains("/Count 3"));
        assert_eq!(text.matches("(Learner) Tj").count(), 3);
        assert!(text.contains("(Page 3 of 3) Tj"));
    }

    #[test]
    fn test_long_values_wrap_instead_of_truncating() {
        let long = "Advanced distributed systems for practitioners covering consensus protocols, replication strategies, \
                    failure detectors and the operational side of running fault tolerant services in production";
        let mut report = sample_report();
        report.rows[1][0] = Cell::text(long);

        let text = as_text(&render(&report, None).unwrap());
        let shown = shown_literals(&text);
        assert!(shown.concat().contains(long));
        assert!(!shown.iter().any(|s| s == long), "value should span several lines");
        assert!(!text.contains(".."));
    }

    #[test]
    fn test_unicode_values_survive_in_full() {
        let long = "Введение в программирование: владение, заимствование и времена жизни 所有権と借用の入門コース";
        let mut report = sample_report();
        report.rows[0][0] = Cell::text(long);

        let chars = report_chars(&report);
        let data = synthetic_font(chars.iter().copied());
        let font = PdfFont::Embedded(Box::new(EmbeddedFont::load("TestSans", &data, &chars).unwrap()));
        let bytes = render_with(&report, &font);
        let text = as_text(&bytes);

        assert!(text.contains("/Subtype /Type0 /BaseFont /TestSans /Encoding /Identity-H"));
        assert!(text.contains("/FontFile2"));
        let shown = shown_unicode(&text);
        assert!(shown.concat().contains(long));
        assert!(!shown.iter().any(|s| s == long), "value should span several lines");
        assert!(shown.iter().any(|s| s == "Grace Hopper"));
    }

    #[test]
    fn test_non_latin_text_needs_a_usable_font() {
        let mut report = sample_report();
        report.rows[0][0] = Cell::text("日本語");
        let missing = Path::new("/nonexistent/learnhub/font.ttf");
        assert!(render(&report, Some(missing)).is_err());
    }

    #[test]
    fn test_rows_taller_than_a_page_continue_on_the_next() {
        let mut report = sample_report();
        report.rows[0][0] = Cell::text("word ".repeat(3000));

        let text = as_text(&render(&report, None).unwrap());
        let words: usize = shown_literals(&text).iter().map(|s| s.matches("word").count()).sum();
        assert_eq!(words, 3000);
        assert!(!text.contains("/Count 1 "));
    }

    #[test]
    fn test_wrap_breaks_words_and_newlines() {
        let measure = |s: &str| s.chars().count() as f64;
        assert_eq!(wrap("short", 10.0, measure), vec!["short"]);
        assert_eq!(wrap("one two three", 7.0, measure), vec!["one two ", "three"]);
        assert_eq!(wrap("abcdefghij", 4.0, measure), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap("a\nb", 10.0, measure), vec!["a\n", "b"]);
        assert!(wrap("", 10.0, measure).is_empty());
    }

    proptest! {
        #[test]
        fn wrapped_lines_rejoin_to_the_value(value in "[a-zA-Zé本 \n]{0,80}", width in 1.0f64..30.0) {
            let measure = |s: &str| s.chars().count() as f64;
            let lines = wrap(&value, width, measure);
            prop_assert_eq!(lines.concat(), value);
            for line in &lines {
                prop_assert!(measure(line.trim_end()) <= width || line.trim_end().chars().count() <= 1);
            }
        }
    }
}
