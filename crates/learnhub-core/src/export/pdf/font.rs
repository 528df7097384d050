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

//! Fonts for PDF exports
//!
//! Reports whose text is all Latin-1 use the built-in Helvetica fonts.
//! Anything else is set in a TrueType font embedded as a CID font with a
//! `ToUnicode` map, so the text can be copied and searched as written.

use crate::error::{CoreError, CoreResult};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info};

/// Helvetica advance widths for `' '..='~'` in 1/1000 em
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' ' to '/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // digits
    278, 278, 584, 584, 584, 556, 1015, // ':' to '@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A' to 'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N' to 'Z'
    278, 278, 278, 469, 556, 333, // '[' to '`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a' to 'm'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n' to 'z'
    334, 260, 334, 584, // '{' to '~'
];
const HELVETICA_LATIN1_WIDTH: u16 = 556;
/// Helvetica-Bold runs wider than the regular metrics
const BOLD_FACTOR: f64 = 1.08;

/// ToUnicode `bfchar` blocks hold at most 100 entries
const BFCHAR_CHUNK: usize = 100;

/// Characters the built-in fonts can show. Controls are drawn as spaces.
pub(super) fn is_latin1(c: char) -> bool {
    matches!(c, ' '..='~' | '\u{a0}'..='\u{ff}') || c.is_control()
}

pub(super) enum PdfFont {
    /// Helvetica and Helvetica-Bold with WinAnsi encoding
    Standard,
    /// A TrueType font embedded once and used for both weights
    Embedded(Box<EmbeddedFont>),
}

impl PdfFont {
    /// Pick the font for a report using `chars`.
    ///
    /// A configured font file always wins and must cover every character.
    /// Otherwise Latin-1 text uses Helvetica and other text needs an
    /// installed TrueType font covering all of it.
    pub(super) fn select(chars: &BTreeSet<char>, configured: Option<&Path>) -> CoreResult<Self> {
        if let Some(path) = configured {
            let data = std::fs::read(path).map_err(|e| CoreError::Export {
                message: format!("Cannot read PDF font {}: {}", path.display(), e),
            })?;
            let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            return EmbeddedFont::load(name, &data, chars).map(|font| PdfFont::Embedded(Box::new(font)));
        }

        if chars.iter().all(|c| is_latin1(*c)) {
            return Ok(PdfFont::Standard);
        }

        match system_font(chars) {
            Some(font) => Ok(PdfFont::Embedded(Box::new(font))),
            None => {
                let wide: String = chars.iter().filter(|c| !is_latin1(**c)).take(10).collect();
                Err(CoreError::Export {
                    message: format!("No installed TrueType font covers '{}'; configure a PDF font", wide),
                })
            }
        }
    }

    /// Width of `value` set at `size` points
    pub(super) fn width(&self, value: &str, size: f64, bold: bool) -> f64 {
        match self {
            PdfFont::Standard => {
                let units: f64 = value.chars().map(|c| f64::from(helvetica_width(c))).sum();
                let width = units * size / 1000.0;
                if bold { width * BOLD_FACTOR } else { width }
            }
            PdfFont::Embedded(font) => font.width(value, size),
        }
    }

    /// Encode `value` as a PDF string operand
    pub(super) fn encode(&self, value: &str) -> String {
        match self {
            PdfFont::Standard => format!("({})", escape(value)),
            PdfFont::Embedded(font) => font.encode(value),
        }
    }

    /// Font dictionaries starting at object `first_id`.
    ///
    /// Returns the objects with the ids of the regular and bold fonts.
    pub(super) fn objects(&self, first_id: usize) -> (Vec<Vec<u8>>, usize, usize) {
        match self {
            PdfFont::Standard => (
                vec![
                    b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_vec(),
                    b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>".to_vec(),
                ],
                first_id,
                first_id + 1,
            ),
            PdfFont::Embedded(font) => (font.objects(first_id), first_id, first_id),
        }
    }
}

fn helvetica_width(c: char) -> u16 {
    match c {
        ' '..='~' => HELVETICA_WIDTHS[c as usize - ' ' as usize],
        c if c.is_control() => HELVETICA_WIDTHS[0],
        _ => HELVETICA_LATIN1_WIDTH,
    }
}

/// Escape a string for a PDF literal using WinAnsi code points
pub(super) fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            ' '..='~' => out.push(c),
            '\u{a0}'..='\u{ff}' => {
                let _ = write!(out, "\\{:03o}", c as u32);
            }
            // Only controls get here; `select` routes other text to an embedded font
            _ => out.push(' '),
        }
    }
    out
}

/// A parsed TrueType font ready to embed
pub(super) struct EmbeddedFont {
    name: String,
    data: Vec<u8>,
    units_per_em: f64,
    ascent: i16,
    descent: i16,
    cap_height: i16,
    bbox: [i16; 4],
    /// Glyph id and advance of every character the report uses
    glyphs: BTreeMap<char, (u16, u16)>,
}

impl EmbeddedFont {
    /// Parse `data` and map every character in `chars` to a glyph
    pub(super) fn load(name: &str, data: &[u8], chars: &BTreeSet<char>) -> CoreResult<Self> {
        let invalid = |reason: &str| CoreError::Export {
            message: format!("PDF font '{}' {}", name, reason),
        };

        // FontFile2 takes a single TrueType font, not a collection or CFF outlines
        if !matches!(data.get(..4), Some([0, 1, 0, 0]) | Some(b"true")) {
            return Err(invalid("is not a TrueType font"));
        }
        let face = ttf_parser::Face::parse(data, 0).map_err(|e| invalid(&format!("could not be parsed: {}", e)))?;

        let mut glyphs = BTreeMap::new();
        let mut missing = String::new();
        for &c in chars.iter().filter(|c| !c.is_control()) {
            match face.glyph_index(c) {
                Some(glyph) => {
                    let advance = face.glyph_hor_advance(glyph).unwrap_or(0);
                    glyphs.insert(c, (glyph.0, advance));
                }
                None => missing.push(c),
            }
        }
        if !missing.is_empty() {
            return Err(invalid(&format!("has no glyphs for '{}'", missing)));
        }

        let bbox = face.global_bounding_box();
        Ok(Self {
            name: postscript_name(name),
            units_per_em: f64::from(face.units_per_em()),
            ascent: face.ascender(),
            descent: face.descender(),
            cap_height: face.capital_height().unwrap_or_else(|| face.ascender()),
            bbox: [bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max],
            glyphs,
            data: data.to_vec(),
        })
    }

    fn glyph(&self, c: char) -> (u16, u16) {
        let c = if c.is_control() { ' ' } else { c };
        self.glyphs.get(&c).copied().unwrap_or((0, 0))
    }

    fn width(&self, value: &str, size: f64) -> f64 {
        let units: f64 = value.chars().map(|c| f64::from(self.glyph(c).1)).sum();
        units * size / self.units_per_em
    }

    fn encode(&self, value: &str) -> String {
        let mut out = String::with_capacity(value.len() * 4 + 2);
        out.push('<');
        for c in value.chars() {
            let _ = write!(out, "{:04X}", self.glyph(c).0);
        }
        out.push('>');
        out
    }

    /// Scale font units to the 1/1000 em PDF metrics use
    fn scaled(&self, units: impl Into<f64>) -> i64 {
        (units.into() * 1000.0 / self.units_per_em).round() as i64
    }

    /// Type0 font, CID font, descriptor, font file and ToUnicode map
    fn objects(&self, first_id: usize) -> Vec<Vec<u8>> {
        let (cid_id, descriptor_id, file_id, to_unicode_id) = (first_id + 1, first_id + 2, first_id + 3, first_id + 4);

        let type0 = format!(
            "<< /Type /Font /Subtype /Type0 /BaseFont /{} /Encoding /Identity-H /DescendantFonts [{} 0 R] /ToUnicode {} 0 R >>",
            self.name, cid_id, to_unicode_id
        );

        let mut widths = BTreeMap::new();
        for &(glyph, advance) in self.glyphs.values() {
            widths.insert(glyph, self.scaled(advance));
        }
        let w: Vec<String> = widths.iter().map(|(glyph, width)| format!("{} [{}]", glyph, width)).collect();
        let cid = format!(
            "<< /Type /Font /Subtype /CIDFontType2 /BaseFont /{} /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> /FontDescriptor {} 0 R /CIDToGIDMap /Identity /W [{}] >>",
            self.name,
            descriptor_id,
            w.join(" ")
        );

        let [x_min, y_min, x_max, y_max] = self.bbox;
        let descriptor = format!(
            "<< /Type /FontDescriptor /FontName /{} /Flags 32 /FontBBox [{} {} {} {}] /ItalicAngle 0 /Ascent {} /Descent {} /CapHeight {} /StemV 80 /FontFile2 {} 0 R >>",
            self.name,
            self.scaled(x_min),
            self.scaled(y_min),
            self.scaled(x_max),
            self.scaled(y_max),
            self.scaled(self.ascent),
            self.scaled(self.descent),
            self.scaled(self.cap_height),
            file_id
        );

        let mut file = format!("<< /Length {} /Length1 {} >>\nstream\n", self.data.len(), self.data.len()).into_bytes();
        file.extend_from_slice(&self.data);
        file.extend_from_slice(b"\nendstream");

        let cmap = self.to_unicode();
        let to_unicode = format!("<< /Length {} >>\nstream\n{}endstream", cmap.len(), cmap);

        vec![type0.into_bytes(), cid.into_bytes(), descriptor.into_bytes(), file, to_unicode.into_bytes()]
    }

    /// CMap from glyph ids back to the characters they were chosen for
    fn to_unicode(&self) -> String {
        let mut by_glyph: BTreeMap<u16, char> = BTreeMap::new();
        for (&c, &(glyph, _)) in &self.glyphs {
            by_glyph.entry(glyph).or_insert(c);
        }

        let mut cmap = String::from(
            "/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n\
             /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
             /CMapName /Adobe-Identity-UCS def\n/CMapType 2 def\n\
             1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
        );
        let entries: Vec<(u16, char)> = by_glyph.into_iter().collect();
        for chunk in entries.chunks(BFCHAR_CHUNK) {
            let _ = writeln!(cmap, "{} beginbfchar", chunk.len());
            for (glyph, c) in chunk {
                let mut units = [0u16; 2];
                let utf16: String = c.encode_utf16(&mut units).iter().map(|u| format!("{:04X}", u)).collect();
                let _ = writeln!(cmap, "<{:04X}> <{}>", glyph, utf16);
            }
            cmap.push_str("endbfchar\n");
        }
        cmap.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
        cmap
    }
}

/// PDF names allow letters, digits and a few punctuation marks
fn postscript_name(name: &str) -> String {
    let cleaned: String = name.chars().filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_')).collect();
    if cleaned.is_empty() { "LearnHubFont".to_string() } else { cleaned }
}

/// Find an installed font covering every character, preferring sans-serif
fn system_font(chars: &BTreeSet<char>) -> Option<EmbeddedFont> {
    static DATABASE: OnceLock<fontdb::Database> = OnceLock::new();
    let db = DATABASE.get_or_init(|| {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        debug!("Discovered {} font faces for PDF export", db.faces().count());
        db
    });

    let preferred = db.query(&fontdb::Query {
        families: &[fontdb::Family::SansSerif],
        weight: fontdb::Weight::NORMAL,
        stretch: fontdb::Stretch::Normal,
        style: fontdb::Style::Normal,
    });

    for id in preferred.into_iter().chain(db.faces().map(|face| face.id)) {
        let Some(info) = db.face(id) else { continue };
        let loaded = db
            .with_face_data(id, |data, index| if index == 0 { EmbeddedFont::load(&info.post_script_name, data, chars).ok() } else { None })
            .flatten();
        if let Some(font) = loaded {
            info!("Embedding font {} in PDF export", font.name);
            return Some(font);
        }
    }
    None
}

#[cfg(test)]
pub(super) mod tests {
    use super::*;

    fn table(out: &mut Vec<u8>, values: &[u32], sizes: &[usize]) {
        for (value, size) in values.iter().zip(sizes) {
            out.extend_from_slice(&value.to_be_bytes()[4 - size..]);
        }
    }

    /// Build a small TrueType font with one 600-unit glyph per character
    pub(in crate::export) fn synthetic_font(chars: impl IntoIterator<Item = char>) -> Vec<u8> {
        let chars: BTreeSet<char> = chars.into_iter().collect();
        let glyph_count = chars.len() + 1;

        let mut head = Vec::new();
        // version, revision, checksum adjustment, magic, flags, units per em
        table(&mut head, &[0x0001_0000, 0x0001_0000, 0, 0x5F0F_3CF5, 0, 1000], &[4, 4, 4, 4, 2, 2]);
        head.extend_from_slice(&[0; 16]);
        // bbox, mac style, lowest ppem, direction hint, loca format, glyph format
        table(&mut head, &[0, (-200i16) as u16 as u32, 600, 800, 0, 8, 2, 0, 0], &[2; 9]);

        let mut hhea = Vec::new();
        table(&mut hhea, &[0x0001_0000, 800, (-200i16) as u16 as u32, 0], &[4, 2, 2, 2]);
        hhea.extend_from_slice(&[0; 24]);
        table(&mut hhea, &[glyph_count as u32], &[2]);

        let mut maxp = Vec::new();
        table(&mut maxp, &[0x0000_5000, glyph_count as u32], &[4, 2]);

        let mut hmtx = Vec::new();
        for _ in 0..glyph_count {
            table(&mut hmtx, &[600, 0], &[2, 2]);
        }

        let mut cmap = Vec::new();
        table(&mut cmap, &[0, 1, 3, 10, 12], &[2, 2, 2, 2, 4]);
        table(&mut cmap, &[12, 0, 16 + 12 * chars.len() as u32, 0, chars.len() as u32], &[2, 2, 4, 4, 4]);
        for (index, c) in chars.iter().enumerate() {
            table(&mut cmap, &[*c as u32, *c as u32, index as u32 + 1], &[4, 4, 4]);
        }

        let tables: [(&[u8; 4], Vec<u8>); 5] = [(b"cmap", cmap), (b"head", head), (b"hhea", hhea), (b"hmtx", hmtx), (b"maxp", maxp)];
        let mut font = Vec::new();
        table(&mut font, &[0x0001_0000, tables.len() as u32, 64, 2, 16], &[4, 2, 2, 2, 2]);
        let mut offset = 12 + 16 * tables.len();
        for (tag, data) in &tables {
            font.extend_from_slice(*tag);
            table(&mut font, &[0, offset as u32, data.len() as u32], &[4, 4, 4]);
            offset += data.len().next_multiple_of(4);
        }
        for (_, data) in &tables {
            font.extend_from_slice(data);
            font.resize(font.len().next_multiple_of(4), 0);
        }
        font
    }

    fn set(text: &str) -> BTreeSet<char> {
        text.chars().collect()
    }

    #[test]
    fn test_latin1_reports_use_helvetica() {
        let chars = set("Café Ünïcode (Ada) 100%");
        assert!(matches!(PdfFont::select(&chars, None).unwrap(), PdfFont::Standard));
    }

    #[test]
    fn test_configured_font_must_exist() {
        let chars = set("日本");
        let missing = Path::new("/nonexistent/learnhub/font.ttf");
        assert!(matches!(PdfFont::select(&chars, Some(missing)), Err(CoreError::Export { .. })));
    }

    #[test]
    fn test_configured_font_file_is_embedded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Report Sans.ttf");
        std::fs::write(&path, synthetic_font("Ада".chars())).unwrap();

        let font = PdfFont::select(&set("Ада"), Some(&path)).unwrap();
        match font {
            PdfFont::Embedded(font) => assert_eq!(font.name, "ReportSans"),
            PdfFont::Standard => panic!("expected an embedded font"),
        }
    }

    #[test]
    fn test_font_without_glyphs_is_rejected_by_name() {
        let data = synthetic_font("abc".chars());
        match EmbeddedFont::load("Sans", &data, &set("ab本")) {
            Err(CoreError::Export { message }) => assert!(message.contains('本'), "{}", message),
            Err(other) => panic!("unexpected error: {:?}", other),
            Ok(_) => panic!("font should not cover every character"),
        }
        assert!(EmbeddedFont::load("Sans", b"ttcf-collection", &set("a")).is_err());
    }

    #[test]
    fn test_embedded_encoding_and_to_unicode_map() {
        let font = EmbeddedFont::load("Sans", &synthetic_font("aé本".chars()), &set("aé本")).unwrap();
        // glyph ids follow code point order
        assert_eq!(font.encode("本a"), "<00030001>");
        assert_eq!(font.width("aé", 10.0), 12.0);

        let cmap = font.to_unicode();
        assert!(cmap.contains("3 beginbfchar"));
        assert!(cmap.contains("<0001> <0061>"));
        assert!(cmap.contains("<0003> <672C>"));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a(b)\\c"), "a\\(b\\)\\\\c");
        assert_eq!(escape("café"), "caf\\351");
        assert_eq!(escape("tab\there"), "tab here");
    }

    #[test]
    fn test_helvetica_widths() {
        let font = PdfFont::Standard;
        assert_eq!(font.width("W", 1000.0, false), 944.0);
        assert_eq!(font.width("il", 10.0, false), 4.44);
        assert!(font.width("Course", 7.0, true) > font.width("Course", 7.0, false));
    }
}
