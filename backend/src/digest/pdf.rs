// Minimal PDF 1.4 writer for text reports
//
// Supports the two standard Helvetica faces, word-wrapped paragraphs and
// automatic page breaks on A4 pages. Text is encoded as WinAnsi; characters
// outside printable ASCII are replaced.

use std::fmt::Write;

const PAGE_WIDTH: f64 = 595.0;
const PAGE_HEIGHT: f64 = 842.0;
const MARGIN: f64 = 50.0;
/// Approximate Helvetica advance width as a fraction of the font size
const CHAR_WIDTH_RATIO: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(&self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

/// A document under construction
#[derive(Debug, Clone)]
pub struct PdfDocument {
    pages: Vec<String>,
    /// Baseline of the next line on the current page
    cursor_y: f64,
}

impl Default for PdfDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfDocument {
    pub fn new() -> Self {
        Self {
            pages: vec![String::new()],
            cursor_y: PAGE_HEIGHT - MARGIN,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn add_page(&mut self) {
        self.pages.push(String::new());
        self.cursor_y = PAGE_HEIGHT - MARGIN;
    }

    /// Vertical gap in points
    pub fn space(&mut self, height: f64) {
        self.cursor_y -= height;
    }

    /// Write a paragraph, wrapping at the right margin
    pub fn paragraph(&mut self, text: &str, font: Font, size: f64) {
        let line_height = size * 1.4;
        let max_chars = ((PAGE_WIDTH - 2.0 * MARGIN) / (size * CHAR_WIDTH_RATIO)).floor() as usize;

        for line in wrap(&sanitize(text), max_chars.max(1)) {
            if self.cursor_y - line_height < MARGIN {
                self.add_page();
            }
            self.cursor_y -= line_height;
            self.put_line(&line, font, size, MARGIN);
        }
    }

    /// Write a single line centred on the page
    pub fn centered(&mut self, text: &str, font: Font, size: f64) {
        let line_height = size * 1.4;
        if self.cursor_y - line_height < MARGIN {
            self.add_page();
        }
        self.cursor_y -= line_height;
        let text = sanitize(text);
        let width = text.chars().count() as f64 * size * CHAR_WIDTH_RATIO;
        let x = ((PAGE_WIDTH - width) / 2.0).max(MARGIN);
        self.put_line(&text, font, size, x);
    }

    fn put_line(&mut self, text: &str, font: Font, size: f64, x: f64) {
        let y = self.cursor_y;
        if let Some(page) = self.pages.last_mut() {
            let _ = writeln!(
                page,
                "BT /{} {} Tf {:.2} {:.2} Td ({}) Tj ET",
                font.resource(),
                size,
                x,
                y,
                escape(text)
            );
        }
    }

    /// Serialize the document
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out: Vec<u8> = Vec::new();
        let mut offsets: Vec<usize> = Vec::new();
        let page_count = self.pages.len();

        out.extend_from_slice(b"%PDF-1.4\n");

        let push_obj = |out: &mut Vec<u8>, offsets: &mut Vec<usize>, body: String| {
            offsets.push(out.len());
            let id = offsets.len();
            out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", id, body).as_bytes());
        };

        // 1: catalog, 2: page tree, 3-4: fonts, then (page, content) pairs
        let kids = (0..page_count)
            .map(|i| format!("{} 0 R", 5 + 2 * i))
            .collect::<Vec<_>>()
            .join(" ");

        push_obj(&mut out, &mut offsets, "<< /Type /Catalog /Pages 2 0 R >>".to_string());
        push_obj(
            &mut out,
            &mut offsets,
            format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids, page_count),
        );
        push_obj(
            &mut out,
            &mut offsets,
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                .to_string(),
        );
        push_obj(
            &mut out,
            &mut offsets,
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>"
                .to_string(),
        );

        for (i, content) in self.pages.iter().enumerate() {
            push_obj(
                &mut out,
                &mut offsets,
                format!(
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
                    PAGE_WIDTH,
                    PAGE_HEIGHT,
                    6 + 2 * i
                ),
            );
            push_obj(
                &mut out,
                &mut offsets,
                format!(
                    "<< /Length {} >>\nstream\n{}endstream",
                    content.len(),
                    content
                ),
            );
        }

        let xref_start = out.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", offsets.len() + 1);
        for offset in &offsets {
            let _ = write!(xref, "{:010} 00000 n \n", offset);
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            offsets.len() + 1,
            xref_start
        );
        out.extend_from_slice(xref.as_bytes());
        out
    }
}

/// Map text onto printable ASCII
fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c,
            '\u{2010}'..='\u{2015}' => '-',
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\t' | '\n' | '\r' => ' ',
            _ => '?',
        })
        .collect()
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '(' | ')' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Greedy word wrap; words longer than a line are split
fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word = word.to_string();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(max_chars);
            lines.push(word);
            word = rest;
        }

        if current.is_empty() {
            current = word;
        } else if current.len() + 1 + word.len() <= max_chars {
            current.push(' ');
            current.push_str(&word);
        } else {
            lines.push(std::mem::replace(&mut current, word));
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_structure() {
        let mut doc = PdfDocument::new();
        doc.centered("Report (draft)", Font::Bold, 16.0);
        doc.paragraph("Hello", Font::Regular, 10.0);

        let bytes = doc.to_bytes();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("%PDF-1.4\n"));
        assert!(text.ends_with("%%EOF\n"));
        assert!(text.contains("(Report \\(draft\\)) Tj"));
        assert!(text.contains("/Count 1"));
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let mut doc = PdfDocument::new();
        doc.paragraph("x", Font::Regular, 10.0);
        let text = String::from_utf8(doc.to_bytes()).unwrap();

        let xref = text.find("xref\n").unwrap();
        let first_entry = text[xref..].lines().nth(3).unwrap();
        let offset: usize = first_entry[..10].parse().unwrap();
        assert!(text[offset..].starts_with("1 0 obj"));
    }

    #[test]
    fn test_long_content_breaks_pages() {
        let mut doc = PdfDocument::new();
        for i in 0..200 {
            doc.paragraph(&format!("Line {}", i), Font::Regular, 10.0);
        }
        assert!(doc.page_count() > 1);
        let text = String::from_utf8(doc.to_bytes()).unwrap();
        assert!(text.contains(&format!("/Count {}", doc.page_count())));
    }

    #[test]
    fn test_wrap_and_sanitize() {
        assert_eq!(wrap("aa bb cc", 5), vec!["aa bb", "cc"]);
        assert_eq!(wrap("abcdefgh", 3), vec!["abc", "def", "gh"]);
        assert_eq!(wrap("", 10), vec![""]);
        assert_eq!(sanitize("/plan – done ✓"), "/plan - done ?");
    }
}
