//! Plain-text PDF rendering.
//!
//! Layout is fixed: US Letter, 12 pt text on a 20 pt leading, 72 pt left
//! margin, first baseline at 720 pt and a page break once the cursor drops
//! below 72 pt. An optional page image is drawn at the top of the first page,
//! at most 400 pt wide, and the text starts below it.
//!
//! Without an [`EmbeddedFont`] the standard Helvetica faces are used and text
//! is written in WinAnsi encoding, so anything outside it becomes `?`. With
//! one, every string is written as glyph IDs of the embedded TrueType font.

mod font;
mod page_image;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::error::PdfError;

pub use font::EmbeddedFont;
pub use page_image::PageImage;

use font::GlyphEncoder;

const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;
const MARGIN_LEFT: i64 = 72;
const TOP_Y: i64 = 720;
const BOTTOM_Y: i64 = 72;
const LEADING: i64 = 20;
const BODY_SIZE: i64 = 12;
const TITLE_SIZE: i64 = 16;
const TITLE_LEADING: i64 = 28;
/// Columns per line at 12 pt across the 468 pt text column. Wide (Hangul,
/// CJK) characters take two columns.
pub const WRAP_COLUMNS: usize = 78;
const IMAGE_MAX_WIDTH: f32 = 400.0;
const IMAGE_MAX_HEIGHT: f32 = 420.0;
const IMAGE_TOP_Y: i64 = TOP_Y + BODY_SIZE;
const IMAGE_RESOURCE: &str = "Im1";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdfDocumentSpec {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub text: String,
    pub image: Option<PageImage>,
}

/// Where the page image lands on the first page, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ImagePlacement {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

impl ImagePlacement {
    fn for_image(image: &PageImage) -> Self {
        let (width, height) = image.fit(IMAGE_MAX_WIDTH, IMAGE_MAX_HEIGHT);
        Self {
            x: MARGIN_LEFT as f32,
            y: IMAGE_TOP_Y as f32 - height,
            width,
            height,
        }
    }

    /// First text baseline below the image.
    fn text_top(&self) -> i64 {
        self.y.floor() as i64 - LEADING
    }

    fn operations(&self) -> Vec<Operation> {
        vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(self.width),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(self.height),
                    Object::Real(self.x),
                    Object::Real(self.y),
                ],
            ),
            Operation::new("Do", vec![IMAGE_RESOURCE.into()]),
            Operation::new("Q", vec![]),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource_name(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Line {
    font: Font,
    size: i64,
    advance: i64,
    text: String,
}

impl Line {
    fn body(text: impl Into<String>) -> Self {
        Self {
            font: Font::Regular,
            size: BODY_SIZE,
            advance: LEADING,
            text: text.into(),
        }
    }

    fn heading(text: impl Into<String>) -> Self {
        Self {
            font: Font::Bold,
            size: BODY_SIZE,
            advance: LEADING,
            text: text.into(),
        }
    }
}

/// Render `document` into PDF bytes, writing text with `font` when given.
pub fn render_pdf(
    document: &PdfDocumentSpec,
    font: Option<&EmbeddedFont>,
) -> Result<Vec<u8>, PdfError> {
    let placement = document.image.as_ref().map(ImagePlacement::for_image);
    let first_top = placement.map_or(TOP_Y, |p| p.text_top());
    let pages = paginate(layout_lines(document), first_top);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut encoder = font.map(EmbeddedFont::encoder).transpose()?;

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for (index, page) in pages.iter().enumerate() {
        let image = placement.filter(|_| index == 0);
        let page_id = add_page(&mut doc, pages_id, page, image, encoder.as_mut())?;
        kids.push(page_id.into());
    }

    let (regular_id, bold_id) = match encoder {
        Some(encoder) => {
            let id = encoder.write(&mut doc)?;
            (id, id)
        }
        None => standard_fonts(&mut doc),
    };

    let mut resources = dictionary! {
        "Font" => dictionary! {
            Font::Regular.resource_name() => regular_id,
            Font::Bold.resource_name() => bold_id,
        },
    };
    if let Some(image) = &document.image {
        let image_id = image.write(&mut doc);
        resources.set("XObject", dictionary! { IMAGE_RESOURCE => image_id });
    }
    let resources_id = doc.add_object(resources);

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(PAGE_WIDTH),
                Object::Integer(PAGE_HEIGHT),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| PdfError::Serialize(e.to_string()))?;
    Ok(bytes)
}

fn standard_fonts(doc: &mut Document) -> (ObjectId, ObjectId) {
    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    (regular_id, bold_id)
}

fn add_page(
    doc: &mut Document,
    pages_id: ObjectId,
    lines: &[(i64, Line)],
    image: Option<ImagePlacement>,
    mut encoder: Option<&mut GlyphEncoder<'_>>,
) -> Result<ObjectId, PdfError> {
    let mut operations = image.map(|p| p.operations()).unwrap_or_default();
    operations.reserve(lines.len() * 5);

    for (y, line) in lines {
        let text = match encoder.as_deref_mut() {
            Some(encoder) => Object::String(encoder.encode(&line.text), StringFormat::Hexadecimal),
            None => Object::string_literal(encode_win_ansi(&line.text)),
        };
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![line.font.resource_name().into(), Object::Integer(line.size)],
        ));
        operations.push(Operation::new(
            "Td",
            vec![Object::Integer(MARGIN_LEFT), Object::Integer(*y)],
        ));
        operations.push(Operation::new("Tj", vec![text]));
        operations.push(Operation::new("ET", vec![]));
    }

    let content = Content { operations }
        .encode()
        .map_err(|e| PdfError::Content(e.to_string()))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, content));

    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    }))
}

fn layout_lines(document: &PdfDocumentSpec) -> Vec<Line> {
    let mut lines = Vec::new();

    if let Some(title) = document.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let title_columns = WRAP_COLUMNS * BODY_SIZE as usize / TITLE_SIZE as usize;
        for chunk in wrap_paragraph(title, title_columns) {
            lines.push(Line {
                font: Font::Bold,
                size: TITLE_SIZE,
                advance: TITLE_LEADING,
                text: chunk,
            });
        }
    }

    if let Some(summary) = document.summary.as_deref().filter(|s| !s.trim().is_empty()) {
        lines.push(Line::heading("Summary:"));
        lines.extend(wrap_text(summary, WRAP_COLUMNS).into_iter().map(Line::body));
        lines.push(Line::body(""));
    }

    lines.push(Line::heading("Text:"));
    lines.extend(wrap_text(&document.text, WRAP_COLUMNS).into_iter().map(Line::body));
    lines
}

/// Assign each line a baseline, starting a new page when the cursor falls
/// below the bottom margin. The first page starts at `first_top`.
fn paginate(lines: Vec<Line>, first_top: i64) -> Vec<Vec<(i64, Line)>> {
    let mut pages = vec![Vec::new()];
    let mut y = first_top;

    for line in lines {
        if y < BOTTOM_Y {
            pages.push(Vec::new());
            y = TOP_Y;
        }
        let advance = line.advance;
        if let Some(page) = pages.last_mut() {
            page.push((y, line));
        }
        y -= advance;
    }

    pages
}

/// Wrap every paragraph of `text`, keeping blank lines.
pub fn wrap_text(text: &str, columns: usize) -> Vec<String> {
    text.replace("\r\n", "\n")
        .split('\n')
        .flat_map(|paragraph| wrap_paragraph(paragraph, columns))
        .collect()
}

/// Columns a character occupies; Hangul, kana and CJK ideographs are wide.
fn char_columns(c: char) -> usize {
    match c as u32 {
        0x1100..=0x115F
        | 0x2E80..=0x303E
        | 0x3041..=0x33FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xA000..=0xA4CF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6
        | 0x20000..=0x3FFFD => 2,
        _ => 1,
    }
}

fn text_columns(text: &str) -> usize {
    text.chars().map(char_columns).sum()
}

fn wrap_paragraph(paragraph: &str, columns: usize) -> Vec<String> {
    let columns = columns.max(1);
    let paragraph = paragraph.replace('\t', "    ");
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in paragraph.split_whitespace() {
        let word_len = text_columns(word);

        if current_len > 0 && current_len + 1 + word_len > columns {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if word_len > columns {
            // Hard-split words that cannot fit on any line
            for c in word.chars() {
                let width = char_columns(c);
                if current_len > 0 && current_len + width > columns {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                current.push(c);
                current_len += width;
            }
            continue;
        }

        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if current_len > 0 || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Map to WinAnsi bytes: printable ASCII and Latin-1 pass through, all else
/// becomes `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7E | 0xA0..=0xFF => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use ::image::{DynamicImage, ImageFormat, Rgb, RgbImage};

    use super::font::tests::synthetic_ttf;

    fn page_count(bytes: &[u8]) -> usize {
        Document::load_mem(bytes).unwrap().get_pages().len()
    }

    fn page_operations(doc: &Document, page: u32) -> Vec<Operation> {
        let page_id = doc.get_pages()[&page];
        Content::decode(&doc.get_page_content(page_id).unwrap())
            .unwrap()
            .operations
    }

    fn shown_strings(operations: &[Operation]) -> Vec<Vec<u8>> {
        operations
            .iter()
            .filter(|op| op.operator == "Tj")
            .map(|op| op.operands[0].as_str().unwrap().to_vec())
            .collect()
    }

    fn page_image(width: u32, height: u32) -> PageImage {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 200, 200]));
        let mut png = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();
        PageImage::decode(&png).unwrap()
    }

    #[test]
    fn test_render_starts_with_pdf_header() {
        let bytes = render_pdf(
            &PdfDocumentSpec {
                title: Some("Chapter 1".to_string()),
                summary: Some("A short summary.".to_string()),
                text: "Hello, world.".to_string(),
                image: None,
            },
            None,
        )
        .unwrap();

        assert!(bytes.starts_with(b"%PDF-"));
        assert_eq!(page_count(&bytes), 1);
    }

    #[test]
    fn test_long_text_paginates() {
        let text = (0..120)
            .map(|i| format!("line {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        let bytes = render_pdf(
            &PdfDocumentSpec {
                text,
                ..Default::default()
            },
            None,
        )
        .unwrap();

        // 33 lines fit between 720 and 72 on a 20 pt leading
        assert_eq!(page_count(&bytes), 4);
    }

    #[test]
    fn test_standard_font_replaces_hangul() {
        let bytes = render_pdf(
            &PdfDocumentSpec {
                text: "한국어 페이지 abc".to_string(),
                ..Default::default()
            },
            None,
        )
        .unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        let shown = shown_strings(&page_operations(&doc, 1));
        assert!(shown.contains(&b"??? ??? abc".to_vec()));
    }

    #[test]
    fn test_embedded_font_writes_hangul_as_glyph_ids() {
        let font = EmbeddedFont::from_bytes(synthetic_ttf("한국어 페이지abc")).unwrap();
        let bytes = render_pdf(
            &PdfDocumentSpec {
                text: "한국어 페이지 abc".to_string(),
                ..Default::default()
            },
            Some(&font),
        )
        .unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        let shown = shown_strings(&page_operations(&doc, 1));

        // 한 국 어 ' ' 페 이 지 ' ' a b c
        let expected: Vec<u8> = [1u16, 2, 3, 4, 5, 6, 7, 4, 8, 9, 10]
            .iter()
            .flat_map(|gid| gid.to_be_bytes())
            .collect();
        assert!(shown.contains(&expected));
        assert!(shown.iter().all(|s| s.len() % 2 == 0));
        assert!(!shown.iter().any(|s| s.windows(3).any(|w| w == b"???")));
    }

    #[test]
    fn test_embedded_font_is_identity_h_type0() {
        let font = EmbeddedFont::from_bytes(synthetic_ttf("abc")).unwrap();
        let bytes = render_pdf(
            &PdfDocumentSpec {
                text: "abc".to_string(),
                ..Default::default()
            },
            Some(&font),
        )
        .unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        let page_id = doc.get_pages()[&1];
        let fonts = doc.get_page_fonts(page_id).unwrap();
        let regular = fonts[b"F1".as_slice()];

        assert_eq!(regular.get(b"Subtype").unwrap().as_name().unwrap(), b"Type0");
        assert_eq!(regular.get(b"Encoding").unwrap().as_name().unwrap(), b"Identity-H");
        assert!(regular.get(b"ToUnicode").is_ok());
        assert_eq!(regular.get(b"DescendantFonts").unwrap().as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_image_is_drawn_above_text() {
        let bytes = render_pdf(
            &PdfDocumentSpec {
                text: "caption".to_string(),
                image: Some(page_image(800, 600)),
                ..Default::default()
            },
            None,
        )
        .unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        let page_id = doc.get_pages()[&1];
        let (_, resource_ids) = doc.get_page_resources(page_id).unwrap();
        let has_image = resource_ids.iter().any(|id| {
            doc.get_dictionary(*id)
                .and_then(|resources| resources.get(b"XObject"))
                .and_then(Object::as_dict)
                .map(|xobjects| xobjects.has(IMAGE_RESOURCE.as_bytes()))
                .unwrap_or(false)
        });
        assert!(has_image);

        let operations = page_operations(&doc, 1);
        let cm = operations.iter().find(|op| op.operator == "cm").unwrap();
        let matrix: Vec<f32> = cm.operands.iter().map(|o| o.as_float().unwrap()).collect();
        assert_eq!(matrix[0], 400.0);
        assert_eq!(matrix[3], 300.0);
        assert!(operations.iter().any(|op| op.operator == "Do"));

        let image_bottom = matrix[5];
        let first_baseline = operations
            .iter()
            .find(|op| op.operator == "Td")
            .map(|op| op.operands[1].as_float().unwrap())
            .unwrap();
        assert!(first_baseline < image_bottom);
    }

    #[test]
    fn test_image_only_on_first_page() {
        let text = (0..60)
            .map(|i| format!("line {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        let bytes = render_pdf(
            &PdfDocumentSpec {
                text,
                image: Some(page_image(100, 400)),
                ..Default::default()
            },
            None,
        )
        .unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        assert!(doc.get_pages().len() >= 2);
        assert!(page_operations(&doc, 1).iter().any(|op| op.operator == "Do"));
        assert!(!page_operations(&doc, 2).iter().any(|op| op.operator == "Do"));
    }

    #[test]
    fn test_encode_win_ansi_replaces_unencodable() {
        assert_eq!(encode_win_ansi("Café"), vec![b'C', b'a', b'f', 0xE9]);
        assert_eq!(encode_win_ansi("가a"), b"?a".to_vec());
    }

    #[test]
    fn test_wrap_text_keeps_blank_lines() {
        let lines = wrap_text("first\n\nsecond", 78);
        assert_eq!(lines, vec!["first", "", "second"]);
    }

    #[test]
    fn test_wrap_paragraph_breaks_on_words() {
        let lines = wrap_text("aaa bbb ccc", 7);
        assert_eq!(lines, vec!["aaa bbb", "ccc"]);
    }

    #[test]
    fn test_wrap_splits_overlong_words() {
        let lines = wrap_text("abcdefghij", 4);
        assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_wrap_counts_hangul_as_wide() {
        assert_eq!(wrap_text("가나다라 마", 8), vec!["가나다라", "마"]);
        assert_eq!(wrap_text("가나다", 4), vec!["가나", "다"]);
        assert_eq!(text_columns("한a"), 3);
    }

    #[test]
    fn test_paginate_breaks_below_margin() {
        let lines = (0..34).map(|i| Line::body(i.to_string())).collect();
        let pages = paginate(lines, TOP_Y);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].len(), 33);
        assert_eq!(pages[0][32].0, 80);
        assert_eq!(pages[1][0].0, TOP_Y);
    }

    #[test]
    fn test_paginate_starts_first_page_lower() {
        let lines = (0..20).map(|i| Line::body(i.to_string())).collect();
        let pages = paginate(lines, 300);
        assert_eq!(pages[0][0].0, 300);
        assert_eq!(pages[0].len(), 12);
        assert_eq!(pages[1][0].0, TOP_Y);
    }
}
