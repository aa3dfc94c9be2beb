//! TrueType embedding for text outside WinAnsi (Hangul, CJK, ...).
//!
//! The whole font file is embedded as a `CIDFontType2` descendant of a
//! `Type0` font with `Identity-H` encoding, so every string is written as
//! big-endian two-byte glyph IDs. A `ToUnicode` map keeps the text
//! searchable and copyable.

use std::collections::BTreeMap;
use std::path::Path;

use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use ttf_parser::{name_id, Face, GlyphId};

use crate::error::PdfError;

const FALLBACK_FONT_NAME: &str = "EmbeddedFont";
const BFCHAR_CHUNK: usize = 100;

/// A validated TrueType font ready to be embedded in rendered PDFs.
#[derive(Debug, Clone)]
pub struct EmbeddedFont {
    bytes: Vec<u8>,
    name: String,
}

impl EmbeddedFont {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PdfError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| PdfError::Font(format!("{}: {e}", path.display())))?;
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, PdfError> {
        let face = parse_face(&bytes)?;
        let name = postscript_name(&face);
        Ok(Self { bytes, name })
    }

    /// PostScript name used as the PDF `BaseFont`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(super) fn encoder(&self) -> Result<GlyphEncoder<'_>, PdfError> {
        Ok(GlyphEncoder {
            face: parse_face(&self.bytes)?,
            font: self,
            used: BTreeMap::new(),
        })
    }
}

fn parse_face(bytes: &[u8]) -> Result<Face<'_>, PdfError> {
    Face::parse(bytes, 0).map_err(|e| PdfError::Font(e.to_string()))
}

fn postscript_name(face: &Face<'_>) -> String {
    face.names()
        .into_iter()
        .filter(|name| name.name_id == name_id::POST_SCRIPT_NAME)
        .find_map(|name| name.to_string())
        .map(|name| {
            name.chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
                .collect::<String>()
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_FONT_NAME.to_string())
}

/// Maps text to glyph IDs for one document and remembers which glyphs were
/// used, for the width table and the `ToUnicode` map.
pub(super) struct GlyphEncoder<'a> {
    face: Face<'a>,
    font: &'a EmbeddedFont,
    used: BTreeMap<u16, char>,
}

impl GlyphEncoder<'_> {
    /// Two bytes per character; characters missing from the font map to
    /// glyph 0 (`.notdef`).
    pub(super) fn encode(&mut self, text: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(text.len() * 2);
        for c in text.chars() {
            let gid = self.face.glyph_index(c).map_or(0, |g| g.0);
            if gid != 0 {
                self.used.entry(gid).or_insert(c);
            }
            out.extend_from_slice(&gid.to_be_bytes());
        }
        out
    }

    /// Add the font objects to `doc` and return the `Type0` font.
    pub(super) fn write(self, doc: &mut Document) -> Result<ObjectId, PdfError> {
        let face = &self.face;
        let units_per_em = i64::from(face.units_per_em().max(1));
        let scale = |v: i64| v * 1000 / units_per_em;

        let bbox = face.global_bounding_box();
        let ascent = scale(i64::from(face.ascender()));
        let descent = scale(i64::from(face.descender()));
        let cap_height = face
            .capital_height()
            .map_or(ascent, |h| scale(i64::from(h)));

        let font_file_id = doc.add_object(Stream::new(
            dictionary! { "Length1" => self.font.bytes.len() as i64 },
            self.font.bytes.clone(),
        ));

        let descriptor_id = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => Object::Name(self.font.name.as_bytes().to_vec()),
            "Flags" => 4,
            "FontBBox" => vec![
                Object::Integer(scale(i64::from(bbox.x_min))),
                Object::Integer(scale(i64::from(bbox.y_min))),
                Object::Integer(scale(i64::from(bbox.x_max))),
                Object::Integer(scale(i64::from(bbox.y_max))),
            ],
            "ItalicAngle" => 0,
            "Ascent" => ascent,
            "Descent" => descent,
            "CapHeight" => cap_height,
            "StemV" => 80,
            "FontFile2" => font_file_id,
        });

        let mut widths = Vec::with_capacity(self.used.len() * 2);
        for gid in self.used.keys() {
            let advance = face
                .glyph_hor_advance(GlyphId(*gid))
                .map_or(1000, |a| scale(i64::from(a)));
            widths.push(Object::Integer(i64::from(*gid)));
            widths.push(Object::Array(vec![Object::Integer(advance)]));
        }

        let cid_font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => Object::Name(self.font.name.as_bytes().to_vec()),
            "CIDSystemInfo" => dictionary! {
                "Registry" => Object::string_literal("Adobe"),
                "Ordering" => Object::string_literal("Identity"),
                "Supplement" => 0,
            },
            "FontDescriptor" => descriptor_id,
            "DW" => 1000,
            "W" => widths,
            "CIDToGIDMap" => "Identity",
        });

        let to_unicode_id = doc.add_object(Stream::new(
            dictionary! {},
            to_unicode_cmap(&self.used).into_bytes(),
        ));

        Ok(doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => Object::Name(self.font.name.as_bytes().to_vec()),
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![Object::Reference(cid_font_id)],
            "ToUnicode" => to_unicode_id,
        }))
    }
}

fn to_unicode_cmap(used: &BTreeMap<u16, char>) -> String {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n\
         12 dict begin\n\
         begincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n\
         /CMapType 2 def\n\
         1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
    );

    let entries: Vec<(&u16, &char)> = used.iter().collect();
    for chunk in entries.chunks(BFCHAR_CHUNK) {
        cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for (gid, c) in chunk {
            let mut units = [0u16; 2];
            let hex: String = c
                .encode_utf16(&mut units)
                .iter()
                .map(|u| format!("{u:04X}"))
                .collect();
            cmap.push_str(&format!("<{gid:04X}> <{hex}>\n"));
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str("endcmap\nCMapName currentdict /defineresource pop\nend\nend\n");
    cmap
}
