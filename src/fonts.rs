use lopdf::{Object, StringFormat};
use owned_ttf_parser::{AsFaceRef as _, Face, OwnedFace};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
    sync::Arc,
};
use unicode_normalization::UnicodeNormalization as _;

use crate::error::{ContextError, ErrorKind};

/// Widths of the printable ASCII characters (from the space up to the tilde) of
/// Times-Roman, in thousandths of the font size, as published in its AFM metrics.
#[rustfmt::skip]
const TIMES_ROMAN_WIDTHS: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500,
    278, 278, 564, 564, 564, 444, 921,
    722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889,
    722, 722, 556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611,
    333, 278, 333, 469, 500, 333,
    444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778,
    500, 500, 500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444,
    480, 200, 480, 541,
];

/// Widths of the printable ASCII characters of Helvetica-Bold, in thousandths of the font size.
#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

/// Widths of the Latin-1 half of WinAnsi (from the no-break space up to `ÿ`) of Times-Roman.
#[rustfmt::skip]
const TIMES_ROMAN_LATIN1_WIDTHS: [u16; 96] = [
    250, 333, 500, 500, 500, 500, 200, 500, 333, 760, 276, 500, 564, 333, 760, 333,
    400, 564, 300, 300, 333, 500, 453, 250, 333, 300, 310, 500, 750, 750, 750, 444,
    722, 722, 722, 722, 722, 722, 889, 667, 611, 611, 611, 611, 333, 333, 333, 333,
    722, 722, 722, 722, 722, 722, 722, 564, 722, 722, 722, 722, 722, 722, 556, 500,
    444, 444, 444, 444, 444, 444, 667, 444, 444, 444, 444, 444, 278, 278, 278, 278,
    500, 500, 500, 500, 500, 500, 500, 564, 500, 500, 500, 500, 500, 500, 500, 500,
];

/// Widths of the Latin-1 half of WinAnsi of Helvetica-Bold.
#[rustfmt::skip]
const HELVETICA_BOLD_LATIN1_WIDTHS: [u16; 96] = [
    278, 333, 556, 556, 556, 556, 280, 556, 333, 737, 370, 556, 584, 333, 737, 333,
    400, 584, 333, 333, 333, 611, 556, 278, 333, 333, 365, 556, 834, 834, 834, 611,
    722, 722, 722, 722, 722, 722, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278,
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611,
    556, 556, 556, 556, 556, 556, 889, 556, 556, 556, 556, 556, 278, 278, 278, 278,
    611, 611, 611, 611, 611, 611, 611, 584, 611, 611, 611, 611, 611, 556, 611, 556,
];

/// The WinAnsi code points outside of the Latin-1 ranges which map to themselves.
const WIN_ANSI_EXTRAS: [(char, u8); 27] = [
    ('€', 0x80), ('‚', 0x82), ('ƒ', 0x83), ('„', 0x84), ('…', 0x85), ('†', 0x86),
    ('‡', 0x87), ('ˆ', 0x88), ('‰', 0x89), ('Š', 0x8A), ('‹', 0x8B), ('Œ', 0x8C),
    ('Ž', 0x8E), ('‘', 0x91), ('’', 0x92), ('“', 0x93), ('”', 0x94), ('•', 0x95),
    ('–', 0x96), ('—', 0x97), ('˜', 0x98), ('™', 0x99), ('š', 0x9A), ('›', 0x9B),
    ('œ', 0x9C), ('ž', 0x9E), ('Ÿ', 0x9F),
];

/// Widths of the characters of `WIN_ANSI_EXTRAS`, in the same order, for Times-Roman.
#[rustfmt::skip]
const TIMES_ROMAN_EXTRA_WIDTHS: [u16; 27] = [
    500, 333, 500, 444, 1000, 500, 500, 333, 1000, 556, 333, 889, 611, 333,
    333, 444, 444, 350, 500, 1000, 333, 980, 389, 333, 722, 444, 722,
];

/// Widths of the characters of `WIN_ANSI_EXTRAS` for Helvetica-Bold.
#[rustfmt::skip]
const HELVETICA_BOLD_EXTRA_WIDTHS: [u16; 27] = [
    556, 278, 556, 500, 1000, 556, 556, 333, 1000, 667, 333, 1000, 611, 278,
    278, 500, 500, 350, 556, 1000, 333, 1000, 556, 333, 944, 500, 667,
];

/// One of the standard Type1 fonts every PDF reader ships with, so they need no font file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StandardFont {
    #[serde(rename = "Times-Roman")]
    TimesRoman,
    #[serde(rename = "Helvetica-Bold")]
    HelveticaBold,
}

impl StandardFont {
    /// The PostScript name of the font, used as the `BaseFont` entry.
    pub fn base_font_name(self) -> &'static str {
        match self {
            StandardFont::TimesRoman => "Times-Roman",
            StandardFont::HelveticaBold => "Helvetica-Bold",
        }
    }

    /// The advance width of a character in thousandths of the font size, or `None`
    /// if the character cannot be encoded with the WinAnsi encoding.
    pub fn character_width(self, character: char) -> Option<u16> {
        let (ascii_widths, latin1_widths, extra_widths) = match self {
            StandardFont::TimesRoman => (
                &TIMES_ROMAN_WIDTHS,
                &TIMES_ROMAN_LATIN1_WIDTHS,
                &TIMES_ROMAN_EXTRA_WIDTHS,
            ),
            StandardFont::HelveticaBold => (
                &HELVETICA_BOLD_WIDTHS,
                &HELVETICA_BOLD_LATIN1_WIDTHS,
                &HELVETICA_BOLD_EXTRA_WIDTHS,
            ),
        };

        let code = win_ansi_code(character)?;
        match code {
            0x20..=0x7E => Some(ascii_widths[usize::from(code - 0x20)]),
            0xA0..=0xFF => Some(latin1_widths[usize::from(code - 0xA0)]),
            _ => WIN_ANSI_EXTRAS
                .iter()
                .position(|(_, extra_code)| *extra_code == code)
                .map(|position| extra_widths[position]),
        }
    }

    /// The WinAnsi bytes of the text. A character outside of WinAnsi fails the whole text.
    fn encode_text(self, text: &str) -> Result<Vec<u8>, ContextError> {
        text.nfc()
            .map(|character| {
                win_ansi_code(character).ok_or_else(|| {
                    ContextError::composition(format!(
                        "The font {} cannot encode the character {:?} of {:?}",
                        self.base_font_name(),
                        character,
                        text
                    ))
                })
            })
            .collect()
    }

    fn text_width(self, text: &str) -> f32 {
        text.nfc()
            .filter_map(|character| self.character_width(character))
            .map(f32::from)
            .sum::<f32>()
            / 1000.0
    }
}

/// The WinAnsi code of a character, if there is one.
fn win_ansi_code(character: char) -> Option<u8> {
    match character as u32 {
        code @ (0x20..=0x7E | 0xA0..=0xFF) => Some(code as u8),
        _ => WIN_ANSI_EXTRAS
            .iter()
            .find(|(extra, _)| *extra == character)
            .map(|(_, code)| *code),
    }
}

/// The (insofar) relevant vertical metrics of a font.
#[derive(Clone, Copy, Debug, Default)]
struct FontMetrics {
    ascent: i16,
    descent: i16,
    units_per_em: u16,
}

/// The (insofar) relevant metrics associated to a single glyph of a font.
#[derive(Clone, Copy, Debug, Default)]
struct GlyphMetrics {
    width: u32,
    height: u32,
}

/// A TrueType (or TrueType-flavoured OpenType) font to be embedded in full into the output document.
#[derive(Clone)]
pub struct TrueTypeFont {
    /// The byte data the font was loaded from.
    bytes: Vec<u8>,
    face: Arc<OwnedFace>,
    units_per_em: u16,
}

impl std::fmt::Debug for TrueTypeFont {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("TrueTypeFont")
            .field("bytes", &self.bytes.len())
            .field("units_per_em", &self.units_per_em)
            .finish()
    }
}

impl TrueTypeFont {
    /// Parse a font face from the raw data of a TTF/OTF file.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ContextError> {
        let face = OwnedFace::from_vec(bytes.clone(), 0)
            .map_err(|error| ContextError::with_error(ErrorKind::Parse, "Failed to parse font", &error))?;
        let units_per_em = face.as_face_ref().units_per_em();

        Ok(Self {
            bytes,
            face: Arc::new(face),
            units_per_em,
        })
    }

    /// Read and parse the font file at the given path.
    pub fn from_path(font_path: &Path) -> Result<Self, ContextError> {
        let bytes = std::fs::read(font_path).map_err(|error| {
            ContextError::with_error(
                ErrorKind::ResourceLoad,
                format!("Failed to read font {:?}, probably the path is wrong", font_path),
                &error,
            )
        })?;
        Self::from_bytes(bytes)
    }

    fn face(&self) -> &Face<'_> {
        self.face.as_face_ref()
    }

    fn font_metrics(&self) -> FontMetrics {
        FontMetrics {
            ascent: self.face().ascender(),
            descent: self.face().descender(),
            units_per_em: self.units_per_em,
        }
    }

    fn glyph_id(&self, character: char) -> Option<u16> {
        self.face().glyph_index(character).map(|glyph_id| glyph_id.0)
    }

    /// The mapping between the glyph IDs and the first character of the unicode subtables pointing at them.
    fn glyph_characters(&self) -> HashMap<u16, char> {
        let Some(cmap) = self.face().tables().cmap else {
            return HashMap::new();
        };

        let mut glyph_characters = HashMap::with_capacity(self.face().number_of_glyphs().into());
        for subtable in cmap.subtables.into_iter().filter(|subtable| subtable.is_unicode()) {
            subtable.codepoints(|codepoint| {
                let Ok(character) = char::try_from(codepoint) else {
                    return;
                };
                if let Some(glyph_index) = subtable.glyph_index(codepoint).filter(|index| index.0 > 0) {
                    glyph_characters.entry(glyph_index.0).or_insert(character);
                }
            })
        }

        glyph_characters
    }

    fn glyph_metrics(&self, glyph_id: u16) -> Option<GlyphMetrics> {
        let glyph_id = owned_ttf_parser::GlyphId(glyph_id);
        let width = self.face().glyph_hor_advance(glyph_id)? as u32;
        // Horizontally laid fonts only, the descender corrects the box height
        let height = self
            .face()
            .glyph_bounding_box(glyph_id)
            .map(|bounding_box| bounding_box.y_max - bounding_box.y_min - self.face().descender())
            .unwrap_or(1000) as u32;

        Some(GlyphMetrics { width, height })
    }

    fn glyph_ids(&self, text: &str) -> Result<Vec<u16>, ContextError> {
        text.nfc()
            .map(|character| {
                self.glyph_id(character).ok_or_else(|| {
                    ContextError::composition(format!(
                        "Unable to find the character {:?} of {:?} in the font",
                        character, text
                    ))
                })
            })
            .collect()
    }

    /// The big-endian glyph IDs of the text, as read through the Identity-H encoding.
    fn encode_text(&self, text: &str) -> Result<Vec<u8>, ContextError> {
        Ok(self
            .glyph_ids(text)?
            .into_iter()
            .flat_map(|glyph_id| glyph_id.to_be_bytes())
            .collect())
    }

    fn text_width(&self, text: &str) -> f32 {
        let advance: u32 = text
            .nfc()
            .filter_map(|character| self.glyph_id(character))
            .filter_map(|glyph_id| self.glyph_metrics(glyph_id))
            .map(|metrics| metrics.width)
            .sum();
        advance as f32 / f32::from(self.units_per_em.max(1))
    }

    /// Embed the font program into the document as a Type0 font with the Identity-H encoding,
    /// returning the font dictionary to be registered under `resource_name`.
    fn insert_into_document(&self, document: &mut lopdf::Document, resource_name: &str) -> lopdf::Dictionary {
        use lopdf::Object::*;
        let face_metrics = self.font_metrics();

        let font_stream = lopdf::Stream::new(
            lopdf::Dictionary::from_iter(vec![("Length1", Integer(self.bytes.len() as i64))]),
            self.bytes.clone(),
        )
        .with_compression(false);

        let mut maximum_character_height = 0;
        let mut total_width = 0;
        // Glyph ID to (character, width), the notdef glyph always maps to nothing
        let mut glyph_properties = BTreeMap::<u16, (char, u32)>::new();
        glyph_properties.insert(0, ('\0', 1000));
        for (glyph_id, character) in self.glyph_characters() {
            if let Some(glyph_metrics) = self.glyph_metrics(glyph_id) {
                maximum_character_height = maximum_character_height.max(glyph_metrics.height);
                total_width += glyph_metrics.width;
                glyph_properties.insert(glyph_id, (character, glyph_metrics.width));
            }
        }

        // A bfchar block holds at most 100 entries sharing the same high byte
        let mut cmap_blocks: Vec<Vec<(u16, char)>> = vec![Vec::new()];
        let mut current_high_byte = 0;
        for (glyph_id, (character, _)) in glyph_properties.iter().filter(|(glyph_id, _)| **glyph_id > 0) {
            let block_is_full = cmap_blocks.last().map_or(true, |block| block.len() >= 100);
            if glyph_id >> 8 != current_high_byte || block_is_full {
                cmap_blocks.push(Vec::new());
                current_high_byte = glyph_id >> 8;
            }
            if let Some(block) = cmap_blocks.last_mut() {
                block.push((*glyph_id, *character));
            }
        }
        let cid_to_unicode_map = generate_cid_to_unicode_map(resource_name, &cmap_blocks);
        let cid_to_unicode_map_id = document.add_object(lopdf::Stream::new(
            lopdf::Dictionary::new(),
            cid_to_unicode_map.into_bytes(),
        ));

        // Runs of consecutive glyph widths: `first_gid [w1 w2 ...]`, scaled to the 1000 unit em square
        let scaling = 1000.0 / f32::from(face_metrics.units_per_em.max(1));
        let mut width_objects = Vec::<Object>::new();
        let mut run_start = 0;
        let mut run_end = 0;
        let mut run_widths = Vec::<Object>::new();
        for glyph_id in 0..self.face().number_of_glyphs() {
            let Some(GlyphMetrics { width, .. }) = self.glyph_metrics(glyph_id) else {
                log::debug!("Glyph ID {} has no horizontal advance, leaving it out of the widths", glyph_id);
                continue;
            };
            if glyph_id != run_end {
                width_objects.push(Integer(i64::from(run_start)));
                width_objects.push(Array(std::mem::take(&mut run_widths)));
                run_start = glyph_id;
            }
            run_widths.push(Integer((width as f32 * scaling) as i64));
            run_end = glyph_id + 1;
        }
        width_objects.push(Integer(i64::from(run_start)));
        width_objects.push(Array(run_widths));

        let font_bounding_box = vec![
            Integer(0),
            Integer(maximum_character_height as i64),
            Integer(total_width as i64),
            Integer(maximum_character_height as i64),
        ];
        let font_file_id = document.add_object(font_stream);
        let font_descriptor_id = document.add_object(lopdf::Dictionary::from_iter(vec![
            ("Type", Name("FontDescriptor".into())),
            ("FontName", Name(resource_name.into())),
            ("Ascent", Integer(i64::from(face_metrics.ascent))),
            ("Descent", Integer(i64::from(face_metrics.descent))),
            ("CapHeight", Integer(i64::from(face_metrics.ascent))),
            ("ItalicAngle", Integer(0)),
            // Adobe standard Latin character set
            ("Flags", Integer(32)),
            ("StemV", Integer(80)),
            ("FontFile2", Reference(font_file_id)),
            // Adobe Reader needs it
            ("FontBBox", Array(font_bounding_box)),
        ]));

        let descendant_font = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("Font".into())),
            ("Subtype", Name("CIDFontType2".into())),
            ("BaseFont", Name(resource_name.into())),
            (
                "CIDSystemInfo",
                Dictionary(lopdf::Dictionary::from_iter(vec![
                    ("Registry", String("Adobe".into(), StringFormat::Literal)),
                    ("Ordering", String("Identity".into(), StringFormat::Literal)),
                    ("Supplement", Integer(0)),
                ])),
            ),
            ("W", Array(width_objects)),
            ("DW", Integer(1000)),
            ("FontDescriptor", Reference(font_descriptor_id)),
        ]);

        lopdf::Dictionary::from_iter(vec![
            ("Type", Name("Font".into())),
            ("Subtype", Name("Type0".into())),
            ("BaseFont", Name(resource_name.into())),
            ("Encoding", Name("Identity-H".into())),
            ("DescendantFonts", Array(vec![Dictionary(descendant_font)])),
            ("ToUnicode", Reference(cid_to_unicode_map_id)),
        ])
    }
}

/// Generates the ToUnicode CMap of an embedded font from blocks of glyph IDs and their characters.
fn generate_cid_to_unicode_map(face_name: &str, cmap_blocks: &[Vec<(u16, char)>]) -> String {
    let mut cid_to_unicode_map = format!(include_str!("../assets/gid_to_unicode_beg.txt"), face_name);

    for cmap_block in cmap_blocks.iter().filter(|block| !block.is_empty()) {
        cid_to_unicode_map.push_str(&format!("{} beginbfchar\r\n", cmap_block.len()));
        for (glyph_id, character) in cmap_block {
            let utf16: String = character
                .encode_utf16(&mut [0; 2])
                .iter()
                .map(|unit| format!("{unit:04x}"))
                .collect();
            cid_to_unicode_map.push_str(&format!("<{glyph_id:04x}> <{utf16}>\n"));
        }
        cid_to_unicode_map.push_str("endbfchar\r\n");
    }

    cid_to_unicode_map.push_str(include_str!("../assets/gid_to_unicode_end.txt"));
    cid_to_unicode_map
}

/// A font the overlay text can be drawn with.
#[derive(Debug, Clone)]
pub enum OverlayFont {
    Standard(StandardFont),
    TrueType(TrueTypeFont),
}

impl OverlayFont {
    /// The width of the text, in points, once drawn at the given size. Characters the
    /// font cannot draw do not count, `encode_text` refuses them.
    pub fn width_of_text_at_size(&self, text: &str, font_size: f32) -> f32 {
        let width_per_point = match self {
            OverlayFont::Standard(font) => font.text_width(text),
            OverlayFont::TrueType(font) => font.text_width(text),
        };
        width_per_point * font_size
    }

    /// The bytes of the `Tj` operand drawing the text. A character the font cannot draw
    /// is a composition error rather than a gap in the text.
    pub(crate) fn encode_text(&self, text: &str) -> Result<Vec<u8>, ContextError> {
        match self {
            OverlayFont::Standard(font) => font.encode_text(text),
            OverlayFont::TrueType(font) => font.encode_text(text),
        }
    }

    /// Build the font dictionary, adding whatever objects it refers to into the document.
    pub(crate) fn insert_into_document(
        &self,
        document: &mut lopdf::Document,
        resource_name: &str,
    ) -> lopdf::Dictionary {
        match self {
            OverlayFont::Standard(font) => lopdf::Dictionary::from_iter(vec![
                ("Type", Object::Name("Font".into())),
                ("Subtype", Object::Name("Type1".into())),
                ("BaseFont", Object::Name(font.base_font_name().into())),
                ("Encoding", Object::Name("WinAnsiEncoding".into())),
            ]),
            OverlayFont::TrueType(font) => font.insert_into_document(document, resource_name),
        }
    }
}

/// Where an overlay font comes from, as written in the configuration file:
/// `{"standard": "Times-Roman"}` or `{"trueType": "fonts/Body.ttf"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FontSource {
    Standard(StandardFont),
    TrueType(PathBuf),
}

impl FontSource {
    /// Resolve the source into a usable font, reading the font file if there is one.
    pub fn load(&self) -> Result<OverlayFont, ContextError> {
        match self {
            FontSource::Standard(font) => Ok(OverlayFont::Standard(*font)),
            FontSource::TrueType(font_path) => Ok(OverlayFont::TrueType(TrueTypeFont::from_path(font_path)?)),
        }
    }
}
