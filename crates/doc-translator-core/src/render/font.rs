//! Fonts for the generated PDF.
//!
//! Two options:
//! - **Helvetica**: one of the PDF standard fonts, never embedded. Text is
//!   written in WinAnsi encoding, so characters outside Latin-1 (plus the
//!   usual typographic punctuation) render as `?`.
//! - **TrueType**: a font file from the configuration, embedded as a
//!   Type0/CIDFontType2 composite font with Identity-H encoding. Glyph IDs
//!   go into the content stream and a ToUnicode CMap built from the glyphs
//!   actually used maps them back for text extraction.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use ttf_parser::{Face, GlyphId};

use crate::error::{Error, Result};

/// Substitute for characters the font cannot show
const REPLACEMENT: u8 = b'?';

/// ToUnicode CMaps allow at most this many entries per `bfchar` block
const BFCHAR_BLOCK: usize = 100;

/// Helvetica advance widths for ASCII 0x20..=0x7E, in 1/1000 em.
#[rustfmt::skip]
const HELVETICA_ASCII_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Width used for non-ASCII WinAnsi characters (average lowercase advance)
const HELVETICA_DEFAULT_WIDTH: u16 = 556;

/// Font used to set the translated text.
#[derive(Debug, Clone)]
pub enum PdfFont {
    Helvetica,
    TrueType(TrueTypeFont),
}

impl PdfFont {
    /// Load the font at `path`, or the standard Helvetica font when unset.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Ok(Self::TrueType(TrueTypeFont::from_file(path)?)),
            None => Ok(Self::Helvetica),
        }
    }

    /// Name shown in logs.
    pub fn name(&self) -> &str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::TrueType(font) => &font.name,
        }
    }

    /// Start encoding text for one document.
    pub(crate) fn encoder(&self) -> Result<FontEncoder<'_>> {
        match self {
            Self::Helvetica => Ok(FontEncoder::Helvetica),
            Self::TrueType(font) => Ok(FontEncoder::TrueType {
                font,
                face: font.face()?,
                used: BTreeMap::new(),
            }),
        }
    }
}

/// A TrueType font file held in memory.
#[derive(Clone)]
pub struct TrueTypeFont {
    data: Vec<u8>,
    name: String,
    path: PathBuf,
}

impl TrueTypeFont {
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| Error::FontLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_bytes(data, path)
    }

    pub fn from_bytes(data: Vec<u8>, path: &Path) -> Result<Self> {
        let name = {
            let face = Face::parse(&data, 0).map_err(|e| Error::FontLoad {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
            postscript_name(&face).unwrap_or_else(|| fallback_name(path))
        };

        Ok(Self {
            data,
            name,
            path: path.to_path_buf(),
        })
    }

    fn face(&self) -> Result<Face<'_>> {
        Face::parse(&self.data, 0).map_err(|e| Error::FontLoad {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }
}

impl std::fmt::Debug for TrueTypeFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrueTypeFont")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("bytes", &self.data.len())
            .finish()
    }
}

fn postscript_name(face: &Face<'_>) -> Option<String> {
    face.names()
        .into_iter()
        .filter(|n| n.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
        .find_map(|n| n.to_string())
        .map(|n| sanitize_name(&n))
        .filter(|n| !n.is_empty())
}

fn fallback_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(sanitize_name)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "EmbeddedFont".to_string())
}

/// PDF names for fonts must not contain whitespace or delimiters.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

/// Per-document text encoder. Measures strings, turns them into content
/// stream operands, and finally writes the font objects.
pub(crate) enum FontEncoder<'a> {
    Helvetica,
    TrueType {
        font: &'a TrueTypeFont,
        face: Face<'a>,
        /// Glyphs shown so far, with the character each one stands for
        used: BTreeMap<u16, char>,
    },
}

impl FontEncoder<'_> {
    /// Width of `text` in points at `font_size`.
    #[allow(clippy::cast_precision_loss)]
    pub fn text_width(&self, text: &str, font_size: f32) -> f32 {
        match self {
            Self::Helvetica => {
                let units: u32 = text.chars().map(|c| u32::from(helvetica_width(c))).sum();
                units as f32 * font_size / 1000.0
            }
            Self::TrueType { face, .. } => {
                let units: u32 = text
                    .chars()
                    .map(|c| u32::from(glyph_advance(face, glyph_id(face, c))))
                    .sum();
                units as f32 * font_size / f32::from(face.units_per_em())
            }
        }
    }

    /// Encode `text` as a string operand for `Tj`.
    pub fn encode(&mut self, text: &str) -> Object {
        let bytes = match self {
            Self::Helvetica => text.chars().map(win_ansi_byte).collect(),
            Self::TrueType { face, used, .. } => {
                let mut bytes = Vec::with_capacity(text.len() * 2);
                for c in text.chars() {
                    let gid = glyph_id(face, c);
                    if gid != 0 {
                        used.entry(gid).or_insert(c);
                    }
                    bytes.extend_from_slice(&gid.to_be_bytes());
                }
                bytes
            }
        };
        Object::String(bytes, StringFormat::Hexadecimal)
    }

    /// Add the font objects to `doc` and return the font dictionary's id.
    pub fn embed(self, doc: &mut Document) -> ObjectId {
        match self {
            Self::Helvetica => doc.add_object(Dictionary::from_iter([
                ("Type", Object::Name(b"Font".to_vec())),
                ("Subtype", Object::Name(b"Type1".to_vec())),
                ("BaseFont", Object::Name(b"Helvetica".to_vec())),
                ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
            ])),
            Self::TrueType { font, face, used } => embed_truetype(doc, font, &face, &used),
        }
    }
}

fn helvetica_width(c: char) -> u16 {
    let code = u32::from(c);
    if (0x20..=0x7E).contains(&code) {
        // code - 0x20 is at most 94
        #[allow(clippy::cast_possible_truncation)]
        return HELVETICA_ASCII_WIDTHS[(code - 0x20) as usize];
    }
    if win_ansi_byte(c) == REPLACEMENT {
        return HELVETICA_ASCII_WIDTHS[usize::from(REPLACEMENT - 0x20)];
    }
    HELVETICA_DEFAULT_WIDTH
}

/// Map a character to its WinAnsiEncoding byte.
fn win_ansi_byte(c: char) -> u8 {
    match c {
        ' '..='~' | '\u{A0}'..='\u{FF}' => u8::try_from(u32::from(c)).unwrap_or(REPLACEMENT),
        '€' => 0x80,
        '‚' => 0x82,
        '„' => 0x84,
        '…' => 0x85,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '™' => 0x99,
        '\t' => b' ',
        _ => REPLACEMENT,
    }
}

fn glyph_id(face: &Face<'_>, c: char) -> u16 {
    face.glyph_index(c).map_or(0, |g| g.0)
}

fn glyph_advance(face: &Face<'_>, gid: u16) -> u16 {
    face.glyph_hor_advance(GlyphId(gid)).unwrap_or(0)
}

/// Scale a font-unit width to PDF's 1000-unit glyph space.
fn scale_width(face: &Face<'_>, width: u16) -> i64 {
    i64::from(width) * 1000 / i64::from(face.units_per_em().max(1))
}

fn embed_truetype(
    doc: &mut Document,
    font: &TrueTypeFont,
    face: &Face<'_>,
    used: &BTreeMap<u16, char>,
) -> ObjectId {
    let base_font = Object::Name(font.name.clone().into_bytes());

    let mut file_dict = Dictionary::new();
    file_dict.set(
        "Length1",
        Object::Integer(i64::try_from(font.data.len()).unwrap_or(i64::MAX)),
    );
    let font_file_id = doc.add_object(Stream::new(file_dict, font.data.clone()).with_compression(true));

    let bbox = face.global_bounding_box();
    let descriptor_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"FontDescriptor".to_vec())),
        ("FontName", base_font.clone()),
        ("Flags", Object::Integer(32)),
        (
            "FontBBox",
            Object::Array(vec![
                Object::Integer(i64::from(bbox.x_min)),
                Object::Integer(i64::from(bbox.y_min)),
                Object::Integer(i64::from(bbox.x_max)),
                Object::Integer(i64::from(bbox.y_max)),
            ]),
        ),
        ("ItalicAngle", Object::Integer(0)),
        ("Ascent", Object::Integer(i64::from(face.ascender()))),
        ("Descent", Object::Integer(i64::from(face.descender()))),
        (
            "CapHeight",
            Object::Integer(i64::from(face.capital_height().unwrap_or_else(|| face.ascender()))),
        ),
        ("StemV", Object::Integer(80)),
        ("FontFile2", Object::Reference(font_file_id)),
    ]));

    let default_width = scale_width(face, glyph_advance(face, glyph_id(face, ' ')));
    let cid_font_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"CIDFontType2".to_vec())),
        ("BaseFont", base_font.clone()),
        (
            "CIDSystemInfo",
            Object::Dictionary(Dictionary::from_iter([
                ("Registry", Object::string_literal("Adobe")),
                ("Ordering", Object::string_literal("Identity")),
                ("Supplement", Object::Integer(0)),
            ])),
        ),
        ("FontDescriptor", Object::Reference(descriptor_id)),
        ("DW", Object::Integer(default_width)),
        ("W", Object::Array(widths_array(face, used))),
        ("CIDToGIDMap", Object::Name(b"Identity".to_vec())),
    ]));

    let cmap = to_unicode_cmap(used);
    let to_unicode_id = doc.add_object(Stream::new(Dictionary::new(), cmap.into_bytes()));

    doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type0".to_vec())),
        ("BaseFont", base_font),
        ("Encoding", Object::Name(b"Identity-H".to_vec())),
        ("DescendantFonts", Object::Array(vec![Object::Reference(cid_font_id)])),
        ("ToUnicode", Object::Reference(to_unicode_id)),
    ]))
}

/// W array: `[first_gid [w1 w2 ...]]` per run of consecutive glyph IDs.
fn widths_array(face: &Face<'_>, used: &BTreeMap<u16, char>) -> Vec<Object> {
    let mut result = Vec::new();
    let mut gids = used.keys().copied().peekable();

    while let Some(first) = gids.next() {
        let mut widths = vec![Object::Integer(scale_width(face, glyph_advance(face, first)))];
        let mut next = first.saturating_add(1);
        while gids.peek() == Some(&next) {
            widths.push(Object::Integer(scale_width(face, glyph_advance(face, next))));
            gids.next();
            next = next.saturating_add(1);
        }
        result.push(Object::Integer(i64::from(first)));
        result.push(Object::Array(widths));
    }

    result
}

/// ToUnicode CMap mapping every used glyph back to its character.
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

    let entries: Vec<_> = used.iter().collect();
    for block in entries.chunks(BFCHAR_BLOCK) {
        let _ = writeln!(cmap, "{} beginbfchar", block.len());
        for (gid, c) in block {
            let mut utf16 = [0_u16; 2];
            let units: String = c
                .encode_utf16(&mut utf16)
                .iter()
                .map(|u| format!("{u:04X}"))
                .collect();
            let _ = writeln!(cmap, "<{gid:04X}> <{units}>");
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str(
        "endcmap\n\
         CMapName currentdict /CMap defineresource pop\n\
         end\n\
         end\n",
    );
    cmap
}

/// A TrueType font for tests: `DOC_TRANSLATOR_TEST_FONT`, or DejaVu Sans
/// where the system has it. Tests needing one are skipped without it.
#[cfg(test)]
pub(crate) fn fixture_font_path() -> Option<PathBuf> {
    std::env::var_os("DOC_TRANSLATOR_TEST_FONT")
        .map(PathBuf::from)
        .into_iter()
        .chain(
            [
                "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
                "/usr/share/fonts/TTF/DejaVuSans.ttf",
                "/usr/share/fonts/dejavu/DejaVuSans.ttf",
            ]
            .map(PathBuf::from),
        )
        .find(|path| path.is_file())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_win_ansi_mapping() {
        assert_eq!(win_ansi_byte('A'), b'A');
        assert_eq!(win_ansi_byte('é'), 0xE9);
        assert_eq!(win_ansi_byte('’'), 0x92);
        assert_eq!(win_ansi_byte('—'), 0x97);
        assert_eq!(win_ansi_byte('م'), REPLACEMENT);
    }

    #[test]
    fn test_helvetica_widths() {
        let encoder = FontEncoder::Helvetica;
        // "Hi": H=722, i=222
        let width = encoder.text_width("Hi", 10.0);
        assert!((width - 9.44).abs() < 0.001);
        assert!(encoder.text_width("", 10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_helvetica_encode_is_hex_win_ansi() {
        let mut encoder = FontEncoder::Helvetica;
        match encoder.encode("Ça?") {
            Object::String(bytes, StringFormat::Hexadecimal) => {
                assert_eq!(bytes, vec![0xC7, b'a', b'?']);
            }
            other => panic!("unexpected operand {other:?}"),
        }
    }

    #[test]
    fn test_cmap_blocks_and_surrogates() {
        let mut used = BTreeMap::new();
        for gid in 1..=150_u16 {
            used.insert(gid, 'a');
        }
        used.insert(200, '😀');

        let cmap = to_unicode_cmap(&used);
        assert!(cmap.contains("100 beginbfchar"));
        assert!(cmap.contains("51 beginbfchar"));
        assert!(cmap.contains("<00C8> <D83DDE00>"));
        assert!(cmap.contains("<0001> <0061>"));
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Noto Sans Arabic"), "NotoSansArabic");
        assert_eq!(fallback_name(Path::new("/fonts/My Font-Bold.ttf")), "MyFont-Bold");
        assert_eq!(fallback_name(Path::new("/fonts/()")), "EmbeddedFont");
    }

    #[test]
    fn test_truetype_rejects_garbage() {
        let result = TrueTypeFont::from_bytes(b"not a font".to_vec(), Path::new("x.ttf"));
        assert!(matches!(result, Err(Error::FontLoad { .. })));
    }

    #[test]
    fn test_load_missing_font() {
        let result = PdfFont::load(Some(Path::new("/no/such/font.ttf")));
        assert!(matches!(result, Err(Error::FontLoad { .. })));
        assert_eq!(PdfFont::load(None).unwrap_or(PdfFont::Helvetica).name(), "Helvetica");
    }

    #[test]
    fn test_truetype_encode_and_embed() {
        let Some(path) = fixture_font_path() else {
            return;
        };
        let font = PdfFont::load(Some(&path)).unwrap();
        assert!(!font.name().is_empty());
        assert!(!font.name().contains(' '));

        let mut encoder = font.encoder().unwrap();
        let Object::String(bytes, StringFormat::Hexadecimal) = encoder.encode("abca") else {
            panic!("expected a hex string");
        };
        // Two bytes per glyph ID
        assert_eq!(bytes.len(), 8);
        assert_eq!(bytes[0..2], bytes[6..8]);
        assert!(encoder.text_width("abc", 11.0) > 0.0);

        let FontEncoder::TrueType { ref face, ref used, .. } = encoder else {
            panic!("expected a TrueType encoder");
        };
        assert_eq!(used.len(), 3);
        let widths = widths_array(face, used);
        let listed: usize = widths
            .chunks(2)
            .map(|run| match run {
                [Object::Integer(_), Object::Array(w)] => w.len(),
                other => panic!("malformed W entry: {other:?}"),
            })
            .sum();
        assert_eq!(listed, 3);

        let mut doc = Document::with_version("1.5");
        let font_id = encoder.embed(&mut doc);
        let dict = doc.get_object(font_id).unwrap().as_dict().unwrap();
        assert_eq!(dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Type0");
        assert_eq!(dict.get(b"Encoding").unwrap().as_name().unwrap(), b"Identity-H");
        assert!(dict.get(b"ToUnicode").is_ok());
    }
}
