//! PDF generation for translated text.
//!
//! # Layout
//!
//! Paragraphs are set top to bottom in a single column between the page
//! margins. PDF uses a bottom-left origin, so the first baseline sits at
//! `page_height - margin - font_size` and each line moves it down by
//! `font_size * line_height`. A new page starts when the next baseline
//! would fall below the bottom margin.
//!
//! Lines are wrapped on whitespace using the font's advance widths; a
//! single word wider than the column is broken between characters.

mod font;

pub use font::{PdfFont, TrueTypeFont};

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::debug;

use crate::config::RenderConfig;
use crate::document::TranslatedText;
use crate::error::{Error, Result};
use font::FontEncoder;

/// Resource name of the text font in page content streams
const FONT_RESOURCE: &str = "F1";

/// Renders translated text into a paginated PDF.
#[derive(Debug, Clone)]
pub struct PdfRenderer {
    config: RenderConfig,
    font: Arc<PdfFont>,
}

/// One line of text placed on a page.
#[derive(Debug, Clone, PartialEq)]
struct PlacedLine {
    text: String,
    x: f32,
    y: f32,
}

impl PdfRenderer {
    /// Create a renderer, loading the configured font if any.
    pub fn new(config: &RenderConfig) -> Result<Self> {
        let font = PdfFont::load(config.font_path.as_deref())?;
        debug!("PDF renderer using font {}", font.name());
        Ok(Self {
            config: config.clone(),
            font: Arc::new(font),
        })
    }

    pub fn font(&self) -> &PdfFont {
        &self.font
    }

    /// Build the PDF for `text` in memory.
    pub fn render_to_bytes(&self, text: &TranslatedText) -> Result<Vec<u8>> {
        let paragraphs: Vec<&str> = text.paragraphs().collect();
        if paragraphs.is_empty() {
            return Err(Error::Render("translation has no text to render".to_string()));
        }

        let mut encoder = self.font.encoder()?;
        let pages = self.layout(&paragraphs, &encoder);

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut contents = Vec::with_capacity(pages.len());
        for lines in &pages {
            contents.push(self.page_content(lines, &mut encoder)?);
        }

        let font_id = encoder.embed(&mut doc);
        let resources_id = doc.add_object(Dictionary::from_iter([(
            "Font",
            Object::Dictionary(Dictionary::from_iter([(
                FONT_RESOURCE,
                Object::Reference(font_id),
            )])),
        )]));

        let kids: Vec<Object> = contents
            .into_iter()
            .map(|content| {
                let content_id = doc.add_object(Stream::new(Dictionary::new(), content));
                Object::Reference(self.add_page(&mut doc, pages_id, content_id, resources_id))
            })
            .collect();

        let page_count = i64::try_from(kids.len()).unwrap_or(i64::MAX);
        doc.objects.insert(
            pages_id,
            Object::Dictionary(Dictionary::from_iter([
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Kids", Object::Array(kids)),
                ("Count", Object::Integer(page_count)),
            ])),
        );

        let catalog_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc.compress();

        let mut output = Vec::new();
        doc.save_to(&mut output)
            .map_err(|e| Error::Render(format!("failed to serialize PDF: {e}")))?;

        debug!(
            "Rendered {} paragraph(s) onto {} page(s), {} bytes",
            paragraphs.len(),
            page_count,
            output.len()
        );
        Ok(output)
    }

    /// Render `text` to `output_path`.
    ///
    /// The file is written next to its final location and renamed into
    /// place, so a failed render never leaves a partial artifact behind.
    pub fn render(&self, text: &TranslatedText, output_path: &Path) -> Result<()> {
        let bytes = self.render_to_bytes(text)?;
        write_atomically(output_path, &bytes)
    }

    /// [`render`](Self::render) on the blocking thread pool.
    pub async fn render_blocking(&self, text: TranslatedText, output_path: PathBuf) -> Result<()> {
        let renderer = self.clone();
        tokio::task::spawn_blocking(move || renderer.render(&text, &output_path))
            .await
            .map_err(|e| Error::Render(format!("render task failed: {e}")))?
    }

    /// Wrap and paginate paragraphs into per-page line lists.
    fn layout(&self, paragraphs: &[&str], encoder: &FontEncoder<'_>) -> Vec<Vec<PlacedLine>> {
        let cfg = &self.config;
        let column_width = cfg.page_width - 2.0 * cfg.margin;
        let line_advance = cfg.font_size * cfg.line_height;
        let top = cfg.page_height - cfg.margin - cfg.font_size;
        let bottom = cfg.margin;

        let mut pages = Vec::new();
        let mut current: Vec<PlacedLine> = Vec::new();
        let mut y = top;

        for paragraph in paragraphs {
            let lines = wrap_text(paragraph, column_width, |s| {
                encoder.text_width(s, cfg.font_size)
            });
            for line in lines {
                if y < bottom && !current.is_empty() {
                    pages.push(std::mem::take(&mut current));
                    y = top;
                }
                current.push(PlacedLine {
                    text: line,
                    x: cfg.margin,
                    y,
                });
                y -= line_advance;
            }
            y -= cfg.paragraph_spacing;
        }

        if !current.is_empty() {
            pages.push(current);
        }
        pages
    }

    fn page_content(&self, lines: &[PlacedLine], encoder: &mut FontEncoder<'_>) -> Result<Vec<u8>> {
        let mut operations = Vec::with_capacity(lines.len() * 5);
        for line in lines {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new(
                "Tf",
                vec![FONT_RESOURCE.into(), self.config.font_size.into()],
            ));
            operations.push(Operation::new("Td", vec![line.x.into(), line.y.into()]));
            operations.push(Operation::new("Tj", vec![encoder.encode(&line.text)]));
            operations.push(Operation::new("ET", vec![]));
        }

        Content { operations }
            .encode()
            .map_err(|e| Error::Render(format!("failed to encode page content: {e}")))
    }

    fn add_page(
        &self,
        doc: &mut Document,
        pages_id: ObjectId,
        content_id: ObjectId,
        resources_id: ObjectId,
    ) -> ObjectId {
        doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Reference(resources_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    0.into(),
                    0.into(),
                    self.config.page_width.into(),
                    self.config.page_height.into(),
                ]),
            ),
        ]))
    }
}

/// Greedy word wrap to `max_width`, measured by `measure`.
fn wrap_text(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };

        if measure(&candidate) <= max_width {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }

        if measure(word) <= max_width {
            current = word.to_string();
        } else {
            // Overlong word: break between characters
            for c in word.chars() {
                current.push(c);
                if measure(&current) > max_width && current.chars().count() > 1 {
                    current.pop();
                    lines.push(std::mem::take(&mut current));
                    current.push(c);
                }
            }
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let save_error = |reason: String| Error::RenderSave {
        path: path.to_path_buf(),
        reason,
    };

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| save_error(e.to_string()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| save_error(e.to_string()))?;
    tmp.write_all(bytes).map_err(|e| save_error(e.to_string()))?;
    tmp.as_file().sync_all().map_err(|e| save_error(e.to_string()))?;
    tmp.persist(path).map_err(|e| save_error(e.error.to_string()))?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::extract::extract_pdf;

    #[allow(clippy::cast_precision_loss)]
    fn char_count(s: &str) -> f32 {
        s.chars().count() as f32
    }

    fn renderer() -> PdfRenderer {
        PdfRenderer::new(&RenderConfig::default()).unwrap()
    }

    #[test]
    fn test_wrap_text_basic() {
        let lines = wrap_text("Hello world this is a test", 10.0, char_count);
        assert_eq!(lines, vec!["Hello", "world this", "is a test"]);
    }

    #[test]
    fn test_wrap_text_breaks_long_word() {
        let lines = wrap_text("abcdefghij xy", 4.0, char_count);
        assert_eq!(lines, vec!["abcd", "efgh", "ij", "xy"]);
    }

    #[test]
    fn test_wrap_text_empty() {
        assert!(wrap_text("   ", 10.0, char_count).is_empty());
    }

    #[test]
    fn test_layout_paginates() {
        let renderer = renderer();
        let encoder = FontEncoder::Helvetica;
        let paragraph = "Line";
        let paragraphs = vec![paragraph; 80];

        let pages = renderer.layout(&paragraphs, &encoder);
        assert!(pages.len() > 1);

        let first = &pages[0];
        let cfg = RenderConfig::default();
        assert!((first[0].y - (cfg.page_height - cfg.margin - cfg.font_size)).abs() < 0.01);
        assert!(pages.iter().flatten().all(|l| l.y >= cfg.margin - cfg.font_size * cfg.line_height));
        assert_eq!(pages.iter().map(Vec::len).sum::<usize>(), 80);
    }

    #[test]
    fn test_render_rejects_empty_text() {
        let result = renderer().render_to_bytes(&TranslatedText::new(" \n\n "));
        assert!(matches!(result, Err(Error::Render(_))));
    }

    #[test]
    fn test_render_round_trips_paragraphs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("doc_translated.pdf");
        let text = TranslatedText::new("Bonjour le monde.\n\nDeuxième paragraphe ici.");

        renderer().render(&text, &path).unwrap();

        let extracted = extract_pdf(&path).unwrap();
        assert!(extracted.contains("Bonjour le monde."));
        assert!(extracted.contains("Deuxième paragraphe ici."));
        let first = extracted.find("Bonjour").unwrap();
        let second = extracted.find("Deuxième").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_render_with_embedded_font_round_trips() {
        let Some(font_path) = super::font::fixture_font_path() else {
            return;
        };
        let config = RenderConfig {
            font_path: Some(font_path),
            ..RenderConfig::default()
        };
        let renderer = PdfRenderer::new(&config).unwrap();
        assert!(matches!(renderer.font(), PdfFont::TrueType(_)));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lesson_translated.pdf");
        let arabic = "مرحبا";
        let text = TranslatedText::new(format!("Bonjour le monde.\n{arabic}"));
        renderer.render(&text, &path).unwrap();

        let extracted = extract_pdf(&path).unwrap();
        assert!(extracted.contains("Bonjour le monde."));
        // Glyphs map back through ToUnicode; order may follow visual layout
        assert!(arabic.chars().all(|c| extracted.contains(c)));
        assert!(!extracted.contains('?'));
    }

    #[test]
    fn test_render_is_deterministic() {
        let text = TranslatedText::new("Same input.\nSame output.");
        let renderer = renderer();
        assert_eq!(
            renderer.render_to_bytes(&text).unwrap(),
            renderer.render_to_bytes(&text).unwrap()
        );
    }

    #[test]
    fn test_failed_write_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        // Parent is a regular file, so the directory cannot be created
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let path = blocker.join("out.pdf");

        let result = renderer().render(&TranslatedText::new("Hello"), &path);
        assert!(matches!(result, Err(Error::RenderSave { .. })));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_render_blocking_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a_translated.pdf");
        renderer()
            .render_blocking(TranslatedText::new("Habari"), path.clone())
            .await
            .unwrap();
        assert!(path.exists());
        // No temp files left next to the artifact
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
