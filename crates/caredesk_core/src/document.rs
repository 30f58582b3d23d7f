//! Flowing text layout for exported documents.
//!
//! # Responsibility
//! - Place left-aligned lines on A4 pages with automatic page breaks.
//! - Render a finished layout to PDF through `printpdf` base-14 fonts.
//!
//! # Invariants
//! - Coordinates are millimetres from the bottom-left page corner.
//! - The footer, when set, is drawn centered on every page.

use printpdf::{BuiltinFont, Color, Greyscale, Mm, PdfDocument};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const BOTTOM_LIMIT: f32 = 28.0;
const FOOTER_Y: f32 = 14.0;
const FOOTER_SIZE: f32 = 10.0;
const FOOTER_GREY: f32 = 0.47;
const LINE_GAP: f32 = 1.4;
const MM_PER_PT: f32 = 0.352_778;
// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.5;
const LAYER_NAME: &str = "content";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Regular,
    Bold,
}

/// One positioned run of text.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedText {
    pub text: String,
    /// Font size in points.
    pub size: f32,
    pub weight: FontWeight,
    pub x: f32,
    pub y: f32,
}

/// Page-flowing text layout.
#[derive(Debug, Clone)]
pub struct DocumentLayout {
    pages: Vec<Vec<PlacedText>>,
    cursor_y: f32,
    footer: Option<String>,
}

impl Default for DocumentLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentLayout {
    pub fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            cursor_y: PAGE_HEIGHT - MARGIN,
            footer: None,
        }
    }

    pub fn set_footer(&mut self, text: impl Into<String>) {
        self.footer = Some(text.into());
    }

    pub fn footer(&self) -> Option<&str> {
        self.footer.as_deref()
    }

    /// Places one line and advances the cursor.
    pub fn line(&mut self, text: &str, size: f32, weight: FontWeight) {
        let height = size * MM_PER_PT;
        let advance = height * 1.2 + LINE_GAP;
        if self.cursor_y - advance < BOTTOM_LIMIT {
            self.pages.push(Vec::new());
            self.cursor_y = PAGE_HEIGHT - MARGIN;
        }
        self.cursor_y -= height;
        let placed = PlacedText {
            text: text.to_string(),
            size,
            weight,
            x: MARGIN,
            y: self.cursor_y,
        };
        if let Some(page) = self.pages.last_mut() {
            page.push(placed);
        }
        self.cursor_y -= advance - height;
    }

    /// Places `text` word-wrapped to the printable width.
    pub fn paragraph(&mut self, text: &str, size: f32, weight: FontWeight) {
        let max_chars = ((PAGE_WIDTH - 2.0 * MARGIN) / glyph_width(size)) as usize;
        for line in wrap_text(text, max_chars) {
            self.line(&line, size, weight);
        }
    }

    /// Vertical gap in millimetres.
    pub fn gap(&mut self, mm: f32) {
        self.cursor_y -= mm;
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[Vec<PlacedText>] {
        &self.pages
    }

    /// Every placed line in reading order, footer excluded.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.pages.iter().flatten().map(|placed| placed.text.as_str())
    }

    /// Renders the layout as a PDF document titled `title`.
    ///
    /// # Errors
    /// - Returns the `printpdf` error when fonts cannot be registered or the
    ///   document cannot be serialized.
    pub fn render_pdf(&self, title: &str) -> Result<Vec<u8>, printpdf::Error> {
        let (doc, first_page, first_layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER_NAME);
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;

        for (index, page) in self.pages.iter().enumerate() {
            let layer = if index == 0 {
                doc.get_page(first_page).get_layer(first_layer)
            } else {
                let (page_index, layer_index) =
                    doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER_NAME);
                doc.get_page(page_index).get_layer(layer_index)
            };

            for placed in page {
                let font = match placed.weight {
                    FontWeight::Regular => &regular,
                    FontWeight::Bold => &bold,
                };
                layer.use_text(
                    placed.text.as_str(),
                    placed.size,
                    Mm(placed.x),
                    Mm(placed.y),
                    font,
                );
            }

            if let Some(footer) = &self.footer {
                let width = footer.chars().count() as f32 * glyph_width(FOOTER_SIZE);
                layer.set_fill_color(Color::Greyscale(Greyscale::new(FOOTER_GREY, None)));
                layer.use_text(
                    footer.as_str(),
                    FOOTER_SIZE,
                    Mm(((PAGE_WIDTH - width) / 2.0).max(MARGIN)),
                    Mm(FOOTER_Y),
                    &regular,
                );
            }
        }

        doc.save_to_bytes()
    }
}

fn glyph_width(size: f32) -> f32 {
    size * AVG_GLYPH_WIDTH * MM_PER_PT
}

/// Greedy word wrap; explicit newlines are kept and long words are split.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();

    for raw in text.lines() {
        let mut line = String::new();
        let mut len = 0;
        for word in raw.split_whitespace() {
            let mut word = word.chars().collect::<Vec<_>>();
            while word.len() > max_chars {
                if len > 0 {
                    lines.push(std::mem::take(&mut line));
                    len = 0;
                }
                let rest = word.split_off(max_chars);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            if word.is_empty() {
                continue;
            }
            let extra = if len == 0 { word.len() } else { word.len() + 1 };
            if len + extra > max_chars {
                lines.push(std::mem::take(&mut line));
                len = 0;
            }
            if len > 0 {
                line.push(' ');
                len += 1;
            }
            line.extend(word.iter());
            len += word.len();
        }
        lines.push(line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
