//! Report rendering boundary: markdown report text to a printable PDF.
//!
//! The layout is fixed (20 mm margins, 20 pt / 16 pt headings, 12 pt body),
//! matching the styling the report prompt was written for. Rendering is the
//! last step of an export; a failure here never touches the in-session
//! textual report.

use std::path::{Path, PathBuf};

use chrono::Utc;
use genpdf::elements::{Break, Paragraph};
use genpdf::fonts::{FontData, FontFamily};
use genpdf::{Document, SimplePageDecorator};
use thiserror::Error;
use tracing::info;

const PAGE_MARGIN_MM: i32 = 20;
const TITLE_SIZE: u8 = 20;
const HEADING_SIZE: u8 = 16;
const BODY_SIZE: u8 = 12;

const REPORT_TITLE: &str = "Research Report";

/// Directories probed for a usable body font, in order.
const FONT_DIRS: &[&str] = &[
    "/usr/share/fonts/truetype/liberation",
    "/usr/share/fonts/liberation",
    "/System/Library/Fonts",
    "/Library/Fonts",
];

const FONT_FAMILIES: &[&str] = &["LiberationSans", "Helvetica", "Arial"];

/// Report export failed.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no usable font found on this system")]
    Font,

    #[error("could not write the PDF: {0}")]
    Pdf(String),
}

/// A block of report text, classified for styling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Title(String),
    Heading(String),
    Bullet(String),
    Paragraph(String),
}

/// Split markdown report text into styled blocks.
///
/// Only the subset the report prompt asks the model to produce is
/// recognized: `#`/`##` headings, `-`/`*` bullets, and paragraphs separated
/// by blank lines. Anything else renders as body text.
pub fn parse_blocks(content: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();

    let mut flush = |paragraph: &mut Vec<&str>, blocks: &mut Vec<Block>| {
        if !paragraph.is_empty() {
            blocks.push(Block::Paragraph(paragraph.join(" ")));
            paragraph.clear();
        }
    };

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            flush(&mut paragraph, &mut blocks);
        } else if let Some(rest) = trimmed.strip_prefix("## ") {
            flush(&mut paragraph, &mut blocks);
            blocks.push(Block::Heading(rest.trim().to_string()));
        } else if let Some(rest) = trimmed.strip_prefix("# ") {
            flush(&mut paragraph, &mut blocks);
            blocks.push(Block::Title(rest.trim().to_string()));
        } else if let Some(rest) =
            trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* "))
        {
            flush(&mut paragraph, &mut blocks);
            blocks.push(Block::Bullet(rest.trim().to_string()));
        } else {
            paragraph.push(trimmed);
        }
    }
    flush(&mut paragraph, &mut blocks);
    blocks
}

/// Renders markdown report text to fixed-layout PDF files.
pub struct ReportRenderer;

impl ReportRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render `content` to a PDF at `path`.
    pub fn render_to_file(&self, content: &str, path: &Path) -> Result<(), RenderError> {
        let font_family = load_font()?;

        let mut doc = Document::new(font_family);
        doc.set_title(REPORT_TITLE);
        doc.set_font_size(BODY_SIZE);

        let mut decorator = SimplePageDecorator::new();
        decorator.set_margins(PAGE_MARGIN_MM);
        doc.set_page_decorator(decorator);

        let title_style = genpdf::style::Style::new().bold().with_font_size(TITLE_SIZE);
        let heading_style = genpdf::style::Style::new().bold().with_font_size(HEADING_SIZE);

        doc.push(Paragraph::new(genpdf::style::StyledString::new(
            REPORT_TITLE.to_string(),
            title_style,
        )));
        doc.push(Break::new(1));

        for block in parse_blocks(content) {
            match block {
                Block::Title(text) | Block::Heading(text) => {
                    doc.push(Paragraph::new(genpdf::style::StyledString::new(
                        text,
                        heading_style.clone(),
                    )));
                    doc.push(Break::new(1));
                }
                Block::Bullet(text) => {
                    doc.push(Paragraph::new(format!("\u{2022} {text}")));
                }
                Block::Paragraph(text) => {
                    doc.push(Paragraph::new(text));
                    doc.push(Break::new(1));
                }
            }
        }

        doc.render_to_file(path)
            .map_err(|e| RenderError::Pdf(e.to_string()))?;
        info!(path = %path.display(), "report exported");
        Ok(())
    }

    /// Render `content` into the system temp directory under a timestamped
    /// name and return the path.
    pub fn export(&self, content: &str) -> Result<PathBuf, RenderError> {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let path = std::env::temp_dir().join(format!("research_report_{stamp}.pdf"));
        self.render_to_file(content, &path)?;
        Ok(path)
    }
}

impl Default for ReportRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn load_font() -> Result<FontFamily<FontData>, RenderError> {
    for dir in FONT_DIRS {
        for family in FONT_FAMILIES {
            if let Ok(font) = genpdf::fonts::from_files(dir, family, None) {
                return Ok(font);
            }
        }
    }
    Err(RenderError::Font)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings_bullets_and_paragraphs_are_classified() {
        let blocks = parse_blocks(
            "# Executive Summary\n\nThe market is growing.\nRapidly.\n\n\
             ## Key Findings\n- first point\n* second point\n\nClosing remarks.",
        );

        assert_eq!(blocks[0], Block::Title("Executive Summary".to_string()));
        assert_eq!(
            blocks[1],
            Block::Paragraph("The market is growing. Rapidly.".to_string())
        );
        assert_eq!(blocks[2], Block::Heading("Key Findings".to_string()));
        assert_eq!(blocks[3], Block::Bullet("first point".to_string()));
        assert_eq!(blocks[4], Block::Bullet("second point".to_string()));
        assert_eq!(blocks[5], Block::Paragraph("Closing remarks.".to_string()));
    }

    #[test]
    fn empty_content_yields_no_blocks() {
        assert!(parse_blocks("").is_empty());
        assert!(parse_blocks("\n\n\n").is_empty());
    }

    #[test]
    fn consecutive_lines_merge_into_one_paragraph() {
        let blocks = parse_blocks("one\ntwo\nthree");
        assert_eq!(blocks, vec![Block::Paragraph("one two three".to_string())]);
    }

    // Actual PDF rendering depends on fonts installed on the host, so the
    // render path is exercised only when one can be loaded.
    #[test]
    fn render_writes_a_pdf_when_a_font_is_available() {
        if load_font().is_err() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        ReportRenderer::new()
            .render_to_file("# Heading\n\nBody text.", &path)
            .unwrap();
        assert!(path.metadata().unwrap().len() > 0);
    }
}
