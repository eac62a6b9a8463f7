//! Renders a [`PatientIntake`] into an A4 PDF.
//!
//! Layout follows the paper intake sheet: a centered title, one colored
//! bar per section followed by its lines, a red bar for allergies, and a
//! footer with the generation time on every page. Text uses the PDF
//! standard Helvetica faces, so anything outside printable ASCII is drawn
//! as `?`.

use anyhow::Result;
use chrono::{DateTime, Local};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use medidoc_core::intake::{IntakeLine, PatientIntake, SectionKind};

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 42.0;
const TEXT_INDENT: f32 = 14.0;
const LINE_HEIGHT: f32 = 17.0;
const BAR_HEIGHT: f32 = 23.0;
/// A section header needs this much space below the cursor or it moves to
/// the next page.
const SECTION_ROOM: f32 = 142.0;
/// Characters per wrapped 10pt line across the text width.
const WRAP_CHARS: usize = 95;

const FONT_REGULAR: &str = "F1";
const FONT_BOLD: &str = "F2";
const FONT_ITALIC: &str = "F3";

#[derive(Clone, Copy)]
struct Rgb(u8, u8, u8);

const BLACK: Rgb = Rgb(0, 0, 0);
const WHITE: Rgb = Rgb(255, 255, 255);
const GRAY: Rgb = Rgb(150, 150, 150);
const ALERT_RED: Rgb = Rgb(239, 68, 68);

fn section_colors(kind: SectionKind) -> (Rgb, Rgb) {
    match kind {
        SectionKind::Patient => (Rgb(79, 70, 229), WHITE),
        SectionKind::Medical => (Rgb(34, 197, 94), WHITE),
        SectionKind::Report => (Rgb(168, 85, 247), WHITE),
        SectionKind::Additional => (Rgb(234, 179, 8), BLACK),
    }
}

fn fill_color(c: Rgb) -> Operation {
    Operation::new(
        "rg",
        vec![
            (c.0 as f32 / 255.0).into(),
            (c.1 as f32 / 255.0).into(),
            (c.2 as f32 / 255.0).into(),
        ],
    )
}

/// Printable ASCII only; whitespace collapses to a space.
fn pdf_text(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            ' '..='~' => c,
            c if c.is_whitespace() => ' ',
            _ => '?',
        })
        .collect()
}

/// Greedy word wrap at `width` characters; words longer than a line are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word = word.to_string();
            while word.chars().count() > width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let head: String = word.chars().take(width).collect();
                word = word.chars().skip(width).collect();
                lines.push(head);
            }
            if current.is_empty() {
                current = word;
            } else if current.chars().count() + 1 + word.chars().count() <= width {
                current.push(' ');
                current.push_str(&word);
            } else {
                lines.push(std::mem::replace(&mut current, word));
            }
        }
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn text_ops(font: &str, size: i64, x: f32, baseline: f32, color: Rgb, text: &str) -> Vec<Operation> {
    let y = PAGE_HEIGHT - baseline;
    vec![
        fill_color(color),
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![font.into(), size.into()]),
        Operation::new("Td", vec![(x as i64).into(), (y as i64).into()]),
        Operation::new("Tj", vec![Object::string_literal(pdf_text(text))]),
        Operation::new("ET", vec![]),
    ]
}

fn centered_ops(font: &str, size: i64, baseline: f32, color: Rgb, text: &str) -> Vec<Operation> {
    // Helvetica averages roughly half an em per character.
    let width = text.chars().count() as f32 * size as f32 * 0.5;
    let x = ((PAGE_WIDTH - width) / 2.0).max(MARGIN);
    text_ops(font, size, x, baseline, color, text)
}

/// Page content under construction. `cursor` is measured from the top edge.
struct Layout {
    pages: Vec<Vec<Operation>>,
    cursor: f32,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            cursor: MARGIN,
        }
    }

    fn ops(&mut self) -> &mut Vec<Operation> {
        if self.pages.is_empty() {
            self.pages.push(Vec::new());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn new_page(&mut self) {
        self.pages.push(Vec::new());
        self.cursor = MARGIN;
    }

    fn ensure_room(&mut self, needed: f32) {
        if self.cursor > PAGE_HEIGHT - needed {
            self.new_page();
        }
    }

    fn text_at(&mut self, font: &str, size: i64, x: f32, baseline: f32, color: Rgb, text: &str) {
        let ops = text_ops(font, size, x, baseline, color, text);
        self.ops().extend(ops);
    }

    fn centered(&mut self, font: &str, size: i64, baseline: f32, color: Rgb, text: &str) {
        let ops = centered_ops(font, size, baseline, color, text);
        self.ops().extend(ops);
    }

    /// Full-width filled bar whose top edge sits `BAR_HEIGHT / 2` above the cursor.
    fn bar(&mut self, color: Rgb) {
        let top = self.cursor - BAR_HEIGHT / 2.0;
        let y = PAGE_HEIGHT - top - BAR_HEIGHT;
        let ops = self.ops();
        ops.push(fill_color(color));
        ops.push(Operation::new(
            "re",
            vec![
                (MARGIN as i64).into(),
                (y as i64).into(),
                ((PAGE_WIDTH - 2.0 * MARGIN) as i64).into(),
                (BAR_HEIGHT as i64).into(),
            ],
        ));
        ops.push(Operation::new("f", vec![]));
    }

    fn section_header(&mut self, kind: SectionKind) {
        self.ensure_room(SECTION_ROOM);
        let (bg, fg) = section_colors(kind);
        self.bar(bg);
        let baseline = self.cursor + 4.0;
        self.text_at(FONT_BOLD, 12, MARGIN + TEXT_INDENT, baseline, fg, kind.title());
        self.cursor += 2.5 * LINE_HEIGHT;
    }

    fn body_lines(&mut self, text: &str) {
        for line in wrap(&pdf_text_keep_newlines(text), WRAP_CHARS) {
            self.ensure_room(MARGIN + 28.0);
            let baseline = self.cursor;
            self.text_at(FONT_REGULAR, 10, MARGIN + TEXT_INDENT, baseline, BLACK, &line);
            self.cursor += LINE_HEIGHT;
        }
    }

    fn alert(&mut self, text: &str) {
        self.cursor += 8.0;
        for line in wrap(text, WRAP_CHARS - 10) {
            self.ensure_room(MARGIN + 28.0);
            self.bar(ALERT_RED);
            let baseline = self.cursor + 4.0;
            self.text_at(FONT_BOLD, 10, MARGIN + TEXT_INDENT, baseline, WHITE, &line);
            self.cursor += BAR_HEIGHT + 4.0;
        }
    }
}

/// Like [`pdf_text`] but keeps line breaks for wrapping.
fn pdf_text_keep_newlines(s: &str) -> String {
    s.lines().map(pdf_text).collect::<Vec<_>>().join("\n")
}

/// Draws `form` and returns the encoded PDF bytes.
///
/// The form is not validated here; see [`PatientIntake::validate`].
pub fn render(form: &PatientIntake, generated_at: DateTime<Local>) -> Result<Vec<u8>> {
    let mut layout = Layout::new();

    layout.centered(FONT_BOLD, 20, layout.cursor, BLACK, "MEDICAL DOCUMENT");
    layout.cursor += 2.5 * LINE_HEIGHT;

    for section in form.sections(generated_at.date_naive()) {
        layout.section_header(section.kind);
        for line in &section.lines {
            match line {
                IntakeLine::Field(text) | IntakeLine::Paragraph(text) => layout.body_lines(text),
                IntakeLine::Alert(text) => layout.alert(text),
            }
        }
        layout.cursor += 8.0;
    }

    let footer = format!("Generated on {}", generated_at.format("%Y-%m-%d %H:%M:%S"));
    for page in &mut layout.pages {
        page.extend(centered_ops(
            FONT_ITALIC,
            8,
            PAGE_HEIGHT - MARGIN / 2.0,
            GRAY,
            &footer,
        ));
    }

    encode(layout.pages)
}

fn encode(pages: Vec<Vec<Operation>>) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font = |doc: &mut Document, base: &str| {
        doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => base,
            "Encoding" => "WinAnsiEncoding",
        })
    };
    let regular = font(&mut doc, "Helvetica");
    let bold = font(&mut doc, "Helvetica-Bold");
    let italic = font(&mut doc, "Helvetica-Oblique");

    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            FONT_REGULAR => regular,
            FONT_BOLD => bold,
            FONT_ITALIC => italic,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), (PAGE_WIDTH as i64).into(), (PAGE_HEIGHT as i64).into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf)?;
    Ok(buf)
}
