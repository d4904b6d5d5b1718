//! One-record PDF summary
//!
//! Uses the standard Helvetica faces with WinAnsiEncoding, so no font data is
//! embedded. Characters outside Latin-1 print as `?`. Content streams are
//! left uncompressed.

use chrono::Local;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use miette::Diagnostic;
use thiserror::Error;

use crate::entities::rnc::{PhotoCategory, Rnc};

// A4 portrait, in points
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: f32 = 50.0;

const BODY_SIZE: f32 = 10.0;
const LINE_HEIGHT: f32 = 14.0;
const WRAP_COLUMNS: usize = 95;

#[derive(Debug, Error, Diagnostic)]
pub enum PdfError {
    #[error("PDF rendering failed: {0}")]
    Render(#[from] lopdf::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Face {
    Regular,
    Bold,
}

impl Face {
    fn resource_name(self) -> &'static str {
        match self {
            Face::Regular => "F1",
            Face::Bold => "F2",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Line {
    face: Face,
    size: f32,
    text: String,
}

impl Line {
    fn body(text: impl Into<String>) -> Self {
        Self {
            face: Face::Regular,
            size: BODY_SIZE,
            text: text.into(),
        }
    }

    fn heading(text: impl Into<String>) -> Self {
        Self {
            face: Face::Bold,
            size: 12.0,
            text: text.into(),
        }
    }

    fn blank() -> Self {
        Self::body("")
    }
}

/// Render a record to PDF bytes
pub fn render(rnc: &Rnc) -> Result<Vec<u8>, PdfError> {
    let lines = layout(rnc);
    let pages = paginate(&lines);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(font("Helvetica"));
    let bold_id = doc.add_object(font("Helvetica-Bold"));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    });

    let total = pages.len();
    let mut kids: Vec<Object> = Vec::with_capacity(total);
    for (idx, page_lines) in pages.iter().enumerate() {
        let footer = format!("RNC {}  -  page {} of {}", rnc.number, idx + 1, total);
        let content = page_content(page_lines, &footer);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id: ObjectId = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => total as i64,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}

fn font(base: &str) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Flatten the record into printable lines
fn layout(rnc: &Rnc) -> Vec<Line> {
    let mut lines = vec![
        Line {
            face: Face::Bold,
            size: 16.0,
            text: format!("RNC {}", rnc.number),
        },
        Line::body(format!("Status: {}", rnc.status.label())),
        Line::blank(),
    ];

    let created = rnc.created.with_timezone(&Local).format("%Y-%m-%d %H:%M");
    let fields = [
        ("Reporter", rnc.reporter.clone()),
        ("Report date", rnc.report_date.format("%Y-%m-%d").to_string()),
        ("Created", created.to_string()),
        ("Area", rnc.area.clone()),
        ("PEP", rnc.pep.clone()),
        ("Title", rnc.title.clone()),
    ];
    for (label, value) in fields {
        let value = if value.is_empty() { "-".to_string() } else { value };
        let indent = " ".repeat(label.len() + 2);
        for (i, chunk) in wrap_text(&value, WRAP_COLUMNS - indent.len())
            .into_iter()
            .enumerate()
        {
            let prefix = if i == 0 {
                format!("{}: ", label)
            } else {
                indent.clone()
            };
            lines.push(Line::body(format!("{}{}", prefix, chunk)));
        }
    }

    lines.push(Line::blank());
    lines.push(Line::heading("Description"));
    if rnc.description.trim().is_empty() {
        lines.push(Line::body("-"));
    } else {
        for paragraph in rnc.description.lines() {
            if paragraph.trim().is_empty() {
                lines.push(Line::blank());
                continue;
            }
            lines.extend(wrap_text(paragraph, WRAP_COLUMNS).into_iter().map(Line::body));
        }
    }

    if !rnc.events.is_empty() {
        lines.push(Line::blank());
        lines.push(Line::heading("History"));
        for event in &rnc.events {
            let at = event.at.with_timezone(&Local).format("%Y-%m-%d %H:%M");
            lines.push(Line::body(format!(
                "{}  {}  {} -> {}  by {}",
                at,
                event.action,
                event.from.label(),
                event.to.label(),
                event.actor
            )));
            if !event.note.is_empty() {
                lines.extend(
                    wrap_text(&event.note, WRAP_COLUMNS - 4)
                        .into_iter()
                        .map(|l| Line::body(format!("    {}", l))),
                );
            }
        }
    }

    if !rnc.photos.is_empty() {
        lines.push(Line::blank());
        lines.push(Line::heading("Photos"));
        for category in [
            PhotoCategory::Opening,
            PhotoCategory::Closing,
            PhotoCategory::Reopening,
        ] {
            for photo in rnc.photos_in(category) {
                lines.push(Line::body(format!("[{}] {}", category, photo.filename)));
                lines.extend(
                    wrap_text(&photo.url, WRAP_COLUMNS - 4)
                        .into_iter()
                        .map(|l| Line::body(format!("    {}", l))),
                );
            }
        }
    }

    lines
}

/// Split lines into pages that fit between the margins, leaving room for the footer
fn paginate(lines: &[Line]) -> Vec<Vec<Line>> {
    let usable = PAGE_HEIGHT as f32 - 2.0 * MARGIN - 2.0 * LINE_HEIGHT;
    let per_page = ((usable / LINE_HEIGHT) as usize).max(1);

    let mut pages: Vec<Vec<Line>> = lines.chunks(per_page).map(|c| c.to_vec()).collect();
    if pages.is_empty() {
        pages.push(Vec::new());
    }
    pages
}

fn page_content(lines: &[Line], footer: &str) -> Content {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("TL", vec![LINE_HEIGHT.into()]),
        Operation::new("Td", vec![MARGIN.into(), (PAGE_HEIGHT as f32 - MARGIN).into()]),
    ];

    let mut current: Option<(Face, f32)> = None;
    for line in lines {
        if current != Some((line.face, line.size)) {
            operations.push(Operation::new(
                "Tf",
                vec![line.face.resource_name().into(), line.size.into()],
            ));
            current = Some((line.face, line.size));
        }
        operations.push(Operation::new(
            "Tj",
            vec![Object::string_literal(encode_win_ansi(&line.text))],
        ));
        operations.push(Operation::new("T*", vec![]));
    }
    operations.push(Operation::new("ET", vec![]));

    operations.extend([
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 8.into()]),
        Operation::new("Td", vec![MARGIN.into(), (MARGIN / 2.0).into()]),
        Operation::new("Tj", vec![Object::string_literal(encode_win_ansi(footer))]),
        Operation::new("ET", vec![]),
    ]);

    Content { operations }
}

/// Latin-1 characters map to their byte; everything else becomes `?`
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match u32::from(c) {
            0x20..=0x7E | 0xA0..=0xFF => c as u8,
            0x09 => b' ',
            _ => b'?',
        })
        .collect()
}

/// Greedy word wrap on character counts; words longer than a line are split
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let max_width = max_width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut chars: Vec<char> = word.chars().collect();
        if current_len > 0 && current_len + 1 + chars.len() <= max_width {
            current.push(' ');
            current.extend(chars.iter());
            current_len += 1 + chars.len();
            continue;
        }
        if current_len > 0 {
            lines.push(std::mem::take(&mut current));
        }
        while chars.len() > max_width {
            let rest = chars.split_off(max_width);
            lines.push(chars.into_iter().collect());
            chars = rest;
        }
        current_len = chars.len();
        current = chars.into_iter().collect();
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::numbering::RncNumber;
    use crate::entities::rnc::{NewRnc, PhotoRef, RncAction, RncEvent, RncStatus};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn sample(description: &str) -> Rnc {
        let new = NewRnc::new("Vazamento de óleo")
            .with_reporter("João")
            .with_report_date(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap())
            .with_area("Pátio")
            .with_pep("PEP-7")
            .with_description(description);
        let at = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();
        let mut rnc = Rnc::from_new(RncNumber::new(2025, 7).unwrap(), new, at);
        rnc.status = RncStatus::Closed;
        rnc.events.push(RncEvent {
            action: RncAction::Close,
            from: RncStatus::Open,
            to: RncStatus::Closed,
            note: "Gasket replaced".to_string(),
            actor: "qa".to_string(),
            at,
        });
        rnc.photos.push(PhotoRef {
            key: "photos/2025-007/opening/a.jpg".to_string(),
            url: "https://files.example.com/photos/2025-007/opening/a.jpg".to_string(),
            category: PhotoCategory::Opening,
            filename: "a.jpg".to_string(),
            uploaded: at,
        });
        rnc
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn test_render_single_page() {
        let bytes = render(&sample("Oil on the floor near pump 2")).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);

        assert!(contains(&bytes, b"RNC 2025-007"));
        assert!(contains(&bytes, b"Gasket replaced"));
        assert!(contains(&bytes, b"a.jpg"));
        // "ó" is 0xF3 in WinAnsi
        assert!(contains(&bytes, b"Vazamento de \xF3leo"));
    }

    #[test]
    fn test_long_description_paginates() {
        let long = (0..200)
            .map(|i| format!("Paragraph {} of the investigation notes.", i))
            .collect::<Vec<_>>()
            .join("\n");
        let bytes = render(&sample(&long)).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert!(doc.get_pages().len() >= 4);
        assert!(contains(&bytes, b"Paragraph 199 of"));
    }

    #[test]
    fn test_encode_win_ansi() {
        assert_eq!(encode_win_ansi("Ação"), b"A\xE7\xE3o".to_vec());
        assert_eq!(encode_win_ansi("€ ✓"), b"? ?".to_vec());
    }

    #[test]
    fn test_wrap_text() {
        assert_eq!(wrap_text("", 10), vec![""]);
        assert_eq!(
            wrap_text("the quick brown fox jumps", 10),
            vec!["the quick", "brown fox", "jumps"]
        );
        assert_eq!(wrap_text("abcdefghijkl", 5), vec!["abcde", "fghij", "kl"]);
        assert_eq!(wrap_text("ééééé ééé", 5), vec!["ééééé", "ééé"]);
    }
}
