//! Format-specific text extraction

use crate::error::{Error, Result};
use crate::types::{FileType, LoadedSegment};

/// Byte order mark some editors prepend to UTF-8 text files
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Normalize characters PDF fonts commonly produce
fn cleanup_pdf_text(text: &str) -> String {
    text.replace('\0', "")
        .replace('\u{00A0}', " ") // Non-breaking space -> space
        .replace('\u{FB01}', "fi") // fi ligature -> separate chars
        .replace('\u{FB02}', "fl") // fl ligature -> separate chars
        .replace('\u{FB00}', "ff") // ff ligature -> separate chars
        .replace('\u{FB03}', "ffi") // ffi ligature -> separate chars
        .replace('\u{FB04}', "ffl") // ffl ligature -> separate chars
}

/// Append a paragraph's text, including hyperlink runs, as one line
fn push_paragraph(content: &mut String, paragraph: &docx_rs::Paragraph) {
    push_paragraph_children(content, &paragraph.children);
    content.push('\n');
}

fn push_paragraph_children(content: &mut String, children: &[docx_rs::ParagraphChild]) {
    for child in children {
        match child {
            docx_rs::ParagraphChild::Run(run) => {
                for child in &run.children {
                    if let docx_rs::RunChild::Text(t) = child {
                        content.push_str(&t.text);
                    }
                }
            }
            docx_rs::ParagraphChild::Hyperlink(link) => push_paragraph_children(content, &link.children),
            _ => {}
        }
    }
}

/// Append table text row by row; cells of a row are tab-separated
fn push_table(content: &mut String, table: &docx_rs::Table) {
    for docx_rs::TableChild::TableRow(row) in &table.rows {
        for (i, docx_rs::TableRowChild::TableCell(cell)) in row.cells.iter().enumerate() {
            if i > 0 {
                content.push('\t');
            }
            let mut cell_text = String::new();
            for child in &cell.children {
                match child {
                    docx_rs::TableCellContent::Paragraph(p) => push_paragraph(&mut cell_text, p),
                    docx_rs::TableCellContent::Table(nested) => push_table(&mut cell_text, nested),
                    _ => {}
                }
            }
            content.push_str(cell_text.trim_end_matches('\n'));
        }
        content.push('\n');
    }
}

/// Multi-format file parser
pub struct FileParser;

impl FileParser {
    /// Extract text from document bytes
    ///
    /// PDFs yield one segment per page, everything else a single segment.
    pub fn parse(file_type: FileType, name: &str, data: &[u8]) -> Result<Vec<LoadedSegment>> {
        match file_type {
            FileType::Pdf => Self::parse_pdf(name, data),
            FileType::Docx | FileType::Doc => Self::parse_docx(name, data),
            FileType::Txt => Self::parse_text(name, data),
        }
    }

    /// Parse PDF document page by page, falling back to whole-document
    /// extraction when the page walk yields nothing
    fn parse_pdf(name: &str, data: &[u8]) -> Result<Vec<LoadedSegment>> {
        match Self::extract_pdf_pages(name, data) {
            Ok(pages) if pages.iter().any(|p| !p.text.trim().is_empty()) => return Ok(pages),
            Ok(_) => tracing::debug!("No text on any page of {}, trying pdf-extract", name),
            Err(e) => tracing::warn!("Per-page extraction failed for {}: {}, trying pdf-extract", name, e),
        }

        let content = pdf_extract::extract_text_from_mem(data)
            .map_err(|e| Error::load_failed(name, format!("unreadable PDF: {}", e)))?;
        Ok(vec![LoadedSegment::whole(cleanup_pdf_text(&content), name)])
    }

    fn extract_pdf_pages(name: &str, data: &[u8]) -> Result<Vec<LoadedSegment>> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::load_failed(name, format!("Failed to load PDF: {}", e)))?;

        let mut segments = Vec::new();
        for page_number in doc.get_pages().into_keys() {
            let text = doc.extract_text(&[page_number]).map_err(|e| {
                Error::load_failed(name, format!("page {}: {}", page_number, e))
            })?;
            segments.push(LoadedSegment::page(cleanup_pdf_text(&text), name, page_number));
        }

        Ok(segments)
    }

    /// Parse DOCX document; legacy `.doc` files go through the same reader
    fn parse_docx(name: &str, data: &[u8]) -> Result<Vec<LoadedSegment>> {
        let doc = docx_rs::read_docx(data)
            .map_err(|e| Error::load_failed(name, format!("unreadable Word document: {}", e)))?;

        let mut content = String::new();
        for child in &doc.document.children {
            match child {
                docx_rs::DocumentChild::Paragraph(p) => push_paragraph(&mut content, p),
                docx_rs::DocumentChild::Table(table) => push_table(&mut content, table),
                _ => {}
            }
        }

        Ok(vec![LoadedSegment::whole(content, name)])
    }

    /// Parse strict UTF-8 text
    fn parse_text(name: &str, data: &[u8]) -> Result<Vec<LoadedSegment>> {
        let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
        let content = std::str::from_utf8(data)
            .map_err(|e| Error::load_failed(name, format!("not valid UTF-8: {}", e)))?;
        Ok(vec![LoadedSegment::whole(content, name)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_strips_bom() {
        let mut data = UTF8_BOM.to_vec();
        data.extend_from_slice("Paris is the capital of France.".as_bytes());

        let segments = FileParser::parse(FileType::Txt, "notes.txt", &data).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "Paris is the capital of France.");
        assert_eq!(segments[0].source_name, "notes.txt");
        assert_eq!(segments[0].page, None);
    }

    #[test]
    fn test_parse_text_rejects_invalid_utf8() {
        let err = FileParser::parse(FileType::Txt, "bad.txt", &[0x66, 0xFF, 0xFE]).unwrap_err();
        assert!(matches!(err, Error::LoadFailed { ref name, .. } if name == "bad.txt"));
    }

    #[test]
    fn test_garbage_pdf_fails_to_load() {
        let err = FileParser::parse(FileType::Pdf, "broken.pdf", b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, Error::LoadFailed { .. }));
    }

    #[test]
    fn test_legacy_doc_binary_fails_to_load() {
        // OLE compound file header, which the .docx reader cannot open
        let data = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1, 0, 0, 0, 0];
        let err = FileParser::parse(FileType::Doc, "legacy.doc", &data).unwrap_err();
        assert!(matches!(err, Error::LoadFailed { .. }));
    }

    #[test]
    fn test_docx_includes_hyperlinks_and_tables() {
        use docx_rs::{Docx, Hyperlink, HyperlinkType, Paragraph, Run, Table, TableCell, TableRow};

        let cell = |text: &str| TableCell::new().add_paragraph(Paragraph::new().add_run(Run::new().add_text(text)));
        let mut packed = std::io::Cursor::new(Vec::new());
        Docx::new()
            .add_paragraph(
                Paragraph::new()
                    .add_run(Run::new().add_text("See "))
                    .add_hyperlink(
                        Hyperlink::new("pricing", HyperlinkType::Anchor)
                            .add_run(Run::new().add_text("the pricing table")),
                    ),
            )
            .add_table(Table::new(vec![
                TableRow::new(vec![cell("Plan"), cell("Price")]),
                TableRow::new(vec![cell("Team"), cell("40 EUR")]),
            ]))
            .build()
            .pack(&mut packed)
            .unwrap();

        let segments = FileParser::parse(FileType::Docx, "plans.docx", packed.get_ref()).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].page, None);
        let text = &segments[0].text;
        assert!(text.contains("See the pricing table"), "{:?}", text);
        assert!(text.contains("Plan\tPrice"), "{:?}", text);
        assert!(text.contains("Team\t40 EUR"), "{:?}", text);
    }

    #[test]
    fn test_pdf_yields_one_segment_per_page() {
        let data = two_page_pdf(&["Paris is in France.", "Rome is in Italy."]);

        let segments = FileParser::parse(FileType::Pdf, "cities.pdf", &data).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].page, Some(1));
        assert_eq!(segments[1].page, Some(2));
        assert!(segments[0].text.contains("Paris"), "{:?}", segments[0].text);
        assert!(segments[1].text.contains("Rome"), "{:?}", segments[1].text);
    }

    /// Minimal PDF with one Helvetica text line per page
    fn two_page_pdf(lines: &[&str]) -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Document, Object, Stream};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for line in lines {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![72.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*line)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
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
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut data = Vec::new();
        doc.save_to(&mut data).unwrap();
        data
    }

    #[test]
    fn test_pdf_cleanup() {
        assert_eq!(cleanup_pdf_text("e\u{FB03}cient\0 team"), "efficient team");
    }
}
