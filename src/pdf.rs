//! PDF text extraction wrapper
//!
//! Reads documents with lopdf and pulls the text out page by page. lopdf
//! reports through the `log` facade, so nothing reaches stdout (the MCP
//! transport). Corrupted, encrypted or otherwise unreadable documents surface
//! as [`BridgeError::Extraction`]; a panic inside the parser is caught and
//! reported the same way.

use std::panic;

use lopdf::Document;

use crate::error::BridgeError;

/// Extract full text from PDF bytes
///
/// Pages are read in order, each followed by a newline, and the joined text is
/// trimmed. An empty result is not an error here.
pub fn extract_text_from_pdf(pdf_bytes: &[u8]) -> Result<String, BridgeError> {
    panic::catch_unwind(|| extract_pages(pdf_bytes))
        .map_err(|payload| BridgeError::Extraction(panic_message(payload.as_ref())))?
        .map(|text| text.trim().to_string())
}

fn extract_pages(pdf_bytes: &[u8]) -> Result<String, BridgeError> {
    let doc = Document::load_mem(pdf_bytes).map_err(|e| BridgeError::Extraction(e.to_string()))?;

    let mut text = String::new();
    // get_pages is keyed by page number, so iteration follows document order
    for page_number in doc.get_pages().keys() {
        let page = doc
            .extract_text(&[*page_number])
            .map_err(|e| BridgeError::Extraction(format!("page {}: {}", page_number, e)))?;
        text.push_str(&page);
        text.push('\n');
    }
    Ok(text)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "PDF reader panicked".to_string()
    }
}

/// Minimal PDFs for tests, one Courier text line per page.
#[cfg(test)]
pub(crate) fn build_test_pdf(pages: &[&str]) -> Vec<u8> {
    build_test_pdf_with_font("Courier", pages)
}

/// Same as [`build_test_pdf`] with a non-embedded Type1 font of the given name.
#[cfg(test)]
pub(crate) fn build_test_pdf_with_font(base_font: &str, pages: &[&str]) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => Object::Name(base_font.as_bytes().to_vec()),
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let operations = if text.trim().is_empty() {
            Vec::new()
        } else {
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ]
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pages_joined_in_order() {
        let bytes = build_test_pdf(&["Alpha", "Bravo", "Charlie"]);
        let text = extract_text_from_pdf(&bytes).unwrap();
        let a = text.find("Alpha").unwrap();
        let b = text.find("Bravo").unwrap();
        let c = text.find("Charlie").unwrap();
        assert!(a < b && b < c);
        assert_eq!(text, text.trim());
    }

    #[test]
    fn test_non_standard_font_is_extracted() {
        // neither embedded nor one of the 14 standard fonts, no /Widths
        let bytes = build_test_pdf_with_font("ArialMT", &["Alice visited Paris", "Bob stayed home"]);
        let text = extract_text_from_pdf(&bytes).unwrap();
        assert!(text.contains("Alice visited Paris"), "{:?}", text);
        assert!(text.find("Alice").unwrap() < text.find("Bob").unwrap());
    }

    #[test]
    fn test_blank_pages_yield_empty_text() {
        let bytes = build_test_pdf(&["", "   "]);
        assert_eq!(extract_text_from_pdf(&bytes).unwrap(), "");
    }

    #[test]
    fn test_garbage_is_extraction_error() {
        let err = extract_text_from_pdf(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, BridgeError::Extraction(_)));
        assert!(err.to_string().starts_with("Failed to extract text from PDF: "));
    }

    #[test]
    fn test_empty_input_is_extraction_error() {
        assert!(matches!(
            extract_text_from_pdf(&[]),
            Err(BridgeError::Extraction(_))
        ));
    }
}
