//! Raw text extraction from Word (`.docx`) material.
//!
//! Only the main document part is read. Each paragraph becomes one line;
//! tabs and explicit breaks are kept, all formatting is dropped.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;
use zip::ZipArchive;

use crate::error::LibraryError;

const DOCUMENT_PART: &str = "word/document.xml";

/// Read the plain text of the `.docx` file at `path`.
///
/// # Errors
///
/// Returns `LibraryError::Io` if the file cannot be opened and
/// `LibraryError::Document` if it is not a readable Word document.
pub fn read_docx(path: &Path) -> Result<String, LibraryError> {
    let file = File::open(path)?;
    docx_text(file).map_err(|reason| LibraryError::Document {
        file: path.display().to_string(),
        reason,
    })
}

fn docx_text(reader: impl Read + Seek) -> Result<String, String> {
    let mut archive = ZipArchive::new(reader).map_err(|err| err.to_string())?;
    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|err| format!("{DOCUMENT_PART}: {err}"))?
        .read_to_string(&mut xml)
        .map_err(|err| format!("{DOCUMENT_PART}: {err}"))?;
    document_text(&xml)
}

fn document_text(xml: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_run_text = false;

    loop {
        match reader.read_event().map_err(|err| err.to_string())? {
            Event::Start(tag) if tag.name().as_ref() == b"w:t" => in_run_text = true,
            Event::End(tag) => match tag.name().as_ref() {
                b"w:t" => in_run_text = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Event::Empty(tag) => match tag.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" => text.push('\n'),
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Event::Text(chunk) if in_run_text => {
                text.push_str(&chunk.unescape().map_err(|err| err.to_string())?);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(text)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::{Cursor, Write};

    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    use super::*;

    /// Minimal Word document with one paragraph per entry.
    pub(crate) fn docx_bytes(paragraphs: &[&str]) -> Vec<u8> {
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<w:p><w:r><w:t xml:space=\"preserve\">{p}</w:t></w:r></w:p>"))
            .collect();
        let xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
             <w:body>{body}<w:sectPr/></w:body></w:document>"
        );

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("[Content_Types].xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<Types/>").unwrap();
        writer
            .start_file(DOCUMENT_PART, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn paragraphs_become_lines() {
        let bytes = docx_bytes(&["What is ATP?", "The energy currency &amp; more."]);
        let text = docx_text(Cursor::new(bytes)).unwrap();
        assert_eq!(text, "What is ATP?\nThe energy currency & more.\n");
    }

    #[test]
    fn split_runs_tabs_and_breaks_are_kept() {
        let xml = "<w:document><w:body>\
                   <w:p><w:r><w:t>Q: Name</w:t></w:r><w:r><w:tab/><w:t>two</w:t></w:r></w:p>\
                   <w:p><w:r><w:t>line</w:t><w:br/><w:t>wrap</w:t></w:r></w:p>\
                   <w:p/>\
                   <w:p><w:pPr><w:jc w:val=\"left\"/></w:pPr><w:r><w:t>end</w:t></w:r></w:p>\
                   </w:body></w:document>";
        assert_eq!(document_text(xml).unwrap(), "Q: Name\ttwo\nline\nwrap\n\nend\n");
    }

    #[test]
    fn non_zip_files_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("biology.docx");
        std::fs::write(&path, "plain text pretending to be Word").unwrap();
        let err = read_docx(&path).unwrap_err();
        assert!(matches!(err, LibraryError::Document { ref file, .. } if file.ends_with("biology.docx")));
    }
}
