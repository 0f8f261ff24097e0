//! Company documents: storage-backed uploads and an HTML preview for `.docx` files.

use regex::Regex;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::{info, warn};

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{CompanyDocument, NewDocument};
use crate::prompt::Prompt;
use crate::storage::{Bucket, ObjectStorage};

pub fn upload(
    db: &Database,
    storage: &ObjectStorage,
    file: &Path,
    title: Option<&str>,
    uploaded_by: Option<i64>,
) -> Result<i64> {
    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| AppError::Validation(format!("not a file: {}", file.display())))?
        .to_string();
    let title = title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            file.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(&file_name)
                .to_string()
        });

    let stored = storage.upload(Bucket::CompanyDocuments, file)?;
    let id = db.insert_document(&NewDocument {
        title,
        file_name,
        storage_path: stored.key,
        public_url: stored.public_url,
        uploaded_by,
    })?;
    info!(document_id = id, "document uploaded");
    Ok(id)
}

pub fn delete(db: &Database, storage: &ObjectStorage, id: i64, prompt: &dyn Prompt) -> Result<bool> {
    let doc = find(db, id)?;
    if !prompt.confirm("Delete document?", &format!("{} will be removed.", doc.title)) {
        return Ok(false);
    }
    storage.remove(Bucket::CompanyDocuments, &doc.storage_path)?;
    db.delete_document(id)?;
    info!(document_id = id, "document deleted");
    Ok(true)
}

fn find(db: &Database, id: i64) -> Result<CompanyDocument> {
    db.get_document(id)?
        .ok_or_else(|| AppError::NotFound(format!("document #{}", id)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preview {
    Html(String),
    /// No inline preview; the file can still be downloaded from `url`.
    Download { url: String, reason: String },
}

pub fn preview(db: &Database, storage: &ObjectStorage, id: i64) -> Result<Preview> {
    let doc = find(db, id)?;
    if !doc.file_name.to_lowercase().ends_with(".docx") {
        return Ok(Preview::Download {
            url: doc.public_url,
            reason: "preview is only available for .docx files".to_string(),
        });
    }

    let bytes = storage.read(Bucket::CompanyDocuments, &doc.storage_path)?;
    match docx_to_html(&bytes) {
        Ok(html) => Ok(Preview::Html(html)),
        Err(AppError::Conversion(reason)) => {
            warn!(document_id = id, %reason, "docx preview failed");
            Ok(Preview::Download {
                url: doc.public_url,
                reason,
            })
        }
        Err(e) => Err(e),
    }
}

struct DocxPatterns {
    paragraph: Regex,
    style: Regex,
    numbering: Regex,
    run: Regex,
    bold: Regex,
    italic: Regex,
    piece: Regex,
    entity: Regex,
}

impl DocxPatterns {
    fn new() -> Result<Self> {
        let re = |pattern: &str| {
            Regex::new(pattern).map_err(|e| AppError::Conversion(format!("bad pattern: {}", e)))
        };
        Ok(Self {
            paragraph: re(r"(?s)<w:p(?:\s[^>/]*)?>(.*?)</w:p>")?,
            style: re(r#"<w:pStyle\s+w:val="([^"]+)""#)?,
            numbering: re(r"<w:numPr[\s>]")?,
            run: re(r"(?s)<w:r(?:\s[^>/]*)?>(.*?)</w:r>")?,
            bold: re(r#"<w:b(?:\s+w:val="(?:true|1|on)")?\s*/>"#)?,
            italic: re(r#"<w:i(?:\s+w:val="(?:true|1|on)")?\s*/>"#)?,
            piece: re(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>|<w:tab\s*/>|<w:br\s*/>")?,
            entity: re(r"&(lt|gt|amp|quot|apos|#x[0-9a-fA-F]+|#[0-9]+);")?,
        })
    }
}

/// Renders the body of a `.docx` as simple HTML: paragraphs, `Heading1`-`Heading6`
/// and `Title` styles, bold and italic runs, numbered/bulleted paragraphs as `<ul>`.
pub fn docx_to_html(bytes: &[u8]) -> Result<String> {
    let xml = document_xml(bytes)?;
    let p = DocxPatterns::new()?;
    let mut html = String::new();
    let mut in_list = false;

    for paragraph in p.paragraph.captures_iter(&xml) {
        let body = &paragraph[1];
        let style = p.style.captures(body).map(|c| c[1].to_string());
        let is_bullet = p.numbering.is_match(body)
            || style.as_deref().is_some_and(|s| s.starts_with("List"));

        let mut text = String::new();
        for run in p.run.captures_iter(body) {
            let run = &run[1];
            let content = run_text(&p, run);
            if content.is_empty() {
                continue;
            }
            let bold = p.bold.is_match(run);
            let italic = p.italic.is_match(run);
            if bold {
                text.push_str("<strong>");
            }
            if italic {
                text.push_str("<em>");
            }
            text.push_str(&content);
            if italic {
                text.push_str("</em>");
            }
            if bold {
                text.push_str("</strong>");
            }
        }

        if is_bullet {
            if !in_list {
                html.push_str("<ul>\n");
                in_list = true;
            }
            html.push_str(&format!("<li>{}</li>\n", text));
            continue;
        }
        if in_list {
            html.push_str("</ul>\n");
            in_list = false;
        }
        if text.is_empty() {
            continue;
        }
        match heading_level(style.as_deref()) {
            Some(level) => html.push_str(&format!("<h{0}>{1}</h{0}>\n", level, text)),
            None => html.push_str(&format!("<p>{}</p>\n", text)),
        }
    }
    if in_list {
        html.push_str("</ul>\n");
    }
    Ok(html)
}

/// Paragraph text only, one line per paragraph.
pub fn docx_to_text(bytes: &[u8]) -> Result<String> {
    let xml = document_xml(bytes)?;
    let p = DocxPatterns::new()?;
    let mut lines = Vec::new();
    for paragraph in p.paragraph.captures_iter(&xml) {
        let mut line = String::new();
        for piece in p.piece.captures_iter(&paragraph[1]) {
            match piece.get(1) {
                Some(t) => line.push_str(&unescape_xml(&p.entity, t.as_str())),
                None if piece[0].starts_with("<w:tab") => line.push('\t'),
                None => line.push('\n'),
            }
        }
        lines.push(line);
    }
    Ok(lines.join("\n"))
}

fn document_xml(bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| AppError::Conversion(format!("not a .docx archive: {}", e)))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| AppError::Conversion(format!("missing document body: {}", e)))?
        .read_to_string(&mut xml)
        .map_err(|e| AppError::Conversion(format!("unreadable document body: {}", e)))?;
    Ok(xml)
}

fn heading_level(style: Option<&str>) -> Option<u8> {
    let style = style?;
    if style == "Title" {
        return Some(1);
    }
    let level: u8 = style.strip_prefix("Heading")?.parse().ok()?;
    (1..=6).contains(&level).then_some(level)
}

fn run_text(p: &DocxPatterns, run: &str) -> String {
    let mut out = String::new();
    for piece in p.piece.captures_iter(run) {
        match piece.get(1) {
            Some(t) => out.push_str(&escape_html(&unescape_xml(&p.entity, t.as_str()))),
            None if piece[0].starts_with("<w:tab") => out.push('\t'),
            None => out.push_str("<br>"),
        }
    }
    out
}

fn unescape_xml(entity: &Regex, text: &str) -> String {
    entity
        .replace_all(text, |caps: &regex::Captures| {
            let name = &caps[1];
            match name {
                "lt" => "<".to_string(),
                "gt" => ">".to_string(),
                "amp" => "&".to_string(),
                "quot" => "\"".to_string(),
                "apos" => "'".to_string(),
                _ => {
                    let code = match name.strip_prefix("#x") {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => name[1..].parse().ok(),
                    };
                    code.and_then(char::from_u32)
                        .map(String::from)
                        .unwrap_or_else(|| caps[0].to_string())
                }
            }
        })
        .into_owned()
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::fixture;
    use crate::prompt::testing::ScriptedPrompt;
    use std::io::Write;

    fn docx(body: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("word/document.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        );
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_minimal_document_to_html() {
        let bytes = docx(concat!(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Onboarding</w:t></w:r></w:p>"#,
            r#"<w:p w:rsidR="00A1"><w:r><w:t xml:space="preserve">Read the </w:t></w:r>"#,
            r#"<w:r><w:rPr><w:b/></w:rPr><w:t>handbook</w:t></w:r>"#,
            r#"<w:r><w:rPr><w:i/></w:rPr><w:t> first</w:t></w:r></w:p>"#,
            r#"<w:p><w:pPr><w:numPr><w:ilvl w:val="0"/></w:numPr></w:pPr><w:r><w:t>Laptop</w:t></w:r></w:p>"#,
            r#"<w:p><w:pPr><w:pStyle w:val="ListBullet"/></w:pPr><w:r><w:t>Badge</w:t></w:r></w:p>"#,
            r#"<w:p/>"#,
            r#"<w:p><w:r><w:t>Fees &amp; &lt;terms&gt;</w:t></w:r></w:p>"#,
        ));
        let html = docx_to_html(&bytes).unwrap();
        assert_eq!(
            html,
            concat!(
                "<h1>Onboarding</h1>\n",
                "<p>Read the <strong>handbook</strong><em> first</em></p>\n",
                "<ul>\n<li>Laptop</li>\n<li>Badge</li>\n</ul>\n",
                "<p>Fees &amp; &lt;terms&gt;</p>\n",
            )
        );
    }

    #[test]
    fn test_bold_off_is_not_bold() {
        let bytes = docx(r#"<w:p><w:r><w:rPr><w:b w:val="0"/></w:rPr><w:t>plain</w:t></w:r></w:p>"#);
        assert_eq!(docx_to_html(&bytes).unwrap(), "<p>plain</p>\n");
    }

    #[test]
    fn test_non_archive_is_conversion_error() {
        let err = docx_to_html(b"not a zip").unwrap_err();
        assert!(matches!(err, AppError::Conversion(_)));
    }

    #[test]
    fn test_plain_text_keeps_paragraphs() {
        let bytes = docx(concat!(
            r#"<w:p><w:r><w:t>Casey Jones</w:t></w:r></w:p>"#,
            r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Rust</w:t></w:r><w:r><w:tab/><w:t>SQL &amp; Go</w:t></w:r></w:p>"#,
        ));
        assert_eq!(docx_to_text(&bytes).unwrap(), "Casey Jones\nRust\tSQL & Go");
    }

    #[test]
    fn test_heading_levels() {
        assert_eq!(heading_level(Some("Heading3")), Some(3));
        assert_eq!(heading_level(Some("Title")), Some(1));
        assert_eq!(heading_level(Some("Heading9")), None);
        assert_eq!(heading_level(Some("Normal")), None);
        assert_eq!(heading_level(None), None);
    }

    #[test]
    fn test_upload_preview_and_delete() {
        let f = fixture();
        let dir = tempfile::tempdir().unwrap();
        let storage = ObjectStorage::new(&dir.path().join("store"));

        let good = dir.path().join("handbook.docx");
        std::fs::write(&good, docx(r#"<w:p><w:r><w:t>Welcome</w:t></w:r></w:p>"#)).unwrap();
        let id = upload(&f.db, &storage, &good, None, Some(f.recruiter_id)).unwrap();
        assert_eq!(f.db.get_document(id).unwrap().unwrap().title, "handbook");
        assert_eq!(
            preview(&f.db, &storage, id).unwrap(),
            Preview::Html("<p>Welcome</p>\n".to_string())
        );

        let broken = dir.path().join("broken.docx");
        std::fs::write(&broken, b"garbage").unwrap();
        let broken_id = upload(&f.db, &storage, &broken, Some("Policy"), None).unwrap();
        assert!(matches!(
            preview(&f.db, &storage, broken_id).unwrap(),
            Preview::Download { .. }
        ));

        let prompt = ScriptedPrompt::answering(&[true]);
        assert!(delete(&f.db, &storage, id, &prompt).unwrap());
        assert!(f.db.get_document(id).unwrap().is_none());
        assert!(preview(&f.db, &storage, id).is_err());
    }
}
