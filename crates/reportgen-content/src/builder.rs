use std::io::{Cursor, Write};

use bytes::Bytes;
use quick_xml::escape::escape;
use reportgen_common::{ReportConfig, ReportError, Result};
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use crate::types::ReportDocument;

pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const PAGE_BREAK: &str = r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#;

pub trait DocumentBuilder: Send + Sync {
    fn content_type(&self) -> &'static str;

    fn build(&self, document: &ReportDocument) -> Result<Bytes>;
}

#[derive(Debug, Clone, Copy)]
enum Style {
    Title,
    Subtitle,
    CoverLine,
    Heading1,
    Heading2,
    Body,
}

/// Writes a minimal WordprocessingML package: cover page, chapters, references.
#[derive(Debug, Clone, Default)]
pub struct DocxBuilder;

impl DocxBuilder {
    pub fn new() -> Self {
        Self
    }

    fn document_xml(document: &ReportDocument) -> String {
        let config = &document.config;
        let mut body = String::new();

        push_paragraph(&mut body, Style::Title, &config.project_title);
        push_paragraph(&mut body, Style::Subtitle, config.report_type.display_name());
        push_paragraph(
            &mut body,
            Style::CoverLine,
            &format!("Submitted by {} ({})", config.student_name, config.student_id),
        );
        push_paragraph(&mut body, Style::CoverLine, &format!("Course: {}", config.course));
        push_paragraph(&mut body, Style::CoverLine, &format!("Semester: {}", config.semester));
        if let Some(department) = config.department.as_deref() {
            push_paragraph(&mut body, Style::CoverLine, department);
        }
        push_paragraph(&mut body, Style::CoverLine, &config.institution);
        if let Some(year) = config.academic_year.as_deref() {
            push_paragraph(&mut body, Style::CoverLine, &format!("Academic Year {year}"));
        }
        push_paragraph(
            &mut body,
            Style::CoverLine,
            &format!("Supervisor: {}", config.supervisor),
        );
        body.push_str(PAGE_BREAK);

        for (index, chapter) in document.chapters.iter().enumerate() {
            let number = index + 1;
            push_paragraph(
                &mut body,
                Style::Heading1,
                &format!("Chapter {number}: {}", chapter.title),
            );
            for (section_index, section) in chapter.sections.iter().enumerate() {
                push_paragraph(
                    &mut body,
                    Style::Heading2,
                    &format!("{number}.{} {}", section_index + 1, section.heading),
                );
                let paragraphs = section
                    .body
                    .split("\n\n")
                    .map(str::trim)
                    .filter(|paragraph| !paragraph.is_empty());
                for paragraph in paragraphs {
                    push_paragraph(&mut body, Style::Body, paragraph);
                }
            }
            body.push_str(PAGE_BREAK);
        }

        if !document.references.is_empty() {
            push_paragraph(&mut body, Style::Heading1, "References");
            for (index, reference) in document.references.iter().enumerate() {
                let line = format!("[{}] {reference}", index + 1);
                push_paragraph(&mut body, Style::Body, &line);
            }
        }

        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}<w:sectPr><w:pgSz w:w="11906" w:h="16838"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440"/></w:sectPr></w:body></w:document>"#
        )
    }
}

impl DocumentBuilder for DocxBuilder {
    fn content_type(&self) -> &'static str {
        DOCX_CONTENT_TYPE
    }

    fn build(&self, document: &ReportDocument) -> Result<Bytes> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        let parts = [
            ("[Content_Types].xml", CONTENT_TYPES_XML.to_string()),
            ("_rels/.rels", PACKAGE_RELS_XML.to_string()),
            ("word/document.xml", Self::document_xml(document)),
        ];
        for (name, content) in parts {
            let options =
                SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
            writer
                .start_file(name, options)
                .map_err(|err| ReportError::Build(format!("failed to start {name}: {err}")))?;
            writer
                .write_all(content.as_bytes())
                .map_err(|err| ReportError::Build(format!("failed to write {name}: {err}")))?;
        }

        let cursor = writer
            .finish()
            .map_err(|err| ReportError::Build(format!("failed to finish docx package: {err}")))?;
        Ok(Bytes::from(cursor.into_inner()))
    }
}

fn push_paragraph(body: &mut String, style: Style, text: &str) {
    let (justify, run_props) = match style {
        Style::Title => ("center", r#"<w:b/><w:sz w:val="40"/>"#),
        Style::Subtitle => ("center", r#"<w:sz w:val="32"/>"#),
        Style::CoverLine => ("center", r#"<w:sz w:val="24"/>"#),
        Style::Heading1 => ("left", r#"<w:b/><w:sz w:val="32"/>"#),
        Style::Heading2 => ("left", r#"<w:b/><w:sz w:val="26"/>"#),
        Style::Body => ("both", r#"<w:sz w:val="24"/>"#),
    };
    body.push_str(&format!(
        r#"<w:p><w:pPr><w:jc w:val="{justify}"/></w:pPr><w:r><w:rPr>{run_props}</w:rPr><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
        escape(text)
    ));
}

pub fn report_filename(config: &ReportConfig) -> String {
    let title = sanitize_segment(&config.project_title);
    let title = if title.is_empty() { "Report".to_string() } else { title };
    let mut kind = config.report_type.as_str().to_string();
    if let Some(first) = kind.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    format!("{title}_{kind}_Report.docx")
}

fn sanitize_segment(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').chars().take(80).collect()
}
