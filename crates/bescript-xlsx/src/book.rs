//! Workbook container access
//!
//! [`FormulaBook`] opens an existing workbook, exposes its defined names,
//! and saves the workbook back with the names rewritten. Every part of the
//! container other than `xl/workbook.xml` is carried through byte-for-byte,
//! so sheet data, styles and anything else a real workbook holds survive a
//! compile round-trip untouched. Only the `<definedNames>` section of the
//! workbook part is regenerated.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use bescript_compiler::NamedFormulaStore;
use log::debug;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{XlsxError, XlsxResult};

const WORKBOOK_PART: &str = "xl/workbook.xml";

/// One defined name in the workbook
#[derive(Debug, Clone, PartialEq)]
pub struct DefinedFormula {
    pub name: String,
    pub formula: String,
    pub comment: Option<String>,
}

/// An open workbook, holding its container parts and defined names
pub struct FormulaBook {
    /// All parts except the workbook part, in container order
    parts: Vec<(String, Vec<u8>)>,
    /// Index in the save order where the workbook part goes
    workbook_pos: usize,
    /// The workbook part with its `<definedNames>` section stripped
    workbook_xml: String,
    names: Vec<DefinedFormula>,
}

impl FormulaBook {
    /// Create a fresh single-sheet workbook with no defined names
    pub fn new() -> Self {
        let parts = vec![
            (
                "[Content_Types].xml".to_string(),
                CONTENT_TYPES_XML.as_bytes().to_vec(),
            ),
            ("_rels/.rels".to_string(), ROOT_RELS_XML.as_bytes().to_vec()),
            (
                "xl/_rels/workbook.xml.rels".to_string(),
                WORKBOOK_RELS_XML.as_bytes().to_vec(),
            ),
            ("xl/styles.xml".to_string(), STYLES_XML.as_bytes().to_vec()),
            (
                "xl/worksheets/sheet1.xml".to_string(),
                SHEET_XML.as_bytes().to_vec(),
            ),
        ];
        FormulaBook {
            parts,
            workbook_pos: 2,
            workbook_xml: WORKBOOK_XML.to_string(),
            names: Vec::new(),
        }
    }

    /// Open a workbook file
    pub fn open<P: AsRef<Path>>(path: P) -> XlsxResult<Self> {
        let file = File::open(path.as_ref())?;
        let mut archive = zip::ZipArchive::new(file)?;

        let mut parts = Vec::new();
        let mut workbook_pos = None;
        let mut workbook_raw = None;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let mut data = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut data)?;
            if name == WORKBOOK_PART {
                workbook_pos = Some(parts.len());
                workbook_raw = Some(data);
            } else {
                parts.push((name, data));
            }
        }

        let workbook_raw =
            workbook_raw.ok_or_else(|| XlsxError::MissingPart(WORKBOOK_PART.to_string()))?;
        let workbook_raw = String::from_utf8(workbook_raw).map_err(|e| {
            XlsxError::InvalidFormat(format!("workbook part is not UTF-8: {e}"))
        })?;

        let names = parse_defined_names(&workbook_raw)?;
        debug!(
            "opened workbook: {} parts, {} defined names",
            parts.len() + 1,
            names.len()
        );

        Ok(FormulaBook {
            parts,
            workbook_pos: workbook_pos.unwrap_or(0),
            workbook_xml: strip_defined_names(&workbook_raw),
            names,
        })
    }

    /// Save the workbook to a file, regenerating the defined-names section
    pub fn save<P: AsRef<Path>>(&self, path: P) -> XlsxResult<()> {
        let file = File::create(path.as_ref())?;
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();

        let workbook_xml = self.render_workbook_xml()?;
        let mut wrote_workbook = false;

        for (i, (name, data)) in self.parts.iter().enumerate() {
            if i == self.workbook_pos {
                zip.start_file(WORKBOOK_PART, options)?;
                zip.write_all(workbook_xml.as_bytes())?;
                wrote_workbook = true;
            }
            zip.start_file(name.as_str(), options)?;
            zip.write_all(data)?;
        }
        if !wrote_workbook {
            zip.start_file(WORKBOOK_PART, options)?;
            zip.write_all(workbook_xml.as_bytes())?;
        }

        zip.finish()?;
        debug!("saved workbook with {} defined names", self.names.len());
        Ok(())
    }

    /// The defined names currently in the workbook, in definition order
    pub fn defined_names(&self) -> &[DefinedFormula] {
        &self.names
    }

    fn render_workbook_xml(&self) -> XlsxResult<String> {
        let block = self.render_defined_names();
        if block.is_empty() {
            return Ok(self.workbook_xml.clone());
        }
        // Schema order puts definedNames right after the sheet list
        if let Some(pos) = self.workbook_xml.find("</sheets>") {
            let insert_at = pos + "</sheets>".len();
            let mut out = String::with_capacity(self.workbook_xml.len() + block.len());
            out.push_str(&self.workbook_xml[..insert_at]);
            out.push_str(&block);
            out.push_str(&self.workbook_xml[insert_at..]);
            return Ok(out);
        }
        Err(XlsxError::InvalidFormat(
            "workbook part has no sheet list".to_string(),
        ))
    }

    fn render_defined_names(&self) -> String {
        if self.names.is_empty() {
            return String::new();
        }
        let mut content = String::from("\n    <definedNames>");
        for def in &self.names {
            content.push_str("\n        <definedName name=\"");
            content.push_str(&escape(&def.name));
            content.push('"');
            if let Some(comment) = &def.comment {
                content.push_str(" comment=\"");
                content.push_str(&escape(comment));
                content.push('"');
            }
            content.push('>');
            content.push_str(&escape(&def.formula));
            content.push_str("</definedName>");
        }
        content.push_str("\n    </definedNames>");
        content
    }
}

impl Default for FormulaBook {
    fn default() -> Self {
        Self::new()
    }
}

impl NamedFormulaStore for FormulaBook {
    fn names(&self) -> Vec<String> {
        self.names.iter().map(|d| d.name.clone()).collect()
    }

    fn formula(&self, name: &str) -> Option<&str> {
        self.names
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.formula.as_str())
    }

    fn comment(&self, name: &str) -> Option<&str> {
        self.names
            .iter()
            .find(|d| d.name == name)
            .and_then(|d| d.comment.as_deref())
    }

    fn set(&mut self, name: &str, formula: &str, comment: Option<&str>) {
        let def = DefinedFormula {
            name: name.to_string(),
            formula: formula.to_string(),
            comment: comment.map(str::to_string),
        };
        match self.names.iter_mut().find(|d| d.name == name) {
            Some(existing) => *existing = def,
            None => self.names.push(def),
        }
    }

    fn remove(&mut self, name: &str) {
        self.names.retain(|d| d.name != name);
    }
}

/// Parse the `<definedNames>` entries out of a workbook part
fn parse_defined_names(xml: &str) -> XlsxResult<Vec<DefinedFormula>> {
    let mut reader = Reader::from_str(xml);
    let mut names = Vec::new();
    let mut current: Option<DefinedFormula> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"definedName" => {
                let mut def = DefinedFormula {
                    name: String::new(),
                    formula: String::new(),
                    comment: None,
                };
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"name" => def.name = attr.unescape_value()?.into_owned(),
                        b"comment" => def.comment = Some(attr.unescape_value()?.into_owned()),
                        _ => {}
                    }
                }
                current = Some(def);
            }
            Event::Text(t) => {
                if let Some(def) = current.as_mut() {
                    def.formula.push_str(&t.unescape()?);
                }
            }
            Event::End(e) if e.name().as_ref() == b"definedName" => {
                if let Some(def) = current.take() {
                    names.push(def);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(names)
}

/// Remove the `<definedNames>` section (if any) from a workbook part
fn strip_defined_names(xml: &str) -> String {
    let Some(start) = xml.find("<definedNames") else {
        return xml.to_string();
    };
    let end = match xml[start..].find("</definedNames>") {
        Some(rel) => start + rel + "</definedNames>".len(),
        // Self-closing form
        None => match xml[start..].find("/>") {
            Some(rel) => start + rel + "/>".len(),
            None => return xml.to_string(),
        },
    };

    let mut out = String::with_capacity(xml.len());
    // Drop the whitespace run that preceded the removed section
    out.push_str(xml[..start].trim_end_matches([' ', '\t', '\n', '\r']));
    out.push_str(&xml[end..]);
    out
}

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="xml" ContentType="application/xml"/>
    <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
    <Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>
    <Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

const WORKBOOK_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
    <sheets>
        <sheet name="Sheet1" sheetId="1" r:id="rId1"/>
    </sheets>
</workbook>"#;

const WORKBOOK_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
    <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
    <fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts>
    <fills count="1"><fill><patternFill patternType="none"/></fill></fills>
    <borders count="1"><border/></borders>
    <cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
    <cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs>
</styleSheet>"#;

const SHEET_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
    <sheetData/>
</worksheet>"#;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_defined_names() {
        let xml = r#"<workbook><sheets><sheet name="S" sheetId="1"/></sheets>
            <definedNames>
                <definedName name="x" comment="note">1 + 2</definedName>
                <definedName name="y">SUM(A:A)</definedName>
            </definedNames></workbook>"#;
        let names = parse_defined_names(xml).unwrap();
        assert_eq!(names.len(), 2);
        assert_eq!(names[0].name, "x");
        assert_eq!(names[0].formula, "1 + 2");
        assert_eq!(names[0].comment.as_deref(), Some("note"));
        assert_eq!(names[1].comment, None);
    }

    #[test]
    fn test_parse_unescapes_entities() {
        let xml = r#"<workbook><definedNames>
            <definedName name="cmp">IF(A1&lt;B1, &quot;lo&quot;, &quot;hi&quot;)</definedName>
        </definedNames></workbook>"#;
        let names = parse_defined_names(xml).unwrap();
        assert_eq!(names[0].formula, r#"IF(A1<B1, "lo", "hi")"#);
    }

    #[test]
    fn test_strip_defined_names_section() {
        let xml = "<workbook>\n    <sheets/>\n    <definedNames><definedName name=\"x\">1</definedName></definedNames>\n</workbook>";
        assert_eq!(strip_defined_names(xml), "<workbook>\n    <sheets/>\n</workbook>");
    }

    #[test]
    fn test_strip_without_section_is_identity() {
        let xml = "<workbook><sheets/></workbook>";
        assert_eq!(strip_defined_names(xml), xml);
    }

    #[test]
    fn test_render_splices_after_sheets() {
        let mut book = FormulaBook::new();
        book.set("x", "1 + 2", Some("marker"));
        let xml = book.render_workbook_xml().unwrap();
        let sheets_end = xml.find("</sheets>").unwrap();
        let names_start = xml.find("<definedNames>").unwrap();
        assert!(names_start > sheets_end);
        assert!(xml.contains(r#"<definedName name="x" comment="marker">1 + 2</definedName>"#));
    }

    #[test]
    fn test_render_escapes_content() {
        let mut book = FormulaBook::new();
        book.set("cmp", r#"IF(A1<B1, "lo", "hi")"#, None);
        let xml = book.render_workbook_xml().unwrap();
        assert!(xml.contains("IF(A1&lt;B1, &quot;lo&quot;, &quot;hi&quot;)"));
    }

    #[test]
    fn test_store_set_replaces_in_place() {
        let mut book = FormulaBook::new();
        book.set("x", "1", None);
        book.set("y", "2", None);
        book.set("x", "3", Some("c"));
        assert_eq!(book.names(), vec!["x".to_string(), "y".to_string()]);
        assert_eq!(book.formula("x"), Some("3"));
        assert_eq!(book.comment("x"), Some("c"));
    }

    #[test]
    fn test_store_remove() {
        let mut book = FormulaBook::new();
        book.set("x", "1", None);
        book.remove("x");
        book.remove("never-there");
        assert!(book.names().is_empty());
    }
}
