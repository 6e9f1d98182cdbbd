//! Workbook decoder: OOXML package bytes -> one [`Table`] per worksheet.
//!
//! Only the parts the engine needs are read: workbook and relationships,
//! shared strings, the `cellXfs` side of the styles part, and each worksheet's
//! columns, rows, cells and merged ranges. Formulas contribute their cached
//! value only.

use std::collections::HashMap;
use std::fmt::Display;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, BytesText, Event};
use thiserror::Error;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::conf::{
    N_DAYS_DATE1904_OFFSET, N_NCOLS_EXCEL_MAX, TUP_BUILTIN_DATE_FORMAT_IDS,
    derive_builtin_num_format,
};
use crate::spec::{
    EnumCellValue, EnumColor, SpecAlignmentStyle, SpecBorderSide, SpecBorderStyle, SpecCell,
    SpecCellStyle, SpecFillStyle, SpecFontStyle, SpecProtectionStyle,
};
use crate::table::{SpecWorkbook, Table, TableBuilder};
use crate::util::{
    convert_datetime_to_serial, format_cell_reference, is_date_format_code, parse_cell_reference,
    parse_range_reference,
};

const C_PART_WORKBOOK_DEFAULT: &str = "xl/workbook.xml";
const C_PART_ROOT_RELS: &str = "_rels/.rels";

/// Errors that abort decoding of a workbook.
#[derive(Debug, Error)]
pub enum XlsxDecodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not a readable workbook container: {0}")]
    Container(#[from] ZipError),

    #[error("Malformed XML in `{part}`: {message}")]
    Xml { part: String, message: String },

    #[error("Missing workbook part: {0}")]
    MissingPart(String),

    #[error("Workbook contains no worksheets")]
    NoSheets,
}

fn derive_xml_error(c_part: &str, err: impl Display) -> XlsxDecodeError {
    XlsxDecodeError::Xml {
        part: c_part.to_string(),
        message: err.to_string(),
    }
}

////////////////////////////////////////////////////////////////////////////////
// #region PublicEntryPoints

/// Decode every worksheet of an `.xlsx` payload, in workbook order.
pub fn load_workbook(v_bytes: &[u8]) -> Result<SpecWorkbook, XlsxDecodeError> {
    let mut zip = ZipArchive::new(Cursor::new(v_bytes))?;

    let c_workbook_part = derive_workbook_part_path(&mut zip)?;
    let v_workbook = read_zip_part(&mut zip, &c_workbook_part)?
        .ok_or_else(|| XlsxDecodeError::MissingPart(c_workbook_part.clone()))?;
    let meta = parse_workbook_part(&c_workbook_part, &v_workbook)?;
    if meta.l_sheets.is_empty() {
        return Err(XlsxDecodeError::NoSheets);
    }

    let c_workbook_dir = derive_parent_dir(&c_workbook_part);
    let c_workbook_rels_part = derive_rels_part_path(&c_workbook_part);
    let l_rels = match read_zip_part(&mut zip, &c_workbook_rels_part)? {
        Some(v_rels) => parse_relationships_part(&c_workbook_rels_part, &v_rels)?,
        None => Vec::new(),
    };

    let c_sst_part = find_relationship_by_kind(&l_rels, "/sharedStrings")
        .map(|rel| derive_part_path(&c_workbook_dir, &rel.target))
        .unwrap_or_else(|| format!("{c_workbook_dir}/sharedStrings.xml"));
    let l_shared_strings = match read_zip_part(&mut zip, &c_sst_part)? {
        Some(v_sst) => parse_shared_strings_part(&c_sst_part, &v_sst)?,
        None => Vec::new(),
    };

    let c_styles_part = find_relationship_by_kind(&l_rels, "/styles")
        .map(|rel| derive_part_path(&c_workbook_dir, &rel.target))
        .unwrap_or_else(|| format!("{c_workbook_dir}/styles.xml"));
    let styles = match read_zip_part(&mut zip, &c_styles_part)? {
        Some(v_styles) => parse_styles_part(&c_styles_part, &v_styles)?,
        None => SpecStyleTable::default(),
    };

    let ctx = SpecDecodeContext {
        l_shared_strings,
        styles,
        if_date1904: meta.if_date1904,
    };

    let mut l_tables = Vec::with_capacity(meta.l_sheets.len());
    let mut l_warnings = Vec::new();
    let mut n_idx_active = 0usize;

    for (n_idx_sheet, sheet) in meta.l_sheets.iter().enumerate() {
        let rel = l_rels.iter().find(|rel| rel.id == sheet.rel_id);
        if let Some(rel) = rel
            && !rel.kind.ends_with("/worksheet")
        {
            l_warnings.push(format!(
                "[{}] skipped: not a worksheet ({})",
                sheet.name, rel.kind
            ));
            continue;
        }

        let c_sheet_part = match rel {
            Some(rel) => derive_part_path(&c_workbook_dir, &rel.target),
            None => format!("{c_workbook_dir}/worksheets/sheet{}.xml", n_idx_sheet + 1),
        };

        if n_idx_sheet == meta.n_idx_active {
            n_idx_active = l_tables.len();
        }

        let table = match read_zip_part(&mut zip, &c_sheet_part)? {
            Some(v_sheet) => parse_worksheet_part(
                &c_sheet_part,
                &v_sheet,
                &sheet.name,
                &ctx,
                &mut l_warnings,
            )?,
            None => {
                l_warnings.push(format!(
                    "[{}] worksheet part `{c_sheet_part}` is missing; decoded as empty",
                    sheet.name
                ));
                TableBuilder::new(sheet.name.clone()).build()
            }
        };
        l_tables.push(table);
    }

    if l_tables.is_empty() {
        return Err(XlsxDecodeError::NoSheets);
    }

    for c_warning in &l_warnings {
        log::warn!("{c_warning}");
    }
    log::info!(
        "Decoded workbook: sheets={} warnings={}",
        l_tables.len(),
        l_warnings.len()
    );

    Ok(SpecWorkbook {
        tables: l_tables,
        n_idx_active,
        warnings: l_warnings,
    })
}

/// Read a workbook file from disk and decode it.
pub fn load_workbook_from_path(path: impl AsRef<Path>) -> Result<SpecWorkbook, XlsxDecodeError> {
    let v_bytes = std::fs::read(path.as_ref())?;
    load_workbook(&v_bytes)
}

/// Decode the active worksheet only.
pub fn load_table(v_bytes: &[u8]) -> Result<Table, XlsxDecodeError> {
    load_workbook(v_bytes)?
        .into_active_table()
        .ok_or(XlsxDecodeError::NoSheets)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PackageParts

/// Read a part by name, matching case-insensitively as Excel does.
fn read_zip_part<R: Read + Seek>(
    zip: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>, XlsxDecodeError> {
    let c_pattern = name.trim_start_matches('/').replace('\\', "/");
    let c_name_found = zip
        .file_names()
        .find(|c_name| c_pattern.eq_ignore_ascii_case(c_name))
        .map(ToString::to_string);
    let Some(c_name_found) = c_name_found else {
        return Ok(None);
    };

    let mut file = zip.by_name(&c_name_found)?;
    let mut v_bytes = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut v_bytes)?;
    Ok(Some(v_bytes))
}

fn derive_workbook_part_path<R: Read + Seek>(
    zip: &mut ZipArchive<R>,
) -> Result<String, XlsxDecodeError> {
    let Some(v_rels) = read_zip_part(zip, C_PART_ROOT_RELS)? else {
        return Ok(C_PART_WORKBOOK_DEFAULT.to_string());
    };
    let l_rels = parse_relationships_part(C_PART_ROOT_RELS, &v_rels)?;
    Ok(find_relationship_by_kind(&l_rels, "/officeDocument")
        .map(|rel| derive_part_path("", &rel.target))
        .unwrap_or_else(|| C_PART_WORKBOOK_DEFAULT.to_string()))
}

fn derive_parent_dir(c_part: &str) -> String {
    match c_part.rsplit_once('/') {
        Some((c_dir, _)) => c_dir.to_string(),
        None => String::new(),
    }
}

fn derive_rels_part_path(c_part: &str) -> String {
    match c_part.rsplit_once('/') {
        Some((c_dir, c_file)) => format!("{c_dir}/_rels/{c_file}.rels"),
        None => format!("_rels/{c_part}.rels"),
    }
}

/// Resolve a relationship target against the owning part's directory.
fn derive_part_path(c_base_dir: &str, c_target: &str) -> String {
    if let Some(c_absolute) = c_target.strip_prefix('/') {
        return c_absolute.to_string();
    }

    let mut l_segments: Vec<&str> = c_base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for c_segment in c_target.split('/') {
        match c_segment {
            "" | "." => {}
            ".." => {
                l_segments.pop();
            }
            _ => l_segments.push(c_segment),
        }
    }
    l_segments.join("/")
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region XmlHelpers

fn create_xml_reader(v_bytes: &[u8]) -> Reader<&[u8]> {
    let mut reader = Reader::from_reader(v_bytes);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.expand_empty_elements = true;
    config.trim_text(false);
    reader
}

fn read_xml_event<'a>(
    reader: &mut Reader<&'a [u8]>,
    c_part: &str,
) -> Result<Option<Event<'a>>, XlsxDecodeError> {
    match reader.read_event() {
        Ok(Event::Eof) => Ok(None),
        Ok(event) => Ok(Some(event)),
        Err(err) => Err(derive_xml_error(c_part, err)),
    }
}

fn get_attribute(
    node: &BytesStart<'_>,
    name: &[u8],
    c_part: &str,
) -> Result<Option<String>, XlsxDecodeError> {
    for attr_res in node.attributes() {
        let attr = attr_res.map_err(|err| derive_xml_error(c_part, err))?;
        if attr.key.local_name().as_ref() == name {
            let value = attr
                .unescape_value()
                .map_err(|err| derive_xml_error(c_part, err))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn get_attribute_parsed<T: std::str::FromStr>(
    node: &BytesStart<'_>,
    name: &[u8],
    c_part: &str,
) -> Result<Option<T>, XlsxDecodeError> {
    Ok(get_attribute(node, name, c_part)?.and_then(|c_val| c_val.trim().parse::<T>().ok()))
}

/// OOXML boolean attribute; `default` applies when the attribute is absent.
fn get_attribute_flag(
    node: &BytesStart<'_>,
    name: &[u8],
    default: bool,
    c_part: &str,
) -> Result<bool, XlsxDecodeError> {
    Ok(match get_attribute(node, name, c_part)?.as_deref() {
        Some("1") | Some("true") => true,
        Some("0") | Some("false") => false,
        _ => default,
    })
}

fn unescape_text(text: &BytesText<'_>, c_part: &str) -> Result<String, XlsxDecodeError> {
    Ok(text
        .unescape()
        .map_err(|err| derive_xml_error(c_part, err))?
        .into_owned())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WorkbookAndRelationships

struct SpecSheetEntry {
    name: String,
    rel_id: String,
}

struct SpecWorkbookMeta {
    l_sheets: Vec<SpecSheetEntry>,
    if_date1904: bool,
    n_idx_active: usize,
}

struct SpecRelationship {
    id: String,
    target: String,
    kind: String,
}

fn find_relationship_by_kind<'a>(
    l_rels: &'a [SpecRelationship],
    c_kind_suffix: &str,
) -> Option<&'a SpecRelationship> {
    l_rels.iter().find(|rel| rel.kind.ends_with(c_kind_suffix))
}

fn parse_workbook_part(c_part: &str, v_bytes: &[u8]) -> Result<SpecWorkbookMeta, XlsxDecodeError> {
    let mut reader = create_xml_reader(v_bytes);
    let mut meta = SpecWorkbookMeta {
        l_sheets: Vec::new(),
        if_date1904: false,
        n_idx_active: 0,
    };

    while let Some(event) = read_xml_event(&mut reader, c_part)? {
        let Event::Start(node) = event else {
            continue;
        };
        match node.local_name().as_ref() {
            b"sheet" => {
                let name = get_attribute(&node, b"name", c_part)?.unwrap_or_default();
                let rel_id = get_attribute(&node, b"id", c_part)?.unwrap_or_default();
                meta.l_sheets.push(SpecSheetEntry { name, rel_id });
            }
            b"workbookPr" => {
                meta.if_date1904 = get_attribute_flag(&node, b"date1904", false, c_part)?;
            }
            b"workbookView" => {
                meta.n_idx_active =
                    get_attribute_parsed::<usize>(&node, b"activeTab", c_part)?.unwrap_or(0);
            }
            _ => {}
        }
    }

    Ok(meta)
}

fn parse_relationships_part(
    c_part: &str,
    v_bytes: &[u8],
) -> Result<Vec<SpecRelationship>, XlsxDecodeError> {
    let mut reader = create_xml_reader(v_bytes);
    let mut l_rels = Vec::new();

    while let Some(event) = read_xml_event(&mut reader, c_part)? {
        if let Event::Start(node) = event
            && node.local_name().as_ref() == b"Relationship"
        {
            l_rels.push(SpecRelationship {
                id: get_attribute(&node, b"Id", c_part)?.unwrap_or_default(),
                target: get_attribute(&node, b"Target", c_part)?.unwrap_or_default(),
                kind: get_attribute(&node, b"Type", c_part)?.unwrap_or_default(),
            });
        }
    }

    Ok(l_rels)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SharedStrings

fn parse_shared_strings_part(c_part: &str, v_bytes: &[u8]) -> Result<Vec<String>, XlsxDecodeError> {
    let mut reader = create_xml_reader(v_bytes);
    let mut l_strings = Vec::new();
    let mut c_current = String::new();
    let mut if_in_item = false;
    let mut if_in_text = false;
    let mut if_in_phonetic = false;

    while let Some(event) = read_xml_event(&mut reader, c_part)? {
        match event {
            Event::Start(node) => match node.local_name().as_ref() {
                b"si" => {
                    if_in_item = true;
                    c_current.clear();
                }
                b"rPh" => if_in_phonetic = true,
                b"t" if if_in_item && !if_in_phonetic => if_in_text = true,
                _ => {}
            },
            Event::End(node) => match node.local_name().as_ref() {
                b"si" => {
                    if_in_item = false;
                    l_strings.push(std::mem::take(&mut c_current));
                }
                b"rPh" => if_in_phonetic = false,
                b"t" => if_in_text = false,
                _ => {}
            },
            Event::Text(text) if if_in_text => {
                c_current.push_str(&unescape_text(&text, c_part)?);
            }
            Event::CData(data) if if_in_text => {
                c_current.push_str(&String::from_utf8_lossy(&data));
            }
            _ => {}
        }
    }

    Ok(l_strings)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Styles

/// Resolved `cellXfs` table: style and date-ness per style index.
#[derive(Debug, Default)]
struct SpecStyleTable {
    l_styles: Vec<Arc<SpecCellStyle>>,
    l_if_date: Vec<bool>,
}

#[derive(Debug, Default)]
struct SpecXfRecord {
    num_fmt_id: u32,
    font_id: usize,
    fill_id: usize,
    border_id: usize,
    alignment: SpecAlignmentStyle,
    protection: SpecProtectionStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnumStylesSection {
    Outside,
    NumFmts,
    Fonts,
    Fills,
    Borders,
    CellXfs,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnumBorderEdge {
    Left,
    Right,
    Top,
    Bottom,
}

fn parse_color(node: &BytesStart<'_>, c_part: &str) -> Result<Option<EnumColor>, XlsxDecodeError> {
    if let Some(c_rgb) = get_attribute(node, b"rgb", c_part)? {
        let c_hex = c_rgb.trim().trim_start_matches('#');
        let c_hex = if c_hex.len() == 8 {
            c_hex.get(2..).unwrap_or(c_hex)
        } else {
            c_hex
        };
        return Ok(u32::from_str_radix(c_hex, 16).ok().map(EnumColor::Rgb));
    }
    if let Some(n_theme) = get_attribute_parsed::<u32>(node, b"theme", c_part)? {
        let n_tint = get_attribute_parsed::<f64>(node, b"tint", c_part)?.unwrap_or(0.0);
        return Ok(Some(EnumColor::Theme {
            index: n_theme,
            tint: n_tint,
        }));
    }
    if let Some(n_indexed) = get_attribute_parsed::<u32>(node, b"indexed", c_part)? {
        return Ok(Some(EnumColor::Indexed(n_indexed)));
    }
    if get_attribute_flag(node, b"auto", false, c_part)? {
        return Ok(Some(EnumColor::Auto));
    }
    Ok(None)
}

fn parse_styles_part(c_part: &str, v_bytes: &[u8]) -> Result<SpecStyleTable, XlsxDecodeError> {
    let mut reader = create_xml_reader(v_bytes);

    let mut dict_num_fmts: HashMap<u32, String> = HashMap::new();
    let mut l_fonts: Vec<SpecFontStyle> = Vec::new();
    let mut l_fills: Vec<SpecFillStyle> = Vec::new();
    let mut l_borders: Vec<SpecBorderStyle> = Vec::new();
    let mut l_xfs: Vec<SpecXfRecord> = Vec::new();

    let mut enum_section = EnumStylesSection::Outside;
    let mut font_cur: Option<SpecFontStyle> = None;
    let mut fill_cur: Option<SpecFillStyle> = None;
    let mut border_cur: Option<SpecBorderStyle> = None;
    let mut enum_edge_cur: Option<EnumBorderEdge> = None;
    let mut xf_cur: Option<SpecXfRecord> = None;

    while let Some(event) = read_xml_event(&mut reader, c_part)? {
        match event {
            Event::Start(node) => {
                let c_name = node.local_name();
                let c_name = c_name.as_ref();
                match c_name {
                    b"numFmts" => enum_section = EnumStylesSection::NumFmts,
                    b"fonts" => enum_section = EnumStylesSection::Fonts,
                    b"fills" => enum_section = EnumStylesSection::Fills,
                    b"borders" => enum_section = EnumStylesSection::Borders,
                    b"cellXfs" => enum_section = EnumStylesSection::CellXfs,
                    b"cellStyleXfs" | b"cellStyles" | b"dxfs" | b"tableStyles" | b"colors"
                    | b"extLst" => enum_section = EnumStylesSection::Skipped,
                    _ => match enum_section {
                        EnumStylesSection::NumFmts if c_name == b"numFmt" => {
                            if let Some(n_id) = get_attribute_parsed::<u32>(&node, b"numFmtId", c_part)?
                            {
                                let c_code =
                                    get_attribute(&node, b"formatCode", c_part)?.unwrap_or_default();
                                dict_num_fmts.insert(n_id, c_code);
                            }
                        }
                        EnumStylesSection::Fonts => {
                            if c_name == b"font" {
                                font_cur = Some(SpecFontStyle::default());
                            } else if let Some(font) = font_cur.as_mut() {
                                match c_name {
                                    b"name" => font.name = get_attribute(&node, b"val", c_part)?,
                                    b"sz" => {
                                        font.size = get_attribute_parsed::<f64>(&node, b"val", c_part)?
                                    }
                                    b"b" => font.bold = get_attribute_flag(&node, b"val", true, c_part)?,
                                    b"i" => {
                                        font.italic = get_attribute_flag(&node, b"val", true, c_part)?
                                    }
                                    b"strike" => {
                                        font.strike = get_attribute_flag(&node, b"val", true, c_part)?
                                    }
                                    b"u" => {
                                        let c_kind = get_attribute(&node, b"val", c_part)?
                                            .unwrap_or_else(|| "single".to_string());
                                        font.underline = (c_kind != "none").then_some(c_kind);
                                    }
                                    b"color" => font.color = parse_color(&node, c_part)?,
                                    _ => {}
                                }
                            }
                        }
                        EnumStylesSection::Fills => {
                            if c_name == b"fill" {
                                fill_cur = Some(SpecFillStyle::default());
                            } else if let Some(fill) = fill_cur.as_mut() {
                                match c_name {
                                    b"patternFill" => {
                                        fill.pattern = get_attribute(&node, b"patternType", c_part)?
                                    }
                                    b"fgColor" => fill.fg_color = parse_color(&node, c_part)?,
                                    b"bgColor" => fill.bg_color = parse_color(&node, c_part)?,
                                    _ => {}
                                }
                            }
                        }
                        EnumStylesSection::Borders => {
                            if c_name == b"border" {
                                border_cur = Some(SpecBorderStyle::default());
                                continue;
                            }
                            let Some(border) = border_cur.as_mut() else {
                                continue;
                            };
                            let enum_edge = match c_name {
                                b"left" | b"start" => Some(EnumBorderEdge::Left),
                                b"right" | b"end" => Some(EnumBorderEdge::Right),
                                b"top" => Some(EnumBorderEdge::Top),
                                b"bottom" => Some(EnumBorderEdge::Bottom),
                                _ => None,
                            };
                            if let Some(enum_edge) = enum_edge {
                                enum_edge_cur = Some(enum_edge);
                                let side = derive_border_side_mut(border, enum_edge);
                                side.style = get_attribute(&node, b"style", c_part)?;
                            } else if c_name == b"color"
                                && let Some(enum_edge) = enum_edge_cur
                            {
                                derive_border_side_mut(border, enum_edge).color =
                                    parse_color(&node, c_part)?;
                            }
                        }
                        EnumStylesSection::CellXfs => {
                            if c_name == b"xf" {
                                xf_cur = Some(SpecXfRecord {
                                    num_fmt_id: get_attribute_parsed(&node, b"numFmtId", c_part)?
                                        .unwrap_or(0),
                                    font_id: get_attribute_parsed(&node, b"fontId", c_part)?
                                        .unwrap_or(0),
                                    fill_id: get_attribute_parsed(&node, b"fillId", c_part)?
                                        .unwrap_or(0),
                                    border_id: get_attribute_parsed(&node, b"borderId", c_part)?
                                        .unwrap_or(0),
                                    ..Default::default()
                                });
                            } else if let Some(xf) = xf_cur.as_mut() {
                                match c_name {
                                    b"alignment" => {
                                        xf.alignment = SpecAlignmentStyle {
                                            horizontal: get_attribute(&node, b"horizontal", c_part)?,
                                            vertical: get_attribute(&node, b"vertical", c_part)?,
                                            wrap_text: get_attribute_flag(
                                                &node, b"wrapText", false, c_part,
                                            )?,
                                            indent: get_attribute_parsed(&node, b"indent", c_part)?,
                                            text_rotation: get_attribute_parsed(
                                                &node,
                                                b"textRotation",
                                                c_part,
                                            )?,
                                            shrink_to_fit: get_attribute_flag(
                                                &node,
                                                b"shrinkToFit",
                                                false,
                                                c_part,
                                            )?,
                                        };
                                    }
                                    b"protection" => {
                                        xf.protection = SpecProtectionStyle {
                                            locked: get_attribute_flag(&node, b"locked", true, c_part)?,
                                            hidden: get_attribute_flag(&node, b"hidden", false, c_part)?,
                                        };
                                    }
                                    _ => {}
                                }
                            }
                        }
                        _ => {}
                    },
                }
            }
            Event::End(node) => match node.local_name().as_ref() {
                b"numFmts" | b"fonts" | b"fills" | b"borders" | b"cellXfs" | b"cellStyleXfs"
                | b"cellStyles" | b"dxfs" | b"tableStyles" | b"colors" | b"extLst" => {
                    enum_section = EnumStylesSection::Outside;
                }
                b"font" if enum_section == EnumStylesSection::Fonts => {
                    l_fonts.extend(font_cur.take());
                }
                b"fill" if enum_section == EnumStylesSection::Fills => {
                    l_fills.extend(fill_cur.take());
                }
                b"border" if enum_section == EnumStylesSection::Borders => {
                    l_borders.extend(border_cur.take());
                    enum_edge_cur = None;
                }
                b"left" | b"start" | b"right" | b"end" | b"top" | b"bottom" => {
                    enum_edge_cur = None;
                }
                b"xf" if enum_section == EnumStylesSection::CellXfs => {
                    l_xfs.extend(xf_cur.take());
                }
                _ => {}
            },
            _ => {}
        }
    }

    let mut styles = SpecStyleTable::default();
    for xf in l_xfs {
        let c_custom_code = dict_num_fmts.get(&xf.num_fmt_id);
        let if_date = match c_custom_code {
            Some(c_code) => is_date_format_code(c_code),
            None => TUP_BUILTIN_DATE_FORMAT_IDS.contains(&xf.num_fmt_id),
        };
        let num_format = c_custom_code
            .cloned()
            .or_else(|| derive_builtin_num_format(xf.num_fmt_id).map(str::to_string));

        styles.l_styles.push(Arc::new(SpecCellStyle {
            font: l_fonts.get(xf.font_id).cloned().unwrap_or_default(),
            border: l_borders.get(xf.border_id).cloned().unwrap_or_default(),
            fill: l_fills.get(xf.fill_id).cloned().unwrap_or_default(),
            num_format,
            protection: xf.protection,
            alignment: xf.alignment,
        }));
        styles.l_if_date.push(if_date);
    }

    Ok(styles)
}

fn derive_border_side_mut(border: &mut SpecBorderStyle, enum_edge: EnumBorderEdge) -> &mut SpecBorderSide {
    match enum_edge {
        EnumBorderEdge::Left => &mut border.left,
        EnumBorderEdge::Right => &mut border.right,
        EnumBorderEdge::Top => &mut border.top,
        EnumBorderEdge::Bottom => &mut border.bottom,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Worksheet

struct SpecDecodeContext {
    l_shared_strings: Vec<String>,
    styles: SpecStyleTable,
    if_date1904: bool,
}

#[derive(Debug, Default)]
struct SpecRawCell {
    row: usize,
    col: usize,
    n_style_idx: Option<usize>,
    c_type: Option<String>,
    c_value: String,
    c_inline: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnumTextTarget {
    Value,
    InlineText,
}

fn parse_worksheet_part(
    c_part: &str,
    v_bytes: &[u8],
    sheet_name: &str,
    ctx: &SpecDecodeContext,
    l_warnings: &mut Vec<String>,
) -> Result<Table, XlsxDecodeError> {
    let mut reader = create_xml_reader(v_bytes);
    let mut builder = TableBuilder::new(sheet_name);

    let mut n_row_cursor = 0usize;
    let mut n_col_cursor = 0usize;
    let mut cell_cur: Option<SpecRawCell> = None;
    let mut enum_text_target: Option<EnumTextTarget> = None;
    let mut if_in_inline = false;
    let mut if_in_phonetic = false;

    while let Some(event) = read_xml_event(&mut reader, c_part)? {
        match event {
            Event::Start(node) => match node.local_name().as_ref() {
                b"col" => {
                    let n_min = get_attribute_parsed::<usize>(&node, b"min", c_part)?.unwrap_or(0);
                    let n_max = get_attribute_parsed::<usize>(&node, b"max", c_part)?
                        .unwrap_or(n_min)
                        .min(N_NCOLS_EXCEL_MAX);
                    if let Some(n_width) = get_attribute_parsed::<f64>(&node, b"width", c_part)? {
                        for n_col in n_min.max(1)..=n_max {
                            builder.set_col_width(n_col, n_width);
                        }
                    }
                }
                b"row" => {
                    n_row_cursor = get_attribute_parsed::<usize>(&node, b"r", c_part)?
                        .unwrap_or(n_row_cursor + 1);
                    n_col_cursor = 0;
                    if let Some(n_height) = get_attribute_parsed::<f64>(&node, b"ht", c_part)? {
                        builder.set_row_height(n_row_cursor, n_height);
                    }
                }
                b"c" => {
                    let (n_row, n_col) = match get_attribute(&node, b"r", c_part)? {
                        Some(c_ref) => match parse_cell_reference(&c_ref) {
                            Ok(pos) => pos,
                            Err(msg) => {
                                l_warnings.push(format!("[{sheet_name}] {msg}"));
                                (n_row_cursor, n_col_cursor + 1)
                            }
                        },
                        None => (n_row_cursor, n_col_cursor + 1),
                    };
                    n_row_cursor = n_row.max(n_row_cursor);
                    n_col_cursor = n_col;
                    cell_cur = Some(SpecRawCell {
                        row: n_row,
                        col: n_col,
                        n_style_idx: get_attribute_parsed::<usize>(&node, b"s", c_part)?,
                        c_type: get_attribute(&node, b"t", c_part)?,
                        ..Default::default()
                    });
                }
                b"v" if cell_cur.is_some() => enum_text_target = Some(EnumTextTarget::Value),
                b"is" if cell_cur.is_some() => if_in_inline = true,
                b"rPh" => if_in_phonetic = true,
                b"t" if if_in_inline && !if_in_phonetic => {
                    enum_text_target = Some(EnumTextTarget::InlineText)
                }
                b"mergeCell" => {
                    if let Some(c_ref) = get_attribute(&node, b"ref", c_part)? {
                        match parse_range_reference(&c_ref) {
                            Ok(region) => {
                                builder.push_merged_region(region);
                            }
                            Err(msg) => l_warnings.push(format!(
                                "[{sheet_name}] merged range skipped: {msg}"
                            )),
                        }
                    }
                }
                _ => {}
            },
            Event::End(node) => match node.local_name().as_ref() {
                b"v" | b"t" => enum_text_target = None,
                b"is" => if_in_inline = false,
                b"rPh" => if_in_phonetic = false,
                b"c" => {
                    if let Some(raw) = cell_cur.take() {
                        let cell = derive_cell(&raw, ctx, sheet_name, l_warnings);
                        if !cell.is_void() {
                            builder.set_cell(raw.row, raw.col, cell);
                        }
                    }
                    enum_text_target = None;
                    if_in_inline = false;
                }
                _ => {}
            },
            Event::Text(text) => {
                if let (Some(enum_target), Some(raw)) = (enum_text_target, cell_cur.as_mut()) {
                    let c_text = unescape_text(&text, c_part)?;
                    match enum_target {
                        EnumTextTarget::Value => raw.c_value.push_str(&c_text),
                        EnumTextTarget::InlineText => raw.c_inline.push_str(&c_text),
                    }
                }
            }
            Event::CData(data) => {
                if let (Some(enum_target), Some(raw)) = (enum_text_target, cell_cur.as_mut()) {
                    let c_text = String::from_utf8_lossy(&data);
                    match enum_target {
                        EnumTextTarget::Value => raw.c_value.push_str(&c_text),
                        EnumTextTarget::InlineText => raw.c_inline.push_str(&c_text),
                    }
                }
            }
            _ => {}
        }
    }

    Ok(builder.build())
}

fn derive_cell(
    raw: &SpecRawCell,
    ctx: &SpecDecodeContext,
    sheet_name: &str,
    l_warnings: &mut Vec<String>,
) -> SpecCell {
    let c_ref = format_cell_reference(raw.row, raw.col);

    let mut if_date_style = false;
    let style = match raw.n_style_idx {
        None => None,
        Some(n_idx) => match ctx.styles.l_styles.get(n_idx) {
            Some(style) => {
                if_date_style = ctx.styles.l_if_date.get(n_idx).copied().unwrap_or(false);
                Some(Arc::clone(style))
            }
            None => {
                l_warnings.push(format!(
                    "[{sheet_name}] {c_ref}: style index {n_idx} not found; default style used"
                ));
                None
            }
        },
    };

    let c_value = raw.c_value.as_str();
    let value = match raw.c_type.as_deref() {
        Some("s") => match c_value
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|n_idx| ctx.l_shared_strings.get(n_idx))
        {
            Some(c_text) => EnumCellValue::String(c_text.clone()),
            None => {
                l_warnings.push(format!(
                    "[{sheet_name}] {c_ref}: shared string {c_value:?} not found; decoded as empty"
                ));
                EnumCellValue::Empty
            }
        },
        Some("inlineStr") => {
            if raw.c_inline.is_empty() {
                EnumCellValue::Empty
            } else {
                EnumCellValue::String(raw.c_inline.clone())
            }
        }
        Some("str") | Some("e") => {
            if c_value.is_empty() {
                EnumCellValue::Empty
            } else {
                EnumCellValue::String(c_value.to_string())
            }
        }
        Some("b") => match c_value.trim() {
            "" => EnumCellValue::Empty,
            c_flag => EnumCellValue::Boolean(c_flag == "1" || c_flag.eq_ignore_ascii_case("true")),
        },
        Some("d") => match parse_iso_datetime(c_value.trim()) {
            Some(dt) => EnumCellValue::DateTime(convert_datetime_to_serial(dt)),
            None if c_value.is_empty() => EnumCellValue::Empty,
            None => EnumCellValue::String(c_value.to_string()),
        },
        _ => {
            let c_trimmed = c_value.trim();
            if c_trimmed.is_empty() {
                EnumCellValue::Empty
            } else {
                match c_trimmed.parse::<f64>().ok().filter(|n_val| n_val.is_finite()) {
                    Some(n_val) if if_date_style => {
                        let n_offset = if ctx.if_date1904 {
                            N_DAYS_DATE1904_OFFSET
                        } else {
                            0.0
                        };
                        EnumCellValue::DateTime(n_val + n_offset)
                    }
                    Some(n_val) => EnumCellValue::Number(n_val),
                    None => {
                        l_warnings.push(format!(
                            "[{sheet_name}] {c_ref}: unparsable number {c_trimmed:?}; decoded as empty"
                        ));
                        EnumCellValue::Empty
                    }
                }
            }
        }
    };

    SpecCell { value, style }
}

fn parse_iso_datetime(c_value: &str) -> Option<NaiveDateTime> {
    for c_fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(c_value, c_fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(c_value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
