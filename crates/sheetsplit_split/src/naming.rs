//! Output naming rules: partition names, safe file stems, date stamps.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{Local, NaiveDate};
use regex::Regex;
use sheetsplit_io_xlsx::{EnumCellValue, Table, convert_serial_to_datetime, parse_cell_reference};

use crate::conf::{C_KEY_COMPANY_SEPARATOR, C_NAME_UNKNOWN, N_LEN_KEY_NAME_PREFIX};
use crate::spec::EnumDateFallback;

static RE_ISO_DATE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(\d{4})-(\d{2})-(\d{2})").ok());

/// Company part of `"<code> - <company>"`, trimmed.
pub fn derive_company_part(key: &str) -> Option<&str> {
    key.split_once(C_KEY_COMPANY_SEPARATOR)
        .map(|(_, c_company)| c_company.trim())
}

/// Human name of a partition key.
///
/// The first 13 characters with digits and `-` removed; when that leaves
/// nothing, the company part after `" - "`; else `UNKNOWN`.
pub fn derive_partition_name(key: &str) -> String {
    let c_prefix: String = key
        .chars()
        .take(N_LEN_KEY_NAME_PREFIX)
        .filter(|chr| !chr.is_ascii_digit() && *chr != '-')
        .collect();
    let c_cleaned = c_prefix.trim();
    if !c_cleaned.is_empty() {
        return c_cleaned.to_string();
    }
    match derive_company_part(key) {
        Some(c_company) if !c_company.is_empty() => c_company.to_string(),
        _ => C_NAME_UNKNOWN.to_string(),
    }
}

/// Keep alphanumerics, space, `-`, `_` (plus `extra`), then trim.
pub fn filter_file_name_chars(name: &str, extra: &[char]) -> String {
    name.chars()
        .filter(|chr| chr.is_alphanumeric() || matches!(chr, ' ' | '-' | '_') || extra.contains(chr))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Filesystem-safe stem: filtered, spaces as `_`, never empty.
pub fn derive_safe_file_stem(name: &str) -> String {
    let c_stem = filter_file_name_chars(name, &[]).replace(' ', "_");
    if c_stem.is_empty() {
        C_NAME_UNKNOWN.to_string()
    } else {
        c_stem
    }
}

/// `<safe name>_<yyyymmdd>.xlsx` for a partition key.
pub fn derive_output_name(key: &str, date_stamp: &str) -> String {
    format!(
        "{}_{date_stamp}.xlsx",
        derive_safe_file_stem(&derive_partition_name(key))
    )
}

/// File names already used within one run.
#[derive(Debug, Clone, Default)]
pub struct SpecFileNameRegistry {
    set_names: HashSet<String>,
}

impl SpecFileNameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `file_name`, suffixing `_2`, `_3`, ... before the extension on collision.
    pub fn claim(&mut self, file_name: &str) -> String {
        if self.set_names.insert(file_name.to_string()) {
            return file_name.to_string();
        }
        let (c_stem, c_ext) = match file_name.rsplit_once('.') {
            Some((c_stem, c_ext)) if !c_stem.is_empty() => (c_stem, format!(".{c_ext}")),
            _ => (file_name, String::new()),
        };
        let mut n_idx = 2usize;
        loop {
            let candidate = format!("{c_stem}_{n_idx}{c_ext}");
            if self.set_names.insert(candidate.clone()) {
                return candidate;
            }
            n_idx += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.set_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set_names.is_empty()
    }
}

/// `yyyymmdd` from a date cell, if it holds one.
pub fn extract_date_stamp(value: &EnumCellValue) -> Option<String> {
    match value {
        EnumCellValue::DateTime(serial) => {
            convert_serial_to_datetime(*serial).map(|dt| dt.format("%Y%m%d").to_string())
        }
        EnumCellValue::String(text) => {
            let re_date = RE_ISO_DATE.as_ref()?;
            let caps = re_date.captures(text)?;
            let c_stamp = format!("{}{}{}", &caps[1], &caps[2], &caps[3]);
            NaiveDate::parse_from_str(&c_stamp, "%Y%m%d")
                .ok()
                .map(|_| c_stamp)
        }
        _ => None,
    }
}

/// Date stamp of a run: the cell at `date_cell_ref` or the fallback date.
pub fn derive_date_stamp(
    table: &Table,
    date_cell_ref: &str,
    rule_fallback: EnumDateFallback,
) -> String {
    let value = parse_cell_reference(date_cell_ref)
        .ok()
        .map(|(row, col)| &table.cell_at(row, col).value);
    if let Some(c_stamp) = value.and_then(extract_date_stamp) {
        return c_stamp;
    }
    log::debug!("No date in {date_cell_ref}; using fallback {rule_fallback:?}");
    derive_fallback_date(rule_fallback)
        .format("%Y%m%d")
        .to_string()
}

pub fn derive_fallback_date(rule_fallback: EnumDateFallback) -> NaiveDate {
    match rule_fallback {
        EnumDateFallback::Today => Local::now().date_naive(),
        EnumDateFallback::Fixed(date) => date,
    }
}
