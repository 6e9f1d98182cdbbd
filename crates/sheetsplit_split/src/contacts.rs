//! Key -> contact target lookup (WhatsApp group, email address, ...).

use std::collections::HashMap;

use sheetsplit_io_xlsx::Table;

use crate::naming::{derive_company_part, derive_partition_name};

/// Contact targets read from a two-column mapping sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecContactBook {
    dict_targets: HashMap<String, String>,
}

impl SpecContactBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows from 2: column A key, column B target, both trimmed and non-empty.
    ///
    /// A key `"<code> - <company>"` is also registered under `<company>`.
    pub fn from_table(table: &Table) -> Self {
        let mut spec_book = Self::new();
        for (n_row, _) in table.iter_rows().filter(|(n_row, _)| *n_row >= 2) {
            let c_key = table.cell_at(n_row, 1).value.to_text();
            let c_target = table.cell_at(n_row, 2).value.to_text();
            spec_book.insert(&c_key, &c_target);
        }
        log::debug!("Loaded {} contact keys from {:?}", spec_book.len(), table.sheet_name());
        spec_book
    }

    /// Register `target` under `key` (and its company part). Blank input is ignored.
    pub fn insert(&mut self, key: &str, target: &str) {
        let (c_key, c_target) = (key.trim(), target.trim());
        if c_key.is_empty() || c_target.is_empty() {
            return;
        }
        self.dict_targets
            .insert(c_key.to_string(), c_target.to_string());
        if let Some(c_company) = derive_company_part(c_key)
            && !c_company.is_empty()
        {
            self.dict_targets
                .insert(c_company.to_string(), c_target.to_string());
        }
    }

    /// Exact key, then company part after `" - "`, then the cleaned name.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        let c_key = key.trim();
        if let Some(c_target) = self.dict_targets.get(c_key) {
            return Some(c_target.as_str());
        }
        if let Some(c_company) = derive_company_part(c_key)
            && let Some(c_target) = self.dict_targets.get(c_company)
        {
            return Some(c_target.as_str());
        }
        let c_target = self
            .dict_targets
            .get(&derive_partition_name(c_key))
            .map(String::as_str);
        if c_target.is_none() {
            log::debug!("No contact for key {c_key:?}");
        }
        c_target
    }

    pub fn len(&self) -> usize {
        self.dict_targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dict_targets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetsplit_io_xlsx::{EnumCellValue, SpecCell, TableBuilder};

    fn text(val: &str) -> SpecCell {
        SpecCell::new(EnumCellValue::String(val.to_string()))
    }

    fn mapping_table(l_rows: &[(&str, &str)]) -> Table {
        let mut builder = TableBuilder::new("Mapping");
        builder.set_cell(1, 1, text("Supplier")).set_cell(1, 2, text("Target"));
        for (n_idx, (c_key, c_target)) in l_rows.iter().enumerate() {
            builder
                .set_cell(n_idx + 2, 1, text(c_key))
                .set_cell(n_idx + 2, 2, text(c_target));
        }
        builder.build()
    }

    #[test]
    fn test_from_table_skips_header_and_blanks() {
        let spec_book = SpecContactBook::from_table(&mapping_table(&[
            ("  ACME  ", " group-acme "),
            ("", "orphan"),
            ("NoTarget", "   "),
        ]));
        assert_eq!(spec_book.lookup("ACME"), Some("group-acme"));
        assert_eq!(spec_book.lookup("Supplier"), None);
        assert_eq!(spec_book.lookup("NoTarget"), None);
        assert_eq!(spec_book.len(), 1);
    }

    #[test]
    fn test_lookup_strategies_in_order() {
        let spec_book = SpecContactBook::from_table(&mapping_table(&[
            ("0000000008 - PT. INDOCORE PERKASA", "wa-indocore"),
            ("PT. MAJU", "wa-maju"),
            ("ACME SUPPLIES", "wa-acme"),
        ]));

        assert_eq!(
            spec_book.lookup("0000000008 - PT. INDOCORE PERKASA"),
            Some("wa-indocore")
        );
        assert_eq!(spec_book.lookup("PT. INDOCORE PERKASA"), Some("wa-indocore"));
        assert_eq!(spec_book.lookup("0000000099 - PT. MAJU"), Some("wa-maju"));
        assert_eq!(spec_book.lookup("ACME SUPPLIES LTD"), Some("wa-acme"));
        assert_eq!(spec_book.lookup("Unknown Co"), None);
    }
}
