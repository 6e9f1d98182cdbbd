//! Stateless helpers shared by the decoder, the serializer and callers.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use crate::conf::{N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, TUP_EXCEL_ILLEGAL};
use crate::spec::SpecMergedRegion;

////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().trim_matches('\'').to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

/// Create suffixed sheet name (`base__2`, `base__3`, ...), respecting length cap.
pub fn create_sheet_identifier(base_name: &str, part_idx: usize) -> String {
    let c_sheet_name_suffix = format!("__{part_idx}");
    let n_len_base_name_max = N_LEN_EXCEL_SHEET_NAME_MAX.saturating_sub(c_sheet_name_suffix.len());

    let c_sheet_name_base: String = base_name
        .chars()
        .take(usize::max(1, n_len_base_name_max))
        .collect();

    format!("{c_sheet_name_base}{c_sheet_name_suffix}")
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellReferences

/// 1-based column index to letters (`1 -> A`, `27 -> AA`).
pub fn convert_col_index_to_letters(col: usize) -> String {
    let mut n_rest = col;
    let mut l_chars = Vec::new();
    while n_rest > 0 {
        let n_rem = (n_rest - 1) % 26;
        l_chars.push((b'A' + n_rem as u8) as char);
        n_rest = (n_rest - 1) / 26;
    }
    l_chars.iter().rev().collect()
}

/// Column letters to 1-based index (`A -> 1`, `AO -> 41`).
pub fn convert_letters_to_col_index(letters: &str) -> Option<usize> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut n_col = 0usize;
    for chr in letters.chars() {
        if !chr.is_ascii_alphabetic() {
            return None;
        }
        n_col = n_col * 26 + (chr.to_ascii_uppercase() as u8 - b'A' + 1) as usize;
    }
    (n_col <= N_NCOLS_EXCEL_MAX).then_some(n_col)
}

/// Parse an A1 reference (`$` anchors allowed) into 1-based `(row, col)`.
pub fn parse_cell_reference(reference: &str) -> Result<(usize, usize), String> {
    let c_ref = reference.trim().replace('$', "");
    let n_split = c_ref
        .find(|chr: char| chr.is_ascii_digit())
        .ok_or_else(|| format!("Invalid cell reference: {reference:?}"))?;
    let (c_letters, c_digits) = c_ref.split_at(n_split);
    let n_col = convert_letters_to_col_index(c_letters)
        .ok_or_else(|| format!("Invalid column in cell reference: {reference:?}"))?;
    let n_row = c_digits
        .parse::<usize>()
        .ok()
        .filter(|row| *row >= 1)
        .ok_or_else(|| format!("Invalid row in cell reference: {reference:?}"))?;
    Ok((n_row, n_col))
}

/// Format 1-based `(row, col)` as A1 text.
pub fn format_cell_reference(row: usize, col: usize) -> String {
    format!("{}{}", convert_col_index_to_letters(col), row)
}

/// Parse `A1:C3` (or a single `A1`) into a merged region.
pub fn parse_range_reference(reference: &str) -> Result<SpecMergedRegion, String> {
    match reference.split_once(':') {
        Some((c_start, c_end)) => {
            let (n_row_start, n_col_start) = parse_cell_reference(c_start)?;
            let (n_row_end, n_col_end) = parse_cell_reference(c_end)?;
            Ok(SpecMergedRegion::new(
                n_row_start,
                n_col_start,
                n_row_end,
                n_col_end,
            ))
        }
        None => {
            let (n_row, n_col) = parse_cell_reference(reference)?;
            Ok(SpecMergedRegion::new(n_row, n_col, n_row, n_col))
        }
    }
}

/// Convert sorted indices to contiguous inclusive ranges.
pub fn derive_contiguous_ranges(sorted_indices: &[usize]) -> Vec<(usize, usize)> {
    if sorted_indices.is_empty() {
        return vec![];
    }

    let mut l_contiguous_ranges = Vec::new();
    let mut n_idx_start = sorted_indices[0];
    let mut n_idx_end = sorted_indices[0];

    for idx in &sorted_indices[1..] {
        if *idx == n_idx_end + 1 {
            n_idx_end = *idx;
        } else {
            l_contiguous_ranges.push((n_idx_start, n_idx_end));
            n_idx_start = *idx;
            n_idx_end = *idx;
        }
    }

    l_contiguous_ranges.push((n_idx_start, n_idx_end));
    l_contiguous_ranges
}

/// Render 1-based column indices as letter ranges, e.g. `B:C, E`.
pub fn format_column_ranges(sorted_indices: &[usize]) -> String {
    derive_contiguous_ranges(sorted_indices)
        .into_iter()
        .map(|(n_start, n_end)| {
            if n_start == n_end {
                convert_col_index_to_letters(n_start)
            } else {
                format!(
                    "{}:{}",
                    convert_col_index_to_letters(n_start),
                    convert_col_index_to_letters(n_end)
                )
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DateSerials

fn derive_serial_epoch(days_after_1899_12_30: i64) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1899, 12, 30)?
        .checked_add_signed(TimeDelta::try_days(days_after_1899_12_30)?)?
        .and_hms_opt(0, 0, 0)
}

/// Excel 1900-system serial to a naive datetime (second precision).
///
/// Serials below 61 account for the phantom 1900-02-29.
pub fn convert_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let n_seconds_total = (serial * 86_400.0).round() as i64;
    let n_days = n_seconds_total.div_euclid(86_400);
    let n_seconds = n_seconds_total.rem_euclid(86_400);

    let dt_base = match n_days {
        n if n < 60 => derive_serial_epoch(n + 1)?,
        60 => derive_serial_epoch(60)?,
        n => derive_serial_epoch(n)?,
    };
    dt_base.checked_add_signed(TimeDelta::try_seconds(n_seconds)?)
}

/// Naive datetime to an Excel 1900-system serial.
pub fn convert_datetime_to_serial(dt: NaiveDateTime) -> f64 {
    let dt_epoch = NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or_default();
    let n_seconds = (dt - dt_epoch).num_seconds() as f64;
    let n_serial = n_seconds / 86_400.0;
    if n_serial < 61.0 {
        n_serial - 1.0
    } else {
        n_serial
    }
}

/// `true` when a number format code renders dates or times.
pub fn is_date_format_code(format_code: &str) -> bool {
    let mut if_in_quotes = false;
    let mut if_in_brackets = false;
    let mut c_bracket = String::new();
    let mut iter_chars = format_code.chars();

    while let Some(chr) = iter_chars.next() {
        if if_in_quotes {
            if chr == '"' {
                if_in_quotes = false;
            }
            continue;
        }
        if if_in_brackets {
            if chr == ']' {
                if_in_brackets = false;
                let c_token = c_bracket.to_ascii_lowercase();
                // Elapsed-time tokens like [h] or [mm] are the only date-ish brackets.
                if !c_token.is_empty() && c_token.chars().all(|c| matches!(c, 'h' | 'm' | 's')) {
                    return true;
                }
                c_bracket.clear();
            } else {
                c_bracket.push(chr);
            }
            continue;
        }
        match chr {
            '"' => if_in_quotes = true,
            '[' => if_in_brackets = true,
            '\\' | '_' | '*' => {
                iter_chars.next();
            }
            ';' => break,
            'y' | 'Y' | 'm' | 'M' | 'd' | 'D' | 'h' | 'H' | 's' | 'S' => return true,
            _ => {}
        }
    }
    false
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WidthEstimation

/// Convert a width as stored in the sheet XML back to the character width
/// `set_column_width` expects (it re-adds 5px padding at 7px per digit).
pub fn convert_stored_width_to_character_width(n_width: f64) -> f64 {
    const N_PX_PER_DIGIT: f64 = 7.0;
    const N_PX_PADDING: f64 = 5.0;
    if n_width <= 0.0 {
        return 0.0;
    }
    let n_px = n_width * N_PX_PER_DIGIT;
    if n_px >= N_PX_PER_DIGIT + N_PX_PADDING {
        (n_px - N_PX_PADDING) / N_PX_PER_DIGIT
    } else {
        n_px / (N_PX_PER_DIGIT + N_PX_PADDING)
    }
}

/// Inverse of [`convert_stored_width_to_character_width`].
pub fn convert_character_width_to_stored_width(n_width_char: f64) -> f64 {
    if n_width_char <= 0.0 {
        return 0.0;
    }
    if n_width_char >= 1.0 {
        ((n_width_char * 7.0 + 5.0) / 7.0 * 256.0).trunc() / 256.0
    } else {
        n_width_char * 12.0 / 7.0
    }
}

/// Displayed width units of a string; non-ASCII glyphs count wider.
pub fn estimate_unicode_string_width(s: &str) -> usize {
    let n_ascii = s.chars().filter(|chr| chr.is_ascii()).count();
    let n_non_ascii = s.chars().count().saturating_sub(n_ascii);
    n_ascii + (n_non_ascii as f64 * 1.6).round() as usize
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_sheet_name_replaces_and_truncates() {
        assert_eq!(sanitize_sheet_name("a/b:c", "_"), "a_b_c");
        assert_eq!(sanitize_sheet_name("   ", "_"), "Sheet");
        assert_eq!(sanitize_sheet_name(&"x".repeat(40), "_").len(), 31);
        assert_eq!(create_sheet_identifier(&"y".repeat(40), 2).len(), 31);
    }

    #[test]
    fn test_cell_reference_round_trip_for_wide_columns() {
        assert_eq!(convert_col_index_to_letters(1), "A");
        assert_eq!(convert_col_index_to_letters(26), "Z");
        assert_eq!(convert_col_index_to_letters(27), "AA");
        assert_eq!(convert_letters_to_col_index("AO"), Some(41));
        assert_eq!(parse_cell_reference("$G$3"), Ok((3, 7)));
        assert!(parse_cell_reference("G0").is_err());
        assert!(parse_cell_reference("12").is_err());
        assert_eq!(format_cell_reference(9, 18), "R9");
    }

    #[test]
    fn test_parse_range_reference_single_and_span() {
        assert_eq!(
            parse_range_reference("B2:D4"),
            Ok(SpecMergedRegion::new(2, 2, 4, 4))
        );
        assert_eq!(
            parse_range_reference("C7"),
            Ok(SpecMergedRegion::new(7, 3, 7, 3))
        );
    }

    #[test]
    fn test_format_column_ranges() {
        assert_eq!(format_column_ranges(&[2, 3, 5, 8, 9]), "B:C, E, H:I");
        assert_eq!(format_column_ranges(&[]), "");
    }

    #[test]
    fn test_serial_conversion_handles_leap_bug_boundary() {
        let dt = convert_serial_to_datetime(1.0).unwrap();
        assert_eq!(dt.to_string(), "1900-01-01 00:00:00");
        let dt = convert_serial_to_datetime(61.0).unwrap();
        assert_eq!(dt.to_string(), "1900-03-01 00:00:00");
        let dt = convert_serial_to_datetime(45_306.25).unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 06:00:00");
        assert_eq!(convert_datetime_to_serial(dt), 45_306.25);
        assert!(convert_serial_to_datetime(-1.0).is_none());
    }

    #[test]
    fn test_is_date_format_code() {
        assert!(is_date_format_code("yyyy-mm-dd"));
        assert!(is_date_format_code("[h]:mm:ss"));
        assert!(is_date_format_code("[$-409]d-mmm-yy"));
        assert!(!is_date_format_code("General"));
        assert!(!is_date_format_code("#,##0.00"));
        assert!(!is_date_format_code("[Red]0.00"));
        assert!(!is_date_format_code("\"days\" 0"));
        assert!(!is_date_format_code("_(* #,##0_)"));
    }

    #[test]
    fn test_character_width_round_trips_through_stored_width() {
        for n_char in [1.0, 8.43, 12.0, 50.0] {
            let n_stored = convert_character_width_to_stored_width(n_char);
            assert!(n_stored > n_char);
            let n_back = convert_stored_width_to_character_width(n_stored);
            assert!((n_back - n_char).abs() < 0.01, "{n_char} -> {n_back}");
        }
        assert_eq!(convert_character_width_to_stored_width(0.0), 0.0);
    }
}
