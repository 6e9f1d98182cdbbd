//! Split constants and default presets.

/// Columns removed from key-split outputs (1-based).
pub const TUP_COLS_DELETE_DEFAULT: [usize; 11] = [2, 3, 5, 6, 8, 9, 13, 16, 19, 20, 21];
/// Header label expected in the key column.
pub const C_KEY_COLUMN_LABEL_DEFAULT: &str = "Supplier";
/// Key column (1-based, before projection).
pub const N_KEY_COLUMN_INDEX_DEFAULT: usize = 4;
/// Cell holding the report timestamp.
pub const C_DATE_CELL_REF_DEFAULT: &str = "G3";
/// Key-split archive prefix.
pub const C_ARCHIVE_PREFIX_DEFAULT: &str = "IM_Split";

/// Characters of the key inspected by the name-cleaning rule.
pub const N_LEN_KEY_NAME_PREFIX: usize = 13;
/// Separator between a code and a company name in keys.
pub const C_KEY_COMPANY_SEPARATOR: &str = " - ";
/// Name used when cleaning leaves nothing.
pub const C_NAME_UNKNOWN: &str = "UNKNOWN";

/// Voucher cells.
pub const C_VOUCHER_COMPANY_CELL_DEFAULT: &str = "D9";
pub const C_VOUCHER_NUMBER_CELL_DEFAULT: &str = "R9";
pub const C_VOUCHER_EMAIL_CELL_DEFAULT: &str = "D12";
/// Voucher number used when the cell is empty.
pub const C_VOUCHER_NUMBER_MISSING: &str = "NO_PV";
/// Voucher archive prefix, followed by `_%Y%m%d_%H%M%S`.
pub const C_VOUCHER_ARCHIVE_PREFIX_DEFAULT: &str = "pv_split";

/// Share endpoint for prefilled messages.
pub const C_WHATSAPP_SEND_URL: &str = "https://web.whatsapp.com/send";
/// Documents listed in an email subject before eliding.
pub const N_EMAIL_SUBJECT_IDS_MAX: usize = 3;
pub const C_EMAIL_SUBJECT_PREFIX_DEFAULT: &str = "PV Documents - ";
pub const C_EMAIL_SIGNOFF_DEFAULT: &str = "Apotek Alpro Finance Team";

/// Rows scanned for the roster header.
pub const N_ROSTER_HEADER_SCAN_ROWS: usize = 10;
/// Roster columns (1-based): C name, D id, G role, AO outlet.
pub const N_ROSTER_COL_NAME_DEFAULT: usize = 3;
pub const N_ROSTER_COL_ID_DEFAULT: usize = 4;
pub const N_ROSTER_COL_ROLE_DEFAULT: usize = 7;
pub const N_ROSTER_COL_OUTLET_DEFAULT: usize = 41;
/// Markers identifying the roster header row (lowercase substring match).
pub const TUP_ROSTER_NAME_MARKERS: [&str; 2] = ["name", "nama"];
pub const TUP_ROSTER_ID_MARKERS: [&str; 2] = ["employee", "id"];
/// Results sheet header labels.
pub const C_RESULTS_LABEL_NAME_DEFAULT: &str = "Employee Name";
pub const C_RESULTS_LABEL_ROLE_DEFAULT: &str = "Role";
pub const C_RESULTS_LABEL_OUTLET_DEFAULT: &str = "Outlet";
/// Rows inspected by the roster layout check.
pub const N_ROSTER_INSPECT_ROWS_DEFAULT: usize = 100;
