//! In-memory ZIP assembly.

use std::collections::HashSet;
use std::io::{Cursor, Write};

use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::spec::ArchiveError;
use crate::util::validate_file_name;

/// Pack `(file_name, bytes)` entries into one deflate-compressed ZIP.
///
/// Entries keep input order. Names must be plain file names and unique.
pub fn build_zip_archive<S, B>(entries: &[(S, B)]) -> Result<Vec<u8>, ArchiveError>
where
    S: AsRef<str>,
    B: AsRef<[u8]>,
{
    let mut zip_writer = ZipWriter::new(Cursor::new(Vec::new()));
    let cfg_file_options =
        SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut set_names: HashSet<&str> = HashSet::with_capacity(entries.len());
    for (c_name, bytes) in entries {
        let c_name = c_name.as_ref();
        validate_file_name(c_name).map_err(|_| ArchiveError::InvalidEntryName(c_name.into()))?;
        if !set_names.insert(c_name) {
            return Err(ArchiveError::DuplicateEntry(c_name.to_string()));
        }
        zip_writer.start_file(c_name, cfg_file_options)?;
        zip_writer.write_all(bytes.as_ref())?;
    }

    let cursor = zip_writer.finish()?;
    log::debug!("Built archive with {} entries", entries.len());
    Ok(cursor.into_inner())
}
