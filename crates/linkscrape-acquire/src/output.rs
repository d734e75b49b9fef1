use linkscrape_model::ProfileRecord;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Serialize a record as JSON onto `writer`, followed by a newline.
pub fn write_record<W: Write>(
    record: &ProfileRecord,
    mut writer: W,
    pretty: bool,
) -> io::Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut writer, record)?;
    } else {
        serde_json::to_writer(&mut writer, record)?;
    }
    writer.write_all(b"\n")?;
    writer.flush()
}

/// Write a record to `path`, creating parent directories as needed.
///
/// The file handle is dropped, and therefore closed, before returning on
/// every path.
pub fn write_record_file(record: &ProfileRecord, path: &Path, pretty: bool) -> io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let file = File::create(path)?;
    write_record(record, BufWriter::new(file), pretty)?;
    tracing::info!(path = %path.display(), links = record.links.len(), "Wrote profile record");
    Ok(())
}

/// Save the raw fetched page so extraction can be re-run offline.
pub fn cache_html(path: &Path, html: &str) -> io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, html)?;
    tracing::info!(path = %path.display(), bytes = html.len(), "Cached raw HTML");
    Ok(())
}
