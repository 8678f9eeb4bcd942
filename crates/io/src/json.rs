// JSON export of the QA status record

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use insights_pipeline::QaStatus;

use crate::WriteError;

/// Pretty-printed status object with a trailing newline.
pub fn export_status(status: &QaStatus, path: &Path) -> Result<(), WriteError> {
    let file = File::create(path).map_err(|e| WriteError::io(path, e))?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, status).map_err(|e| WriteError::Json {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    writeln!(writer).map_err(|e| WriteError::io(path, e))?;
    writer.flush().map_err(|e| WriteError::io(path, e))?;

    Ok(())
}
