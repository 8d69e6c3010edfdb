//! JSON Export (§4.12, §6): serializes an [`AnalysisResult`] to the
//! canonical camelCase JSON document consumed by the external UI.

use std::io::Write;
use std::path::Path;

use crate::error::CoreError;
use crate::result::AnalysisResult;

/// Serializes `result` to pretty-printed camelCase JSON and writes it to
/// `path`.
pub fn write_json(result: &AnalysisResult, path: &Path) -> Result<(), CoreError> {
    let file = std::fs::File::create(path)
        .map_err(|e| CoreError::config_invalid("export", format!("cannot create {}: {}", path.display(), e)))?;
    let mut writer = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, result)
        .map_err(|e| CoreError::config_invalid("export", format!("cannot serialize result: {e}")))?;
    writer
        .flush()
        .map_err(|e| CoreError::config_invalid("export", format!("cannot flush {}: {}", path.display(), e)))?;
    Ok(())
}

/// Serializes `result` to a camelCase JSON `String`, for callers that want
/// the bytes rather than a file (e.g. tests, or an embedding host).
pub fn to_json_string(result: &AnalysisResult) -> Result<String, CoreError> {
    serde_json::to_string_pretty(result)
        .map_err(|e| CoreError::config_invalid("export", format!("cannot serialize result: {e}")))
}
