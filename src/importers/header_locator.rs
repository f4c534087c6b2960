//! Finds the row holding column labels in a sheet whose top rows may carry
//! titles, logos or notes.

use tracing::debug;

use crate::error::PipelineError;
use crate::sheet::{CellValue, RawSheet};
use crate::utils::normalize_text;

/// First row within `scan_rows` containing any keyword.
///
/// Both cell text and keywords are normalized before the substring test.
pub fn locate_header(
    sheet: &RawSheet,
    keywords: &[String],
    scan_rows: usize,
) -> Result<usize, PipelineError> {
    locate_header_validated(sheet, keywords, scan_rows, 1)
}

/// Like [`locate_header`], but a matching row with fewer than `min_columns`
/// filled cells is treated as decoration and skipped.
pub fn locate_header_validated(
    sheet: &RawSheet,
    keywords: &[String],
    scan_rows: usize,
    min_columns: usize,
) -> Result<usize, PipelineError> {
    let needles: Vec<String> = keywords
        .iter()
        .map(|k| normalize_text(k))
        .filter(|k| !k.is_empty())
        .collect();

    let limit = scan_rows.min(sheet.len());
    for idx in 0..limit {
        let Some(row) = sheet.row(idx) else { continue };

        let hit = row.iter().any(|cell| {
            let text = normalize_text(&cell.as_text());
            !text.is_empty() && needles.iter().any(|n| text.contains(n.as_str()))
        });
        if !hit {
            continue;
        }

        let filled = row.iter().filter(|c| !CellValue::is_empty(c)).count();
        if filled < min_columns {
            debug!(
                "Row {} of '{}' matches a keyword but has only {} filled cells, skipping",
                idx + 1,
                sheet.name,
                filled
            );
            continue;
        }

        debug!("Header row of '{}' located at row {}", sheet.name, idx + 1);
        return Ok(idx);
    }

    Err(PipelineError::HeaderNotFound {
        sheet: sheet.name.clone(),
        keywords: keywords.to_vec(),
    })
}
