//! Classification file reader
//!
//! Layout is positional: the first row is a header and is skipped, then
//! column 0 holds the tracking code, column 1 the vehicle id and column 2 the
//! visit-order label. Only the first worksheet of a workbook is read. Any
//! payload that is not a recognizable workbook is read as CSV.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;
use wlms_common::normalize_tracking_code;

use crate::error::{ApiError, ApiResult};

const TRACKING_CODE_COLUMN: usize = 0;
const VEHICLE_ID_COLUMN: usize = 1;
const VISIT_LABEL_COLUMN: usize = 2;

/// One data row with every cell optional, exactly as read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawClassificationRow {
    /// 1-based row number in the source file (header is row 1)
    pub line: usize,
    pub tracking_code: Option<String>,
    pub vehicle_id: Option<String>,
    pub visit_label: Option<String>,
}

/// A row whose required cells are present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidClassificationRow {
    pub line: usize,
    /// Normalized tracking code
    pub tracking_code: String,
    pub vehicle_id: String,
    pub visit_label: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowRejection {
    MissingTrackingCode,
    MissingVehicleId,
}

impl RawClassificationRow {
    pub fn validate(self) -> Result<ValidClassificationRow, RowRejection> {
        let tracking_code = self
            .tracking_code
            .as_deref()
            .map(normalize_tracking_code)
            .filter(|c| !c.is_empty())
            .ok_or(RowRejection::MissingTrackingCode)?;
        let vehicle_id = self.vehicle_id.ok_or(RowRejection::MissingVehicleId)?;

        Ok(ValidClassificationRow {
            line: self.line,
            tracking_code,
            vehicle_id,
            visit_label: self.visit_label,
        })
    }

    fn is_blank(&self) -> bool {
        self.tracking_code.is_none() && self.vehicle_id.is_none() && self.visit_label.is_none()
    }
}

/// Read every data row of an uploaded classification file
///
/// Fully blank rows are dropped here; rows with only some cells filled are
/// kept so the caller can count them as invalid.
pub fn read_classification_file(bytes: &[u8]) -> ApiResult<Vec<RawClassificationRow>> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(ApiError::InvalidInput("Uploaded file is empty".to_string()));
    }

    let rows = if is_workbook(bytes) {
        read_workbook(bytes)?
    } else {
        read_csv(bytes)?
    };

    let rows: Vec<RawClassificationRow> = rows.into_iter().filter(|r| !r.is_blank()).collect();
    if rows.is_empty() {
        return Err(ApiError::InvalidInput(
            "Uploaded file has no data rows after the header".to_string(),
        ));
    }

    Ok(rows)
}

/// Zip container (xlsx, xlsb, ods) or OLE compound document (xls)
fn is_workbook(bytes: &[u8]) -> bool {
    bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0])
}

fn read_workbook(bytes: &[u8]) -> ApiResult<Vec<RawClassificationRow>> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| ApiError::InvalidInput(format!("Failed to open workbook: {}", e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ApiError::InvalidInput("Workbook contains no sheets".to_string()))?
        .map_err(|e| ApiError::InvalidInput(format!("Failed to read first sheet: {}", e)))?;

    // Range coordinates are absolute, but the range itself starts at the
    // first non-empty cell; read by absolute position so column offsets hold.
    let Some(end) = range.end() else {
        return Ok(Vec::new());
    };

    let cell = |row: u32, col: usize| range.get_value((row, col as u32)).and_then(cell_text);

    Ok((1..=end.0)
        .map(|row| RawClassificationRow {
            line: row as usize + 1,
            tracking_code: cell(row, TRACKING_CODE_COLUMN),
            vehicle_id: cell(row, VEHICLE_ID_COLUMN),
            visit_label: cell(row, VISIT_LABEL_COLUMN),
        })
        .collect())
}

fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty | Data::Error(_) => return None,
        Data::String(s) => s.clone(),
        // Codes typed as numbers come back as floats; "1042.0" must read "1042"
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Int(i) => i.to_string(),
        other => other.to_string(),
    };
    non_blank(&text)
}

fn read_csv(bytes: &[u8]) -> ApiResult<Vec<RawClassificationRow>> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record =
            record.map_err(|e| ApiError::InvalidInput(format!("Malformed CSV: {}", e)))?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(index + 2);

        rows.push(RawClassificationRow {
            line,
            tracking_code: record.get(TRACKING_CODE_COLUMN).and_then(non_blank),
            vehicle_id: record.get(VEHICLE_ID_COLUMN).and_then(non_blank),
            visit_label: record.get(VISIT_LABEL_COLUMN).and_then(non_blank),
        });
    }

    Ok(rows)
}

fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_skips_header_and_reads_fixed_columns() {
        let csv = b"codigo,vehiculo,orden\nabc1,V1,INICIO\nABC2,V1,2\n";
        let rows = read_classification_file(csv).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].tracking_code.as_deref(), Some("abc1"));
        assert_eq!(rows[0].vehicle_id.as_deref(), Some("V1"));
        assert_eq!(rows[0].visit_label.as_deref(), Some("INICIO"));
        assert_eq!(rows[0].line, 2);
    }

    #[test]
    fn test_csv_short_rows_leave_cells_empty() {
        let csv = b"h1,h2,h3\nabc1\n,V2,3\n";
        let rows = read_classification_file(csv).unwrap();

        assert_eq!(rows[0].vehicle_id, None);
        assert_eq!(rows[1].tracking_code, None);
        assert_eq!(rows[1].vehicle_id.as_deref(), Some("V2"));
    }

    #[test]
    fn test_blank_rows_are_dropped() {
        let csv = b"h1,h2,h3\n , , \nabc1,V1,1\n";
        let rows = read_classification_file(csv).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_empty_upload_is_invalid_input() {
        assert!(matches!(read_classification_file(b""), Err(ApiError::InvalidInput(_))));
        assert!(matches!(read_classification_file(b"  \n"), Err(ApiError::InvalidInput(_))));
    }

    #[test]
    fn test_header_only_is_invalid_input() {
        let result = read_classification_file(b"codigo,vehiculo,orden\n");
        assert!(matches!(result, Err(ApiError::InvalidInput(_))));
    }

    #[test]
    fn test_validate_normalizes_code() {
        let row = RawClassificationRow {
            line: 2,
            tracking_code: Some("abc1 ".to_string()),
            vehicle_id: Some("V1".to_string()),
            visit_label: None,
        };
        assert_eq!(row.validate().unwrap().tracking_code, "ABC1");
    }

    #[test]
    fn test_validate_rejects_missing_required_cells() {
        let missing_vehicle = RawClassificationRow {
            line: 2,
            tracking_code: Some("ABC1".to_string()),
            ..Default::default()
        };
        assert_eq!(missing_vehicle.validate(), Err(RowRejection::MissingVehicleId));

        let missing_code = RawClassificationRow {
            line: 3,
            vehicle_id: Some("V1".to_string()),
            ..Default::default()
        };
        assert_eq!(missing_code.validate(), Err(RowRejection::MissingTrackingCode));
    }

    #[test]
    fn test_integral_float_cells_render_without_fraction() {
        assert_eq!(cell_text(&Data::Float(1042.0)).as_deref(), Some("1042"));
        assert_eq!(cell_text(&Data::Float(2.5)).as_deref(), Some("2.5"));
        assert_eq!(cell_text(&Data::Empty), None);
        assert_eq!(cell_text(&Data::String("  ".to_string())), None);
    }
}
