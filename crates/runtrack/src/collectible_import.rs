//! CSV bulk-import parsing for collectible items.
//!
//! The upload endpoint accepts a CSV file with a header row of
//! `name,uid,latitude,longitude,picture,value`. Rows that fail to parse or
//! carry out-of-range coordinates are collected and reported back to the
//! caller; valid rows are inserted.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{errors::AppError, geodesic};

#[derive(Debug, Clone, Deserialize)]
pub struct CollectibleRow {
    pub name: String,
    pub uid: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub picture: String,
    #[serde(default)]
    pub value: i32,
}

/// A row the import refused, with its 1-based line number.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RejectedRow {
    pub line: u64,
    pub reason: String,
}

/// Outcome of parsing an uploaded CSV file.
#[derive(Debug, Default)]
pub struct ParsedImport {
    pub rows: Vec<CollectibleRow>,
    pub rejected: Vec<RejectedRow>,
}

pub fn parse_collectible_csv(data: &[u8]) -> Result<ParsedImport, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(data);

    let mut parsed = ParsedImport::default();

    for (index, record) in reader.deserialize::<CollectibleRow>().enumerate() {
        // Line 1 is the header.
        let line = index as u64 + 2;
        let row = match record {
            Ok(row) => row,
            Err(e) => {
                parsed.rejected.push(RejectedRow {
                    line,
                    reason: format!("malformed row: {e}"),
                });
                continue;
            }
        };

        if let Err(e) = validate_row(&row) {
            parsed.rejected.push(RejectedRow {
                line,
                reason: e.to_string(),
            });
            continue;
        }

        parsed.rows.push(row);
    }

    Ok(parsed)
}

fn validate_row(row: &CollectibleRow) -> Result<(), AppError> {
    if row.name.is_empty() {
        return Err(AppError::Validation("name must not be empty".to_string()));
    }
    if row.uid.is_empty() {
        return Err(AppError::Validation("uid must not be empty".to_string()));
    }
    geodesic::validate_latitude(row.latitude)?;
    geodesic::validate_longitude(row.longitude)?;
    if row.value < 0 {
        return Err(AppError::Validation("value must not be negative".to_string()));
    }
    Ok(())
}
