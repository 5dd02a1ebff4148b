// 🌐 Google Sheets client over blocking HTTP
//
// Opens the spreadsheet by name through the Drive files search, then talks to
// the Sheets v4 values API. The bearer token comes from outside (service
// credential with spreadsheet + drive scope); issuing it is not our job.

use super::remote::SheetClient;
use crate::error::StoreError;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};

const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const SHEETS_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

// RAW: cells are stored as typed strings. USER_ENTERED would turn "00123"
// into 123 and evaluate a leading "=" as a formula.
const APPEND_PARAMS: [(&str, &str); 2] = [("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")];

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

pub struct HttpSheetClient {
    http: Client,
    token: String,
    spreadsheet_id: String,
    worksheet: String,
}

fn transport(err: reqwest::Error) -> StoreError {
    StoreError::remote(err.to_string())
}

fn cell_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn append_body(cells: &[String]) -> Value {
    json!({ "values": [cells] })
}

impl HttpSheetClient {
    /// Resolve `spreadsheet` by name and bind to its `worksheet` tab.
    pub fn open_by_name(token: String, spreadsheet: &str, worksheet: &str) -> Result<Self, StoreError> {
        let http = Client::new();
        let query = format!(
            "name = '{}' and mimeType = 'application/vnd.google-apps.spreadsheet' and trashed = false",
            spreadsheet.replace('\'', "\\'")
        );

        let list: DriveFileList = http
            .get(DRIVE_FILES_URL)
            .bearer_auth(&token)
            .query(&[("q", query.as_str()), ("fields", "files(id)")])
            .send()
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?
            .json()
            .map_err(transport)?;

        let file = list
            .files
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::remote(format!("spreadsheet {:?} not found", spreadsheet)))?;

        tracing::info!(spreadsheet, id = %file.id, "opened remote spreadsheet");

        Ok(Self {
            http,
            token,
            spreadsheet_id: file.id,
            worksheet: worksheet.to_string(),
        })
    }

    fn values_url(&self, suffix: &str) -> String {
        format!(
            "{}/{}/values/{}{}",
            SHEETS_URL,
            self.spreadsheet_id,
            urlencoding::encode(&self.worksheet),
            suffix
        )
    }
}

impl SheetClient for HttpSheetClient {
    fn read_rows(&self) -> Result<Vec<Vec<String>>, StoreError> {
        let range: ValueRange = self
            .http
            .get(self.values_url(""))
            .bearer_auth(&self.token)
            .send()
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?
            .json()
            .map_err(transport)?;

        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    fn append_row(&self, cells: &[String]) -> Result<(), StoreError> {
        self.http
            .post(self.values_url(":append"))
            .bearer_auth(&self.token)
            .query(&APPEND_PARAMS)
            .json(&append_body(cells))
            .send()
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_to_string() {
        assert_eq!(cell_to_string(json!("Ref001")), "Ref001");
        assert_eq!(cell_to_string(json!(12)), "12");
        assert_eq!(cell_to_string(Value::Null), "");
    }

    #[test]
    fn test_append_keeps_cells_literal() {
        assert!(APPEND_PARAMS.contains(&("valueInputOption", "RAW")));

        let cells = ["Bmehaini", "00123", "=Produit", "0"].map(String::from);
        assert_eq!(
            append_body(&cells),
            json!({ "values": [["Bmehaini", "00123", "=Produit", "0"]] })
        );
    }

    #[test]
    fn test_value_range_without_values() {
        let range: ValueRange = serde_json::from_str(r#"{"range":"Inventaire!A1:Z1000"}"#).unwrap();
        assert!(range.values.is_empty());
    }
}
