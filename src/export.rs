// 📥 Export - full inventory snapshot as a spreadsheet
// One sheet "Inventaire", fixed columns, one header row, one row per record.

use crate::error::ExportError;
use crate::record::{InventoryRecord, HEADERS};
use rust_xlsxwriter::Workbook;
use serde::{Deserialize, Serialize};

pub const SHEET_NAME: &str = "Inventaire";
pub const EXPORT_FILE_NAME: &str = "inventaire_global.xlsx";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const CSV_MIME: &str = "text/csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn mime(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => XLSX_MIME,
            ExportFormat::Csv => CSV_MIME,
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => EXPORT_FILE_NAME,
            ExportFormat::Csv => "inventaire_global.csv",
        }
    }

    pub fn encode(&self, records: &[InventoryRecord]) -> Result<Vec<u8>, ExportError> {
        match self {
            ExportFormat::Xlsx => to_xlsx(records),
            ExportFormat::Csv => to_csv(records),
        }
    }
}

/// Encode records as an XLSX workbook
pub fn to_xlsx(records: &[InventoryRecord]) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, header) in HEADERS.iter().enumerate() {
        sheet.write_string(0, col as u16, *header)?;
    }

    for (i, record) in records.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, record.inventoriste.as_str())?;
        sheet.write_string(row, 1, record.reference.as_str())?;
        sheet.write_string(row, 2, record.description.as_str())?;
        sheet.write_number(row, 3, record.quantity)?;
    }

    Ok(workbook.save_to_buffer()?)
}

/// Encode records as CSV with the same header row
pub fn to_csv(records: &[InventoryRecord]) -> Result<Vec<u8>, ExportError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(HEADERS)?;
    for record in records {
        wtr.write_record(record.to_row())?;
    }
    wtr.into_inner()
        .map_err(|e| ExportError::Buffer(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
    use std::io::Cursor;

    fn sample() -> Vec<InventoryRecord> {
        vec![
            InventoryRecord::new("Bmehaini", "Ref001", "Produit A", 5).unwrap(),
            InventoryRecord::new("Bmehaini", "Ref003", "Produit C", 10).unwrap(),
        ]
    }

    #[test]
    fn test_csv_layout() {
        let bytes = to_csv(&sample()).unwrap();
        let mut rdr = csv::Reader::from_reader(bytes.as_slice());

        let headers: Vec<String> = rdr.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, HEADERS);

        let rows: Vec<Vec<String>> = rdr
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], ["Bmehaini", "Ref001", "Produit A", "5"]);
        assert_eq!(rows[1], ["Bmehaini", "Ref003", "Produit C", "10"]);
    }

    #[test]
    fn test_csv_deserializes_back_into_records() {
        let bytes = to_csv(&sample()).unwrap();
        let mut rdr = csv::Reader::from_reader(bytes.as_slice());
        let records: Vec<InventoryRecord> = rdr.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(records, sample());
    }

    #[test]
    fn test_xlsx_layout() {
        let bytes = to_xlsx(&sample()).unwrap();
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        assert_eq!(workbook.sheet_names(), [SHEET_NAME]);

        let range = workbook.worksheet_range(SHEET_NAME).unwrap();
        let rows: Vec<Vec<Data>> = range.rows().map(|r| r.to_vec()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], HEADERS.map(|h| Data::String(h.to_string())));
        assert_eq!(
            rows[1],
            [
                Data::String("Bmehaini".into()),
                Data::String("Ref001".into()),
                Data::String("Produit A".into()),
                Data::Float(5.0),
            ]
        );
        assert_eq!(rows[2][1], Data::String("Ref003".into()));
        assert_eq!(rows[2][3], Data::Float(10.0));
    }

    #[test]
    fn test_format_metadata() {
        assert_eq!(ExportFormat::default(), ExportFormat::Xlsx);
        assert_eq!(ExportFormat::Xlsx.file_name(), "inventaire_global.xlsx");
        assert!(ExportFormat::Xlsx.mime().ends_with("spreadsheetml.sheet"));
        assert_eq!(ExportFormat::Csv.mime(), "text/csv");
    }
}
