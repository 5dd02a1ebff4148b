use inventaire::{
    AuthGate, Catalog, ExportFormat, FormError, FormState, InventoryForm, InventoryRecord,
    MemoryStore, RecordStore, SqliteStore, HEADERS,
};
use calamine::{open_workbook_from_rs, Reader, Xlsx};
use std::io::Cursor;
use std::sync::Arc;

fn open(store: Arc<dyn RecordStore>, identity: &str) -> InventoryForm {
    let mut form = InventoryForm::new(Arc::new(Catalog::default()), store);
    form.sign_in(&AuthGate::default(), identity, "1234").unwrap();
    form
}

fn available_refs(catalog: &Catalog, store: &dyn RecordStore) -> Vec<String> {
    catalog
        .available(&store.load_all().unwrap())
        .into_iter()
        .map(|e| e.reference)
        .collect()
}

#[test]
fn end_to_end_two_references() {
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    let mut form = open(store.clone(), "Bmehaini");

    form.select(&["Ref001", "Ref003"]).unwrap();
    form.set_quantity("Ref001", 5).unwrap();
    form.set_quantity("Ref003", 10).unwrap();
    form.submit().unwrap();

    assert_eq!(
        store.load_all().unwrap(),
        vec![
            InventoryRecord::new("Bmehaini", "Ref001", "Produit A", 5).unwrap(),
            InventoryRecord::new("Bmehaini", "Ref003", "Produit C", 10).unwrap(),
        ]
    );
    assert_eq!(
        available_refs(&Catalog::default(), store.as_ref()),
        ["Ref002", "Ref004", "Ref005", "Ref006"]
    );

    // Export: header + two data rows, fixed column order
    let csv_bytes = form.export(ExportFormat::Csv).unwrap().unwrap();
    let mut rdr = csv::Reader::from_reader(csv_bytes.as_slice());
    let headers: Vec<String> = rdr.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers, HEADERS);
    assert_eq!(rdr.records().count(), 2);

    let xlsx = form.export(ExportFormat::Xlsx).unwrap().unwrap();
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(xlsx)).unwrap();
    let range = workbook.worksheet_range("Inventaire").unwrap();
    let rows: Vec<Vec<String>> = range
        .rows()
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .collect();
    assert_eq!(
        rows,
        [
            HEADERS.map(String::from).to_vec(),
            vec!["Bmehaini".into(), "Ref001".into(), "Produit A".into(), "5".into()],
            vec!["Bmehaini".into(), "Ref003".into(), "Produit C".into(), "10".into()],
        ]
    );
}

#[test]
fn existing_reference_is_not_appended_again() {
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    let mut late = open(store.clone(), "Mguerger");
    late.select(&["Ref001"]).unwrap();

    store
        .append(&[InventoryRecord::new("Clamsalla", "Ref001", "Produit A", 3).unwrap()])
        .unwrap();

    let outcome = late.submit().unwrap();
    assert!(outcome.appended.is_empty());
    assert_eq!(outcome.skipped, ["Ref001"]);
    assert_eq!(store.load_all().unwrap().len(), 1);
}

#[test]
fn zero_quantity_is_a_count() {
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());
    let mut form = open(store.clone(), "Clamsalla");
    form.select(&["Ref002"]).unwrap();
    form.submit().unwrap();

    let records = store.load_all().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].reference, "Ref002");
    assert_eq!(records[0].quantity, 0);
}

#[test]
fn full_catalog_signals_fully_inventoried() {
    let store: Arc<dyn RecordStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
    let mut form = open(store.clone(), "Bmehaini");

    let all: Vec<String> = form.available().iter().map(|e| e.reference.clone()).collect();
    form.select(&all).unwrap();
    assert_eq!(form.submit().unwrap().appended.len(), 6);

    assert_eq!(form.state(), FormState::FullyInventoried);
    assert!(form.is_fully_inventoried());
    assert!(available_refs(&Catalog::default(), store.as_ref()).is_empty());

    // A new session lands straight on the terminal state
    let mut other = InventoryForm::new(Arc::new(Catalog::default()), store);
    let state = other.sign_in(&AuthGate::default(), "Mguerger", "1234").unwrap();
    assert_eq!(state, FormState::FullyInventoried);
    assert!(matches!(other.select(&["Ref001"]), Err(FormError::FullyInventoried)));
}
