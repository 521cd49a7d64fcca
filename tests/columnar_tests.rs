//! Parquet output read back through the Arrow reader

use std::fs::File;
use std::io::Write;
use std::sync::Arc;

use arrow::array::{Array, Date32Array, Decimal128Array, Int32Array, StringArray};
use arrow::datatypes::DataType as ArrowType;
use arrow::record_batch::RecordBatch;
use file_ingest_pipeline::storage::{FileLocation, MemoryObjectStore, ObjectStore};
use file_ingest_pipeline::{ColumnarSerializer, ColumnarWriter, Config, Frame, ParquetSerializer};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::json;

const TARGET_KEY: &str = "CFM/Everest/Holdings/2020/202002/Holdings20200205233143.csv";
const PARQUET_KEY: &str = "CFM/Everest/Holdings/parquet/year=2020/year_month=202002/year_month_day=20200205/Holdings20200205233143.parquet";

const CONFIG: &str = r#"{
    "schema": [
        {"name": "asofdate", "type": "DATE", "is_calculated": "true"},
        {"name": "Portfolio_Name", "type": "STRING"},
        {"name": "Portfolio_ID", "type": "INT"},
        {"name": "MarketValue", "type": "DECIMAL(18,2)"},
        {"name": "row_index", "type": "INT", "is_calculated": "true"},
        {"name": "correlation_id", "type": "STRING", "is_calculated": "true"},
        {"name": "confidence_level", "type": "DECIMAL(3,2)", "is_calculated": "true"}
    ]
}"#;

fn read_back(bytes: &[u8]) -> RecordBatch {
    let mut file = tempfile::tempfile().unwrap();
    file.write_all(bytes).unwrap();
    let file: File = file;

    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .unwrap()
        .build()
        .unwrap();
    let batches: Vec<RecordBatch> = reader.collect::<Result<_, _>>().unwrap();
    assert_eq!(batches.len(), 1);
    batches.into_iter().next().unwrap()
}

fn publish(csv: &str, config: &Config, error_rows: &[usize]) -> (Arc<MemoryObjectStore>, String) {
    let store = Arc::new(MemoryObjectStore::with_buckets(["curated"]));
    store.put_object("curated", TARGET_KEY, csv.as_bytes()).unwrap();

    let writer = ColumnarWriter::new(store.clone(), Arc::new(ParquetSerializer::default()));
    let key = writer
        .create("curated", TARGET_KEY, config, error_rows, "run-42")
        .unwrap();
    (store, key)
}

#[test]
fn test_published_file_has_typed_columns() {
    let config = Config::from_json_str(CONFIG).unwrap();
    let csv = "Portfolio_ID,MarketValue,Portfolio_Name\n1,100.50,Alpha\n2,,Beta\n3,300.25,Gamma\n";
    let (store, key) = publish(csv, &config, &[1]);
    assert_eq!(key, PARQUET_KEY);

    let bytes = store
        .get_object(&FileLocation::new("curated", PARQUET_KEY))
        .unwrap();
    let batch = read_back(&bytes);
    assert_eq!(batch.num_rows(), 3);

    let schema = batch.schema();
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    assert_eq!(
        names,
        vec![
            "asofdate",
            "Portfolio_Name",
            "Portfolio_ID",
            "MarketValue",
            "row_index",
            "correlation_id",
            "confidence_level"
        ]
    );
    assert_eq!(schema.field(0).data_type(), &ArrowType::Date32);
    assert_eq!(schema.field(2).data_type(), &ArrowType::Int32);
    assert_eq!(schema.field(3).data_type(), &ArrowType::Decimal128(18, 2));
    assert_eq!(schema.field(6).data_type(), &ArrowType::Decimal128(3, 2));

    let asofdate = batch.column(0).as_any().downcast_ref::<Date32Array>().unwrap();
    assert_eq!(
        asofdate.value_as_date(0),
        chrono::NaiveDate::from_ymd_opt(2020, 2, 5)
    );

    let names = batch.column(1).as_any().downcast_ref::<StringArray>().unwrap();
    assert_eq!(names.value(2), "Gamma");

    let market_value = batch.column(3).as_any().downcast_ref::<Decimal128Array>().unwrap();
    assert_eq!(market_value.value(0), 10050);
    assert!(market_value.is_null(1));
    assert_eq!(market_value.value(2), 30025);

    let row_index = batch.column(4).as_any().downcast_ref::<Int32Array>().unwrap();
    assert_eq!(row_index.values().to_vec(), vec![0, 1, 2]);

    let correlation = batch.column(5).as_any().downcast_ref::<StringArray>().unwrap();
    assert_eq!(correlation.value(0), "run-42");

    let confidence = batch.column(6).as_any().downcast_ref::<Decimal128Array>().unwrap();
    assert_eq!(confidence.value(0), 100);
    assert_eq!(confidence.value(1), 0);
    assert_eq!(confidence.value(2), 100);
}

#[test]
fn test_disabled_error_reporting_drops_context_columns() {
    let config = Config::from_json_str(
        &CONFIG.replacen('{', r#"{"error_reporting_enabled": false,"#, 1),
    )
    .unwrap();
    let csv = "Portfolio_Name,Portfolio_ID,MarketValue\nAlpha,1,1.00\n";
    let (store, key) = publish(csv, &config, &[]);

    let bytes = store.get_object(&FileLocation::new("curated", &key)).unwrap();
    let batch = read_back(&bytes);
    let schema = batch.schema();
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    assert_eq!(
        names,
        vec!["asofdate", "Portfolio_Name", "Portfolio_ID", "MarketValue"]
    );
}

#[test]
fn test_unparsable_value_fails_the_write() {
    let config = Config::from_json_str(CONFIG).unwrap();
    let store = Arc::new(MemoryObjectStore::with_buckets(["curated"]));
    store
        .put_object(
            "curated",
            TARGET_KEY,
            b"Portfolio_Name,Portfolio_ID,MarketValue\nAlpha,one,1.00\n",
        )
        .unwrap();

    let writer = ColumnarWriter::new(store.clone(), Arc::new(ParquetSerializer::default()));
    assert!(writer.create("curated", TARGET_KEY, &config, &[], "run-42").is_err());
    assert!(!store.keys("curated").contains(&PARQUET_KEY.to_string()));
}

#[test]
fn test_report_types_are_inferred() {
    let summary = Frame::from_rows(
        ["asofdate", "rule", "status", "score"],
        vec![
            vec![json!("2020-02-05"), json!("blank"), json!("P"), json!(1.0)],
            vec![json!("2020-02-05"), json!("lookup"), json!("E"), json!(null)],
        ],
    )
    .unwrap();

    let bytes = ParquetSerializer::default().write(&summary, None).unwrap();
    let batch = read_back(&bytes);
    assert_eq!(batch.num_rows(), 2);
    assert_eq!(batch.schema().field(1).data_type(), &ArrowType::Utf8);
    assert_eq!(batch.schema().field(3).data_type(), &ArrowType::Float64);
    assert!(batch.column(3).is_null(1));
}
