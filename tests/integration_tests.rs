use optin_savings::core::loader::load_records_csv;
use optin_savings::core::Pipeline;
use optin_savings::domain::model::SavingsProjection;
use optin_savings::utils::diagnostics::CollectingSink;
use optin_savings::{EtlEngine, EtlError, LocalStorage, OptInPipeline, SavingsPipeline, TomlConfig};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const CUSTOMERS: &str = r#"[
    {"id": 1, "name": "Ann", "email": "ann@example.com", "created_date": "2024-01-05", "opt_in": true},
    {"id": 2, "name": "Bob", "email": "bob@example.com", "created_date": "2024-01-20", "opt_in": false},
    {"id": 3, "name": "Cid", "email": "cid@example.com", "created_date": "2024-02-10T08:00:00", "opt_in": "N"},
    {"id": 4, "name": "Dee", "email": "dee@example.com", "created_date": "not a date", "opt_in": false}
]"#;

const EXPENSES: &str = "date,category,amount,description\n\
2024-01-01,Food,12.50,lunch\n\
2024-01-01,Transport,3.00,bus\n\
2024-01-02,Food,7.50,coffee and snack\n\
2024-01-03,Rent,900,January rent\n\
2024-01-03,Food,abc,broken row\n";

fn write_input(dir: &TempDir, name: &str, content: &str) {
    let path = dir.path().join(name);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn storages(dir: &TempDir) -> (LocalStorage, LocalStorage, String) {
    let output_path = dir.path().join("output").display().to_string();
    (
        LocalStorage::new(dir.path().display().to_string()),
        LocalStorage::new(output_path.clone()),
        output_path,
    )
}

#[tokio::test]
async fn test_optin_end_to_end_writes_fixed_csv() {
    let temp_dir = TempDir::new().unwrap();
    write_input(&temp_dir, "data/customers.json", CUSTOMERS);
    let (input, output, output_path) = storages(&temp_dir);

    let sink = Arc::new(CollectingSink::new());
    let pipeline = OptInPipeline::new(input, output, TomlConfig::default(), sink.clone());
    let report = EtlEngine::new(pipeline).run().await.unwrap();

    assert_eq!(report.pipeline, "opt-in");
    assert_eq!(report.rows_in, 3);
    assert_eq!(report.rows_out, 2);
    assert_eq!(report.skipped_rows, 1);
    assert_eq!(sink.issues()[0].field, "created_date");

    let csv_path = Path::new(&output_path).join("filtered_customers.csv");
    assert_eq!(report.written, vec![csv_path.display().to_string()]);
    let csv = std::fs::read_to_string(csv_path).unwrap();
    assert_eq!(
        csv,
        "id,name,email,created_date,opt_in\n\
         2,Bob,bob@example.com,2024-01-20,false\n\
         3,Cid,cid@example.com,2024-02-10T08:00:00,N\n"
    );

    let (_, output, _) = storages(&temp_dir);
    let read_back = load_records_csv(&output, "filtered_customers.csv").await.unwrap();
    assert_eq!(read_back.len(), 2);
    assert_eq!(read_back.records[1].get("opt_in").unwrap(), "N");
}

#[tokio::test]
async fn test_optin_from_toml_with_json_output() {
    let temp_dir = TempDir::new().unwrap();
    write_input(&temp_dir, "in/people.json", CUSTOMERS);
    let (input, output, output_path) = storages(&temp_dir);

    let config = TomlConfig::from_toml_str(
        r#"
[optin]
input = "in/people.json"
date_range = "2024-01-01..2024-01-31"
output_prefix = "january_no_consent"

[load]
output_formats = ["csv", "json"]
"#,
    )
    .unwrap();

    let pipeline = OptInPipeline::new(input, output, config, Arc::new(CollectingSink::new()));
    let report = EtlEngine::new(pipeline).run().await.unwrap();
    assert_eq!(report.rows_out, 1);
    assert_eq!(report.written.len(), 2);

    let json = std::fs::read_to_string(Path::new(&output_path).join("january_no_consent.json")).unwrap();
    let rows: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["name"], "Bob");
}

#[tokio::test]
async fn test_optin_rerun_overwrites_previous_output() {
    let temp_dir = TempDir::new().unwrap();
    write_input(&temp_dir, "data/customers.json", CUSTOMERS);

    for _ in 0..2 {
        let (input, output, _) = storages(&temp_dir);
        let pipeline = OptInPipeline::new(input, output, TomlConfig::default(), Arc::new(CollectingSink::new()));
        EtlEngine::new(pipeline).run().await.unwrap();
    }

    let entries = std::fs::read_dir(temp_dir.path().join("output")).unwrap().count();
    assert_eq!(entries, 1);
}

#[tokio::test]
async fn test_savings_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    write_input(&temp_dir, "data/expenses.csv", EXPENSES);
    let (input, output, output_path) = storages(&temp_dir);

    let mut config = TomlConfig::default();
    config.savings.reduction_targets.insert("Food".to_string(), 20.0);
    config.savings.reduction_targets.insert("Travel".to_string(), 50.0);

    let sink = Arc::new(CollectingSink::new());
    let pipeline = SavingsPipeline::new(input, output, config, sink.clone());
    let engine = EtlEngine::new_with_monitoring(pipeline, true);
    let report = engine.run().await.unwrap();

    assert_eq!(report.pipeline, "savings");
    assert_eq!(report.rows_in, 4);
    assert_eq!(report.rows_out, 3);
    assert_eq!(report.skipped_rows, 1);
    assert_eq!(sink.issues()[0].line, 6);
    assert_eq!(report.written.len(), 3);

    let totals_path = report
        .written
        .iter()
        .find(|p| p.ends_with("_category_totals.csv"))
        .unwrap();
    assert!(totals_path.starts_with(&output_path));
    assert_eq!(
        std::fs::read_to_string(totals_path).unwrap(),
        "category,total\nFood,20\nRent,900\nTransport,3\n"
    );

    let report_path = report.written.iter().find(|p| p.ends_with("_savings_report.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(report_path).unwrap()).unwrap();
    // 20% of 20 over 3 days, scaled to a year.
    assert_eq!(json["projection"]["annual_savings"], 486.67);
    assert_eq!(json["daily_averages"]["Food"], 10.0);
}

#[tokio::test]
async fn test_savings_without_rows_is_insufficient_data() {
    let temp_dir = TempDir::new().unwrap();
    write_input(&temp_dir, "data/expenses.csv", "date,category,amount,description\n");
    let (input, output, _) = storages(&temp_dir);

    let pipeline = SavingsPipeline::new(input, output, TomlConfig::default(), Arc::new(CollectingSink::new()));
    let engine = EtlEngine::new(pipeline);
    let loaded = engine.pipeline().extract().await.unwrap();
    let result = engine.pipeline().transform(loaded).await.unwrap();

    assert!(result.category_totals.is_empty());
    assert!(matches!(result.projection, SavingsProjection::InsufficientData { .. }));
}

#[tokio::test]
async fn test_missing_input_file_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let (input, output, _) = storages(&temp_dir);

    let pipeline = SavingsPipeline::new(input, output, TomlConfig::default(), Arc::new(CollectingSink::new()));
    let err = EtlEngine::new(pipeline).run().await.unwrap_err();

    assert!(matches!(err, EtlError::NotFound { .. }));
    assert!(err.user_friendly_message().contains("expenses.csv"));
}

#[tokio::test]
async fn test_customers_document_must_be_an_array() {
    let temp_dir = TempDir::new().unwrap();
    write_input(&temp_dir, "data/customers.json", r#"{"customers": []}"#);
    let (input, output, _) = storages(&temp_dir);

    let pipeline = OptInPipeline::new(input, output, TomlConfig::default(), Arc::new(CollectingSink::new()));
    let err = EtlEngine::new(pipeline).run().await.unwrap_err();
    assert!(matches!(err, EtlError::SchemaError { .. }));
}
