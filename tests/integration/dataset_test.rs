//! Dataset persistence: CSV, Parquet and the distribution report

use chrono::NaiveDate;
use health_synth::dataset::{
    parse_records, read_records, write_distribution_csv, write_records_csv, write_records_parquet,
};
use health_synth::{DiseaseDistribution, Season};
use tempfile::TempDir;

use crate::utils::{fixture_schema, generate_seeded};

#[test]
fn test_csv_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("records.csv");
    let records = generate_seeded(&fixture_schema(), 250, 4).records;

    write_records_csv(&path, &records).unwrap();
    let read_back = read_records(&path).unwrap();
    assert_eq!(read_back, records);
}

#[test]
fn test_parquet_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("records.parquet");
    let records = generate_seeded(&fixture_schema(), 250, 9).records;

    write_records_parquet(&path, &records).unwrap();
    let read_back = read_records(&path).unwrap();
    assert_eq!(read_back, records);
}

#[test]
fn test_reads_python_style_export() {
    let content = "\u{feff}gender,age,location,visit_date,season,disease,symptoms,risk_factors,extra\r\n\
        Nữ,34,Huế,2023-07-15 00:00:00,Hè-Thu,tieu_chay,\"['Mất nước', 'Đau quặn bụng']\",['Nước bẩn'],x\r\n\
        Nam,60,Hà Nội,2024-01-03,,gout,\"[\"\"Sưng khớp\"\"]\",\"['Ăn nhiều đạm', \"\"Rượu bia\"\"]\",y\r\n";
    let records = parse_records(content).unwrap();
    assert_eq!(records.len(), 2);

    assert_eq!(records[0].visit_date, NaiveDate::from_ymd_opt(2023, 7, 15).unwrap());
    assert_eq!(records[0].season, Season::SummerAutumn);
    assert_eq!(records[0].symptoms, vec!["Mất nước", "Đau quặn bụng"]);
    assert_eq!(records[0].risk_factors, vec!["Nước bẩn"]);

    // Missing season is derived from the date
    assert_eq!(records[1].season, Season::WinterSpring);
    assert_eq!(records[1].symptoms, vec!["Sưng khớp"]);
    assert_eq!(records[1].risk_factors, vec!["Ăn nhiều đạm", "Rượu bia"]);
}

#[test]
fn test_malformed_rows_name_their_line() {
    let content = "gender,age,location,visit_date,season,disease,symptoms,risk_factors\n\
        Nam,abc,Huế,2023-01-01,,cum,[],[]\n";
    let err = parse_records(content).unwrap_err();
    assert!(err.to_string().contains("line 2"), "{err}");

    let missing_column = "gender,age,location\nNam,3,Huế\n";
    assert!(parse_records(missing_column).is_err());
}

#[test]
fn test_distribution_report_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("distribution.csv");
    let records = generate_seeded(&fixture_schema(), 400, 13).records;
    let distribution = DiseaseDistribution::from_records(&records);

    write_distribution_csv(&path, &distribution).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    let mut lines = content.lines();
    assert_eq!(lines.next(), Some("disease,count,percentage"));

    let counts: Vec<usize> = lines
        .map(|line| line.split(',').nth(1).unwrap().parse().unwrap())
        .collect();
    assert_eq!(counts.len(), distribution.rows.len());
    assert_eq!(counts.iter().sum::<usize>(), 400);
    assert!(counts.windows(2).all(|w| w[0] >= w[1]));
}
