//! Shared fixtures for the integration tests

use std::path::PathBuf;

use health_synth::{GenerationOutcome, Schema, generate_records};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Small schema whose diseases have disjoint symptom sets
pub const FIXTURE_SCHEMA: &str = r#"{
    "genders": ["Nam", "Nữ"],
    "age_range": {"min": 18, "max": 80},
    "regions": {
        "mien_bac": ["Hà Nội", "Hải Phòng"],
        "mien_trung": ["Huế", "Đà Nẵng"],
        "mien_nam": ["TP. Hồ Chí Minh", "Cần Thơ"]
    },
    "disease_categories": {
        "ho_hap": ["cum", "viem_phoi"],
        "tieu_hoa": ["viem_da_day", "tieu_chay"],
        "xuong_khop": ["gout"]
    },
    "symptoms": {
        "cum": ["Sốt", "Ho khan", "Sổ mũi", "Đau họng", "Đau mỏi người"],
        "viem_phoi": ["Ho có đờm", "Khó thở", "Đau ngực"],
        "viem_da_day": ["Đau thượng vị", "Ợ chua", "Buồn nôn (sau ăn)"],
        "tieu_chay": ["Đi ngoài phân lỏng", "Mất nước", "Đau quặn bụng"],
        "gout": ["Đau khớp ngón chân cái", "Sưng khớp", "Nóng đỏ khớp"]
    },
    "risk_factors": {
        "cum": ["Tiếp xúc người bệnh", "Thời tiết lạnh"],
        "viem_phoi": ["Hút thuốc lá", "Người cao tuổi", "Suy giảm miễn dịch"],
        "viem_da_day": ["Căng thẳng", "Ăn uống thất thường"],
        "tieu_chay": ["Thực phẩm không an toàn", "Nước bẩn"],
        "gout": ["Ăn nhiều đạm", "Rượu bia", "Béo phì", "Di truyền"]
    },
    "date_range": {"start": "2023-01-01", "end": "2024-12-31"},
    "weights": {
        "categories": {"ho_hap": 0.4, "tieu_hoa": 0.35, "xuong_khop": 0.25},
        "regions": {"mien_bac": 0.35, "mien_trung": 0.3, "mien_nam": 0.35},
        "region_category_multipliers": {"mien_nam": {"tieu_hoa": 1.5}},
        "season_disease_multipliers": {
            "Đông-Xuân": {"cum": 2.0},
            "Hè-Thu": {"tieu_chay": 1.8}
        }
    }
}"#;

#[must_use]
pub fn fixture_schema() -> Schema {
    Schema::from_json_str(FIXTURE_SCHEMA).expect("fixture schema parses")
}

/// Fixture schema with `edit` applied to its JSON value
#[must_use]
pub fn fixture_schema_with(edit: impl FnOnce(&mut serde_json::Value)) -> Schema {
    let mut value: serde_json::Value =
        serde_json::from_str(FIXTURE_SCHEMA).expect("fixture schema is JSON");
    edit(&mut value);
    serde_json::from_value(value).expect("edited fixture schema parses")
}

/// Generate `count` records from `schema` with a seeded random source
#[must_use]
pub fn generate_seeded(schema: &Schema, count: usize, seed: u64) -> GenerationOutcome {
    let mut rng = StdRng::seed_from_u64(seed);
    generate_records(schema, count, &mut rng)
}

/// Path of the schema shipped with the crate
#[must_use]
pub fn shipped_schema_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/schema.json")
}
