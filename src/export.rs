//! Backup, CSV export, import and report generation.
//!
//! CSV rows are records flattened with dot-joined keys (`heartRate.resting`);
//! arrays are embedded as JSON text, every field is quoted, and the file
//! starts with a UTF-8 BOM so spreadsheet tools detect the encoding.

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::aggregate::{self, Statistics};
use crate::dates;
use crate::models::{Goal, GoalType, Profile, Record, RecordPatch, Reminder, completion_percent};
use crate::storage::generate_id;
use crate::{Error, Result};

const BOM: char = '\u{feff}';

/// CSV columns that stay text even when they look numeric.
const STRING_COLUMNS: [&str; 10] = [
    "id",
    "date",
    "mood",
    "notes",
    "createdAt",
    "updatedAt",
    "sleep.quality",
    "food.breakfast",
    "food.lunch",
    "food.dinner",
];

/// Full JSON backup.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub records: Vec<Record>,
    pub goals: Vec<Goal>,
    pub profile: Option<Profile>,
    pub reminders: Vec<Reminder>,
    pub exported_at: DateTime<Utc>,
}

impl Backup {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A record as it appears in an import file. Everything but the measured
/// fields is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub fields: RecordPatch,
}

impl ImportedRecord {
    /// Complete the record against the default template.
    pub fn into_record(self, today: NaiveDate) -> Record {
        let date = self.fields.date.unwrap_or(today);
        let id = self
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| generate_id("record", &date.to_string()));
        let mut record = Record::from_patch(id, date, &self.fields);
        if let Some(created_at) = self.created_at {
            record.created_at = created_at;
        }
        record.updated_at = self.updated_at.unwrap_or(record.created_at.max(record.updated_at));
        record
    }
}

/// Format of an import file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    Json,
    Csv,
}

impl ImportFormat {
    /// Guess the format from a file extension (JSON unless `.csv`).
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            _ => Self::Json,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

/// Parse import content and complete every record.
pub fn import_records(content: &str, format: ImportFormat, today: NaiveDate) -> Result<Vec<Record>> {
    let imported = match format {
        ImportFormat::Json => records_from_json(content)?,
        ImportFormat::Csv => records_from_csv(content)?,
    };
    Ok(imported.into_iter().map(|r| r.into_record(today)).collect())
}

/// Records from a backup bundle (`{"records": [...]}`) or a bare array.
pub fn records_from_json(content: &str) -> Result<Vec<ImportedRecord>> {
    let value: Value = serde_json::from_str(content.trim_start_matches(BOM))
        .map_err(|e| Error::InvalidInput(format!("Invalid JSON file: {}", e)))?;
    let records = match value {
        Value::Array(_) => value,
        Value::Object(mut map) => match map.remove("records") {
            Some(records @ Value::Array(_)) => records,
            _ => {
                return Err(Error::InvalidInput(
                    "JSON import needs a record array or a backup with a \"records\" array"
                        .to_string(),
                ));
            }
        },
        _ => {
            return Err(Error::InvalidInput(
                "JSON import needs a record array or a backup object".to_string(),
            ));
        }
    };
    serde_json::from_value(records)
        .map_err(|e| Error::InvalidInput(format!("Invalid record in import: {}", e)))
}

// === CSV ===

fn flatten_into(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let name = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_into(&name, child, out);
            }
        }
        Value::Array(_) => out.push((prefix.to_string(), value.to_string())),
        Value::Null => out.push((prefix.to_string(), String::new())),
        Value::String(s) => out.push((prefix.to_string(), s.clone())),
        other => out.push((prefix.to_string(), other.to_string())),
    }
}

/// Flatten a JSON object into dot-joined `(column, text)` pairs.
pub fn flatten(value: &Value) -> Vec<(String, String)> {
    let mut out = Vec::new();
    flatten_into("", value, &mut out);
    out
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Render records as CSV (BOM, header row, every field quoted).
pub fn records_to_csv(records: &[Record]) -> Result<String> {
    let rows = records
        .iter()
        .map(|r| serde_json::to_value(r).map(|v| flatten(&v)))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut header: Vec<String> = Vec::new();
    for row in &rows {
        for (column, _) in row {
            if !header.contains(column) {
                header.push(column.clone());
            }
        }
    }

    let mut out = String::new();
    out.push(BOM);
    out.push_str(&header.iter().map(|h| quote(h)).collect::<Vec<_>>().join(","));
    for row in &rows {
        out.push_str("\r\n");
        let line: Vec<String> = header
            .iter()
            .map(|column| {
                let value = row
                    .iter()
                    .find(|(c, _)| c == column)
                    .map(|(_, v)| v.as_str())
                    .unwrap_or("");
                quote(value)
            })
            .collect();
        out.push_str(&line.join(","));
    }
    Ok(out)
}

/// Split CSV text into rows of fields. Blank lines are skipped.
pub fn parse_csv(content: &str) -> Result<Vec<Vec<String>>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.trim_start_matches(BOM).chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ',' => row.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                row.push(std::mem::take(&mut field));
                if !(row.len() == 1 && row[0].is_empty()) {
                    rows.push(std::mem::take(&mut row));
                } else {
                    row.clear();
                }
            }
            _ => field.push(c),
        }
    }
    if in_quotes {
        return Err(Error::InvalidInput("Unterminated quoted field in CSV".to_string()));
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    Ok(rows)
}

fn coerce(column: &str, raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    if STRING_COLUMNS.contains(&column) {
        return Value::String(raw.to_string());
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::from(i);
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() => Value::from(f),
        _ => Value::String(raw.to_string()),
    }
}

/// Insert `value` at the dot-joined `path`, creating nested objects.
fn insert_path(target: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            target.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = target
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(map) = child {
                insert_path(map, rest, value);
            }
        }
    }
}

/// Records from CSV with a header row; dot-joined columns are unflattened
/// and numeric columns coerced.
pub fn records_from_csv(content: &str) -> Result<Vec<ImportedRecord>> {
    let mut rows = parse_csv(content)?.into_iter();
    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };

    rows.enumerate()
        .map(|(n, row)| {
            let mut object = Map::new();
            for (column, raw) in header.iter().zip(row.iter()) {
                let column = column.trim();
                if column.is_empty() {
                    continue;
                }
                insert_path(&mut object, column, coerce(column, raw));
            }
            serde_json::from_value(Value::Object(object)).map_err(|e| {
                Error::InvalidInput(format!("Invalid CSV row {}: {}", n + 2, e))
            })
        })
        .collect()
}

// === Report ===

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportProfile {
    pub nickname: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub bmi: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportGoal {
    #[serde(rename = "type")]
    pub goal_type: GoalType,
    pub name: Option<String>,
    pub target: f64,
    pub current: f64,
    /// Percent of target, rounded but not capped at 100
    pub progress: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub report_date: NaiveDate,
    pub profile: ReportProfile,
    pub statistics: Statistics,
    pub goals_progress: Vec<ReportGoal>,
}

pub fn generate_report(
    profile: Option<&Profile>,
    records: &[Record],
    goals: &[Goal],
    today: NaiveDate,
) -> HealthReport {
    let profile = profile
        .map(|p| ReportProfile {
            nickname: Some(p.nickname.clone()),
            age: p.age(today),
            gender: p.gender.clone(),
            height: p.height,
            weight: p.weight,
            bmi: p.bmi(),
        })
        .unwrap_or_default();

    let goals_progress = goals
        .iter()
        .map(|g| ReportGoal {
            goal_type: g.goal_type,
            name: g.name.clone(),
            target: g.target_value,
            current: g.current_value,
            progress: completion_percent(g.current_value, g.target_value).round() as i64,
        })
        .collect();

    HealthReport {
        report_date: today,
        profile,
        statistics: aggregate::statistics(records),
        goals_progress,
    }
}

// === Files ===

/// Default export file name, e.g. `health_backup_2026_10_18_093000.json`.
pub fn default_file_name(stem: &str, extension: &str, now: DateTime<Local>) -> String {
    format!("{}_{}.{}", stem, dates::file_stamp(now), extension)
}

/// Resolve an output path: a directory gets the default file name appended.
pub fn output_path(path: &Path, stem: &str, extension: &str) -> PathBuf {
    if path.is_dir() {
        path.join(default_file_name(stem, extension, Local::now()))
    } else {
        path.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_date;
    use crate::models::{GoalPeriod, GoalStatus, HeartRate, Sleep};

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn sample() -> Record {
        let mut r = Record::new("record-abc".to_string(), date("2026-10-18"));
        r.steps = Some(8000);
        r.sleep = Sleep {
            duration: Some(7.5),
            quality: Some("good".to_string()),
            ..Default::default()
        };
        r.heart_rate = HeartRate {
            resting: Some(60),
            ..Default::default()
        };
        r.notes = "said \"hi\", then ran".to_string();
        r
    }

    #[test]
    fn test_json_import_missing_sleep_gets_nulls() {
        let json = r#"[{"date": "2026-10-18", "steps": 1000}]"#;
        let records = import_records(json, ImportFormat::Json, date("2026-10-18")).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sleep, Sleep::default());
        let value = serde_json::to_value(&records[0]).unwrap();
        for key in ["duration", "deep", "light", "quality"] {
            assert!(value["sleep"][key].is_null());
        }
        assert!(records[0].id.starts_with("record-"));
    }

    #[test]
    fn test_json_import_accepts_backup_bundle() {
        let json = r#"{
            "records": [{"id": "record-1", "date": "2026-10-01", "createdAt": "2026-10-01T07:00:00Z"}],
            "goals": [],
            "exportedAt": "2026-10-18T00:00:00Z"
        }"#;
        let records = import_records(json, ImportFormat::Json, date("2026-10-18")).unwrap();
        assert_eq!(records[0].id, "record-1");
        assert_eq!(records[0].created_at.to_rfc3339(), "2026-10-01T07:00:00+00:00");
        assert_eq!(records[0].mood, "normal");
    }

    #[test]
    fn test_json_import_rejects_other_shapes() {
        assert!(records_from_json("42").is_err());
        assert!(records_from_json(r#"{"goals": []}"#).is_err());
        assert!(records_from_json("not json").is_err());
    }

    #[test]
    fn test_csv_layout() {
        let csv = records_to_csv(&[sample()]).unwrap();
        assert!(csv.starts_with('\u{feff}'));

        let mut lines = csv.trim_start_matches('\u{feff}').split("\r\n");
        let header = lines.next().unwrap();
        assert!(header.contains("\"heartRate.resting\""));
        assert!(header.contains("\"sleep.quality\""));
        let row = lines.next().unwrap();
        assert!(row.contains("\"said \"\"hi\"\", then ran\""));
        assert!(row.contains("\"8000\""));
    }

    #[test]
    fn test_csv_import_restores_record() {
        let original = sample();
        let csv = records_to_csv(&[original.clone()]).unwrap();

        let records = import_records(&csv, ImportFormat::Csv, date("2026-10-18")).unwrap();
        assert_eq!(records.len(), 1);
        let restored = &records[0];
        assert_eq!(restored.id, original.id);
        assert_eq!(restored.steps, Some(8000));
        assert_eq!(restored.sleep, original.sleep);
        assert_eq!(restored.heart_rate.resting, Some(60));
        assert_eq!(restored.heart_rate.max, None);
        assert_eq!(restored.notes, original.notes);
        assert_eq!(restored.mood, "normal");
    }

    #[test]
    fn test_parse_csv_quoting() {
        let rows = parse_csv("a,b\r\n\"x,1\",\"line\nbreak\"\r\n\r\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec!["x,1".to_string(), "line\nbreak".to_string()]);
        assert!(parse_csv("\"open").is_err());
    }

    #[test]
    fn test_csv_coercion_keeps_text_columns() {
        let csv = "date,notes,food.lunch,weight\n2026-10-18,123,456,70.5\n";
        let records = records_from_csv(csv).unwrap();
        let record = records.into_iter().next().unwrap().into_record(date("2026-10-18"));
        assert_eq!(record.notes, "123");
        assert_eq!(record.food.lunch.as_deref(), Some("456"));
        assert_eq!(record.weight, Some(70.5));
    }

    #[test]
    fn test_flatten_arrays_as_json() {
        let value = serde_json::json!({"tags": ["a", "b"], "nested": {"x": null}});
        let flat = flatten(&value);
        assert!(flat.contains(&("tags".to_string(), "[\"a\",\"b\"]".to_string())));
        assert!(flat.contains(&("nested.x".to_string(), String::new())));
    }

    #[test]
    fn test_report() {
        let profile = Profile {
            id: "user-1".to_string(),
            nickname: "Ana".to_string(),
            birth_date: Some(date("1990-10-19")),
            gender: Some("female".to_string()),
            height: Some(175.0),
            weight: Some(70.0),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let mut over = Goal::new(
            "goal-1".to_string(),
            crate::models::NewGoal {
                goal_type: GoalType::Steps,
                period: GoalPeriod::Daily,
                target_value: 10000.0,
                name: Some("Walk".to_string()),
            },
        );
        over.current_value = 12500.0;
        over.status = GoalStatus::Completed;
        let mut zero = over.clone();
        zero.target_value = 0.0;

        let report = generate_report(Some(&profile), &[sample()], &[over, zero], date("2026-10-18"));

        assert_eq!(report.profile.age, Some(35));
        assert_eq!(report.profile.bmi, Some(22.9));
        assert_eq!(report.statistics.total_days, 1);
        assert_eq!(report.goals_progress[0].progress, 125);
        assert_eq!(report.goals_progress[1].progress, 0);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["reportDate"], "2026-10-18");
        assert_eq!(json["goalsProgress"][0]["type"], "steps");
    }

    #[test]
    fn test_report_without_profile() {
        let report = generate_report(None, &[], &[], date("2026-10-18"));
        assert!(report.profile.nickname.is_none());
        assert_eq!(report.statistics, Statistics::default());
    }

    #[test]
    fn test_default_file_name() {
        let now = Local::now();
        let name = default_file_name("health_backup", "json", now);
        assert!(name.starts_with("health_backup_"));
        assert!(name.ends_with(".json"));
    }
}
