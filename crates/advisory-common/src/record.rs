/// Flat submission records appended to the remote table.
///
/// A record is an ordered column → value mapping; column order is the header order.
use indexmap::IndexMap;
use serde_json::Value;

use crate::assessment::Responses;
use crate::contact::ContactInfo;
use crate::question_bank::QuestionBank;
use crate::strategy::StrategySummary;

pub type Record = IndexMap<String, Value>;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Local wall-clock time in `TIMESTAMP_FORMAT`.
pub fn timestamp_now() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

pub fn strategy_record(summary: &StrategySummary, contact: &ContactInfo, timestamp: &str) -> Record {
    let mut record = contact_columns(contact, timestamp);
    record.insert("Goal".to_string(), Value::from(summary.goal.as_str()));
    record.insert("Method".to_string(), Value::from(summary.method.as_str()));
    record.insert("Tool".to_string(), Value::from(summary.tool.as_str()));
    record.insert("KPI".to_string(), Value::from(summary.kpi.as_str()));
    record.insert("Use Cases".to_string(), Value::from(summary.use_cases.join(", ")));
    record.insert("Partners".to_string(), Value::from(summary.partners.join(", ")));
    record
}

/// Contact columns followed by one column per bank question, in bank order.
/// Unanswered questions are `null`.
pub fn assessment_record(
    bank: &QuestionBank,
    contact: &ContactInfo,
    responses: &Responses,
    timestamp: &str,
) -> Record {
    let mut record = contact_columns(contact, timestamp);
    for id in bank.question_ids() {
        let value = responses.get(id).map(Value::from).unwrap_or(Value::Null);
        record.insert(id.to_string(), value);
    }
    record
}

pub fn header(record: &Record) -> Vec<String> {
    record.keys().cloned().collect()
}

/// Plain-text cells: strings as-is, numbers printed, `null` empty.
pub fn cells(record: &Record) -> Vec<String> {
    record.values().map(cell_text).collect()
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn contact_columns(contact: &ContactInfo, timestamp: &str) -> Record {
    let mut record = Record::new();
    record.insert("Timestamp".to_string(), Value::from(timestamp));
    for (key, value) in contact.fields() {
        record.insert(key.to_string(), Value::from(value));
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question_bank::SAMPLE_BANK;

    fn contact() -> ContactInfo {
        ContactInfo {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            company: "Analytical Engines".to_string(),
            phone: "555-0100".to_string(),
        }
    }

    #[test]
    fn strategy_columns_in_order() {
        let summary = StrategySummary {
            goal: "Increase Efficiency".to_string(),
            method: "Lean Engineering".to_string(),
            tool: "Value Stream Mapping".to_string(),
            kpi: "Cycle Time".to_string(),
            use_cases: vec!["Design Reviews".to_string(), "Test Planning".to_string()],
            partners: vec!["VendorY".to_string(), "VendorZ".to_string()],
        };
        let record = strategy_record(&summary, &contact(), "2024-05-01 09:30:00");
        assert_eq!(
            header(&record),
            vec![
                "Timestamp", "Name", "Email", "Company", "Phone", "Goal", "Method", "Tool", "KPI",
                "Use Cases", "Partners"
            ]
        );
        assert_eq!(record["Use Cases"], "Design Reviews, Test Planning");
        assert_eq!(record["Partners"], "VendorY, VendorZ");
    }

    #[test]
    fn assessment_columns_follow_bank_order() {
        let bank = QuestionBank::from_json(SAMPLE_BANK).unwrap();
        let mut responses = Responses::default();
        responses.set("K1", 2);
        responses.set("Q_a", 4);
        let record = assessment_record(&bank, &contact(), &responses, "2024-05-01 09:30:00");
        assert_eq!(
            header(&record),
            vec!["Timestamp", "Name", "Email", "Company", "Phone", "Q_a", "Q_b", "K1"]
        );
        assert_eq!(
            cells(&record)[5..].to_vec(),
            vec!["4".to_string(), String::new(), "2".to_string()]
        );
    }

    #[test]
    fn timestamp_has_expected_shape() {
        let ts = timestamp_now();
        assert!(chrono::NaiveDateTime::parse_from_str(&ts, TIMESTAMP_FORMAT).is_ok(), "{ts}");
    }
}
