//! Structured fields extracted from a document by the model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const KNOWN_KEYS: [&str; 8] = [
    "student_number",
    "student_name",
    "college",
    "program",
    "document_type",
    "enrollment_date",
    "confidence",
    "additional_fields",
];

/// Fields the model is asked to extract. Anything else the model
/// returns lands in `additional_fields` instead of being dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefinementData {
    pub student_number: Option<String>,
    pub student_name: Option<String>,
    pub college: Option<String>,
    pub program: Option<String>,
    pub document_type: Option<String>,
    pub enrollment_date: Option<String>,
    /// Percentage scale, 0.0 to 100.0.
    pub confidence: f64,
    pub additional_fields: Map<String, Value>,
}

impl RefinementData {
    /// Builds from the model's parsed JSON object.
    ///
    /// Confidence values at or below 1.0 are treated as a 0-1 scale and
    /// multiplied to percent. Unknown non-null keys are swept into
    /// `additional_fields`.
    pub fn from_value(value: &Value) -> Self {
        let object = match value.as_object() {
            Some(object) => object,
            None => return Self::default(),
        };

        let mut additional = object
            .get("additional_fields")
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default();
        for (key, val) in object {
            if !KNOWN_KEYS.contains(&key.as_str()) && !val.is_null() {
                additional.insert(key.clone(), val.clone());
            }
        }

        let raw_confidence = object
            .get("confidence")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        let confidence = if raw_confidence <= 1.0 {
            raw_confidence * 100.0
        } else {
            raw_confidence
        };

        let field = |key: &str| {
            object
                .get(key)
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
        };

        Self {
            student_number: field("student_number"),
            student_name: field("student_name"),
            college: field("college"),
            program: field("program"),
            document_type: field("document_type"),
            enrollment_date: field("enrollment_date"),
            confidence,
            additional_fields: additional,
        }
    }

    /// Snake-case JSON object for storage.
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "student_number": self.student_number,
            "student_name": self.student_name,
            "college": self.college,
            "program": self.program,
            "document_type": self.document_type,
            "enrollment_date": self.enrollment_date,
            "confidence": self.confidence,
            "additional_fields": self.additional_fields,
        })
    }

    pub fn is_high_confidence(&self, threshold: f64) -> bool {
        self.confidence >= threshold
    }

    /// The minimum fields required before a classification can be
    /// accepted without review.
    pub fn is_complete(&self) -> bool {
        self.student_number.is_some() && self.student_name.is_some() && self.college.is_some()
    }
}
