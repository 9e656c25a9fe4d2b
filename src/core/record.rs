//! Purpose: Define the roster record model and wire normalization.
//! Exports: `StudentRecord`, `ClassName`, `Section`, `normalize_roster`, `seed_roster`.
//! Role: One typed shape for every backend; wire quirks end here.
//! Invariants: `id` and `studentId` are unique across a roster and immutable.
//! Invariants: `rollNo`/`phoneNumber` are strings after normalization, even
//! when a remote sheet row stores them as numbers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Grade levels, ordered lowest to highest.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub enum ClassName {
    #[default]
    I,
    II,
    III,
    IV,
    V,
    VI,
    VII,
    VIII,
    IX,
    X,
    XI,
    XII,
}

impl ClassName {
    pub const ALL: [ClassName; 12] = [
        ClassName::I,
        ClassName::II,
        ClassName::III,
        ClassName::IV,
        ClassName::V,
        ClassName::VI,
        ClassName::VII,
        ClassName::VIII,
        ClassName::IX,
        ClassName::X,
        ClassName::XI,
        ClassName::XII,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClassName::I => "I",
            ClassName::II => "II",
            ClassName::III => "III",
            ClassName::IV => "IV",
            ClassName::V => "V",
            ClassName::VI => "VI",
            ClassName::VII => "VII",
            ClassName::VIII => "VIII",
            ClassName::IX => "IX",
            ClassName::X => "X",
            ClassName::XI => "XI",
            ClassName::XII => "XII",
        }
    }

    pub fn parse(input: &str) -> Option<ClassName> {
        let wanted = input.trim().to_ascii_uppercase();
        ClassName::ALL
            .into_iter()
            .find(|class| class.as_str() == wanted)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum Section {
    #[serde(rename = "MAHA")]
    Maha,
    #[serde(rename = "RISHI")]
    Rishi,
    #[default]
    #[serde(rename = "NONE")]
    None,
}

impl Section {
    pub const ALL: [Section; 3] = [Section::Maha, Section::Rishi, Section::None];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Maha => "MAHA",
            Section::Rishi => "RISHI",
            Section::None => "NONE",
        }
    }

    pub fn parse(input: &str) -> Option<Section> {
        let wanted = input.trim().to_ascii_uppercase();
        Section::ALL
            .into_iter()
            .find(|section| section.as_str() == wanted)
    }
}

/// The unit entity. Field names mirror the tabular wire format.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub student_name: String,
    #[serde(default)]
    pub class_name: ClassName,
    #[serde(default)]
    pub section: Section,
    #[serde(default)]
    pub roll_no: String,
    #[serde(default)]
    pub date_of_birth: String,
    #[serde(default)]
    pub father_name: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub email_id: String,
    #[serde(default)]
    pub photo_url: String,
    #[serde(default)]
    pub signature_url: String,
}

impl StudentRecord {
    /// Build a record from one untyped wire row, coercing number-typed
    /// cells to strings and tolerating unknown enum values.
    pub fn from_wire(row: &Value, index: usize) -> StudentRecord {
        let mut record = StudentRecord {
            id: coerce_string(row.get("id")),
            student_id: coerce_string(row.get("studentId")),
            student_name: coerce_string(row.get("studentName")),
            class_name: parse_class(row.get("className")),
            section: parse_section(row.get("section")),
            roll_no: coerce_string(row.get("rollNo")),
            date_of_birth: coerce_string(row.get("dateOfBirth")),
            father_name: coerce_string(row.get("fatherName")),
            phone_number: coerce_string(row.get("phoneNumber")),
            email_id: coerce_string(row.get("emailId")),
            photo_url: coerce_string(row.get("photoUrl")),
            signature_url: coerce_string(row.get("signatureUrl")),
        };
        record.backfill_id(index);
        record
    }

    fn backfill_id(&mut self, index: usize) {
        if self.id.is_empty() {
            self.id = if self.student_id.is_empty() {
                format!("temp-{index}")
            } else {
                self.student_id.clone()
            };
        }
    }
}

/// Backfill missing ids so every record is addressable. Applied on every
/// load regardless of backend; already-complete records pass through.
pub fn normalize_roster(mut roster: Vec<StudentRecord>) -> Vec<StudentRecord> {
    for (index, record) in roster.iter_mut().enumerate() {
        record.backfill_id(index);
    }
    roster
}

fn coerce_string(cell: Option<&Value>) -> String {
    match cell {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        _ => String::new(),
    }
}

fn parse_class(cell: Option<&Value>) -> ClassName {
    let raw = coerce_string(cell);
    if raw.is_empty() {
        return ClassName::default();
    }
    ClassName::parse(&raw).unwrap_or_else(|| {
        tracing::warn!(value = %raw, "unrecognized class on wire record, keeping record with class I");
        ClassName::default()
    })
}

fn parse_section(cell: Option<&Value>) -> Section {
    let raw = coerce_string(cell);
    if raw.is_empty() {
        return Section::default();
    }
    Section::parse(&raw).unwrap_or_else(|| {
        tracing::warn!(value = %raw, "unrecognized section on wire record, keeping record with section NONE");
        Section::default()
    })
}

/// Fixed dataset used to initialize an empty local slot.
pub fn seed_roster() -> Vec<StudentRecord> {
    vec![
        StudentRecord {
            id: "1".to_string(),
            student_id: "S001".to_string(),
            student_name: "Ravi Sharma".to_string(),
            class_name: ClassName::V,
            section: Section::Maha,
            roll_no: "101".to_string(),
            date_of_birth: "2015-05-15".to_string(),
            father_name: "Ajay Sharma".to_string(),
            phone_number: "9876543210".to_string(),
            email_id: "ravi@example.com".to_string(),
            photo_url: "https://placehold.co/100x100/1e40af/ffffff?text=Ravi".to_string(),
            signature_url: "https://placehold.co/150x50/3b82f6/ffffff?text=Signature".to_string(),
        },
        StudentRecord {
            id: "2".to_string(),
            student_id: "S002".to_string(),
            student_name: "Priya Singh".to_string(),
            class_name: ClassName::IX,
            section: Section::Rishi,
            roll_no: "205".to_string(),
            date_of_birth: "2011-11-22".to_string(),
            father_name: "Manoj Singh".to_string(),
            phone_number: "9988776655".to_string(),
            email_id: "priya@example.com".to_string(),
            photo_url: "https://placehold.co/100x100/dc2626/ffffff?text=Priya".to_string(),
            signature_url: "https://placehold.co/150x50/ef4444/ffffff?text=Signature".to_string(),
        },
        StudentRecord {
            id: "3".to_string(),
            student_id: "S003".to_string(),
            student_name: "Aarav Patel".to_string(),
            class_name: ClassName::II,
            section: Section::Maha,
            roll_no: "056".to_string(),
            date_of_birth: "2018-08-01".to_string(),
            father_name: "Vijay Patel".to_string(),
            phone_number: "9001122334".to_string(),
            email_id: "aarav@example.com".to_string(),
            photo_url: "https://placehold.co/100x100/059669/ffffff?text=Aarav".to_string(),
            signature_url: "https://placehold.co/150x50/10b981/ffffff?text=Signature".to_string(),
        },
        StudentRecord {
            id: "4".to_string(),
            student_id: "S004".to_string(),
            student_name: "Deepak Kumar".to_string(),
            class_name: ClassName::XII,
            section: Section::None,
            roll_no: "301".to_string(),
            date_of_birth: "2008-01-01".to_string(),
            father_name: "Ram Kumar".to_string(),
            phone_number: "9123456789".to_string(),
            email_id: "deepak@example.com".to_string(),
            photo_url: "https://placehold.co/100x100/f59e0b/ffffff?text=Deepak".to_string(),
            signature_url: "https://placehold.co/150x50/fbbf24/ffffff?text=Signature".to_string(),
        },
    ]
}
