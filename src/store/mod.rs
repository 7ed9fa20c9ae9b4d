pub mod db;
pub mod repository;

pub use db::Database;
pub use repository::{MedicineRepository, ReminderRepository, ScanRepository};

use serde::{Deserialize, Serialize};

/// Timestamp format shared by every table. Rows sort and compare as text.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medicine {
    pub id: i64,
    pub image_path: String,
    pub name: String,
    pub expiry_date: String,
    pub dosage_info: String,
    pub detected_time: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderStatus {
    Pending,
    Done,
}

impl ReminderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderStatus::Pending => "pending",
            ReminderStatus::Done => "done",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw {
            "done" => ReminderStatus::Done,
            _ => ReminderStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: i64,
    pub medicine_id: i64,
    pub reminder_time: String,
    pub frequency: String,
    pub status: ReminderStatus,
}

/// Row shape of the due-now query: reminder joined with its medicine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DueReminder {
    pub reminder_id: i64,
    pub medicine_name: String,
    pub image_path: String,
    pub reminder_time: String,
    pub frequency: String,
}

/// One recognition event: what the camera saw and what we made of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: i64,
    pub medicine_id: i64,
    pub image_hash: String,
    pub image_path: String,
    pub predicted_label: String,
    pub confidence: f64,
    pub ocr_text: String,
    pub scanned_at: String,
}
