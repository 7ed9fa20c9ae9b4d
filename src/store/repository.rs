//! Repository structs over the shared connection, one per table.

use crate::store::{DueReminder, Medicine, Reminder, ReminderStatus, ScanRecord, TIME_FORMAT};
use anyhow::Result;
use chrono::Local;
use rusqlite::{Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

pub struct MedicineRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MedicineRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Insert a detected medicine, stamping the detection time. Returns the row id.
    pub fn add(
        &self,
        image_path: &str,
        medicine_name: &str,
        expiry_date: &str,
        dosage_info: &str,
    ) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let detected_time = Local::now().format(TIME_FORMAT).to_string();
        conn.execute(
            r#"
            INSERT INTO medicine (image_path, medicine_name, expiry_date, dosage_info, detected_time)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            (image_path, medicine_name, expiry_date, dosage_info, &detected_time),
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get(&self, id: i64) -> Result<Option<Medicine>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT id, image_path, medicine_name, expiry_date, dosage_info, detected_time
                 FROM medicine WHERE id = ?1",
                [id],
                |row| {
                    Ok(Medicine {
                        id: row.get(0)?,
                        image_path: row.get(1)?,
                        name: row.get(2)?,
                        expiry_date: row.get(3)?,
                        dosage_info: row.get(4)?,
                        detected_time: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    pub fn list_all(&self) -> Result<Vec<Medicine>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, image_path, medicine_name, expiry_date, dosage_info, detected_time
             FROM medicine ORDER BY id DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(Medicine {
                id: row.get(0)?,
                image_path: row.get(1)?,
                name: row.get(2)?,
                expiry_date: row.get(3)?,
                dosage_info: row.get(4)?,
                detected_time: row.get(5)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

pub struct ReminderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ReminderRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub fn add(
        &self,
        medicine_id: i64,
        reminder_time: &str,
        frequency: &str,
        status: ReminderStatus,
    ) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO reminder (medicine_id, reminder_time, frequency, status)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            (medicine_id, reminder_time, frequency, status.as_str()),
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Pending reminders whose time has come, joined with their medicine,
    /// oldest first. `now` is a TIME_FORMAT string.
    pub fn due(&self, now: &str) -> Result<Vec<DueReminder>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT reminder.id, medicine.medicine_name, medicine.image_path,
                   reminder.reminder_time, reminder.frequency
            FROM reminder
            JOIN medicine ON reminder.medicine_id = medicine.id
            WHERE reminder.reminder_time <= ?1 AND reminder.status = 'pending'
            ORDER BY reminder.reminder_time
            "#,
        )?;

        let rows = stmt.query_map([now], |row| {
            Ok(DueReminder {
                reminder_id: row.get(0)?,
                medicine_name: row.get(1)?,
                image_path: row.get(2)?,
                reminder_time: row.get(3)?,
                frequency: row.get(4)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn get(&self, id: i64) -> Result<Option<Reminder>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT id, medicine_id, reminder_time, frequency, status
                 FROM reminder WHERE id = ?1",
                [id],
                |row| {
                    let status: String = row.get(4)?;
                    Ok(Reminder {
                        id: row.get(0)?,
                        medicine_id: row.get(1)?,
                        reminder_time: row.get(2)?,
                        frequency: row.get(3)?,
                        status: ReminderStatus::parse(&status),
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Mark a reminder taken. Returns false when the id does not exist.
    pub fn mark_done(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE reminder SET status = 'done' WHERE id = ?1",
            [id],
        )?;
        Ok(changed > 0)
    }
}

pub struct ScanRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ScanRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub fn add(
        &self,
        medicine_id: i64,
        image_hash: &str,
        image_path: &str,
        predicted_label: &str,
        confidence: f64,
        ocr_text: &str,
    ) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let scanned_at = Local::now().format(TIME_FORMAT).to_string();
        conn.execute(
            r#"
            INSERT INTO scan (medicine_id, image_hash, image_path, predicted_label, confidence, ocr_text, scanned_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            (medicine_id, image_hash, image_path, predicted_label, confidence, ocr_text, &scanned_at),
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Latest scan of a byte-identical image, if we have processed one before.
    pub fn find_by_hash(&self, image_hash: &str) -> Result<Option<ScanRecord>> {
        let conn = self.conn.lock().unwrap();
        let row = conn
            .query_row(
                "SELECT id, medicine_id, image_hash, image_path, predicted_label, confidence, ocr_text, scanned_at
                 FROM scan WHERE image_hash = ?1 ORDER BY id DESC LIMIT 1",
                [image_hash],
                |row| {
                    Ok(ScanRecord {
                        id: row.get(0)?,
                        medicine_id: row.get(1)?,
                        image_hash: row.get(2)?,
                        image_path: row.get(3)?,
                        predicted_label: row.get(4)?,
                        confidence: row.get(5)?,
                        ocr_text: row.get(6)?,
                        scanned_at: row.get(7)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Database;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_add_and_get_medicine() {
        let db = test_db();
        let medicines = MedicineRepository::new(db.connection());

        let id = medicines
            .add("images/paracetamol.jpg", "Paracetamol", "2026-12-01", "Twice a day")
            .unwrap();
        assert_eq!(id, 1);

        let medicine = medicines.get(id).unwrap().expect("row should exist");
        assert_eq!(medicine.name, "Paracetamol");
        assert_eq!(medicine.expiry_date, "2026-12-01");
        assert_eq!(medicine.dosage_info, "Twice a day");
        assert!(!medicine.detected_time.is_empty());

        assert!(medicines.get(999).unwrap().is_none());
    }

    #[test]
    fn test_list_newest_first() {
        let db = test_db();
        let medicines = MedicineRepository::new(db.connection());
        medicines.add("old.jpg", "Aspirin", "", "").unwrap();
        medicines.add("new.jpg", "Cetirizine", "", "").unwrap();

        let all = medicines.list_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "Cetirizine");
        assert_eq!(all[1].name, "Aspirin");
    }

    #[test]
    fn test_due_reminders_filter_and_order() {
        let db = test_db();
        let medicines = MedicineRepository::new(db.connection());
        let reminders = ReminderRepository::new(db.connection());

        let med = medicines
            .add("images/paracetamol.jpg", "Paracetamol", "2026-12-01", "Twice a day")
            .unwrap();

        reminders
            .add(med, "2026-02-07 21:00:00", "daily", ReminderStatus::Pending)
            .unwrap();
        reminders
            .add(med, "2026-02-07 09:00:00", "daily", ReminderStatus::Pending)
            .unwrap();
        reminders
            .add(med, "2099-01-01 09:00:00", "daily", ReminderStatus::Pending)
            .unwrap();

        let due = reminders.due("2026-06-01 00:00:00").unwrap();
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].reminder_time, "2026-02-07 09:00:00");
        assert_eq!(due[1].reminder_time, "2026-02-07 21:00:00");
        assert_eq!(due[0].medicine_name, "Paracetamol");
        assert_eq!(due[0].image_path, "images/paracetamol.jpg");
    }

    #[test]
    fn test_mark_done_removes_from_due() {
        let db = test_db();
        let medicines = MedicineRepository::new(db.connection());
        let reminders = ReminderRepository::new(db.connection());

        let med = medicines.add("a.jpg", "Aspirin", "", "").unwrap();
        let rem = reminders
            .add(med, "2020-01-01 08:00:00", "daily", ReminderStatus::Pending)
            .unwrap();

        assert_eq!(reminders.due("2026-01-01 00:00:00").unwrap().len(), 1);
        assert!(reminders.mark_done(rem).unwrap());
        assert!(reminders.due("2026-01-01 00:00:00").unwrap().is_empty());

        let row = reminders.get(rem).unwrap().unwrap();
        assert_eq!(row.status, ReminderStatus::Done);

        assert!(!reminders.mark_done(999).unwrap());
    }

    #[test]
    fn test_scan_lookup_by_hash() {
        let db = test_db();
        let medicines = MedicineRepository::new(db.connection());
        let scans = ScanRepository::new(db.connection());

        let med = medicines.add("b.jpg", "Benadryl", "", "10 ml").unwrap();
        scans
            .add(med, "deadbeef", "b.jpg", "Syrup", 0.91, "BENADRYL 10 ml")
            .unwrap();

        let hit = scans.find_by_hash("deadbeef").unwrap().expect("hash should hit");
        assert_eq!(hit.medicine_id, med);
        assert_eq!(hit.predicted_label, "Syrup");
        assert!((hit.confidence - 0.91).abs() < 1e-9);
        assert_eq!(hit.ocr_text, "BENADRYL 10 ml");

        assert!(scans.find_by_hash("cafebabe").unwrap().is_none());
    }
}
