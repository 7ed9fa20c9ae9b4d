use crate::classifier::{ClassifierEngine, Prediction};
use crate::nlp::{ExtractedFields, LabelExtractor};
use crate::ocr::OcrEngine;
use crate::store::{Database, MedicineRepository, ScanRecord, ScanRepository};
use anyhow::{anyhow, Context, Result};
use chrono::Local;
use colored::*;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;

/// Everything the CLI needs to render one recognition pass.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub medicine_id: i64,
    pub prediction: Prediction,
    pub fields: ExtractedFields,
    pub ocr_text: String,
    pub expired: bool,
    /// True when the photo was recognized from an earlier scan and the
    /// Vision API was not called again.
    pub cached: bool,
}

/// Photo-to-database pipeline: classify packaging, read the label,
/// extract the fields, persist the medicine and the scan event.
pub struct Recognizer {
    classifier: ClassifierEngine,
    ocr: Arc<dyn OcrEngine>,
    extractor: LabelExtractor,
    medicines: MedicineRepository,
    scans: ScanRepository,
}

impl Recognizer {
    pub fn new(classifier: ClassifierEngine, ocr: Arc<dyn OcrEngine>, db: &Database) -> Self {
        Self {
            classifier,
            ocr,
            extractor: LabelExtractor::new(),
            medicines: MedicineRepository::new(db.connection()),
            scans: ScanRepository::new(db.connection()),
        }
    }

    pub async fn process_image(&self, image: &Path) -> Result<ScanReport> {
        let bytes = std::fs::read(image)
            .with_context(|| format!("Image not found: {}", image.display()))?;
        let hash = hex::encode(Sha256::digest(&bytes));

        // Byte-identical photos skip the whole pipeline, most importantly
        // the metered Vision API call.
        if let Some(scan) = self.scans.find_by_hash(&hash)? {
            println!(
                "{}",
                format!(
                    "♻️  Seen this exact photo before (scan #{}), reusing stored result.",
                    scan.id
                )
                .yellow()
            );
            return self.report_from_scan(scan);
        }

        println!("{}", "📷 Classifying packaging...".cyan());
        let prediction = self.classifier.predict(image)?;
        println!(
            "   Packaging: {} ({:.1}% confidence)",
            prediction.label.bold(),
            prediction.confidence * 100.0
        );

        println!("{}", "🔎 Reading label via Vision OCR...".cyan());
        let ocr_text = self.ocr.extract_text(image).await?;

        let fields = self.extractor.extract(&ocr_text);
        let expired = self.is_expired(&fields.expiry);

        let image_path = image.to_string_lossy();
        let medicine_id = self.medicines.add(
            &image_path,
            &fields.name,
            &fields.expiry,
            &fields.dosage,
        )?;
        self.scans.add(
            medicine_id,
            &hash,
            &image_path,
            &prediction.label,
            prediction.confidence as f64,
            &ocr_text,
        )?;

        Ok(ScanReport {
            medicine_id,
            prediction,
            fields,
            ocr_text,
            expired,
            cached: false,
        })
    }

    /// Rebuild a report from a stored scan without touching the network.
    fn report_from_scan(&self, scan: ScanRecord) -> Result<ScanReport> {
        let medicine = self
            .medicines
            .get(scan.medicine_id)?
            .ok_or_else(|| anyhow!("Scan #{} references missing medicine row", scan.id))?;
        let fields = ExtractedFields {
            name: medicine.name,
            dosage: medicine.dosage_info,
            expiry: medicine.expiry_date,
        };
        let expired = self.is_expired(&fields.expiry);
        Ok(ScanReport {
            medicine_id: scan.medicine_id,
            prediction: Prediction {
                label: scan.predicted_label,
                confidence: scan.confidence as f32,
                scores: Vec::new(),
            },
            fields,
            ocr_text: scan.ocr_text,
            expired,
            cached: true,
        })
    }

    fn is_expired(&self, raw_expiry: &str) -> bool {
        match self.extractor.expiry_date(raw_expiry) {
            Some(date) => date < Local::now().date_naive(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use candle_core::{DType, Device};
    use candle_nn::VarBuilder;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedOcr {
        text: String,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl OcrEngine for FixedOcr {
        async fn extract_text(&self, _image: &Path) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.text.clone())
        }
    }

    fn zeroed_recognizer(db: &Database, ocr: Arc<FixedOcr>) -> Recognizer {
        let vb = VarBuilder::zeros(DType::F32, &Device::Cpu);
        let classifier = ClassifierEngine::from_varbuilder(
            vb,
            vec!["Tablet".into(), "Syrup".into(), "Injection".into()],
            Device::Cpu,
        )
        .unwrap();
        Recognizer::new(classifier, ocr, db)
    }

    #[tokio::test]
    async fn test_scan_persists_and_rescans_skip_the_ocr_api() -> Result<()> {
        let dir = std::env::temp_dir().join("remedi_test_pipeline");
        std::fs::create_dir_all(&dir)?;
        let photo = dir.join("paracetamol.png");
        image::RgbImage::new(8, 8).save(&photo)?;

        let db = Database::open_in_memory()?;
        let ocr = Arc::new(FixedOcr {
            text: "Paracetamol 500mg, take twice a day.\nExpiry: 12/2001".to_string(),
            calls: AtomicUsize::new(0),
        });
        let recognizer = zeroed_recognizer(&db, ocr.clone());

        let report = recognizer.process_image(&photo).await?;
        assert!(!report.cached);
        assert_eq!(report.fields.name, "Paracetamol");
        assert_eq!(report.fields.dosage, "500mg");
        assert!(report.expired, "a 2001 expiry should flag as expired");
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);

        let medicines = MedicineRepository::new(db.connection());
        assert_eq!(medicines.list_all()?.len(), 1);

        let again = recognizer.process_image(&photo).await?;
        assert!(again.cached);
        assert_eq!(again.medicine_id, report.medicine_id);
        assert_eq!(again.fields.name, "Paracetamol");
        assert_eq!(
            ocr.calls.load(Ordering::SeqCst),
            1,
            "byte-identical rescan must not call the Vision API again"
        );
        assert_eq!(medicines.list_all()?.len(), 1, "no duplicate medicine row");

        Ok(())
    }

    #[tokio::test]
    async fn test_missing_image_fails_before_any_network_call() {
        let db = Database::open_in_memory().unwrap();
        let ocr = Arc::new(FixedOcr {
            text: String::new(),
            calls: AtomicUsize::new(0),
        });
        let recognizer = zeroed_recognizer(&db, ocr.clone());

        let err = recognizer
            .process_image(Path::new("/nonexistent/photo.jpg"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Image not found"));
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
    }
}
