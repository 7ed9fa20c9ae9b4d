use remedi::classifier::ClassifierEngine;
use remedi::core::config::{RemediConfig, REMEDI_DIR};
use remedi::core::pipeline::{Recognizer, ScanReport};
use remedi::io::events::InboxEvent;
use remedi::io::watcher::{is_image_file, setup_inbox_watcher};
use remedi::nlp::LabelTokenizer;
use remedi::ocr::GoogleVisionOcr;
use remedi::store::{Database, MedicineRepository, ReminderRepository, ReminderStatus, TIME_FORMAT};

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDateTime, NaiveTime};
use colored::*;
use std::env;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use walkdir::WalkDir;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::from_filename(".env").ok();

    let args: Vec<String> = env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("help");
    let rest = if args.is_empty() { &[][..] } else { &args[1..] };

    match command {
        "init" => init_workspace(),
        "scan" => cmd_scan(rest).await,
        "batch" => cmd_batch(rest).await,
        "watch" => cmd_watch().await,
        "due" => cmd_due(),
        "done" => cmd_done(rest),
        "list" => cmd_list(),
        "tokens" => cmd_tokens(rest),
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn init_workspace() -> Result<()> {
    let remedi_path = Path::new(REMEDI_DIR);
    if remedi_path.exists() {
        println!("{}", "✅ Remedi is already set up in this directory.".green());
        return Ok(());
    }
    fs::create_dir_all(remedi_path.join("inbox"))?;
    let config = RemediConfig::default();
    let toml = toml::to_string_pretty(&config)?;
    fs::write(remedi_path.join("config.toml"), toml)?;

    let gitignore_path = Path::new(".gitignore");
    let mut gitignore = if gitignore_path.exists() {
        fs::read_to_string(gitignore_path)?
    } else {
        String::new()
    };
    if !gitignore.contains(".remedi") {
        gitignore.push_str("\n# Remedi Data\n.remedi/\n");
        fs::write(".gitignore", gitignore)?;
    }

    println!("{}", "💊 MEDICINE CABINET READY.".green().bold());
    println!(
        "   Drop the exported model at {} and put GOOGLE_VISION_API_KEY in .env",
        config.model_path.bold()
    );
    Ok(())
}

fn open_store(config: &RemediConfig) -> Result<Database> {
    Database::open_at(Path::new(&config.db_path))
}

fn build_recognizer(config: &RemediConfig, db: &Database) -> Result<Recognizer> {
    let classifier =
        ClassifierEngine::new(Path::new(&config.model_path), config.class_names.clone())?;
    let ocr = Arc::new(GoogleVisionOcr::new()?);
    Ok(Recognizer::new(classifier, ocr, db))
}

async fn cmd_scan(rest: &[String]) -> Result<()> {
    let photo = rest
        .first()
        .filter(|a| !a.starts_with("--"))
        .ok_or_else(|| anyhow!("Usage: remedi scan <photo> [--remind <time>] [--every <text>]"))?;

    let config = RemediConfig::load_or_default();
    let db = open_store(&config)?;
    let recognizer = build_recognizer(&config, &db)?;

    let report = recognizer.process_image(Path::new(photo)).await?;
    print_report(&report);

    if let Some(raw) = flag_value(rest, "--remind") {
        let reminder_time = resolve_reminder_time(raw)?;
        let frequency = flag_value(rest, "--every").unwrap_or("daily");
        let reminders = ReminderRepository::new(db.connection());
        let id = reminders.add(
            report.medicine_id,
            &reminder_time,
            frequency,
            ReminderStatus::Pending,
        )?;
        println!(
            "{}",
            format!("⏰ Reminder #{} set for {} ({}).", id, reminder_time, frequency).green()
        );
    }

    Ok(())
}

async fn cmd_batch(rest: &[String]) -> Result<()> {
    let dir = rest
        .first()
        .ok_or_else(|| anyhow!("Usage: remedi batch <directory>"))?;

    let config = RemediConfig::load_or_default();
    let db = open_store(&config)?;
    let recognizer = build_recognizer(&config, &db)?;

    let mut photos: Vec<_> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_image_file(e.path()))
        .map(|e| e.into_path())
        .collect();
    photos.sort();

    if photos.is_empty() {
        println!("{}", "📭 No photos found.".yellow());
        return Ok(());
    }

    println!(
        "{}",
        format!("🗂️  Scanning {} photos from {}...", photos.len(), dir).cyan()
    );
    let mut failures = 0usize;
    for photo in &photos {
        println!();
        println!("{}", format!("=== {} ===", photo.display()).bold());
        match recognizer.process_image(photo).await {
            Ok(report) => print_report(&report),
            Err(e) => {
                failures += 1;
                eprintln!("   {} {:#}", "❌".red(), e);
            }
        }
    }
    println!();
    println!(
        "{}",
        format!("Done: {} scanned, {} failed.", photos.len() - failures, failures).bold()
    );
    Ok(())
}

async fn cmd_watch() -> Result<()> {
    let config = RemediConfig::load_or_default();
    fs::create_dir_all(&config.inbox_dir)?;

    let db = open_store(&config)?;
    let recognizer = build_recognizer(&config, &db)?;

    let (tx, mut rx) = mpsc::channel(100);
    let _watcher = setup_inbox_watcher(Path::new(&config.inbox_dir), tx)?;

    println!(
        "{}",
        format!("👀 Watching {} for new photos. Ctrl-C to stop.", config.inbox_dir)
            .green()
            .bold()
    );

    loop {
        tokio::select! {
            Some(event) = rx.recv() => match event {
                InboxEvent::NewImage(path) => {
                    // Let the copy finish before reading. Repeat events for
                    // the same bytes land on the scan cache, not the API.
                    sleep(Duration::from_millis(200)).await;
                    println!();
                    println!("{}", format!("=== {} ===", path.display()).bold());
                    match recognizer.process_image(&path).await {
                        Ok(report) => print_report(&report),
                        Err(e) => eprintln!("   {} {:#}", "❌".red(), e),
                    }
                }
                InboxEvent::WatchError(msg) => {
                    eprintln!("   {} {}", "⚠️".red(), msg);
                }
            },
            _ = tokio::signal::ctrl_c() => {
                println!("{}", "👋 Inbox watch stopped.".yellow());
                break;
            }
            else => break,
        }
    }

    Ok(())
}

fn cmd_due() -> Result<()> {
    let config = RemediConfig::load_or_default();
    let db = open_store(&config)?;
    let reminders = ReminderRepository::new(db.connection());

    let now = Local::now().format(TIME_FORMAT).to_string();
    let due = reminders.due(&now)?;
    if due.is_empty() {
        println!("{}", "✅ Nothing due right now.".green());
        return Ok(());
    }
    for item in due {
        println!(
            "🔔 [{}] Take {} (see image: {}) at {} [{}]",
            item.reminder_id,
            item.medicine_name.bold(),
            item.image_path,
            item.reminder_time,
            item.frequency
        );
    }
    Ok(())
}

fn cmd_done(rest: &[String]) -> Result<()> {
    let id: i64 = rest
        .first()
        .ok_or_else(|| anyhow!("Usage: remedi done <reminder_id>"))?
        .parse()
        .context("Reminder id must be a number")?;

    let config = RemediConfig::load_or_default();
    let db = open_store(&config)?;
    let reminders = ReminderRepository::new(db.connection());

    if reminders.mark_done(id)? {
        println!("{}", format!("✅ Reminder #{} marked as taken.", id).green());
    } else {
        println!("{}", format!("🤷 No reminder #{} found.", id).yellow());
    }
    Ok(())
}

fn cmd_list() -> Result<()> {
    let config = RemediConfig::load_or_default();
    let db = open_store(&config)?;
    let medicines = MedicineRepository::new(db.connection());

    let all = medicines.list_all()?;
    if all.is_empty() {
        println!("{}", "📭 The cabinet is empty. Scan a photo first.".yellow());
        return Ok(());
    }
    println!("{}", format!("💊 {} medicines on record:", all.len()).bold());
    for m in all {
        println!(
            "  #{:<4} {:<24} dosage: {:<12} expiry: {:<18} detected {}",
            m.id,
            m.name.bold(),
            not_found(&m.dosage_info),
            not_found(&m.expiry_date),
            m.detected_time.dimmed()
        );
    }
    Ok(())
}

fn cmd_tokens(rest: &[String]) -> Result<()> {
    let text = rest.join(" ");
    if text.trim().is_empty() {
        return Err(anyhow!("Usage: remedi tokens <label text>"));
    }
    let config = RemediConfig::load_or_default();
    let tokenizer = LabelTokenizer::new(config.tokenizer_path.as_deref().map(Path::new))?;
    let tokens = tokenizer.tokenize(&text)?;
    println!("{} {} tokens:", "🔤".cyan(), tokens.len());
    println!("{}", tokens.join(" | "));
    Ok(())
}

fn print_report(report: &ScanReport) {
    println!();
    println!("{}", "--- OCR TEXT ---".dimmed());
    if report.ocr_text.trim().is_empty() {
        println!("{}", "(no text detected)".dimmed());
    } else {
        println!("{}", report.ocr_text.trim());
    }
    println!();
    println!(
        "   Packaging:     {} ({:.1}%)",
        report.prediction.label.bold(),
        report.prediction.confidence * 100.0
    );
    println!("   Medicine Name: {}", report.fields.name.bold());
    println!("   Dosage:        {}", not_found(&report.fields.dosage));
    println!("   Expiry Date:   {}", not_found(&report.fields.expiry));
    if report.expired {
        println!(
            "   {}",
            "⚠️  This medicine is past its expiry date!".red().bold()
        );
    }
    let tag = if report.cached { " (existing record)" } else { "" };
    println!(
        "{}",
        format!("💾 Saved as medicine #{}{}", report.medicine_id, tag).green()
    );
}

fn not_found(field: &str) -> &str {
    if field.is_empty() {
        "Not Found"
    } else {
        field
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a.as_str() == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

/// Accepts a full timestamp, a date without seconds, or a bare HH:MM
/// (today). Always returns a TIME_FORMAT string.
fn resolve_reminder_time(raw: &str) -> Result<String> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, TIME_FORMAT) {
        return Ok(dt.format(TIME_FORMAT).to_string());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M") {
        return Ok(dt.format(TIME_FORMAT).to_string());
    }
    if let Ok(t) = NaiveTime::parse_from_str(raw, "%H:%M") {
        let today = Local::now().date_naive();
        return Ok(NaiveDateTime::new(today, t).format(TIME_FORMAT).to_string());
    }
    Err(anyhow!(
        "Unrecognized reminder time '{}'. Use 'YYYY-MM-DD HH:MM' or 'HH:MM'.",
        raw
    ))
}

fn print_usage() {
    println!("{}", "remedi - medicine recognition assistant".bold());
    println!();
    println!("Usage:");
    println!("  remedi init                      Prepare .remedi/ in this directory");
    println!("  remedi scan <photo> [--remind <time>] [--every <text>]");
    println!("                                   Recognize one photo and store it");
    println!("  remedi batch <dir>               Scan every photo under a directory");
    println!("  remedi watch                     Watch the inbox for new photos");
    println!("  remedi due                       Show reminders whose time has come");
    println!("  remedi done <id>                 Mark a reminder as taken");
    println!("  remedi list                      List every stored medicine");
    println!("  remedi tokens <text>             Tokenize label text (debug aid)");
    println!();
    println!("Reminder times accept 'YYYY-MM-DD HH:MM:SS', 'YYYY-MM-DD HH:MM' or 'HH:MM'.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_value_picks_the_following_arg() {
        let args: Vec<String> = ["photo.jpg", "--remind", "21:00", "--every", "twice a day"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(flag_value(&args, "--remind"), Some("21:00"));
        assert_eq!(flag_value(&args, "--every"), Some("twice a day"));
        assert_eq!(flag_value(&args, "--missing"), None);
    }

    #[test]
    fn test_reminder_time_forms() {
        assert_eq!(
            resolve_reminder_time("2026-09-01 21:00:00").unwrap(),
            "2026-09-01 21:00:00"
        );
        assert_eq!(
            resolve_reminder_time("2026-09-01 21:00").unwrap(),
            "2026-09-01 21:00:00"
        );

        let today = Local::now().date_naive();
        let evening = resolve_reminder_time("21:15").unwrap();
        assert_eq!(evening, format!("{} 21:15:00", today.format("%Y-%m-%d")));

        assert!(resolve_reminder_time("nonsense").is_err());
    }
}
