use remedi::nlp::{LabelExtractor, LabelTokenizer};
use std::io::Read;

/// Field-extraction scratchpad: feed it label text, see what the regex
/// layer and the tokenizer make of it. No model, no network, no database.
fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let text = if args.is_empty() {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        args.join(" ")
    };

    if text.trim().is_empty() {
        println!("Usage: remedi-extract <label text>   (or pipe text on stdin)");
        return Ok(());
    }

    let extractor = LabelExtractor::new();
    let fields = extractor.extract(&text);

    println!("🔍 Extracted fields:");
    println!("   Medicine Name: {}", fields.name);
    println!(
        "   Dosage:        {}",
        if fields.dosage.is_empty() {
            "Not Found"
        } else {
            fields.dosage.as_str()
        }
    );
    println!(
        "   Expiry Date:   {}",
        if fields.expiry.is_empty() {
            "Not Found"
        } else {
            fields.expiry.as_str()
        }
    );
    match extractor.expiry_date(&fields.expiry) {
        Some(date) => println!("   Parsed expiry: {}", date),
        None => println!("   Parsed expiry: -"),
    }

    match LabelTokenizer::new(None) {
        Ok(tokenizer) => {
            let tokens = tokenizer.tokenize(&text)?;
            println!("🔤 {} tokens: {}", tokens.len(), tokens.join(" | "));
        }
        Err(e) => {
            eprintln!("(tokenizer unavailable: {})", e);
        }
    }

    Ok(())
}
