//! Status command handler

use anyhow::Result;

use golem_db::Database;

use crate::output::{Output, OutputFormat};

/// Show schema version and per-table row counts
pub fn show(db: &Database, output: &Output) -> Result<()> {
    let stored = db.stored_version()?;
    let counts = db.table_counts()?;

    match output.format {
        OutputFormat::Json => {
            let tables: serde_json::Map<String, serde_json::Value> = counts
                .iter()
                .map(|(name, count)| (name.to_string(), (*count).into()))
                .collect();
            println!(
                "{:#}",
                serde_json::json!({
                    "path": db.path().display().to_string(),
                    "schema_version": {
                        "stored": stored,
                        "expected": db.schema_version()
                    },
                    "tables": tables
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", stored);
        }
        OutputFormat::Human => {
            println!("Golem Database Status");
            println!("=====================");
            println!();
            println!("Database: {}", db.path().display());
            println!(
                "Schema:   version {} (expected {})",
                stored,
                db.schema_version()
            );
            println!();
            println!("Tables:");
            for (name, count) in &counts {
                println!("  {:<20} {}", name, count);
            }
            println!();
            println!("{} row(s) total", counts.iter().map(|(_, n)| n).sum::<i64>());
        }
    }

    Ok(())
}
