//! Import command - load the data directory and report what was stored.

use colored::Colorize;
use meetupdb::TableKind;

use crate::cli::{GlobalOptions, OutputFormat};

pub fn run(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    let db = super::open_db(global)?;
    let report = db.import_report();

    if global.output_format() != OutputFormat::Text {
        let tables: serde_json::Map<String, serde_json::Value> = TableKind::ALL
            .iter()
            .map(|kind| {
                let stats = report.table(*kind);
                (
                    kind.table_name().to_string(),
                    serde_json::json!({
                        "inserted": stats.inserted,
                        "deduplicated": stats.deduplicated,
                    }),
                )
            })
            .collect();
        let summary = serde_json::json!({
            "data_dir": global.data_dir,
            "database": global.database,
            "tables": tables,
            "event_ids": report.event_ids,
        });
        match global.output_format() {
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&summary)?),
            _ => println!("{}", serde_json::to_string_pretty(&summary)?),
        }
        return Ok(());
    }

    println!(
        "{} {}",
        "Imported".cyan().bold(),
        global.data_dir.display().to_string().white()
    );
    if let Some(path) = &global.database {
        println!("  Stored in {}", path.display());
    }
    println!();

    println!("{:<16} {:>9} {:>9}", "Table".bold(), "new".bold(), "existing".bold());
    for kind in TableKind::ALL {
        let stats = report.table(kind);
        println!("{:<16} {:>9} {:>9}", kind.table_name(), stats.inserted, stats.deduplicated);
    }
    println!();

    if report.is_noop() {
        println!("{}", "Nothing new to store.".green());
    } else {
        println!(
            "{} {} rows, {} events",
            "Stored".green(),
            report.stats.total_inserted(),
            report.event_ids.len()
        );
    }
    Ok(())
}
