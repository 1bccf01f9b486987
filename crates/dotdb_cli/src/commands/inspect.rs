//! Info and export commands.

use dotdb_core::{Database, DatabaseInfo, Format};
use serde_json::json;
use std::fs;
use std::path::Path;

/// Prints database statistics and metadata.
pub fn info(db: &Database, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let info = db.info()?;
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&info_json(&info))?),
        _ => print_text_output(&info),
    }
    Ok(())
}

/// Renders the stored tree in `format`, to `output` or stdout.
pub fn export(
    db: &Database,
    format: &str,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let format = Format::from_extension(format)?;
    let text = db.export(format)?;
    match output {
        Some(path) => {
            fs::write(path, &text)?;
            println!("✓ Exported {format} to {}", path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn info_json(info: &DatabaseInfo) -> serde_json::Value {
    let tables: serde_json::Map<_, _> = info
        .tables
        .iter()
        .map(|(name, rows)| (name.clone(), json!(rows)))
        .collect();
    json!({
        "file": info.file,
        "format": info.format.extension(),
        "keys": info.keys,
        "tables": tables,
        "backups": info.backups,
        "stats": {
            "reads": info.stats.reads,
            "writes": info.stats.writes,
            "deletes": info.stats.deletes,
            "queries": info.stats.queries,
            "saves": info.stats.saves,
            "backups": info.stats.backups,
            "restores": info.stats.restores,
            "errors": info.stats.errors,
        },
    })
}

fn print_text_output(info: &DatabaseInfo) {
    println!("DotDB Database Information");
    println!("==========================");
    println!("File:     {}", info.file.as_deref().unwrap_or("(in memory)"));
    println!("Format:   {}", info.format);
    println!("Keys:     {}", info.keys);
    println!("Tables:   {}", info.tables.len());
    for (name, rows) in &info.tables {
        println!("  {name}: {rows} rows");
    }
    println!("Backups:  {}", info.backups);
}
