//! Show command: read-only package inspection

use anyhow::{Context, Result};

use msikit_core::{schema, OpenMode, Package};

use crate::cli::ShowArgs;

pub fn run(args: ShowArgs) -> Result<()> {
    let package = Package::open(&args.package, OpenMode::ReadOnly)
        .with_context(|| format!("opening {}", args.package.display()))?;

    match &args.table {
        Some(table) => {
            let rows = package
                .rows(table)
                .with_context(|| format!("reading table {table}"))?;
            for row in rows {
                let fields: Vec<String> = row
                    .fields()
                    .map(|(name, value)| format!("{name}={value}"))
                    .collect();
                println!("{}", fields.join("  "));
            }
        }
        None => {
            for def in schema::builtin() {
                let count = package.rows(def.name)?.len();
                if count > 0 {
                    println!("{:<24} {count} rows", def.name);
                }
            }
        }
    }
    Ok(())
}
