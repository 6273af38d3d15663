//! Rendering of page snapshots.

use sandwich_lab_models::TokenMetadata;
use sandwich_lab_scanner::PageSnapshot;
use serde::Serialize;

/// Symbols to print next to amounts, falling back to generic names.
fn symbols(token_metadata: Option<&TokenMetadata>) -> (&str, &str, &str) {
    match token_metadata {
        Some(meta) => (&meta.base_symbol, &meta.quote_symbol, &meta.native_symbol),
        None => ("BASE", "QUOTE", "NATIVE"),
    }
}

fn short_hash(hash: &str) -> String {
    if hash.len() > 14 {
        format!("{}…{}", &hash[..8], &hash[hash.len() - 4..])
    } else {
        hash.to_string()
    }
}

pub fn print_table(snapshot: &PageSnapshot) {
    let (base, quote, _) = symbols(snapshot.token_metadata.as_ref());

    println!(
        "page {} | {} blocks scanned | state {:?}",
        snapshot.page, snapshot.total_blocks_scanned, snapshot.state
    );
    println!(
        "{:>10}  {:<14}  {:<14}  {:>7}  {:>22}  {:>22}  {:>10}",
        "block",
        "frontrun",
        "backrun",
        "victims",
        format!("profit ({})", base),
        format!("profit ({})", quote),
        "gas"
    );

    for entry in &snapshot.sandwiches {
        println!(
            "{:>10}  {:<14}  {:<14}  {:>7}  {:>22}  {:>22}  {:>10}",
            entry.sandwich.block_number,
            short_hash(&entry.sandwich.frontrun.hash),
            short_hash(&entry.sandwich.backrun.hash),
            entry.analysis.victim_count,
            entry.analysis.base_profit.normalize(),
            entry.analysis.quote_profit.normalize(),
            entry.analysis.gas_cost
        );
    }

    let summary = snapshot.summary();
    println!(
        "{} sandwiches ({} profitable), {} victims, net {} {} / {} {}, {} gas",
        summary.count,
        summary.profitable_count,
        summary.victim_count,
        summary.base_profit.normalize(),
        base,
        summary.quote_profit.normalize(),
        quote,
        summary.gas_cost
    );
    if snapshot.failed {
        println!("scan failed: {}", snapshot.error_message);
    }
    println!();
}

pub fn print_json(snapshot: &PageSnapshot) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(snapshot)?);
    Ok(())
}

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    block_number: u64,
    frontrun_hash: &'a str,
    backrun_hash: &'a str,
    victim_count: usize,
    base_symbol: &'a str,
    base_profit: String,
    quote_symbol: &'a str,
    quote_profit: String,
    native_symbol: &'a str,
    gas_cost: u64,
}

/// CSV writer for exported pages, one row per sandwich.
pub struct CsvExport {
    writer: csv::Writer<std::fs::File>,
    rows: usize,
}

impl CsvExport {
    pub fn create(path: &str) -> anyhow::Result<Self> {
        Ok(Self {
            writer: csv::Writer::from_path(path)?,
            rows: 0,
        })
    }

    pub fn write_page(&mut self, snapshot: &PageSnapshot) -> anyhow::Result<()> {
        let (base_symbol, quote_symbol, native_symbol) = symbols(snapshot.token_metadata.as_ref());

        for entry in &snapshot.sandwiches {
            self.writer.serialize(ExportRow {
                block_number: entry.sandwich.block_number,
                frontrun_hash: &entry.sandwich.frontrun.hash,
                backrun_hash: &entry.sandwich.backrun.hash,
                victim_count: entry.analysis.victim_count,
                base_symbol,
                base_profit: entry.analysis.base_profit.normalize().to_string(),
                quote_symbol,
                quote_profit: entry.analysis.quote_profit.normalize().to_string(),
                native_symbol,
                gas_cost: entry.analysis.gas_cost,
            })?;
            self.rows += 1;
        }
        Ok(())
    }

    /// Flush and return the number of rows written.
    pub fn finish(mut self) -> anyhow::Result<usize> {
        self.writer.flush()?;
        Ok(self.rows)
    }
}
