use anyhow::{bail, Context, Result};
use std::env;
use std::path::Path;

// Use library instead of local modules
use item_ledger::{batch_stats, load_csv, normalize_batch, Config, Ledger, Stats};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let config = Config::from_env()?;

    match args.get(1).map(String::as_str) {
        Some("import") => {
            let csv_path = args.get(2).context("Usage: item-ledger import <file.csv>")?;
            run_import(&config, Path::new(csv_path))?;
        }
        Some("list") => {
            let limit = match args.get(2) {
                Some(raw) => Some(raw.parse::<i64>().context("limit must be a number")?),
                None => None,
            };
            run_list(&config, limit)?;
        }
        Some("stats") => run_stats(&config)?,
        Some("clear") => run_clear(&config)?,
        _ => {
            print_usage();
            bail!("unknown or missing command");
        }
    }

    Ok(())
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  item-ledger import <file.csv>   Accumulate name,price,quantity rows");
    eprintln!("  item-ledger list [limit]        Show stored items, newest first");
    eprintln!("  item-ledger stats               Show stats for the whole ledger");
    eprintln!("  item-ledger clear               Remove every item");
}

fn open_ledger(config: &Config) -> Result<Ledger> {
    Ledger::open_with_timeout(&config.db_path, config.busy_timeout)
        .with_context(|| format!("Failed to open ledger at {}", config.db_path.display()))
}

fn run_import(config: &Config, csv_path: &Path) -> Result<()> {
    println!("📂 Loading {}...", csv_path.display());
    let items = load_csv(csv_path)?;
    println!("✓ Loaded {} line items", items.len());

    let rows = normalize_batch(&items).context("Import rejected, nothing was saved")?;

    let ledger = open_ledger(config)?;
    let (outcome, global) = ledger.bulk_accumulate_with_stats(&rows)?;
    println!(
        "✓ Saved: {} new items, {} accumulated into existing items",
        outcome.created, outcome.accumulated
    );

    print_stats("Batch", &batch_stats(&rows));
    print_stats("Ledger", &global);

    Ok(())
}

fn run_list(config: &Config, limit: Option<i64>) -> Result<()> {
    let ledger = open_ledger(config)?;
    let items = ledger.list(limit)?;

    println!("{:>6}  {:<30} {:>12} {:>8}  created", "id", "name", "price", "qty");
    for item in &items {
        println!(
            "{:>6}  {:<30} {:>12} {:>8}  {}",
            item.id,
            item.name,
            item.price.to_string(),
            item.quantity,
            item.created_at.to_rfc3339()
        );
    }
    println!("\n{} items shown ({} total)", items.len(), ledger.count()?);

    Ok(())
}

fn run_stats(config: &Config) -> Result<()> {
    let ledger = open_ledger(config)?;
    print_stats("Ledger", &ledger.global_stats()?);
    Ok(())
}

fn run_clear(config: &Config) -> Result<()> {
    let ledger = open_ledger(config)?;
    let removed = ledger.clear_all()?;
    println!("✓ Cleared {} items", removed);
    Ok(())
}

fn print_stats(label: &str, stats: &Stats) {
    println!("\n📊 {} stats", label);
    println!("   Line items:     {}", stats.line_item_count);
    println!("   Total quantity: {}", stats.total_quantity);
    println!("   Total cost:     {:.2}", stats.total_cost);
    println!("   Avg unit price: {:.2}", stats.avg_unit_price);
    println!("   Avg line cost:  {:.2}", stats.avg_line_cost);
}
