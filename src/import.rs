// 📂 CSV Import - Load line items from a name,price,quantity file

use crate::normalizer::LineItem;
use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

pub fn load_csv(csv_path: &Path) -> Result<Vec<LineItem>> {
    let rdr = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open CSV file {}", csv_path.display()))?;
    read_items(rdr)
}

/// Read line items from any CSV source with a `name,price,quantity` header.
pub fn load_csv_from_reader<R: Read>(reader: R) -> Result<Vec<LineItem>> {
    read_items(csv::Reader::from_reader(reader))
}

fn read_items<R: Read>(mut rdr: csv::Reader<R>) -> Result<Vec<LineItem>> {
    let mut items = Vec::new();

    for (line, result) in rdr.deserialize().enumerate() {
        // +2: header is line 1
        let item: LineItem =
            result.with_context(|| format!("Failed to deserialize line item on line {}", line + 2))?;
        items.push(item);
    }

    Ok(items)
}
