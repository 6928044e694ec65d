//! CSV export of occurrence lists.

use crate::{Occurrence, Result};
use std::fs::File;
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow<'a> {
    date: String,
    name: &'a str,
    billing_cycle: &'static str,
    price: Option<f64>,
    category: Option<&'a str>,
    unique_key: &'a str,
}

impl<'a> From<&'a Occurrence> for CsvRow<'a> {
    fn from(occurrence: &'a Occurrence) -> Self {
        let sub = &occurrence.subscription;
        CsvRow {
            date: occurrence.date.format("%Y-%m-%d").to_string(),
            name: sub.name(),
            billing_cycle: sub.billing_cycle().as_str(),
            price: sub.price(),
            category: sub.category(),
            unique_key: sub.unique_key(),
        }
    }
}

/// Write occurrences to a CSV file, replacing any existing file.
///
/// Returns the number of rows written. The header row is always present.
pub fn write_occurrences_csv(path: &Path, occurrences: &[Occurrence]) -> Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    // Written explicitly so an empty export still has headers
    writer.write_record([
        "date",
        "name",
        "billing_cycle",
        "price",
        "category",
        "unique_key",
    ])?;

    for occurrence in occurrences {
        writer.serialize(CsvRow::from(occurrence))?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!("Exported {} occurrences to {:?}", occurrences.len(), path);
    Ok(occurrences.len())
}
