//! CSV rendering of stock reports.

use chrono::{DateTime, Utc};
use std::io::Write;

use crate::report::{StockItem, StockSummary};
use crate::stock::StockStatus;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

const DETAIL_HEADERS: [&str; 11] = [
    "Product ID",
    "Product Name",
    "Category",
    "Current Stock",
    "Unit Price",
    "Stock Value",
    "Reorder Level",
    "Stock Status",
    "Stock Health",
    "Last Updated",
    "Days Since Update",
];

const ALERT_HEADERS: [&str; 7] = [
    "Product ID",
    "Product Name",
    "Category",
    "Current Stock",
    "Reorder Level",
    "Shortfall",
    "Stock Status",
];

/// Full stock report: a summary section followed by one row per product.
pub fn stock_report(items: &[StockItem], generated_at: DateTime<Utc>) -> Result<Vec<u8>, ExportError> {
    let summary = StockSummary::from_items(items);
    let health = summary
        .health_score
        .map(|score| format!("{score}%"))
        .unwrap_or_else(|| "N/A".to_string());
    let summary_rows = vec![
        vec!["Total Products".to_string(), summary.total_products.to_string()],
        vec![
            "Total Stock Value".to_string(),
            format!("${}", summary.total_value.with_scale(2)),
        ],
        vec!["Low Stock Items".to_string(), summary.low_stock.to_string()],
        vec!["Out of Stock Items".to_string(), summary.out_of_stock.to_string()],
        vec!["Stock Health Score".to_string(), health],
    ];

    let detail_rows: Vec<Vec<String>> = items
        .iter()
        .map(|item| {
            vec![
                item.code.clone(),
                item.name.clone(),
                item.category.clone(),
                item.current_stock.to_string(),
                item.unit_price.with_scale(2).to_string(),
                item.value().with_scale(2).to_string(),
                item.reorder_level.to_string(),
                item.status.as_str().to_string(),
                item.status.health().as_str().to_string(),
                item.last_updated.format("%Y-%m-%d").to_string(),
                (generated_at - item.last_updated).num_days().max(0).to_string(),
            ]
        })
        .collect();

    let mut out = Vec::new();
    write_section(&mut out, "Stock Summary", generated_at, &["Metric", "Value"], summary_rows)?;
    writeln!(out)?;
    write_section(&mut out, "Stock Details", generated_at, &DETAIL_HEADERS, detail_rows)?;
    Ok(out)
}

/// Products that need reordering, with how far below their reorder level they are.
pub fn low_stock_alert(items: &[StockItem], generated_at: DateTime<Utc>) -> Result<Vec<u8>, ExportError> {
    let rows: Vec<Vec<String>> = items
        .iter()
        .filter(|item| item.status != StockStatus::InStock)
        .map(|item| {
            vec![
                item.code.clone(),
                item.name.clone(),
                item.category.clone(),
                item.current_stock.to_string(),
                item.reorder_level.to_string(),
                (item.reorder_level - item.current_stock).max(0).to_string(),
                item.status.as_str().to_string(),
            ]
        })
        .collect();

    let mut out = Vec::new();
    write_section(&mut out, "Low Stock Alert", generated_at, &ALERT_HEADERS, rows)?;
    Ok(out)
}

fn write_section<W: Write>(
    out: &mut W,
    title: &str,
    generated_at: DateTime<Utc>,
    headers: &[&str],
    rows: Vec<Vec<String>>,
) -> Result<(), ExportError> {
    writeln!(out, "# {} REPORT", title.to_uppercase())?;
    writeln!(out, "# Generated on: {}", generated_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
    writeln!(out, "# Total Records: {}", rows.len())?;
    writeln!(out)?;

    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}
