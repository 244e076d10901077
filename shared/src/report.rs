//! Dashboard reducers over in-memory snapshots.
//!
//! Everything in here is a pure function of its input slice and can be
//! recomputed from the store at any time. Missing numeric fields count as zero.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::stock::{self, StockLevel, StockStatus};
use crate::{OrderStatus, TransactionType};

pub const UNCATEGORIZED: &str = "Uncategorized";

/// One product as shown on the stock screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockItem {
    pub id: i32,
    pub code: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub category_id: Option<i32>,
    pub unit_price: BigDecimal,
    pub current_stock: i32,
    pub reorder_level: i32,
    pub status: StockStatus,
    pub last_updated: DateTime<Utc>,
}

/// One purchase order joined with its product and supplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub order_id: i32,
    pub product_id: i32,
    pub supplier_id: i32,
    pub order_date: DateTime<Utc>,
    pub quantity_ordered: i32,
    pub product_name: Option<String>,
    /// Current price of the product, not the price at order time.
    pub unit_price: Option<BigDecimal>,
    pub supplier_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StockFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockSummary {
    pub total_products: usize,
    pub total_quantity: i64,
    pub total_value: BigDecimal,
    pub low_stock: usize,
    pub out_of_stock: usize,
    /// Share of products in stock, as a whole percentage. `None` when empty.
    pub health_score: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelBucket {
    pub stock_level: StockLevel,
    pub product_count: usize,
    pub total_quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStock {
    pub category_name: String,
    pub total_stock: i64,
    pub product_count: usize,
    pub avg_stock_per_product: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrderSummary {
    pub total_orders: usize,
    pub pending: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub total_value: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyOrders {
    pub date: NaiveDate,
    pub total_orders: usize,
    pub total_revenue: BigDecimal,
    pub avg_order_value: BigDecimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransactionSummary {
    pub total_transactions: usize,
    pub inbound_quantity: i64,
    pub outbound_quantity: i64,
    pub adjustments: usize,
}

impl StockItem {
    pub fn value(&self) -> BigDecimal {
        self.unit_price.clone() * BigDecimal::from(self.current_stock)
    }
}

impl OrderLine {
    /// `quantity × current unit price`; zero when the product has no price.
    pub fn total_amount(&self) -> BigDecimal {
        match &self.unit_price {
            Some(price) => price.clone() * BigDecimal::from(self.quantity_ordered),
            None => BigDecimal::zero(),
        }
    }
}

impl StockFilter {
    pub fn matches(&self, item: &StockItem) -> bool {
        let search = non_empty(&self.search).map(str::to_lowercase);
        let matches_search = search.map_or(true, |needle| {
            item.name.to_lowercase().contains(&needle) || item.code.to_lowercase().contains(&needle)
        });
        let matches_category =
            non_empty(&self.category).map_or(true, |category| item.category == category);
        let matches_status =
            non_empty(&self.status).map_or(true, |status| item.status.as_str() == status);

        matches_search && matches_category && matches_status
    }

    pub fn apply(&self, items: Vec<StockItem>) -> Vec<StockItem> {
        items.into_iter().filter(|item| self.matches(item)).collect()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl StockSummary {
    pub fn from_items(items: &[StockItem]) -> Self {
        let mut summary = StockSummary {
            total_products: items.len(),
            total_quantity: 0,
            total_value: BigDecimal::zero(),
            low_stock: 0,
            out_of_stock: 0,
            health_score: None,
        };

        for item in items {
            summary.total_quantity += i64::from(item.current_stock);
            summary.total_value += item.value();
            match item.status {
                StockStatus::LowStock => summary.low_stock += 1,
                StockStatus::OutOfStock => summary.out_of_stock += 1,
                StockStatus::InStock => {}
            }
        }

        if summary.total_products > 0 {
            let healthy = summary.total_products - summary.low_stock - summary.out_of_stock;
            let score = (healthy as f64 / summary.total_products as f64 * 100.0).round();
            summary.health_score = Some(score as u32);
        }

        summary
    }
}

/// Product counts per dashboard bucket, in bucket order, empty buckets omitted.
pub fn stock_distribution(items: &[StockItem]) -> Vec<LevelBucket> {
    let mut buckets: BTreeMap<StockLevel, (usize, i64)> = BTreeMap::new();
    for item in items {
        let entry = buckets
            .entry(stock::level(item.current_stock, item.reorder_level))
            .or_default();
        entry.0 += 1;
        entry.1 += i64::from(item.current_stock);
    }

    buckets
        .into_iter()
        .map(|(stock_level, (product_count, total_quantity))| LevelBucket {
            stock_level,
            product_count,
            total_quantity,
        })
        .collect()
}

/// Units per category, largest first.
pub fn stock_by_category(items: &[StockItem]) -> Vec<CategoryStock> {
    let mut groups: HashMap<&str, (i64, usize)> = HashMap::new();
    for item in items {
        let entry = groups.entry(item.category.as_str()).or_default();
        entry.0 += i64::from(item.current_stock);
        entry.1 += 1;
    }

    let mut rows: Vec<CategoryStock> = groups
        .into_iter()
        .map(|(name, (total_stock, product_count))| CategoryStock {
            category_name: name.to_string(),
            total_stock,
            product_count,
            avg_stock_per_product: total_stock as f64 / product_count as f64,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.total_stock
            .cmp(&a.total_stock)
            .then_with(|| a.category_name.cmp(&b.category_name))
    });
    rows
}

/// The category with the most products; ties go to the alphabetically first.
pub fn most_common_category(items: &[StockItem]) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for item in items {
        *counts.entry(item.category.as_str()).or_default() += 1;
    }

    counts
        .into_iter()
        .max_by(|(a_name, a_count), (b_name, b_count)| {
            a_count.cmp(b_count).then_with(|| b_name.cmp(a_name))
        })
        .map(|(name, _)| name.to_string())
}

impl OrderSummary {
    pub fn from_lines(lines: &[OrderLine]) -> Self {
        lines.iter().fold(OrderSummary::default(), |mut summary, line| {
            summary.total_orders += 1;
            match line.status {
                OrderStatus::Pending => summary.pending += 1,
                OrderStatus::Completed => summary.completed += 1,
                OrderStatus::Cancelled => summary.cancelled += 1,
            }
            summary.total_value += line.total_amount();
            summary
        })
    }
}

/// Per-day order totals for the `days` days ending at `now`, newest first.
pub fn daily_order_trends(lines: &[OrderLine], now: DateTime<Utc>, days: i64) -> Vec<DailyOrders> {
    let since = now - Duration::days(days);
    let mut per_day: BTreeMap<NaiveDate, (usize, BigDecimal)> = BTreeMap::new();

    for line in lines.iter().filter(|l| l.order_date >= since && l.order_date <= now) {
        let entry = per_day
            .entry(line.order_date.date_naive())
            .or_insert_with(|| (0, BigDecimal::zero()));
        entry.0 += 1;
        entry.1 += line.total_amount();
    }

    per_day
        .into_iter()
        .rev()
        .map(|(date, (total_orders, total_revenue))| {
            let avg_order_value =
                (total_revenue.clone() / BigDecimal::from(total_orders as u64)).round(2);
            DailyOrders {
                date,
                total_orders,
                total_revenue,
                avg_order_value,
            }
        })
        .collect()
}

pub fn status_distribution(lines: &[OrderLine]) -> Vec<StatusCount> {
    [OrderStatus::Pending, OrderStatus::Completed, OrderStatus::Cancelled]
        .into_iter()
        .map(|status| StatusCount {
            status,
            count: lines.iter().filter(|l| l.status == status).count(),
        })
        .filter(|row| row.count > 0)
        .collect()
}

impl TransactionSummary {
    pub fn from_movements<I>(movements: I) -> Self
    where
        I: IntoIterator<Item = (TransactionType, i32)>,
    {
        movements
            .into_iter()
            .fold(TransactionSummary::default(), |mut summary, (kind, quantity)| {
                summary.total_transactions += 1;
                match kind {
                    TransactionType::In => summary.inbound_quantity += i64::from(quantity),
                    TransactionType::Out => summary.outbound_quantity += i64::from(quantity),
                    TransactionType::Adjustment => summary.adjustments += 1,
                }
                summary
            })
    }
}
