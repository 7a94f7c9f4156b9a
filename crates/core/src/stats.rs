//! Vendor dashboard statistics.
//!
//! A single reduction over the restaurant's order snapshots: counts per
//! status, revenue inside a time window and the best-selling menu item.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{MenuItemId, OrderStatus, round_money};

/// Time window the dashboard aggregates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatsWindow {
    /// Since midnight in the restaurant's local offset.
    Today,
    #[default]
    Last7Days,
    Last30Days,
    AllTime,
}

impl StatsWindow {
    /// Inclusive lower bound of the window, `None` for all time.
    ///
    /// `offset` only matters for [`StatsWindow::Today`], which starts at the
    /// local midnight of `now`.
    #[must_use]
    pub fn starts_at(self, now: DateTime<Utc>, offset: FixedOffset) -> Option<DateTime<Utc>> {
        match self {
            Self::Today => now
                .with_timezone(&offset)
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .and_then(|midnight| midnight.and_local_timezone(offset).single())
                .map(|midnight| midnight.with_timezone(&Utc)),
            Self::Last7Days => Some(now - TimeDelta::days(7)),
            Self::Last30Days => Some(now - TimeDelta::days(30)),
            Self::AllTime => None,
        }
    }
}

impl FromStr for StatsWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "today" => Ok(Self::Today),
            "7d" => Ok(Self::Last7Days),
            "30d" => Ok(Self::Last30Days),
            "all" => Ok(Self::AllTime),
            _ => Err(format!("invalid stats window: {s}")),
        }
    }
}

/// Quantity of one menu item sold in an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoldLine {
    pub menu_item_id: MenuItemId,
    pub name: String,
    pub quantity: i32,
}

/// The parts of an order the dashboard needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub status: OrderStatus,
    pub placed_at: DateTime<Utc>,
    pub total: Decimal,
    pub lines: Vec<SoldLine>,
}

/// Best-selling menu item in the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopItem {
    pub menu_item_id: MenuItemId,
    pub name: String,
    pub quantity: i64,
}

/// Aggregated dashboard figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorStats {
    pub window: StatsWindow,
    pub total_orders: u64,
    /// Every status is present, zero-filled.
    pub orders_by_status: BTreeMap<OrderStatus, u64>,
    /// Orders not yet delivered, rejected or cancelled.
    pub pending_orders: u64,
    /// Sum of delivered order totals.
    pub revenue: Decimal,
    pub average_order_value: Decimal,
    pub top_item: Option<TopItem>,
}

/// Aggregate `orders` placed inside `window`.
///
/// Revenue only counts delivered orders. The top item is ranked by quantity
/// over every order that was not rejected or cancelled; ties go to the name
/// that sorts first, then the lower id.
#[must_use]
pub fn compute(
    orders: &[OrderSnapshot],
    window: StatsWindow,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> VendorStats {
    let since = window.starts_at(now, offset);

    let mut orders_by_status: BTreeMap<OrderStatus, u64> =
        OrderStatus::ALL.into_iter().map(|s| (s, 0)).collect();
    let mut total_orders = 0_u64;
    let mut delivered = 0_u64;
    let mut revenue = Decimal::ZERO;
    let mut sold: HashMap<MenuItemId, (String, i64)> = HashMap::new();

    for order in orders
        .iter()
        .filter(|o| since.is_none_or(|start| o.placed_at >= start) && o.placed_at <= now)
    {
        total_orders += 1;
        *orders_by_status.entry(order.status).or_insert(0) += 1;

        if order.status == OrderStatus::Delivered {
            delivered += 1;
            revenue += order.total;
        }

        if matches!(order.status, OrderStatus::Rejected | OrderStatus::Cancelled) {
            continue;
        }
        for line in &order.lines {
            let entry = sold
                .entry(line.menu_item_id)
                .or_insert_with(|| (line.name.clone(), 0));
            entry.1 += i64::from(line.quantity);
        }
    }

    let pending_orders = orders_by_status
        .iter()
        .filter(|(status, _)| status.is_active())
        .map(|(_, count)| count)
        .sum();

    let average_order_value = if delivered == 0 {
        Decimal::ZERO
    } else {
        round_money(revenue / Decimal::from(delivered))
    };

    let top_item = sold
        .into_iter()
        .map(|(menu_item_id, (name, quantity))| TopItem {
            menu_item_id,
            name,
            quantity,
        })
        .min_by(|a, b| {
            b.quantity
                .cmp(&a.quantity)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.menu_item_id.cmp(&b.menu_item_id))
        });

    VendorStats {
        window,
        total_orders,
        orders_by_status,
        pending_orders,
        revenue: round_money(revenue),
        average_order_value,
        top_item,
    }
}

/// Star-rating summary for a restaurant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub count: u64,
    /// Mean rating to one decimal place, `None` without reviews.
    pub average: Option<Decimal>,
    /// Number of 1..=5 star ratings, index 0 is one star.
    pub distribution: [u64; 5],
}

impl RatingSummary {
    /// Summarize ratings; values outside 1..=5 are ignored.
    #[must_use]
    pub fn from_ratings(ratings: &[i16]) -> Self {
        let mut distribution = [0_u64; 5];
        let mut sum = 0_i64;
        let mut count = 0_u64;

        for &rating in ratings {
            let Some(bucket) = usize::try_from(i32::from(rating) - 1)
                .ok()
                .and_then(|idx| distribution.get_mut(idx))
            else {
                continue;
            };
            *bucket += 1;
            sum += i64::from(rating);
            count += 1;
        }

        let average = (count > 0).then(|| {
            (Decimal::from(sum) / Decimal::from(count))
                .round_dp_with_strategy(1, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
        });

        Self {
            count,
            average,
            distribution,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 20, 15, 0, 0).unwrap()
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn order(
        status: OrderStatus,
        hours_ago: i64,
        total: &str,
        lines: &[(i32, &str, i32)],
    ) -> OrderSnapshot {
        OrderSnapshot {
            status,
            placed_at: now() - TimeDelta::hours(hours_ago),
            total: dec(total),
            lines: lines
                .iter()
                .map(|&(id, name, quantity)| SoldLine {
                    menu_item_id: MenuItemId::new(id),
                    name: name.to_string(),
                    quantity,
                })
                .collect(),
        }
    }

    #[test]
    fn test_empty_orders() {
        let stats = compute(&[], StatsWindow::AllTime, now(), utc());
        assert_eq!(stats.total_orders, 0);
        assert_eq!(stats.revenue, Decimal::ZERO);
        assert_eq!(stats.average_order_value, Decimal::ZERO);
        assert!(stats.top_item.is_none());
        assert_eq!(stats.orders_by_status.len(), OrderStatus::ALL.len());
        assert!(stats.orders_by_status.values().all(|&n| n == 0));
    }

    #[test]
    fn test_revenue_counts_only_delivered() {
        let orders = [
            order(OrderStatus::Delivered, 1, "20.00", &[]),
            order(OrderStatus::Delivered, 2, "15.00", &[]),
            order(OrderStatus::Preparing, 1, "99.00", &[]),
            order(OrderStatus::Cancelled, 1, "50.00", &[]),
        ];
        let stats = compute(&orders, StatsWindow::Today, now(), utc());
        assert_eq!(stats.total_orders, 4);
        assert_eq!(stats.revenue, dec("35.00"));
        assert_eq!(stats.average_order_value, dec("17.50"));
        assert_eq!(stats.pending_orders, 1);
        assert_eq!(stats.orders_by_status[&OrderStatus::Delivered], 2);
        assert_eq!(stats.orders_by_status[&OrderStatus::Cancelled], 1);
    }

    #[test]
    fn test_window_filters_orders() {
        let orders = [
            order(OrderStatus::Delivered, 2, "10.00", &[]),
            order(OrderStatus::Delivered, 24 * 3, "20.00", &[]),
            order(OrderStatus::Delivered, 24 * 10, "40.00", &[]),
            order(OrderStatus::Delivered, 24 * 45, "80.00", &[]),
        ];
        assert_eq!(compute(&orders, StatsWindow::Today, now(), utc()).revenue, dec("10"));
        assert_eq!(compute(&orders, StatsWindow::Last7Days, now(), utc()).revenue, dec("30"));
        assert_eq!(compute(&orders, StatsWindow::Last30Days, now(), utc()).revenue, dec("70"));
        assert_eq!(compute(&orders, StatsWindow::AllTime, now(), utc()).revenue, dec("150"));
    }

    #[test]
    fn test_top_item_by_quantity_excluding_cancelled() {
        let orders = [
            order(OrderStatus::Delivered, 1, "0", &[(1, "Samosa", 2), (2, "Dosa", 1)]),
            order(OrderStatus::Placed, 1, "0", &[(2, "Dosa", 2)]),
            order(OrderStatus::Cancelled, 1, "0", &[(1, "Samosa", 10)]),
        ];
        let top = compute(&orders, StatsWindow::Today, now(), utc()).top_item.unwrap();
        assert_eq!(top.menu_item_id, MenuItemId::new(2));
        assert_eq!(top.quantity, 3);
    }

    #[test]
    fn test_top_item_tie_breaks_on_name() {
        let orders = [order(
            OrderStatus::Delivered,
            1,
            "0",
            &[(9, "Biryani", 3), (4, "Vada", 3)],
        )];
        let top = compute(&orders, StatsWindow::Today, now(), utc()).top_item.unwrap();
        assert_eq!(top.name, "Biryani");
    }

    #[test]
    fn test_top_item_same_name_tie_breaks_on_lower_id() {
        let orders = [
            order(OrderStatus::Delivered, 1, "0", &[(12, "Thali", 2), (5, "Thali", 2)]),
            order(OrderStatus::Placed, 1, "0", &[(12, "Thali", 1), (5, "Thali", 1)]),
        ];
        let top = compute(&orders, StatsWindow::Today, now(), utc()).top_item.unwrap();
        assert_eq!(top.menu_item_id, MenuItemId::new(5));
        assert_eq!(top.quantity, 3);
    }

    #[test]
    fn test_stats_window_from_str() {
        assert_eq!("7d".parse::<StatsWindow>().unwrap(), StatsWindow::Last7Days);
        assert_eq!("all".parse::<StatsWindow>().unwrap(), StatsWindow::AllTime);
        assert!("week".parse::<StatsWindow>().is_err());
    }

    #[test]
    fn test_today_starts_at_midnight() {
        let start = StatsWindow::Today.starts_at(now(), utc()).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 5, 20, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_today_follows_local_midnight() {
        // 15:00 UTC is already 00:30 on the 21st at +09:30.
        let ahead = FixedOffset::east_opt(9 * 3600 + 1800).unwrap();
        let start = StatsWindow::Today.starts_at(now(), ahead).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 5, 20, 14, 30, 0).unwrap());

        // At -05:00 it is 10:00 on the 20th; the local day began at 05:00 UTC.
        let behind = FixedOffset::west_opt(5 * 3600).unwrap();
        let start = StatsWindow::Today.starts_at(now(), behind).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 5, 20, 5, 0, 0).unwrap());

        // An order from 01:00 UTC is yesterday in New York but today in UTC.
        let orders = [order(OrderStatus::Delivered, 14, "12.00", &[])];
        assert_eq!(compute(&orders, StatsWindow::Today, now(), utc()).revenue, dec("12"));
        assert_eq!(compute(&orders, StatsWindow::Today, now(), behind).revenue, dec("0"));
    }

    #[test]
    fn test_rating_summary() {
        let summary = RatingSummary::from_ratings(&[5, 4, 4, 0, 6, 3]);
        assert_eq!(summary.count, 4);
        assert_eq!(summary.distribution, [0, 0, 1, 2, 1]);
        assert_eq!(summary.average, Some(dec("4.0")));

        let empty = RatingSummary::from_ratings(&[]);
        assert_eq!(empty.count, 0);
        assert!(empty.average.is_none());
    }
}
