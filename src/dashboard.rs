// Tab views over the precomputed aggregates.
//
// Nothing here recomputes an aggregate; the views only sort, slice and
// print the tables handed to them.
use crate::config::Config;
use crate::output::print_table;
use crate::reports::Aggregates;
use crate::types::{CityCountRow, RfmRow, StateCountRow, TopCategoryRow};
use crate::util::{format_currency, format_int};
use std::cmp::Ordering;

const BEST_CUSTOMERS: usize = 5;
const TOP_LOCATIONS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    SalesPerformance,
    BestCustomer,
    TopCategories,
    OrderByTime,
    OrderByLocation,
}

impl Tab {
    pub const ALL: [Tab; 5] = [
        Tab::SalesPerformance,
        Tab::BestCustomer,
        Tab::TopCategories,
        Tab::OrderByTime,
        Tab::OrderByLocation,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Tab::SalesPerformance => "Sales Performance",
            Tab::BestCustomer => "Best Customer",
            Tab::TopCategories => "Top Categories",
            Tab::OrderByTime => "Order by Time",
            Tab::OrderByLocation => "Order by Location",
        }
    }

    pub fn render(self, agg: &Aggregates, config: &Config) {
        println!("== {} ==\n", self.title());
        match self {
            Tab::SalesPerformance => render_sales_performance(agg, config),
            Tab::BestCustomer => render_best_customer(agg),
            Tab::TopCategories => render_top_categories(agg),
            Tab::OrderByTime => render_order_by_time(agg),
            Tab::OrderByLocation => render_order_by_location(agg),
        }
    }
}

/// Total orders and payment across the monthly table.
pub fn sales_totals(agg: &Aggregates) -> (usize, f64) {
    agg.monthly_orders
        .iter()
        .fold((0, 0.0), |(orders, payment), row| {
            (orders + row.order_count, payment + row.payment_value)
        })
}

fn render_sales_performance(agg: &Aggregates, config: &Config) {
    let (orders, payment) = sales_totals(agg);
    println!("Total orders: {}", format_int(orders));
    println!("Total Payment: {}\n", format_currency(payment, &config.currency));
    print_table(
        &format!("Orders and Payment Value per Month ({})", config.report_year),
        &agg.monthly_orders,
    );
}

fn by_customer(a: &RfmRow, b: &RfmRow) -> Ordering {
    a.customer_id.cmp(&b.customer_id)
}

pub fn top_by_recency(rfm: &[RfmRow], n: usize) -> Vec<RfmRow> {
    top_n(rfm, n, |a, b| {
        a.recency_minute
            .partial_cmp(&b.recency_minute)
            .unwrap_or(Ordering::Equal)
            .then_with(|| by_customer(a, b))
    })
}

pub fn top_by_frequency(rfm: &[RfmRow], n: usize) -> Vec<RfmRow> {
    top_n(rfm, n, |a, b| {
        b.frequency.cmp(&a.frequency).then_with(|| by_customer(a, b))
    })
}

pub fn top_by_monetary(rfm: &[RfmRow], n: usize) -> Vec<RfmRow> {
    top_n(rfm, n, |a, b| {
        b.monetary
            .partial_cmp(&a.monetary)
            .unwrap_or(Ordering::Equal)
            .then_with(|| by_customer(a, b))
    })
}

fn top_n<T, F>(rows: &[T], n: usize, cmp: F) -> Vec<T>
where
    T: Clone,
    F: FnMut(&T, &T) -> Ordering,
{
    let mut sorted = rows.to_vec();
    sorted.sort_by(cmp);
    sorted.truncate(n);
    sorted
}

fn render_best_customer(agg: &Aggregates) {
    println!("Best Customer (RFM Analysis)\n");
    print_table("By Recency (minutes)", &top_by_recency(&agg.rfm, BEST_CUSTOMERS));
    print_table("By Frequency", &top_by_frequency(&agg.rfm, BEST_CUSTOMERS));
    print_table("By Monetary", &top_by_monetary(&agg.rfm, BEST_CUSTOMERS));
}

/// Split the top-categories table into per-year slices, newest year first.
pub fn categories_by_year(rows: &[TopCategoryRow]) -> Vec<(i32, Vec<TopCategoryRow>)> {
    let mut out: Vec<(i32, Vec<TopCategoryRow>)> = Vec::new();
    for row in rows {
        match out.last_mut() {
            Some((year, group)) if *year == row.order_year => group.push(row.clone()),
            _ => out.push((row.order_year, vec![row.clone()])),
        }
    }
    out
}

fn render_top_categories(agg: &Aggregates) {
    let years = categories_by_year(&agg.top_categories);
    if years.is_empty() {
        println!("(no delivered orders)\n");
        return;
    }
    for (year, rows) in years {
        print_table(&format!("Best Selling Categories {}", year), &rows);
    }
}

fn render_order_by_time(agg: &Aggregates) {
    print_table("Order Traffic by Time Period", &agg.order_count_by_period);
    print_table("Order Traffic by Hour", &agg.order_count_by_hour);
}

pub fn top_cities(rows: &[CityCountRow], n: usize) -> Vec<CityCountRow> {
    top_n(rows, n, |a, b| {
        b.order_count
            .cmp(&a.order_count)
            .then_with(|| a.city.cmp(&b.city))
            .then_with(|| a.customer_state.cmp(&b.customer_state))
    })
}

pub fn top_states(rows: &[StateCountRow], n: usize) -> Vec<StateCountRow> {
    top_n(rows, n, |a, b| {
        b.order_count
            .cmp(&a.order_count)
            .then_with(|| a.state.cmp(&b.state))
    })
}

fn render_order_by_location(agg: &Aggregates) {
    print_table(
        "Number of Orders by City",
        &top_cities(&agg.count_by_city, TOP_LOCATIONS),
    );
    print_table(
        "Number of Orders by State",
        &top_states(&agg.count_by_state, TOP_LOCATIONS),
    );
}
