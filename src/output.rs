use crate::error::Result;
use serde::Serialize;
use std::io::{self, Write};
use tabled::{settings::Style, Table, Tabled};

/// Print a subheading followed by `rows` as a markdown table.
pub fn print_table<T>(title: &str, rows: &[T])
where
    T: Tabled + Clone,
{
    println!("{}\n", title);
    if rows.is_empty() {
        println!("(no rows)\n");
        return;
    }
    println!("{}\n", render_table(rows.to_vec()));
}

pub fn render_table<T: Tabled>(rows: Vec<T>) -> String {
    Table::new(rows).with(Style::markdown()).to_string()
}

/// Pretty-print `value` as JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let mut out = io::stdout().lock();
    write_json(&mut out, value)?;
    Ok(())
}

pub fn write_json<W: Write, T: Serialize>(mut out: W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}
