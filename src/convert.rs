//! Converts a raw export to the canonical five-column layout using a fixed
//! dictionary of known header names. Unlike the heuristic mapper, only exact
//! header names are recognised.

use anyhow::{Result, bail};
use log::info;

use crate::{
    cli::ConvertArgs,
    data::{ColumnKind, Value, parse_amount},
    frame::{Row, Table},
    io_utils,
    mapper::CanonicalField,
};

fn aliases(field: CanonicalField) -> &'static [&'static str] {
    match field {
        CanonicalField::Date => &["Order Date", "order_date", "OrderDate", "Date", "date"],
        CanonicalField::Product => &[
            "Product Name",
            "product_name",
            "Product",
            "product",
            "Item",
            "item",
        ],
        CanonicalField::Region => &["Region", "region", "State", "state", "Country", "country"],
        CanonicalField::Revenue => &[
            "Sales", "sales", "Revenue", "revenue", "Amount", "amount", "Total", "total",
        ],
        CanonicalField::Quantity => &["Quantity", "quantity", "Qty", "qty", "Units", "units"],
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub table: Table,
    pub dropped: usize,
}

/// Picks one source column per canonical field, normalises values, and drops
/// rows without a usable date, revenue, or quantity.
pub fn convert_table(raw: &Table) -> Result<Conversion> {
    let mut sources = Vec::with_capacity(CanonicalField::ALL.len());
    for field in CanonicalField::ALL {
        let Some(idx) = aliases(field)
            .iter()
            .find_map(|alias| raw.column_index(alias))
        else {
            bail!(
                "Could not find a column for '{field}'. Available columns: {}",
                raw.headers().join(", ")
            );
        };
        info!("Using '{}' as '{field}'", raw.headers()[idx]);
        sources.push(idx);
    }

    let rows = raw
        .rows()
        .iter()
        .filter_map(|row| convert_row(row, &sources))
        .collect::<Vec<_>>();
    let dropped = raw.row_count() - rows.len();
    let headers = CanonicalField::ALL
        .iter()
        .map(|field| field.as_str().to_string())
        .collect();
    let kinds = vec![
        ColumnKind::Date,
        ColumnKind::Text,
        ColumnKind::Text,
        ColumnKind::Number,
        ColumnKind::Number,
    ];
    Ok(Conversion {
        table: Table::new(headers, kinds, rows),
        dropped,
    })
}

fn convert_row(row: &[Option<Value>], sources: &[usize]) -> Option<Row> {
    let cell = move |slot: usize| row[sources[slot]].as_ref();
    let date = cell(0)?.as_date()?;
    let revenue = amount(cell(3)?)?;
    let quantity = amount(cell(4)?)?;
    let text = move |slot: usize| cell(slot).map(|v| Value::Text(v.as_display()));
    Some(vec![
        Some(Value::Date(date)),
        text(1),
        text(2),
        Some(Value::Number(revenue)),
        Some(Value::Number(quantity)),
    ])
}

fn amount(value: &Value) -> Option<f64> {
    match value {
        Value::Text(raw) => parse_amount(raw),
        other => other.as_number(),
    }
}

pub fn execute(args: &ConvertArgs) -> Result<()> {
    let raw = io_utils::load_table(&args.input.input, &args.input.load_options())?;
    let conversion = convert_table(&raw)?;
    io_utils::write_table(&conversion.table, args.output.as_deref(), None)?;
    info!(
        "Converted {} row(s); dropped {} row(s) missing date, revenue, or quantity",
        conversion.table.row_count(),
        conversion.dropped
    );
    Ok(())
}
