use krishi_core::PriceReference;

use super::{print_json, CmdResult, Context};
use crate::backend::load_prices;
use crate::OutputFormat;

pub(crate) fn cmd_price(ctx: &Context, commodity: &str) -> CmdResult {
    let table = load_prices(ctx.prices.as_deref())?;
    let reference = table
        .lookup(commodity)
        .ok_or_else(|| format!("no price reference for '{}'", commodity.trim()))?;

    match ctx.output {
        OutputFormat::Json => print_json(reference),
        OutputFormat::Text => {
            print_reference(reference);
            Ok(())
        }
    }
}

pub(crate) fn cmd_search(ctx: &Context, query: &str) -> CmdResult {
    let table = load_prices(ctx.prices.as_deref())?;
    let names = table.search(query);
    match ctx.output {
        OutputFormat::Json => print_json(&names),
        OutputFormat::Text => {
            for name in names {
                println!("{}", name);
            }
            Ok(())
        }
    }
}

pub(crate) fn cmd_prices(ctx: &Context) -> CmdResult {
    let table = load_prices(ctx.prices.as_deref())?;
    match ctx.output {
        OutputFormat::Json => print_json(table.entries()),
        OutputFormat::Text => {
            for r in table.entries() {
                println!(
                    "{:<10} ₹{:>6} {}  (₹{}/kg)",
                    r.commodity,
                    r.recommended_price,
                    r.unit,
                    r.suggested_price_per_kg()
                );
            }
            Ok(())
        }
    }
}

fn print_reference(r: &PriceReference) {
    println!("{} ({}, updated {})", r.commodity, r.unit, r.last_updated);
    println!("  recommended: ₹{}", r.recommended_price);
    println!("  market:      ₹{}", r.market_price);
    println!("  range:       ₹{} - ₹{}", r.range.min, r.range.max);
    println!("  trend:       {}", r.trend.as_str());
    println!("  suggested:   ₹{}/kg", r.suggested_price_per_kg());
    if !r.factors.is_empty() {
        println!("  factors:");
        for factor in &r.factors {
            println!("    - {}", factor);
        }
    }
}
