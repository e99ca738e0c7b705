use krishi_core::{Actor, RoleSummary, StageRecord};

use super::{print_json, CmdResult, Context};
use crate::backend::{find_actor, open_for_reading};
use crate::OutputFormat;

pub(crate) async fn cmd_records(ctx: &Context, actor: &str) -> CmdResult {
    let backend = open_for_reading(ctx.data.as_deref(), ctx.prices.as_deref()).await?;
    let actor = find_actor(&backend, actor).await?;
    let records = backend.ledger.records_for(&actor.uid).await?;

    match ctx.output {
        OutputFormat::Json => print_json(&records),
        OutputFormat::Text => {
            print_records(&actor, &records);
            Ok(())
        }
    }
}

pub(crate) async fn cmd_summary(ctx: &Context, actor: &str) -> CmdResult {
    let backend = open_for_reading(ctx.data.as_deref(), ctx.prices.as_deref()).await?;
    let actor = find_actor(&backend, actor).await?;
    let summary = backend.ledger.summary(&actor.uid).await?;

    match ctx.output {
        OutputFormat::Json => print_json(&summary),
        OutputFormat::Text => {
            print_summary(&actor, &summary);
            Ok(())
        }
    }
}

fn print_records(actor: &Actor, records: &[StageRecord]) {
    println!("{} ({})", actor.name, actor.role);
    if records.is_empty() {
        println!("  no records");
    }
    for r in records {
        println!(
            "  {:<8} {}  {:<10} {:>6} kg  ₹{}/kg",
            r.record_id,
            r.date,
            r.commodity_name,
            r.weight,
            r.fields.unit_price()
        );
    }
}

fn print_summary(actor: &Actor, s: &RoleSummary) {
    println!("{} ({})", actor.name, actor.role);
    println!("  records:        {}", s.count);
    println!("  total weight:   {} kg", s.total_weight);
    println!("  total value:    ₹{}", s.total_value);
    println!("  total cost:     ₹{}", s.total_cost);
    println!("  total profit:   ₹{}", s.total_profit);
    println!("  average margin: ₹{}/kg", s.average_margin);
}
