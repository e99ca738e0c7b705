use krishi_core::{StageFields, StageRecord};
use krishi_trace::{resolve_trail_with_holders, LookupInput, ProvenanceTrail};

use super::{print_json, CmdResult, Context};
use crate::backend::open_for_reading;
use crate::OutputFormat;

pub(crate) async fn cmd_trace(ctx: &Context, code: &str) -> CmdResult {
    let backend = open_for_reading(ctx.data.as_deref(), ctx.prices.as_deref()).await?;
    let code = LookupInput::from(code).into_code()?;
    let trail =
        resolve_trail_with_holders(backend.ledger.store(), &backend.documents, &code).await?;

    match ctx.output {
        OutputFormat::Json => print_json(&trail),
        OutputFormat::Text => {
            print_trail(&trail);
            Ok(())
        }
    }
}

fn print_trail(trail: &ProvenanceTrail) {
    println!(
        "{}: {}, now at {}",
        trail.lookup_code,
        trail.commodity_name(),
        trail.current_location()
    );
    for (i, step) in trail.steps.iter().enumerate() {
        let holder = step
            .holder
            .as_ref()
            .map_or(step.record.actor_id.as_str(), |a| a.name.as_str());
        println!(
            "  {}. {:<8} {:<8} {}  {}",
            i + 1,
            step.record.stage().as_str(),
            step.record.record_id,
            step.record.date,
            holder
        );
        println!("     {}", step.record.location);
        println!("     {}", economics(&step.record));
    }
}

fn economics(record: &StageRecord) -> String {
    match &record.fields {
        StageFields::Harvest(h) => {
            format!("{} kg, asking ₹{}/kg", record.weight, h.expected_price)
        }
        StageFields::Purchase(p) => format!(
            "bought at ₹{}/kg plus ₹{} charges, {}",
            p.buying_price, p.other_charges, p.status
        ),
        StageFields::Sale(s) => format!(
            "selling at ₹{}/kg, margin ₹{}/kg",
            s.selling_price,
            s.margin()
        ),
    }
}
