//! List command implementation.

use crate::session::Session;
use campsync_sync_protocol::Material;

/// Runs the list command.
pub fn run(
    session: &Session,
    pending: bool,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = session.open_engine()?;

    if pending {
        let changes = engine.pending_changes();
        match format {
            "json" => println!("{}", serde_json::to_string_pretty(&changes)?),
            _ => {
                if changes.is_empty() {
                    println!("No pending edits");
                }
                for change in &changes {
                    println!(
                        "{:>5}  {:<14} {:<20} {}",
                        change.entity_id,
                        change.field.as_str(),
                        change.value.to_string(),
                        change.timestamp.format("%Y-%m-%d %H:%M:%S")
                    );
                }
            }
        }
        return Ok(());
    }

    let materials = engine.materials();
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&materials)?),
        _ => print_table(&materials),
    }
    Ok(())
}

fn print_table(materials: &[Material]) {
    if materials.is_empty() {
        println!("No cached items (run `campsync sync` first)");
        return;
    }

    println!(
        "{:>5}  {:<28} {:>6} {:>6}  {:<6} {:<7}",
        "id", "name", "need", "owned", "packed", "counted"
    );
    for item in materials {
        println!(
            "{:>5}  {:<28} {:>6} {:>6}  {:<6} {:<7}",
            item.id,
            truncate(&item.name, 28),
            item.need,
            item.owned,
            mark(item.packed),
            mark(item.counted)
        );
    }
}

fn mark(flag: bool) -> &'static str {
    if flag {
        "✓"
    } else {
        "-"
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut short: String = text.chars().take(width.saturating_sub(1)).collect();
    short.push('…');
    short
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_long_names() {
        assert_eq!(truncate("tent", 10), "tent");
        assert_eq!(truncate("sleeping bag liner", 8), "sleepin…");
        assert_eq!(truncate("炊事用具セット", 4), "炊事用…");
    }
}
