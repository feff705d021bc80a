//! Edit command implementation.

use super::print_outcome;
use crate::session::{CliError, Session};
use campsync_sync_engine::EditOutcome;
use campsync_sync_protocol::{Field, FieldValue};

/// Runs the edit command.
pub async fn run(
    session: &Session,
    id: &str,
    field: Field,
    input: &str,
    sync_now: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = session.open_engine()?;
    let value = FieldValue::parse_for(field.kind(), input);

    match engine.edit(id, field, value.clone()) {
        EditOutcome::UnknownEntity => return Err(CliError::UnknownItem(id.to_string()).into()),
        EditOutcome::Queued {
            pending,
            threshold_reached,
        } => {
            println!("Queued {id}.{field} = {value} ({pending} pending)");
            if threshold_reached && !sync_now {
                println!("  Pending edits reached the threshold; run `campsync sync`");
            }
        }
    }

    if sync_now {
        print_outcome(&engine.sync().await);
    }
    Ok(())
}
