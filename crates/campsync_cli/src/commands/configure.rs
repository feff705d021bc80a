//! Configure command implementation.

use crate::session::Session;
use campsync_sync_engine::EndpointConfig;

/// Runs the configure command.
///
/// Without a URL it prints the stored endpoint.
pub fn run(
    session: &Session,
    url: Option<&str>,
    clear: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = session.open_store()?;

    if clear {
        store.save_endpoint(&EndpointConfig::default())?;
        println!("Endpoint cleared; running offline");
        return Ok(());
    }

    match url {
        Some(url) => {
            let endpoint = EndpointConfig::new(url);
            if !endpoint.is_configured() {
                return Err("endpoint URL is empty (use --clear to remove it)".into());
            }
            store.save_endpoint(&endpoint)?;
            println!("Endpoint set to {}", endpoint.apps_script_url);
        }
        None => match store.load_endpoint().as_ref().and_then(EndpointConfig::url) {
            Some(url) => println!("Endpoint: {url}"),
            None => println!("Endpoint: (not configured)"),
        },
    }

    Ok(())
}
