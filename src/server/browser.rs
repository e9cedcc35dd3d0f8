use log::{info, warn};

/// Opens the default browser at the served index page. Best effort: a missing
/// or failing browser only logs a warning.
pub fn open_index(port: u16) {
    let url = format!("http://localhost:{port}/index.html");
    match open::that(&url) {
        Ok(()) => info!("Opened browser at {}", url),
        Err(e) => warn!("Could not open browser at {}: {}", url, e),
    }
}
