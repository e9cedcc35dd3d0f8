use std::path::Path;

// Extension overrides consulted before any inference. Windows MIME databases
// can report .js as text/plain, which breaks ES module loading, and the wasm
// and 3D-asset types need explicit declarations.
static OVERRIDES: &[(&str, &str)] = &[
    ("", "application/octet-stream"),
    ("js", "application/javascript"),
    ("mjs", "application/javascript"),
    ("css", "text/css"),
    ("html", "text/html"),
    ("json", "application/json"),
    ("wasm", "application/wasm"),
    ("obj", "text/plain"),
    ("ply", "application/octet-stream"),
];

/// Read-only content-type lookup, built once at startup and shared with the
/// worker threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct MimeTable;

impl MimeTable {
    pub fn new() -> Self {
        Self
    }

    /// Content type for a file path: override table first, then standard
    /// inference, then `application/octet-stream`.
    pub fn content_type(&self, path: &Path) -> String {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();

        if let Some((_, mime)) = OVERRIDES.iter().find(|(e, _)| *e == ext) {
            return (*mime).to_string();
        }

        mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string()
    }
}
