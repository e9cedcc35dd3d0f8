use log::{debug, error, info, warn};
use std::fs;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::net::TcpStream;
use std::path::Path;

use super::http_status::HttpStatus;
use super::mime::MimeTable;

// Added to every response, whatever the status. The cross-origin isolation
// pair is required for SharedArrayBuffer in the viewer; caching is disabled
// so a rebuilt report is always picked up on refresh.
static INJECTED_HEADERS: &str = "Access-Control-Allow-Origin: *\r\n\
Cross-Origin-Opener-Policy: same-origin\r\n\
Cross-Origin-Embedder-Policy: require-corp\r\n\
Cache-Control: no-store, no-cache, must-revalidate, max-age=0\r\n";

pub fn handle_client(stream: TcpStream, document_root: &Path, mime: &MimeTable) {
    let peer_addr = match stream.peer_addr() {
        Ok(addr) => addr.to_string(),
        Err(_) => "unknown".to_string(),
    };

    debug!("Handling request from {}", peer_addr);

    match serve_connection(stream, document_root, mime, &peer_addr) {
        Ok(()) => {}
        Err(e) if is_benign_disconnect(&e) => {
            // Closed tab or refresh mid-response; the request is done.
            debug!("Client {} went away mid-response", peer_addr);
        }
        Err(e) => error!("Error handling {}: {}", peer_addr, e),
    }
}

/// Write errors with these kinds mean the peer hung up; everything else is a
/// real failure.
fn is_benign_disconnect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::BrokenPipe
    )
}

fn serve_connection(
    mut stream: TcpStream,
    document_root: &Path,
    mime: &MimeTable,
    peer_addr: &str,
) -> io::Result<()> {
    let mut buffer = [0u8; 8192];
    let bytes_read = match stream.read(&mut buffer)? {
        0 => {
            debug!("Connection closed by client {}", peer_addr);
            return Ok(());
        }
        n => n,
    };

    let request = String::from_utf8_lossy(&buffer[..bytes_read]);
    let request_line = match request.lines().next() {
        Some(line) => line,
        None => return send_error(&mut stream, HttpStatus::BadRequest, false),
    };

    let parts: Vec<&str> = request_line.split_whitespace().collect();
    if parts.len() < 2 {
        debug!("Malformed request line from {}: {}", peer_addr, request_line);
        return send_error(&mut stream, HttpStatus::BadRequest, false);
    }

    let method = parts[0];
    let is_head = match method {
        "GET" => false,
        "HEAD" => true,
        _ => {
            warn!("Unsupported method from {}: {}", peer_addr, method);
            return send_error(&mut stream, HttpStatus::MethodNotAllowed, false);
        }
    };

    let raw_path = parts[1]
        .split(['?', '#'])
        .next()
        .unwrap_or(parts[1]);
    let path = percent_decode(raw_path);

    if path.split('/').any(|segment| segment == "..") {
        warn!("Path traversal attempt from {}: {}", peer_addr, path);
        return send_error(&mut stream, HttpStatus::Forbidden, is_head);
    }

    let file_path = document_root.join(path.trim_start_matches('/'));

    if file_path.is_dir() {
        // Relative links in a listing or index page only resolve against the
        // directory itself, so a slashless request is redirected first.
        if !path.ends_with('/') {
            let location = format!("{}/", raw_path);
            info!("Redirecting {} to {}", peer_addr, location);
            return send_redirect(&mut stream, &location);
        }

        let index = file_path.join("index.html");
        if index.is_file() {
            serve_file(&mut stream, &index, is_head, peer_addr, mime)
        } else {
            serve_listing(&mut stream, &file_path, &path, is_head, peer_addr)
        }
    } else if file_path.is_file() {
        serve_file(&mut stream, &file_path, is_head, peer_addr, mime)
    } else {
        info!("File not found for {}: {:?}", peer_addr, file_path);
        send_error(&mut stream, HttpStatus::NotFound, is_head)
    }
}

fn serve_file(
    stream: &mut TcpStream,
    file_path: &Path,
    is_head: bool,
    peer_addr: &str,
    mime: &MimeTable,
) -> io::Result<()> {
    let metadata = match fs::metadata(file_path) {
        Ok(meta) => meta,
        Err(e) => {
            error!("Error getting metadata for {:?}: {}", file_path, e);
            return send_error(stream, HttpStatus::InternalServerError, is_head);
        }
    };

    let content_type = mime.content_type(file_path);
    let headers = response_head(HttpStatus::Ok, &content_type, metadata.len());

    if is_head {
        stream.write_all(headers.as_bytes())?;
        stream.flush()?;
    } else {
        let file = match fs::File::open(file_path) {
            Ok(file) => file,
            Err(e) => {
                error!("Error opening file {:?} for {}: {}", file_path, peer_addr, e);
                return send_error(stream, HttpStatus::InternalServerError, is_head);
            }
        };

        let mut reader = BufReader::new(file);
        let mut writer = BufWriter::new(stream);
        writer.write_all(headers.as_bytes())?;

        let mut buffer = [0u8; 8192];
        loop {
            match reader.read(&mut buffer)? {
                0 => break,
                n => writer.write_all(&buffer[..n])?,
            }
        }
        writer.flush()?;
    }

    info!(
        "Served file to {}: {:?} ({} bytes, {})",
        peer_addr,
        file_path,
        metadata.len(),
        content_type
    );
    Ok(())
}

fn serve_listing(
    stream: &mut TcpStream,
    dir_path: &Path,
    request_path: &str,
    is_head: bool,
    peer_addr: &str,
) -> io::Result<()> {
    let entries = match fs::read_dir(dir_path) {
        Ok(entries) => entries,
        Err(e) => {
            error!("Error listing directory {:?}: {}", dir_path, e);
            return send_error(stream, HttpStatus::InternalServerError, is_head);
        }
    };

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| {
            let mut name = entry.file_name().to_string_lossy().into_owned();
            if entry.path().is_dir() {
                name.push('/');
            }
            name
        })
        .collect();
    names.sort();

    let title = if request_path.is_empty() { "/" } else { request_path };
    let mut body = format!(
        "<!DOCTYPE html><html><head><title>Directory listing for {0}</title></head>\
         <body><h1>Directory listing for {0}</h1><hr><ul>",
        html_escape(title)
    );
    for name in &names {
        body.push_str(&format!(
            "<li><a href=\"{}\">{}</a></li>",
            percent_encode(name),
            html_escape(name)
        ));
    }
    body.push_str("</ul><hr></body></html>");

    let headers = response_head(HttpStatus::Ok, "text/html", body.len() as u64);
    stream.write_all(headers.as_bytes())?;
    if !is_head {
        stream.write_all(body.as_bytes())?;
    }
    stream.flush()?;

    info!(
        "Served directory listing to {}: {:?} ({} entries)",
        peer_addr,
        dir_path,
        names.len()
    );
    Ok(())
}

fn send_error(stream: &mut TcpStream, status: HttpStatus, is_head: bool) -> io::Result<()> {
    let body = format!(
        "<html><body><h1>{} {}</h1></body></html>",
        status.code(),
        status.text()
    );
    stream.write_all(response_head(status, "text/html", body.len() as u64).as_bytes())?;
    if !is_head {
        stream.write_all(body.as_bytes())?;
    }
    stream.flush()
}

fn send_redirect(stream: &mut TcpStream, location: &str) -> io::Result<()> {
    let response = format!(
        "{}Location: {}\r\nContent-Length: 0\r\nConnection: close\r\n{}\r\n",
        HttpStatus::MovedPermanently.as_response_line(),
        location,
        INJECTED_HEADERS
    );
    stream.write_all(response.as_bytes())?;
    stream.flush()
}

/// Standard headers first, then the injected block, then the terminator.
fn response_head(status: HttpStatus, content_type: &str, content_length: u64) -> String {
    format!(
        "{}Content-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n{}\r\n",
        status.as_response_line(),
        content_type,
        content_length,
        INJECTED_HEADERS
    )
}

/// Decodes %XX escapes; malformed escapes are left as-is.
fn percent_decode(path: &str) -> String {
    let bytes = path.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if let (Some(hi), Some(lo)) = (
                bytes.get(i + 1).and_then(|b| (*b as char).to_digit(16)),
                bytes.get(i + 2).and_then(|b| (*b as char).to_digit(16)),
            ) {
                out.push((hi * 16 + lo) as u8);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Encodes a listing entry name for use in an href; unreserved characters and
/// the path separator pass through.
fn percent_encode(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for &byte in name.as_bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
