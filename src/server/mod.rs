pub mod browser;
pub mod config;
pub mod http_status;
pub mod mime;
pub mod port;
pub mod request_handler;

use log::{debug, error, info};
use std::io;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use threadpool::ThreadPool;

use config::ServerConfig;
use mime::MimeTable;
use request_handler::handle_client;

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigint(_signal: libc::c_int) {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

fn install_sigint_handler() -> io::Result<()> {
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = on_sigint as extern "C" fn(libc::c_int) as libc::sighandler_t;
        libc::sigemptyset(&mut action.sa_mask);
        if libc::sigaction(libc::SIGINT, &action, std::ptr::null_mut()) != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

pub struct HttpServer {
    listener: TcpListener,
    document_root: PathBuf,
    mime: MimeTable,
    thread_pool: ThreadPool,
    port: u16,
}

impl HttpServer {
    /// Binds the listener on all interfaces. The port comes from
    /// [`port::allocate_port`]; if another process grabbed it in the window
    /// between allocation and this bind, the error propagates and startup
    /// fails.
    pub fn new(config: &ServerConfig, port: u16, document_root: PathBuf) -> io::Result<Self> {
        let addr = format!("0.0.0.0:{}", port);
        let listener = TcpListener::bind(&addr)?;
        listener.set_nonblocking(true)?;
        // Installed here so an interrupt is handled from the moment the
        // startup banner is visible.
        install_sigint_handler()?;

        info!("Server started on {}", addr);

        Ok(Self {
            listener,
            document_root,
            mime: MimeTable::new(),
            thread_pool: ThreadPool::new(config.threads),
            port,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn document_root(&self) -> &Path {
        &self.document_root
    }

    /// Accept loop. Returns `Ok(())` once an interrupt has been observed and
    /// in-flight requests have drained; any other listener failure is fatal
    /// and propagates.
    pub fn run(&self) -> io::Result<()> {
        info!(
            "Server running with {} threads, serving {:?}",
            self.thread_pool.max_count(),
            self.document_root
        );

        while !SHUTDOWN.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    debug!("New connection from {}", addr);
                    // The listener is non-blocking so the loop can observe the
                    // shutdown flag; workers do blocking I/O.
                    if let Err(e) = stream.set_nonblocking(false) {
                        error!("Failed to set blocking mode: {}", e);
                        continue;
                    }

                    let document_root = self.document_root.clone();
                    let mime = self.mime;
                    self.thread_pool.execute(move || {
                        handle_client(stream, &document_root, &mime);
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(1));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    return Err(e);
                }
            }
        }

        info!("Interrupt received, waiting for in-flight requests");
        self.thread_pool.join();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_reports_chosen_port() {
        let port = port::allocate_port().expect("allocate port");
        let server = HttpServer::new(&ServerConfig::default(), port, PathBuf::from("."))
            .expect("bind server");
        assert_eq!(server.port(), port);
    }

    #[test]
    fn occupied_port_fails_to_bind() {
        let port = port::allocate_port().expect("allocate port");
        let _holder = TcpListener::bind(("0.0.0.0", port)).expect("occupy port");
        let result = HttpServer::new(&ServerConfig::default(), port, PathBuf::from("."));
        assert!(result.is_err());
    }
}
