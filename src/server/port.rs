use std::io;
use std::net::TcpListener;

/// Asks the OS for a free TCP port by binding port 0 and reading back the
/// assignment. The probe socket is dropped before the server binds the same
/// number, so another process can in principle grab the port in between; that
/// window is accepted and a later bind failure is treated as fatal.
pub fn allocate_port() -> io::Result<u16> {
    let probe = TcpListener::bind(("127.0.0.1", 0))?;
    Ok(probe.local_addr()?.port())
}
