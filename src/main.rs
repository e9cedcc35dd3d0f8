use clap::Parser;
use log::info;
use std::io;
use std::process;

use report_server::logger;
use report_server::server::config::ServerConfig;
use report_server::server::{browser, port, HttpServer};

fn main() {
    logger::init();

    let config = ServerConfig::parse();
    info!("Starting web report server with config: {:?}", config);

    match run(&config) {
        Ok(()) => {
            println!("\nServer stopped by user.");
            process::exit(0);
        }
        Err(e) => {
            println!("\nServer failed: {}", e);
            process::exit(1);
        }
    }
}

fn run(config: &ServerConfig) -> io::Result<()> {
    let document_root = config.document_root()?;
    let port = port::allocate_port()?;
    let server = HttpServer::new(config, port, document_root.clone())?;

    println!("========================================");
    println!("  Local web report server started");
    println!("  Address: http://localhost:{}", port);
    println!("  Directory: {}", document_root.display());
    println!("========================================");

    if !config.no_browser {
        browser::open_index(port);
    }

    server.run()
}
