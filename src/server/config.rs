use clap::Parser;
use std::env;
use std::io;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct ServerConfig {
    /// Directory to serve (default: the executable's directory)
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Number of worker threads in the thread pool
    #[arg(short, long, default_value_t = 8)]
    pub threads: usize,

    /// Do not open the default browser after startup
    #[arg(long, default_value_t = false)]
    pub no_browser: bool,
}

impl ServerConfig {
    /// Resolves the document root: `--root` if given, otherwise the directory
    /// containing the running executable. The root is passed to the handler
    /// explicitly; the process working directory is never changed.
    pub fn document_root(&self) -> io::Result<PathBuf> {
        match &self.root {
            Some(root) => root.canonicalize(),
            None => {
                let exe = env::current_exe()?;
                match exe.parent() {
                    Some(dir) => Ok(dir.to_path_buf()),
                    None => Err(io::Error::new(
                        io::ErrorKind::NotFound,
                        "executable has no parent directory",
                    )),
                }
            }
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            root: None,
            threads: 8,
            no_browser: false,
        }
    }
}
