use ansi_term::Colour;
use env_logger::Builder;
use std::io::Write;

pub fn init() {
    Builder::from_default_env()
        .format(|buf, record| {
            let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");

            let level = match record.level() {
                log::Level::Error => Colour::Red.paint(record.level().to_string()),
                log::Level::Warn => Colour::Yellow.paint(record.level().to_string()),
                log::Level::Info => Colour::Green.paint(record.level().to_string()),
                log::Level::Debug => Colour::Blue.paint(record.level().to_string()),
                log::Level::Trace => Colour::Purple.paint(record.level().to_string()),
            };

            writeln!(
                buf,
                "[{} {} {}] {}",
                timestamp,
                level,
                record.module_path().unwrap_or_default(),
                record.args()
            )
        })
        .init();
}
