use colored::*;
use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::utils::current_timestamp;

static LOGGER: ShellLogger = ShellLogger;

struct ShellLogger;

impl Log for ShellLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level() && metadata.target().starts_with("chainfs")
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = match record.level() {
            Level::Error => "ERROR".red().bold(),
            Level::Warn => "WARN ".yellow().bold(),
            Level::Info => "INFO ".green(),
            Level::Debug => "DEBUG".cyan(),
            Level::Trace => "TRACE".bright_black(),
        };
        eprintln!(
            "{} [{}] {}",
            current_timestamp().bright_black(),
            level,
            record.args()
        );
    }

    fn flush(&self) {}
}

/// 安装日志输出（只调用一次）。`verbosity`：0 = warn，1 = info，2+ = debug
pub fn init_logger(verbosity: u8) {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    });
}
