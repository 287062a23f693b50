//! `env_logger` setup that mirrors log output into a per-run file.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use env_logger::{Builder, Env, Target};

/// Writes every record to stderr and to the run log file.
struct Tee {
    file: File,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        self.file.flush()
    }
}

/// `import_log_<YYYYmmdd_HHMMSS>.txt` inside `log_dir`.
pub fn log_file_path(log_dir: &Path) -> PathBuf {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    log_dir.join(format!("import_log_{}.txt", timestamp))
}

/// Initialise the global logger; `RUST_LOG` overrides the `info` default.
///
/// With a log file the output is teed; if the file cannot be created the
/// logger falls back to stderr and the returned path is `None`.
pub fn init(log_file: Option<PathBuf>) -> Option<PathBuf> {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));

    let opened = log_file.and_then(|path| match File::create(&path) {
        Ok(file) => Some((path, file)),
        Err(e) => {
            eprintln!("Could not create log file {:?}: {}", path, e);
            None
        }
    });

    let path = match opened {
        Some((path, file)) => {
            builder.target(Target::Pipe(Box::new(Tee { file })));
            Some(path)
        }
        None => None,
    };

    builder.init();
    path
}
