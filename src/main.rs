mod cli;
mod decode;

use std::env;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::net::TcpStream;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use navi_config::{load_config, Config};
use navi_core::logging::LogRotation;
use navi_notify::Dispatcher;
use navi_platform::{DefaultPaths, PlatformPaths};

use crate::cli::{parse_args, Command, USAGE};
use crate::decode::{decode_notifications, decode_replies};

fn main() {
    let command = match parse_args(env::args().skip(1)) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("naviwire: {:#}\n\n{USAGE}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = run(command) {
        eprintln!("naviwire: {:#}", e);
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<()> {
    if command == Command::Help {
        println!("{USAGE}");
        return Ok(());
    }

    let paths = DefaultPaths::new().context("failed to detect platform paths")?;
    let project_dir = env::current_dir().ok();
    let loaded = load_config(&paths.config_dir(), project_dir.as_deref());
    let config = loaded.as_ref().cloned().unwrap_or_default();
    init_logging(&paths, &config)?;
    if let Err(e) = &loaded {
        error!("config load failed, using defaults: {}", e);
    }

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    match command {
        Command::Replies(path) => {
            let count = decode_replies(open_input(&path)?, &mut out)?;
            info!(count, "decoded {}", path.display());
        }
        Command::Notifications { path, channel } => {
            let dispatcher = Dispatcher::new().context("failed to compile notification grammars")?;
            let summary = decode_notifications(&dispatcher, open_input(&path)?, channel, &mut out)?;
            info!(
                decoded = summary.decoded,
                skipped = summary.skipped,
                failed = summary.failed,
                "decoded {}",
                path.display()
            );
        }
        Command::Connect(address) => {
            let address = address
                .unwrap_or_else(|| format!("{}:{}", config.debugger.host, config.debugger.port));
            let stream = TcpStream::connect(&address)
                .with_context(|| format!("failed to connect to {address}"))?;
            let timeout = config.debugger.read_timeout_ms;
            stream.set_read_timeout((timeout > 0).then(|| Duration::from_millis(timeout)))?;
            info!("connected to debug agent at {address}");
            // Flush per reply so a live session is visible as it happens.
            let mut live = LineFlush(&mut out);
            let count = decode_replies(BufReader::new(stream), &mut live)?;
            info!(count, "agent closed the connection");
        }
        Command::Help => {}
    }
    out.flush()?;
    Ok(())
}

/// Logs go to the configured file, or to stderr so they never mix with
/// the JSON written to stdout. A relative file name is placed in the log
/// directory.
fn init_logging(paths: &impl PlatformPaths, config: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log.level.as_str()));

    let Some(file) = &config.log.file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
        return Ok(());
    };

    let log_path = if file.is_relative() {
        paths.log_dir().join(file)
    } else {
        file.clone()
    };
    let log_file = LogRotation::default()
        .open(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// `-` reads standard input.
fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Flushes the inner writer after every complete line.
struct LineFlush<'a, W: Write>(&'a mut W);

impl<W: Write> Write for LineFlush<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.0.write(buf)?;
        if buf[..n].contains(&b'\n') {
            self.0.flush()?;
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}
