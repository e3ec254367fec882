//! Command-line arguments.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use navi_notify::Channel;

pub(crate) const USAGE: &str = "\
usage: naviwire replies <capture>
       naviwire notifications [--channel <name>] <file>
       naviwire connect [<host:port>]

  replies        decode a captured debug agent stream ('-' for stdin)
  notifications  decode notification lines ('-' for stdin)
  connect        decode replies from a live agent (default from config)";

/// What the binary was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Replies(PathBuf),
    Notifications {
        path: PathBuf,
        channel: Option<Channel>,
    },
    Connect(Option<String>),
    Help,
}

/// Parses arguments without the program name.
pub(crate) fn parse_args<I>(args: I) -> Result<Command>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let Some(sub) = args.next() else {
        return Ok(Command::Help);
    };
    match sub.as_str() {
        "-h" | "--help" | "help" => Ok(Command::Help),
        "replies" => {
            let path = args.next().ok_or_else(|| anyhow!("replies: missing capture file"))?;
            no_more(args)?;
            Ok(Command::Replies(PathBuf::from(path)))
        }
        "notifications" => {
            let mut channel = None;
            let mut path = None;
            while let Some(arg) = args.next() {
                if arg == "--channel" {
                    let name = args
                        .next()
                        .ok_or_else(|| anyhow!("--channel needs a channel name"))?;
                    channel = Some(name.parse::<Channel>().map_err(|e| anyhow!(e))?);
                } else if path.is_none() {
                    path = Some(PathBuf::from(arg));
                } else {
                    bail!("unexpected argument '{arg}'");
                }
            }
            let path = path.ok_or_else(|| anyhow!("notifications: missing input file"))?;
            Ok(Command::Notifications { path, channel })
        }
        "connect" => {
            let address = args.next();
            no_more(args)?;
            Ok(Command::Connect(address))
        }
        other => bail!("unknown command '{other}'"),
    }
}

fn no_more(mut args: impl Iterator<Item = String>) -> Result<()> {
    match args.next() {
        Some(extra) => bail!("unexpected argument '{extra}'"),
        None => Ok(()),
    }
}
