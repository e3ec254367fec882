//! Offline decoding of captured agent streams and notification logs.
//!
//! Both decoders write one JSON document per line so the output can be
//! piped into `jq` or diffed against an earlier capture.

use std::io::{BufRead, Read, Write};

use anyhow::{Context, Result};
use navi_debug::ReplyReceiver;
use navi_notify::{Channel, Dispatcher, Record};
use serde::Serialize;
use tracing::{debug, warn};

/// Counters printed to the log after a notification file is decoded.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NotificationSummary {
    pub decoded: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Serialize)]
struct DecodedLine<'a> {
    line: usize,
    channel: Channel,
    record: &'a Record,
}

#[derive(Serialize)]
struct FailedLine<'a> {
    line: usize,
    error: String,
    fatal: bool,
    text: &'a str,
}

/// Decodes every message of `input` until the agent side closed the
/// stream. Returns the number of replies written.
pub(crate) fn decode_replies<R: Read, W: Write>(input: R, out: &mut W) -> Result<usize> {
    let mut count = 0;
    for reply in ReplyReceiver::new(input) {
        let reply = reply.with_context(|| format!("failed to decode message {}", count + 1))?;
        serde_json::to_writer(&mut *out, &reply)?;
        writeln!(out)?;
        count += 1;
    }
    debug!(count, "reply stream ended");
    Ok(count)
}

/// Parses notification lines. Blank lines and `#` comments are skipped.
/// Without `channel`, each line goes to the channel its table publishes
/// on.
///
/// A line that fails to parse is reported inline and decoding continues.
pub(crate) fn decode_notifications<R: BufRead, W: Write>(
    dispatcher: &Dispatcher,
    input: R,
    channel: Option<Channel>,
    out: &mut W,
) -> Result<NotificationSummary> {
    let mut summary = NotificationSummary::default();
    for (index, line) in input.lines().enumerate() {
        let number = index + 1;
        let line = line.with_context(|| format!("failed to read line {number}"))?;
        let text = line.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }

        let Some(channel) = channel.or_else(|| Dispatcher::channel_of(text)) else {
            warn!(line = number, "no channel publishes {text:?}");
            summary.skipped += 1;
            continue;
        };
        match dispatcher.parse(channel, text) {
            Ok(Some(record)) => {
                let decoded = DecodedLine {
                    line: number,
                    channel,
                    record: &record,
                };
                serde_json::to_writer(&mut *out, &decoded)?;
                summary.decoded += 1;
            }
            Ok(None) => {
                summary.skipped += 1;
                continue;
            }
            Err(e) => {
                let failed = FailedLine {
                    line: number,
                    error: e.to_string(),
                    fatal: e.is_fatal(),
                    text,
                };
                serde_json::to_writer(&mut *out, &failed)?;
                summary.failed += 1;
            }
        }
        writeln!(out)?;
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use navi_core::Address;
    use navi_debug::{CommandType, PacketWriter};
    use serde_json::Value;

    use super::*;

    fn lines(out: &[u8]) -> Vec<Value> {
        String::from_utf8(out.to_vec())
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn replies_become_json_lines() {
        let mut stream = PacketWriter::new().into_packet(CommandType::RespAttachSuccess, 1);
        stream.extend(
            PacketWriter::new()
                .address(Address(0x1000))
                .into_packet(CommandType::RespSearchSuccess, 2),
        );
        let mut out = Vec::new();
        let count = decode_replies(Cursor::new(stream), &mut out).unwrap();
        assert_eq!(count, 2);

        let docs = lines(&out);
        assert_eq!(docs[0]["kind"], "Attach");
        assert_eq!(docs[0]["error_code"], 0);
        assert_eq!(docs[1]["packet_id"], 2);
    }

    #[test]
    fn reply_stream_error_names_the_message() {
        let mut stream = PacketWriter::new().into_packet(CommandType::RespAttachSuccess, 1);
        stream.extend(PacketWriter::new().into_packet_with_code(500, 2));
        let mut out = Vec::new();
        let err = decode_replies(Cursor::new(stream), &mut out).unwrap_err();
        assert!(format!("{err:#}").contains("message 2"), "got: {err:#}");
        // The reply before the bad one was still written.
        assert_eq!(lines(&out).len(), 1);
    }

    #[test]
    fn notification_lines_are_decoded_in_order() {
        let dispatcher = Dispatcher::new().unwrap();
        let input = "\
# captured from comment_changes
bn_comments UPDATE 5 null 1 hello

bn_module_views INSERT 9 4
";
        let mut out = Vec::new();
        let summary =
            decode_notifications(&dispatcher, Cursor::new(input), None, &mut out).unwrap();
        assert_eq!(
            summary,
            NotificationSummary {
                decoded: 2,
                skipped: 0,
                failed: 0,
            }
        );
        let docs = lines(&out);
        assert_eq!(docs[0]["line"], 2);
        assert_eq!(docs[0]["channel"], "Comments");
        assert_eq!(docs[1]["line"], 4);
        assert_eq!(docs[1]["channel"], "Views");
    }

    #[test]
    fn malformed_line_is_reported_and_decoding_continues() {
        let dispatcher = Dispatcher::new().unwrap();
        let input = "bn_types UPDATE x 1\nbn_types UPDATE 1 40\n";
        let mut out = Vec::new();
        let summary =
            decode_notifications(&dispatcher, Cursor::new(input), None, &mut out).unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.decoded, 1);

        let docs = lines(&out);
        assert_eq!(docs[0]["line"], 1);
        assert_eq!(docs[0]["fatal"], true);
        assert_eq!(docs[0]["text"], "bn_types UPDATE x 1");
        assert!(docs[1]["record"].is_object());
    }

    #[test]
    fn unknown_table_is_skipped() {
        let dispatcher = Dispatcher::new().unwrap();
        let mut out = Vec::new();
        let summary = decode_notifications(
            &dispatcher,
            Cursor::new("bn_nonsense INSERT 1\n"),
            None,
            &mut out,
        )
        .unwrap();
        assert_eq!(summary.skipped, 1);
        assert!(out.is_empty());
    }

    #[test]
    fn explicit_channel_selects_function_shape() {
        let dispatcher = Dispatcher::new().unwrap();
        let mut out = Vec::new();
        decode_notifications(
            &dispatcher,
            Cursor::new("bn_functions UPDATE 1 4096\n"),
            Some(Channel::Functions),
            &mut out,
        )
        .unwrap();
        let docs = lines(&out);
        assert!(docs[0]["record"].get("Function").is_some(), "got: {}", docs[0]);
    }
}
