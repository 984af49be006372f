//! Tokenizer for ns-3 ASCII trace lines.
//!
//! Only the pieces needed for flow reconstruction are pulled out: direction
//! marker, timestamp, the TCP port pair, the flags segment and the ack value.
//! Every extraction point maps to its own [`DecodeError`] variant.

use crate::error::DecodeError;
use penny_lab_abstract::FlowKey;

const TCP_HEADER: &str = "ns3::TcpHeader";
const ACK_MARKER: &str = " Ack=";
const WIN_MARKER: &str = " Win=";

/// Direction of a trace event, from the line's leading marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// `-`: packet dequeued for transmission.
    Send,
    /// `r`: packet received.
    Receive,
    /// Enqueue, drop and anything else.
    Other,
}

impl LineKind {
    fn from_marker(marker: Option<char>) -> Self {
        match marker {
            Some('-') => LineKind::Send,
            Some('r') => LineKind::Receive,
            _ => LineKind::Other,
        }
    }
}

/// Fields of one trace line that carries a TCP header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceLine<'a> {
    pub kind: LineKind,
    pub timestamp: &'a str,
    pub src_port: u16,
    pub dst_port: u16,
    /// Text between the flags brackets, e.g. `SYN` or `SYN|ACK`.
    pub flags: &'a str,
    pub ack: Option<u32>,
}

impl TraceLine<'_> {
    /// A pure SYN opens a flow; SYN|ACK does not.
    pub fn is_syn(&self) -> bool {
        self.flags == "SYN"
    }

    pub fn send_key(&self) -> FlowKey {
        FlowKey::from_send(self.src_port, self.dst_port)
    }

    pub fn receive_key(&self) -> FlowKey {
        FlowKey::from_receive(self.src_port, self.dst_port)
    }
}

/// Decode one raw trace line.
///
/// Returns `Ok(None)` for lines without a TCP header; those are outside the
/// flow vocabulary rather than malformed.
pub fn decode_line(line: &str) -> Result<Option<TraceLine<'_>>, DecodeError> {
    let Some(header_at) = line.find(TCP_HEADER) else {
        return Ok(None);
    };

    let kind = LineKind::from_marker(line.chars().next());
    let timestamp = parse_timestamp(line)?;

    let body = line[header_at + TCP_HEADER.len()..]
        .trim_start()
        .strip_prefix('(')
        .ok_or(DecodeError::MissingHeaderOpen)?;

    let flags_at = body.find(" [").ok_or(DecodeError::MissingFlags)?;
    let (src_port, dst_port) = parse_ports(&body[..flags_at])?;

    let after_open = &body[flags_at + 2..];
    let flags_end = after_open.find(']').ok_or(DecodeError::MissingFlags)?;
    let flags = &after_open[..flags_end];
    let ack = parse_ack(&after_open[flags_end + 1..])?;

    Ok(Some(TraceLine {
        kind,
        timestamp,
        src_port,
        dst_port,
        flags,
        ack,
    }))
}

fn parse_timestamp(line: &str) -> Result<&str, DecodeError> {
    let token = line
        .split_whitespace()
        .nth(1)
        .ok_or(DecodeError::MissingTimestamp)?;
    match token.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(token),
        _ => Err(DecodeError::BadTimestamp(token.to_string())),
    }
}

fn parse_ports(segment: &str) -> Result<(u16, u16), DecodeError> {
    let (src, dst) = segment
        .split_once(" > ")
        .ok_or(DecodeError::MissingPortSeparator)?;
    Ok((parse_port(src)?, parse_port(dst)?))
}

fn parse_port(text: &str) -> Result<u16, DecodeError> {
    let text = text.trim();
    text.parse()
        .map_err(|_| DecodeError::BadPort(text.to_string()))
}

fn parse_ack(tail: &str) -> Result<Option<u32>, DecodeError> {
    let Some(at) = tail.find(ACK_MARKER) else {
        return Ok(None);
    };
    let rest = &tail[at + ACK_MARKER.len()..];
    let end = rest.find(WIN_MARKER).ok_or(DecodeError::MissingWindow)?;
    let value = &rest[..end];
    value
        .parse()
        .map(Some)
        .map_err(|_| DecodeError::BadAck(value.to_string()))
}
