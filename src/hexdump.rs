/*! Hex dump interchange format.

Line-oriented textual serialization used between the framing and FEC
stages. Each packet is a header line naming the packet number and byte
count, then sixteen uppercase hex bytes per line separated by single
spaces, then a blank line:

```text
Packet 1 (30 bytes):
7E 86 A2 40 40 40 40 00 9C 60 86 82 98 98 01 03
F0 00 00 00 00 01 48 45 4C 4C 4F A9 19 7E

```

The parser is deliberately loose: any amount of whitespace between
byte tokens, packet boundaries recognized by lines containing both
"Packet" and "bytes", a blank line closing the packet. A malformed
packet is dropped with a warning and parsing resumes at the next
header, so one bad packet never sinks the batch.
 */
use std::io::{BufRead, Write};

use itertools::Itertools;
use log::warn;

use crate::{Error, Result};

const BYTES_PER_LINE: usize = 16;

/// Write packets in hex dump form.
pub fn write_packets<W: Write>(w: &mut W, packets: &[Vec<u8>]) -> Result<()> {
    for (n, packet) in packets.iter().enumerate() {
        writeln!(w, "Packet {} ({} bytes):", n + 1, packet.len())?;
        write_bytes(w, packet)?;
        writeln!(w)?;
    }
    Ok(())
}

/// Write one FX.25 frame with labeled tag and codeword sections.
pub fn write_fx25_packet<W: Write>(
    w: &mut W,
    n: usize,
    tag: &[u8],
    codeword: &[u8],
) -> Result<()> {
    writeln!(w, "Packet {n} ({} bytes):", tag.len() + codeword.len())?;
    writeln!(w, "Correlation Tag:")?;
    write_bytes(w, tag)?;
    writeln!(w, "RS Codeword:")?;
    write_bytes(w, codeword)?;
    writeln!(w)?;
    Ok(())
}

fn write_bytes<W: Write>(w: &mut W, bytes: &[u8]) -> Result<()> {
    for line in bytes.chunks(BYTES_PER_LINE) {
        writeln!(w, "{}", line.iter().map(|b| format!("{b:02X}")).join(" "))?;
    }
    Ok(())
}

/// Parse a hex dump back into packets.
///
/// Malformed packets are dropped, not fatal; the reader only fails on
/// I/O errors.
pub fn read_packets<R: BufRead>(r: R) -> Result<Vec<Vec<u8>>> {
    let mut packets = Vec::new();
    let mut current: Option<Vec<u8>> = None;
    for line in r.lines() {
        let line = line?;
        if line.contains("Packet") && line.contains("bytes") {
            // A header with no preceding blank line still closes the
            // previous packet.
            if let Some(done) = current.take() {
                packets.push(done);
            }
            current = Some(Vec::new());
            continue;
        }
        if line.trim().is_empty() {
            if let Some(done) = current.take() {
                packets.push(done);
            }
            continue;
        }
        let Some(cur) = current.as_mut() else {
            // Bytes outside any packet. Nothing to attach them to.
            continue;
        };
        match parse_line(&line) {
            Ok(bytes) => cur.extend(bytes),
            Err(e) => {
                warn!("dropping packet: {e}");
                current = None;
            }
        }
    }
    if let Some(done) = current.take() {
        packets.push(done);
    }
    Ok(packets)
}

/// Parse one line of whitespace-separated hex byte tokens.
fn parse_line(line: &str) -> Result<Vec<u8>> {
    line.split_whitespace()
        .map(|tok| {
            u8::from_str_radix(tok, 16)
                .map_err(|_| Error::Parse(format!("bad hex byte {tok:?}")))
        })
        .collect()
}
