/*! [AX.25][ax25] link-layer framing.

Address encoding, UI frame assembly with a CRC-CCITT frame check
sequence, fragmentation of large payloads into sequenced frames, and
the inverse parse/reassemble path.

All frames built here are UI frames (control 0x03, PID 0xF0), the
shape used by unconnected packet radio such as [APRS][aprs]. Frames
other than `Message` carry a five-byte fragment header after the PID:
one type byte, a big-endian sequence number and a big-endian fragment
total.

[ax25]: https://en.wikipedia.org/wiki/AX.25
[aprs]: https://en.wikipedia.org/wiki/Automatic_Packet_Reporting_System
 */
use std::collections::HashMap;
use std::str::FromStr;

use log::{debug, warn};

use crate::crc::crc_ccitt;
use crate::{Error, Result};

/// Frame delimiter.
pub const FLAG: u8 = 0x7e;

/// Control byte: UI frame.
pub const CONTROL_UI: u8 = 0x03;

/// PID byte: no layer 3 protocol.
pub const PID_NO_L3: u8 = 0xf0;

/// Most payload bytes a single frame will carry.
pub const MAX_PAYLOAD: usize = 256;

/// Length of the fragment header, when present.
pub const FRAGMENT_HEADER_LEN: usize = 5;

const ADDRESS_LEN: usize = 7;
const CALLSIGN_LEN: usize = 6;
const MAX_SSID: u8 = 63;

// Flags, two addresses, control, PID, FCS.
const MIN_FRAME_LEN: usize = 2 + 2 * ADDRESS_LEN + 2 + 2;

/// A callsign plus SSID, as carried in an AX.25 address field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    call: String,
    ssid: u8,
}

impl Address {
    /// Create a new address.
    ///
    /// The callsign must be one to six ASCII characters; the SSID uses
    /// the full six-bit field of the address byte, so values up to 63.
    pub fn new(call: &str, ssid: u8) -> Result<Self> {
        if call.is_empty() || call.len() > CALLSIGN_LEN || !call.is_ascii() {
            return Err(Error::InvalidInput(format!("bad callsign {call:?}")));
        }
        if ssid > MAX_SSID {
            return Err(Error::InvalidInput(format!(
                "SSID {ssid} does not fit in six bits"
            )));
        }
        Ok(Self {
            call: call.to_string(),
            ssid,
        })
    }

    /// The callsign.
    #[must_use]
    pub fn call(&self) -> &str {
        &self.call
    }

    /// The SSID.
    #[must_use]
    pub fn ssid(&self) -> u8 {
        self.ssid
    }

    /// Encode as the 7-byte wire field: six space-padded callsign
    /// characters each shifted left one bit, then the SSID byte. Bit 0
    /// of the SSID byte marks the last address of the frame.
    fn encode(&self, last: bool) -> [u8; ADDRESS_LEN] {
        let mut out = [b' ' << 1; ADDRESS_LEN];
        for (o, b) in out.iter_mut().zip(self.call.bytes()) {
            *o = b << 1;
        }
        out[ADDRESS_LEN - 1] = (self.ssid << 1) | u8::from(last);
        out
    }

    /// Decode a 7-byte wire field. Returns the address and whether the
    /// end-of-address bit was set.
    fn decode(raw: &[u8; ADDRESS_LEN]) -> (Self, bool) {
        let call: String = raw[..CALLSIGN_LEN]
            .iter()
            .map(|&b| char::from(b >> 1))
            .collect();
        (
            Self {
                call: call.trim_end().to_string(),
                ssid: raw[ADDRESS_LEN - 1] >> 1,
            },
            raw[ADDRESS_LEN - 1] & 1 != 0,
        )
    }
}

impl FromStr for Address {
    type Err = Error;

    /// Parse `"CALL"` or `"CALL-SSID"`, SSID in decimal.
    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('-') {
            None => Self::new(s, 0),
            Some((call, ssid)) => {
                let ssid = ssid
                    .parse()
                    .map_err(|_| Error::InvalidInput(format!("bad SSID in {s:?}")))?;
                Self::new(call, ssid)
            }
        }
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.ssid == 0 {
            write!(f, "{}", self.call)
        } else {
            write!(f, "{}-{}", self.call, self.ssid)
        }
    }
}

/// Role of a frame within a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    /// Single-frame broadcast.
    Beacon,
    /// A payload that fits in one fragment.
    DataHeader,
    /// First fragment of a multi-fragment payload.
    DataFirst,
    /// Middle fragment.
    Data,
    /// Final fragment.
    DataEnd,
    /// Single frame carrying no fragment header at all.
    Message,
}

impl FrameType {
    /// Wire code carried in the fragment header type byte.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            FrameType::Beacon => 0,
            FrameType::DataHeader => 1,
            FrameType::DataFirst => 2,
            FrameType::Data => 3,
            FrameType::DataEnd => 4,
            FrameType::Message => 5,
        }
    }

    fn from_code(code: u8) -> Result<Self> {
        Ok(match code {
            0 => FrameType::Beacon,
            1 => FrameType::DataHeader,
            2 => FrameType::DataFirst,
            3 => FrameType::Data,
            4 => FrameType::DataEnd,
            5 => FrameType::Message,
            _ => {
                return Err(Error::InvalidInput(format!("unknown frame type {code}")));
            }
        })
    }

    /// Whether frames of this type carry the five-byte fragment header.
    #[must_use]
    pub fn has_fragment_header(self) -> bool {
        !matches!(self, FrameType::Message)
    }
}

/// One planned fragment of a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment<'a> {
    /// Frame role within the transfer.
    pub ftype: FrameType,
    /// Zero-based sequence number.
    pub sequence: u16,
    /// Fragment count for the whole payload.
    pub total: u16,
    /// The payload chunk this fragment carries.
    pub chunk: &'a [u8],
}

/// Plan how a payload splits into fragments, without building frames.
///
/// One entry per frame, following the type policy of
/// [`LinkConfig::packetize`]. Callers that need per-frame error
/// handling build each entry themselves with
/// [`LinkConfig::build_frame`] and decide what a failed frame means
/// for the rest of the batch.
pub fn fragment_plan(payload: &[u8]) -> Result<Vec<Fragment<'_>>> {
    let total = payload.len().div_ceil(MAX_PAYLOAD);
    let total = u16::try_from(total).map_err(|_| {
        Error::InvalidInput(format!("payload needs {total} fragments, max 65535"))
    })?;
    Ok(payload
        .chunks(MAX_PAYLOAD)
        .enumerate()
        .map(|(i, chunk)| {
            let ftype = if total == 1 {
                FrameType::DataHeader
            } else if i == 0 {
                FrameType::DataFirst
            } else if i == usize::from(total) - 1 {
                FrameType::DataEnd
            } else {
                FrameType::Data
            };
            Fragment {
                ftype,
                sequence: i as u16,
                total,
                chunk,
            }
        })
        .collect())
}

/// Immutable link endpoints consumed by the frame builder.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    src: Address,
    dst: Address,
}

impl LinkConfig {
    /// Create a link configuration for frames from `src` to `dst`.
    #[must_use]
    pub fn new(src: Address, dst: Address) -> Self {
        Self { src, dst }
    }

    /// Source station.
    #[must_use]
    pub fn src(&self) -> &Address {
        &self.src
    }

    /// Destination station.
    #[must_use]
    pub fn dst(&self) -> &Address {
        &self.dst
    }

    /// Build one UI frame.
    ///
    /// Byte order on the wire: flag, destination address, source
    /// address, control, PID, fragment header (unless `Message`),
    /// payload, FCS little-endian, flag. The FCS covers everything
    /// between the flags, exclusive of both.
    pub fn build_frame(
        &self,
        ftype: FrameType,
        sequence: u16,
        total: u16,
        payload: &[u8],
    ) -> Result<Vec<u8>> {
        if payload.len() > MAX_PAYLOAD {
            return Err(Error::InvalidInput(format!(
                "payload of {} bytes exceeds the {MAX_PAYLOAD} byte frame limit",
                payload.len()
            )));
        }
        let mut frame =
            Vec::with_capacity(MIN_FRAME_LEN + FRAGMENT_HEADER_LEN + payload.len());
        frame.push(FLAG);
        frame.extend_from_slice(&self.dst.encode(false));
        frame.extend_from_slice(&self.src.encode(true));
        frame.push(CONTROL_UI);
        frame.push(PID_NO_L3);
        if ftype.has_fragment_header() {
            frame.push(ftype.code());
            frame.extend_from_slice(&sequence.to_be_bytes());
            frame.extend_from_slice(&total.to_be_bytes());
        }
        frame.extend_from_slice(payload);
        let fcs = crc_ccitt(&frame[1..]);
        frame.extend_from_slice(&fcs.to_le_bytes());
        frame.push(FLAG);
        debug!(
            "built {ftype:?} frame {sequence}/{total}: {} bytes",
            frame.len()
        );
        Ok(frame)
    }

    /// Build a single `Beacon` frame.
    pub fn beacon(&self, payload: &[u8]) -> Result<Vec<u8>> {
        self.build_frame(FrameType::Beacon, 0, 1, payload)
    }

    /// Build a single `Message` frame, with no fragment header.
    pub fn message(&self, payload: &[u8]) -> Result<Vec<u8>> {
        self.build_frame(FrameType::Message, 0, 1, payload)
    }

    /// Split a payload into sequenced data frames.
    ///
    /// A payload that fits in one fragment becomes a single
    /// `DataHeader` frame; larger payloads become `DataFirst`, `Data`…,
    /// `DataEnd`. Every fragment is full-size except possibly the last.
    pub fn packetize(&self, payload: &[u8]) -> Result<Vec<Vec<u8>>> {
        fragment_plan(payload)?
            .into_iter()
            .map(|f| self.build_frame(f.ftype, f.sequence, f.total, f.chunk))
            .collect()
    }
}

/// A parsed AX.25 UI frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Destination station.
    pub dst: Address,
    /// Source station.
    pub src: Address,
    /// Frame role.
    pub ftype: FrameType,
    /// Zero-based fragment sequence number.
    pub sequence: u16,
    /// Fragment count of the transfer this frame belongs to.
    pub total: u16,
    /// Payload bytes.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Parse and verify one flag-delimited frame.
    ///
    /// Checks the flags and the FCS, decodes both address fields, and
    /// splits off the fragment header. A frame whose first post-PID
    /// byte is not a header-carrying type code is taken as `Message`.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MIN_FRAME_LEN {
            return Err(Error::InvalidInput(format!(
                "frame of {} bytes is too short",
                bytes.len()
            )));
        }
        if bytes[0] != FLAG || bytes[bytes.len() - 1] != FLAG {
            return Err(Error::InvalidInput("missing frame flags".into()));
        }
        let body = &bytes[1..bytes.len() - 3];
        let want_fcs = u16::from_le_bytes(bytes[bytes.len() - 3..bytes.len() - 1].try_into()?);
        let got_fcs = crc_ccitt(body);
        if got_fcs != want_fcs {
            return Err(Error::InvalidInput(format!(
                "FCS mismatch: want {want_fcs:04x}, got {got_fcs:04x}"
            )));
        }
        let (dst, dst_last) = Address::decode(body[..ADDRESS_LEN].try_into()?);
        let (src, src_last) = Address::decode(body[ADDRESS_LEN..2 * ADDRESS_LEN].try_into()?);
        if dst_last || !src_last {
            return Err(Error::InvalidInput(
                "end-of-address bit not on the source address".into(),
            ));
        }
        if body[2 * ADDRESS_LEN] != CONTROL_UI || body[2 * ADDRESS_LEN + 1] != PID_NO_L3 {
            return Err(Error::InvalidInput(format!(
                "not a UI frame: control {:02x}, PID {:02x}",
                body[2 * ADDRESS_LEN],
                body[2 * ADDRESS_LEN + 1]
            )));
        }
        let rest = &body[2 * ADDRESS_LEN + 2..];
        let with_header = rest.len() >= FRAGMENT_HEADER_LEN
            && FrameType::from_code(rest[0]).is_ok_and(|t| t.has_fragment_header());
        if with_header {
            Ok(Self {
                dst,
                src,
                ftype: FrameType::from_code(rest[0])?,
                sequence: u16::from_be_bytes(rest[1..3].try_into()?),
                total: u16::from_be_bytes(rest[3..5].try_into()?),
                payload: rest[FRAGMENT_HEADER_LEN..].to_vec(),
            })
        } else {
            Ok(Self {
                dst,
                src,
                ftype: FrameType::Message,
                sequence: 0,
                total: 1,
                payload: rest.to_vec(),
            })
        }
    }
}

struct Partial {
    total: u16,
    next: u16,
    data: Vec<u8>,
}

/// Reassembles fragmented payloads from parsed frames.
///
/// Transfers are keyed by (source, destination). Fragments must arrive
/// in sequence order with a consistent total; a fragment that breaks
/// either rule drops the whole transfer, and the error is reported to
/// the caller.
#[derive(Default)]
pub struct Reassembler {
    transfers: HashMap<(Address, Address), Partial>,
}

impl Reassembler {
    /// Create an empty reassembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Transfers currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.transfers.len()
    }

    /// Feed one parsed frame. Returns the complete payload when the
    /// frame finishes a transfer, `None` while one is still building.
    pub fn push(&mut self, frame: &Frame) -> Result<Option<Vec<u8>>> {
        let key = (frame.src.clone(), frame.dst.clone());
        match frame.ftype {
            FrameType::Beacon | FrameType::Message | FrameType::DataHeader => {
                Ok(Some(frame.payload.clone()))
            }
            FrameType::DataFirst => {
                if frame.sequence != 0 || frame.total < 2 {
                    return Err(Error::InvalidInput(format!(
                        "bad first fragment: sequence {}, total {}",
                        frame.sequence, frame.total
                    )));
                }
                if self.transfers.contains_key(&key) {
                    warn!("{} -> {}: transfer restarted", frame.src, frame.dst);
                }
                self.transfers.insert(
                    key,
                    Partial {
                        total: frame.total,
                        next: 1,
                        data: frame.payload.clone(),
                    },
                );
                Ok(None)
            }
            FrameType::Data | FrameType::DataEnd => {
                let Some(mut partial) = self.transfers.remove(&key) else {
                    return Err(Error::InvalidInput(format!(
                        "{} -> {}: fragment {} without a transfer in progress",
                        frame.src, frame.dst, frame.sequence
                    )));
                };
                if frame.sequence != partial.next || frame.total != partial.total {
                    return Err(Error::InvalidInput(format!(
                        "{} -> {}: fragment out of order",
                        frame.src, frame.dst
                    )));
                }
                partial.data.extend_from_slice(&frame.payload);
                partial.next += 1;
                if frame.ftype == FrameType::DataEnd {
                    if partial.next != partial.total {
                        return Err(Error::InvalidInput(format!(
                            "{} -> {}: transfer ended at fragment {} of {}",
                            frame.src, frame.dst, partial.next, partial.total
                        )));
                    }
                    return Ok(Some(partial.data));
                }
                self.transfers.insert(key, partial);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_link() -> LinkConfig {
        LinkConfig::new(
            Address::new("N0CALL", 0).unwrap(),
            Address::new("CQ", 0).unwrap(),
        )
    }

    #[test]
    fn address_encoding() -> Result<()> {
        let addr = Address::new("N0CALL", 0)?;
        assert_eq!(
            addr.encode(true),
            [0x9c, 0x60, 0x86, 0x82, 0x98, 0x98, 0x01]
        );
        assert_eq!(
            addr.encode(false),
            [0x9c, 0x60, 0x86, 0x82, 0x98, 0x98, 0x00]
        );
        Ok(())
    }

    #[test]
    fn address_space_padding() -> Result<()> {
        let addr = Address::new("CQ", 0)?;
        assert_eq!(
            addr.encode(false),
            [0x86, 0xa2, 0x40, 0x40, 0x40, 0x40, 0x00]
        );
        Ok(())
    }

    #[test]
    fn six_bit_ssid_carries_reserved_bits() -> Result<()> {
        // Callers wanting classic AX.25 reserved bits fold them into
        // the six-bit SSID value.
        let addr = Address::new("N0CALL", 0x30)?;
        assert_eq!(addr.encode(true)[6], 0x61);
        assert_eq!(addr.encode(false)[6], 0x60);
        Ok(())
    }

    #[test]
    fn address_validation() {
        assert!(Address::new("TOOLONGCALL", 0).is_err());
        assert!(Address::new("", 0).is_err());
        assert!(Address::new("N0CALL", 64).is_err());
        assert!(Address::new("N0CALL", 63).is_ok());
    }

    #[test]
    fn address_from_str() -> Result<()> {
        let a: Address = "N0CALL-7".parse()?;
        assert_eq!(a.call(), "N0CALL");
        assert_eq!(a.ssid(), 7);
        let b: Address = "CQ".parse()?;
        assert_eq!(b.ssid(), 0);
        assert!("N0CALL-bogus".parse::<Address>().is_err());
        Ok(())
    }

    #[test]
    fn beacon_frame_layout() -> Result<()> {
        let frame = test_link().beacon(b"HELLO")?;
        let want_prefix = [
            0x7e, // flag
            0x86, 0xa2, 0x40, 0x40, 0x40, 0x40, 0x00, // CQ
            0x9c, 0x60, 0x86, 0x82, 0x98, 0x98, 0x01, // N0CALL, last
            0x03, 0xf0, // control, PID
            0x00, 0x00, 0x00, 0x00, 0x01, // beacon, seq 0, total 1
            0x48, 0x45, 0x4c, 0x4c, 0x4f, // HELLO
        ];
        assert_eq!(&frame[..want_prefix.len()], &want_prefix);
        // FCS over the body, little-endian, then the closing flag.
        assert_eq!(&frame[want_prefix.len()..], &[0xa9, 0x19, 0x7e]);
        let fcs = crc_ccitt(&frame[1..frame.len() - 3]);
        assert_eq!(fcs, 0x19a9);
        Ok(())
    }

    #[test]
    fn message_frame_has_no_fragment_header() -> Result<()> {
        let frame = test_link().message(b"HI")?;
        // flag + addresses + control + PID, then payload directly.
        assert_eq!(&frame[17..19], b"HI");
        assert_eq!(frame.len(), MIN_FRAME_LEN + 2);
        Ok(())
    }

    #[test]
    fn frame_rejects_oversized_payload() {
        let payload = vec![0u8; MAX_PAYLOAD + 1];
        assert!(test_link().message(&payload).is_err());
    }

    #[test]
    fn packetize_single_fragment() -> Result<()> {
        let frames = test_link().packetize(&[7u8; 100])?;
        assert_eq!(frames.len(), 1);
        let f = Frame::parse(&frames[0])?;
        assert_eq!(f.ftype, FrameType::DataHeader);
        assert_eq!(f.sequence, 0);
        assert_eq!(f.total, 1);
        assert_eq!(f.payload, vec![7u8; 100]);
        Ok(())
    }

    #[test]
    fn packetize_three_fragments() -> Result<()> {
        // 513 bytes: 256 + 256 + 1.
        let frames = test_link().packetize(&[0u8; 513])?;
        assert_eq!(frames.len(), 3);
        let want = [
            (FrameType::DataFirst, 0u16, 256usize),
            (FrameType::Data, 1, 256),
            (FrameType::DataEnd, 2, 1),
        ];
        for (frame, (ftype, seq, len)) in frames.iter().zip(want) {
            let f = Frame::parse(frame)?;
            assert_eq!(f.ftype, ftype);
            assert_eq!(f.sequence, seq);
            assert_eq!(f.total, 3);
            assert_eq!(f.payload.len(), len);
        }
        Ok(())
    }

    #[test]
    fn fragment_plan_policy() -> Result<()> {
        let payload = [0u8; 700];
        let plan = fragment_plan(&payload)?;
        let types: Vec<_> = plan.iter().map(|f| f.ftype).collect();
        assert_eq!(
            types,
            [FrameType::DataFirst, FrameType::Data, FrameType::DataEnd]
        );
        for (i, f) in plan.iter().enumerate() {
            assert_eq!(f.sequence, i as u16);
            assert_eq!(f.total, 3);
        }
        assert_eq!(plan[0].chunk.len(), MAX_PAYLOAD);
        assert_eq!(plan[2].chunk.len(), 700 - 2 * MAX_PAYLOAD);
        Ok(())
    }

    #[test]
    fn packetize_exact_boundary() -> Result<()> {
        let frames = test_link().packetize(&[1u8; 2 * MAX_PAYLOAD])?;
        assert_eq!(frames.len(), 2);
        let first = Frame::parse(&frames[0])?;
        let last = Frame::parse(&frames[1])?;
        assert_eq!(first.ftype, FrameType::DataFirst);
        assert_eq!(last.ftype, FrameType::DataEnd);
        assert_eq!(first.payload.len(), MAX_PAYLOAD);
        assert_eq!(last.payload.len(), MAX_PAYLOAD);
        Ok(())
    }

    #[test]
    fn parse_rejects_corrupt_fcs() -> Result<()> {
        let mut frame = test_link().beacon(b"HELLO")?;
        let n = frame.len();
        frame[n / 2] ^= 0x20;
        assert!(Frame::parse(&frame).is_err());
        Ok(())
    }

    #[test]
    fn parse_roundtrip_addresses() -> Result<()> {
        let link = LinkConfig::new(Address::new("W1AW", 5)?, Address::new("APRS", 0)?);
        let f = Frame::parse(&link.beacon(b"x")?)?;
        assert_eq!(f.src.call(), "W1AW");
        assert_eq!(f.src.ssid(), 5);
        assert_eq!(f.dst.call(), "APRS");
        Ok(())
    }

    #[test]
    fn parse_message_frame() -> Result<()> {
        let f = Frame::parse(&test_link().message(b"no header here")?)?;
        assert_eq!(f.ftype, FrameType::Message);
        assert_eq!(f.payload, b"no header here");
        Ok(())
    }

    #[test]
    fn reassemble_multi_fragment() -> Result<()> {
        let payload: Vec<u8> = (0..600u32).map(|i| i as u8).collect();
        let frames = test_link().packetize(&payload)?;
        let mut r = Reassembler::new();
        let mut out = None;
        for frame in &frames {
            out = r.push(&Frame::parse(frame)?)?;
        }
        assert_eq!(out, Some(payload));
        assert_eq!(r.in_flight(), 0);
        Ok(())
    }

    #[test]
    fn reassemble_single_frame_types() -> Result<()> {
        let mut r = Reassembler::new();
        let beacon = Frame::parse(&test_link().beacon(b"one")?)?;
        assert_eq!(r.push(&beacon)?, Some(b"one".to_vec()));
        let frames = test_link().packetize(b"two")?;
        let header = Frame::parse(&frames[0])?;
        assert_eq!(r.push(&header)?, Some(b"two".to_vec()));
        Ok(())
    }

    #[test]
    fn reassemble_rejects_out_of_order() -> Result<()> {
        let frames = test_link().packetize(&[0u8; 600])?;
        let mut r = Reassembler::new();
        r.push(&Frame::parse(&frames[0])?)?;
        // Skip fragment 1, feed the end directly.
        assert!(r.push(&Frame::parse(&frames[2])?).is_err());
        // The transfer is gone; a late middle fragment has no home.
        assert!(r.push(&Frame::parse(&frames[1])?).is_err());
        assert_eq!(r.in_flight(), 0);
        Ok(())
    }

    #[test]
    fn reassemble_rejects_orphan_fragment() -> Result<()> {
        let frames = test_link().packetize(&[0u8; 600])?;
        let mut r = Reassembler::new();
        assert!(r.push(&Frame::parse(&frames[1])?).is_err());
        Ok(())
    }
}
