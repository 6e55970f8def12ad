#![warn(missing_docs)]
/*! Radio link framing and forward error correction for amateur packet
radio.

This crate turns arbitrary byte payloads into [AX.25][ax25] link-layer
frames, wraps each frame into an [FX.25][fx25] correlation-tagged
Reed-Solomon (255,223) codeword, and inverts the FEC path on the
receive side.

# Architecture overview

The transmit path is a chain of small stages. Each stage is a plain
call that consumes bytes and returns bytes; no stage keeps cross-frame
state.

```text
      [ payload bytes ]
             ↓
  [ Packetizer: sequenced ]
  [ AX.25 UI frames       ]
             ↓
  [ Hex dump interchange ]
             ↓
  [ RS(255,223) encoder +  ]
  [ 8-byte correlation tag ]
             ↓
      [ FX.25 frames ]
```

The receive path RS-decodes each 255-byte codeword, correcting up to
16 symbol errors, and hands the recovered AX.25 frame bytes back.
Frame parsing and fragment reassembly are available on top for hosts
that want the original payload back.

The Galois field tables and the generator polynomial live in an
immutable [`rs::RsCodec`] context created once at startup; after that
every operation is read-only and safe to share across threads.

# Example

```
use fx25::ax25::{Address, LinkConfig};
use fx25::rs::RsCodec;

let link = LinkConfig::new(
    Address::new("N0CALL", 0)?,
    Address::new("CQ", 0)?,
);
let codec = RsCodec::new();
for frame in link.packetize(b"hello out there")? {
    let wrapped = fx25::fx25::wrap(&codec, &frame)?;
    assert_eq!(wrapped.len(), 263);
}
# Ok::<(), fx25::Error>(())
```

[ax25]: https://en.wikipedia.org/wiki/AX.25
[fx25]: https://en.wikipedia.org/wiki/FX.25_Forward_Error_Correction
 */

pub mod ax25;
pub mod crc;
pub mod fx25;
pub mod gf;
pub mod hexdump;
pub mod rs;

/// Errors returned by the framing and FEC stages.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Filesystem or stream I/O failure. Fatal to the containing run.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Input violating a frame or address bound. Reported per frame;
    /// the containing batch continues.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Input exceeding the data capacity of one RS codeword.
    #[error("payload too large: {got} bytes, max {max}")]
    PayloadTooLarge {
        /// Bytes offered.
        got: usize,
        /// Bytes the codeword can carry.
        max: usize,
    },

    /// The RS decoder found more errors than it can correct, or an
    /// inconsistent decode. The received word is left for the caller
    /// to fall back on.
    #[error("uncorrectable block: {0}")]
    Uncorrectable(&'static str),

    /// Malformed hex dump input.
    #[error("parse error: {0}")]
    Parse(String),

    /// Slice to array conversion failed.
    #[error("slice conversion: {0}")]
    Slice(#[from] std::array::TryFromSliceError),
}

/// Result type used throughout this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
