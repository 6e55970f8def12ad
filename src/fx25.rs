/*! [FX.25][fx25] outer framing.

FX.25 wraps an AX.25 frame in a fixed correlation tag and an
RS(255,223) codeword, adding forward error correction without touching
the inner frame: a receiver that knows nothing of FX.25 still sees a
plain AX.25 frame between the flags.

The correlation tag lets a receiver find the codeword in a noisy bit
stream without relying on HDLC flags.

[fx25]: https://en.wikipedia.org/wiki/FX.25_Forward_Error_Correction
 */
use log::debug;

use crate::rs::{self, RsCodec};
use crate::{Error, Result};

/// The 8-byte correlation tag preceding every RS codeword.
pub const CORRELATION_TAG: [u8; 8] = [0xcc, 0x8f, 0x8a, 0xe4, 0x85, 0xe2, 0x98, 0x01];

/// Total FX.25 frame length: tag plus codeword.
pub const FRAME_LEN: usize = CORRELATION_TAG.len() + rs::N;

/// Wrap an AX.25 frame into an FX.25 frame.
///
/// The frame is zero padded to the K-symbol data block, parity is
/// appended and the correlation tag prepended. The result is always
/// [`FRAME_LEN`] bytes.
pub fn wrap(codec: &RsCodec, frame: &[u8]) -> Result<[u8; FRAME_LEN]> {
    if frame.len() > rs::K {
        return Err(Error::PayloadTooLarge {
            got: frame.len(),
            max: rs::K,
        });
    }
    let codeword = codec.encode(frame)?;
    let mut out = [0u8; FRAME_LEN];
    out[..CORRELATION_TAG.len()].copy_from_slice(&CORRELATION_TAG);
    out[CORRELATION_TAG.len()..].copy_from_slice(&codeword);
    Ok(out)
}

/// Unwrap a received FX.25 frame.
///
/// Verifies the correlation tag and RS-decodes the codeword. Returns
/// the corrected K-byte data region, zero padding included, together
/// with the number of symbols corrected. The data region is returned
/// verbatim; peeling the AX.25 frame out of it is the caller's
/// business.
pub fn unwrap(codec: &RsCodec, bytes: &[u8]) -> Result<(Vec<u8>, usize)> {
    if bytes.len() != FRAME_LEN {
        return Err(Error::InvalidInput(format!(
            "FX.25 frame must be {FRAME_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    if bytes[..CORRELATION_TAG.len()] != CORRELATION_TAG {
        return Err(Error::InvalidInput("missing correlation tag".into()));
    }
    let block: [u8; rs::N] = bytes[CORRELATION_TAG.len()..].try_into()?;
    let c = codec.decode(&block)?;
    if c.corrected > 0 {
        debug!("FX.25 unwrap corrected {} symbols", c.corrected);
    }
    Ok((c.codeword[..rs::K].to_vec(), c.corrected))
}

/// Locate the correlation tag in a noisy byte stream.
///
/// Slides over `haystack` and returns the offset of the first window
/// within `max_diffs` mismatched bytes of the tag.
#[must_use]
pub fn find_tag(haystack: &[u8], max_diffs: usize) -> Option<usize> {
    haystack.windows(CORRELATION_TAG.len()).position(|w| {
        w.iter()
            .zip(&CORRELATION_TAG)
            .filter(|(a, b)| a != b)
            .count()
            <= max_diffs
    })
}
