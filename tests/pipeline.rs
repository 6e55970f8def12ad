//! End to end exercises of the transmit and receive paths.

use std::fs::File;
use std::io::BufReader;

use anyhow::Result;
use rand::prelude::*;

use ::fx25::ax25::{Address, Frame, LinkConfig, Reassembler};
use ::fx25::fx25;
use ::fx25::hexdump;
use ::fx25::rs::{self, RsCodec};

fn test_link() -> Result<LinkConfig> {
    Ok(LinkConfig::new(
        Address::new("N0CALL", 0)?,
        Address::new("CQ", 0)?,
    ))
}

/// Strip the zero padding after the closing flag. The flag byte 0x7E
/// is always the last nonzero byte of the data region.
fn trim_padding(mut data: Vec<u8>) -> Vec<u8> {
    while data.last() == Some(&0) {
        data.pop();
    }
    data
}

#[test]
fn clean_pipeline_roundtrip() -> Result<()> {
    let payload: Vec<u8> = (0..600u32).map(|i| (i * 7) as u8).collect();
    let link = test_link()?;
    let codec = RsCodec::new();

    // Transmit: packetize, pass through the hex dump interchange on
    // disk, wrap each frame.
    let frames = link.packetize(&payload)?;
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("packets.txt");
    hexdump::write_packets(&mut File::create(&path)?, &frames)?;
    let read_back = hexdump::read_packets(BufReader::new(File::open(&path)?))?;
    assert_eq!(read_back, frames);

    let wrapped: Vec<_> = read_back
        .iter()
        .map(|f| fx25::wrap(&codec, f))
        .collect::<Result<Vec<_>, _>>()?;

    // Receive: unwrap, trim, parse, reassemble.
    let mut reassembler = Reassembler::new();
    let mut result = None;
    for w in &wrapped {
        let (data, corrected) = fx25::unwrap(&codec, w)?;
        assert_eq!(corrected, 0);
        let frame = Frame::parse(&trim_padding(data))?;
        result = reassembler.push(&frame)?;
    }
    assert_eq!(result, Some(payload));
    Ok(())
}

#[test]
fn noisy_pipeline_roundtrip() -> Result<()> {
    let mut rng = rand::rng();
    let mut payload = vec![0u8; 1000];
    rng.fill(&mut payload[..]);
    let link = test_link()?;
    let codec = RsCodec::new();

    let mut reassembler = Reassembler::new();
    let mut result = None;
    for frame in link.packetize(&payload)? {
        let mut wrapped = fx25::wrap(&codec, &frame)?.to_vec();
        // Batter the codeword with the most symbol errors the code can
        // take. Bit flips within a byte only count once.
        let mut positions: Vec<usize> = (8..wrapped.len()).collect();
        positions.shuffle(&mut rng);
        for &pos in positions.iter().take(rs::T) {
            wrapped[pos] ^= rng.random_range(1..=255) as u8;
        }
        let (data, corrected) = fx25::unwrap(&codec, &wrapped)?;
        assert_eq!(corrected, rs::T);
        result = reassembler.push(&Frame::parse(&trim_padding(data))?)?;
    }
    assert_eq!(result, Some(payload));
    Ok(())
}

#[test]
fn codeword_stream_with_bit_flips() -> Result<()> {
    // The decoder-side view: a binary concatenation of codewords, a
    // couple of flipped bits, trailing zeros trimmed from the final
    // block only.
    let payload = b"The quick brown fox jumps over the lazy dog";
    let link = test_link()?;
    let codec = RsCodec::new();

    let mut stream = Vec::new();
    for frame in link.packetize(payload)? {
        stream.extend_from_slice(&codec.encode(&frame)?);
    }
    stream[100] ^= 0x01;

    let mut decoded = Vec::new();
    for chunk in stream.chunks_exact(rs::N) {
        let block: &[u8; rs::N] = chunk.try_into()?;
        decoded.extend_from_slice(&codec.decode(block)?.codeword[..rs::K]);
    }
    let frame = Frame::parse(&trim_padding(decoded))?;
    assert_eq!(frame.payload, payload);
    Ok(())
}

#[test]
fn uncorrectable_block_leaves_the_rest_of_the_stream() -> Result<()> {
    let codec = RsCodec::new();
    let blocks: Vec<[u8; rs::N]> = (0..3u8)
        .map(|i| codec.encode(&[i; rs::K]))
        .collect::<Result<Vec<_>, _>>()?;

    let mut rx = blocks.clone();
    for pos in 0..(rs::T + 1) {
        rx[1][pos * 3] ^= 0xff;
    }

    let mut failed = 0;
    let mut out = Vec::new();
    for block in &rx {
        match codec.decode(block) {
            Ok(c) => out.extend_from_slice(&c.codeword[..rs::K]),
            Err(_) => {
                failed += 1;
                out.extend_from_slice(&block[..rs::K]);
            }
        }
    }
    assert_eq!(failed, 1);
    assert_eq!(&out[..rs::K], &[0u8; rs::K]);
    assert_eq!(&out[2 * rs::K..], &[2u8; rs::K]);
    Ok(())
}
