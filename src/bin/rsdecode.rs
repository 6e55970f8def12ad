/*! RS(255,223) stream decoder.

Reads the binary concatenation of 255-byte codewords, corrects each
block, and writes the 223 data bytes per block. Trailing zero padding
is trimmed from the final block.

An uncorrectable block is written out as received and counted; the
stream is always processed to completion. The exit code is nonzero
when any block failed.

```no_run
$ rsdecode encoded.bin decoded.txt
processed 3 blocks, corrected 0, failed 0
```
*/
use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::{debug, warn};

use fx25::rs::{self, RsCodec};

#[derive(clap::Parser, Debug)]
#[command(version, about)]
struct Opt {
    /// Binary RS codeword stream.
    input: PathBuf,

    /// Decoded output file.
    output: PathBuf,

    #[arg(short = 'v', default_value = "0")]
    verbose: usize,
}

fn main() -> Result<()> {
    let opt = Opt::parse();
    stderrlog::new()
        .module(module_path!())
        .module("fx25")
        .quiet(false)
        .verbosity(opt.verbose)
        .timestamp(stderrlog::Timestamp::Second)
        .init()?;

    let mut raw = Vec::new();
    File::open(&opt.input)?.read_to_end(&mut raw)?;
    let trailing = raw.len() % rs::N;
    if trailing != 0 {
        warn!("input is not a whole number of codewords; ignoring final {trailing} bytes");
    }

    let codec = RsCodec::new();
    let mut decoded = Vec::with_capacity(raw.len() / rs::N * rs::K);
    let mut processed = 0usize;
    let mut corrected = 0usize;
    let mut failed = 0usize;
    for chunk in raw.chunks_exact(rs::N) {
        let block: &[u8; rs::N] = chunk.try_into()?;
        processed += 1;
        match codec.decode(block) {
            Ok(c) => {
                if c.corrected > 0 {
                    debug!("block {processed}: corrected {} symbols", c.corrected);
                    corrected += 1;
                }
                decoded.extend_from_slice(&c.codeword[..rs::K]);
            }
            Err(e) => {
                warn!("block {processed}: {e}");
                failed += 1;
                // Fall back to the received word, uncorrected.
                decoded.extend_from_slice(&block[..rs::K]);
            }
        }
    }

    // The final block carries zero padding up to the block size.
    let keep = decoded.len().saturating_sub(rs::K);
    while decoded.len() > keep && decoded.last() == Some(&0) {
        decoded.pop();
    }

    File::create(&opt.output)?.write_all(&decoded)?;
    println!("processed {processed} blocks, corrected {corrected}, failed {failed}");
    if failed > 0 {
        anyhow::bail!("{failed} of {processed} blocks uncorrectable");
    }
    Ok(())
}
