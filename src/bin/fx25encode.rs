/*! FX.25 encoder.

Reads a hex dump of AX.25 frames, RS(255,223)-encodes each one, and
writes the binary concatenation of 255-byte codewords for the decoder.
With `--dump`, also writes a labeled hex dump of the complete FX.25
frames, correlation tags included.

A frame too large for one codeword is skipped with a warning; the rest
of the batch still goes out.

```no_run
$ fx25encode packets.txt encoded.bin --dump fx25_packets.txt
```
*/
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::{info, warn};

use ::fx25::fx25::{self, CORRELATION_TAG};
use ::fx25::hexdump;
use ::fx25::rs::RsCodec;

#[derive(clap::Parser, Debug)]
#[command(version, about)]
struct Opt {
    /// Hex dump of AX.25 frames.
    input: PathBuf,

    /// Binary RS codeword stream output.
    output: PathBuf,

    /// Also write a labeled FX.25 hex dump here.
    #[arg(long)]
    dump: Option<PathBuf>,

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

    let packets = hexdump::read_packets(BufReader::new(File::open(&opt.input)?))?;
    let codec = RsCodec::new();

    let mut out = BufWriter::new(File::create(&opt.output)?);
    let mut dump = match &opt.dump {
        Some(path) => Some(BufWriter::new(File::create(path)?)),
        None => None,
    };

    let mut encoded = 0usize;
    let mut skipped = 0usize;
    for (n, packet) in packets.iter().enumerate() {
        let frame = match fx25::wrap(&codec, packet) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("packet {}: {e}", n + 1);
                skipped += 1;
                continue;
            }
        };
        out.write_all(&frame[CORRELATION_TAG.len()..])?;
        if let Some(d) = dump.as_mut() {
            hexdump::write_fx25_packet(
                d,
                n + 1,
                &frame[..CORRELATION_TAG.len()],
                &frame[CORRELATION_TAG.len()..],
            )?;
        }
        encoded += 1;
    }
    info!("encoded {encoded} packets, skipped {skipped}");
    Ok(())
}
