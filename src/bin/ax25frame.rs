/*! AX.25 framer.

Reads a payload file, splits it into sequenced AX.25 UI frames, and
writes the frames as a hex dump for the FX.25 encoder to pick up.

```no_run
$ ax25frame input.txt packets.txt
$ ax25frame --src N0CALL-1 --dst CQ --kind beacon input.txt packets.txt
```
*/
use std::fs::File;
use std::io::{BufWriter, Read};
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::{info, warn};

use fx25::ax25::{self, Address, LinkConfig};
use fx25::hexdump;

#[derive(clap::Parser, Debug)]
#[command(version, about)]
struct Opt {
    /// Payload file to frame.
    input: PathBuf,

    /// Hex dump output file.
    output: PathBuf,

    #[arg(long, default_value = "N0CALL", help = "Source callsign[-SSID]")]
    src: Address,

    #[arg(long, default_value = "CQ", help = "Destination callsign[-SSID]")]
    dst: Address,

    #[arg(long, value_enum, default_value_t = Kind::Data)]
    kind: Kind,

    #[arg(short = 'v', default_value = "0")]
    verbose: usize,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum Kind {
    /// Single beacon frame.
    Beacon,
    /// Single frame without a fragment header.
    Message,
    /// Fragment into as many data frames as the payload needs.
    Data,
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

    let mut payload = Vec::new();
    File::open(&opt.input)?.read_to_end(&mut payload)?;

    let link = LinkConfig::new(opt.src.clone(), opt.dst.clone());
    let builds: Vec<fx25::Result<Vec<u8>>> = match opt.kind {
        Kind::Beacon => vec![link.beacon(&payload)],
        Kind::Message => vec![link.message(&payload)],
        Kind::Data => ax25::fragment_plan(&payload)?
            .into_iter()
            .map(|f| link.build_frame(f.ftype, f.sequence, f.total, f.chunk))
            .collect(),
    };

    // A frame that fails to build is skipped with a warning; the rest
    // of the batch still goes out.
    let mut frames = Vec::with_capacity(builds.len());
    let mut skipped = 0usize;
    for (n, build) in builds.into_iter().enumerate() {
        match build {
            Ok(frame) => frames.push(frame),
            Err(e) => {
                warn!("frame {}: {e}", n + 1);
                skipped += 1;
            }
        }
    }

    let mut out = BufWriter::new(File::create(&opt.output)?);
    hexdump::write_packets(&mut out, &frames)?;
    info!(
        "framed {} bytes into {} packets, skipped {skipped}",
        payload.len(),
        frames.len()
    );
    Ok(())
}
