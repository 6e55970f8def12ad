/*! Bit flip fault injector.

Copies a file, XORing 0x01 into the byte at the given offset. Used to
exercise the RS decoder's correction path.

```no_run
$ bitflip encoded.bin corrupted.bin 100
```
*/
use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

#[derive(clap::Parser, Debug)]
#[command(version, about)]
struct Opt {
    /// File to corrupt.
    input: PathBuf,

    /// Corrupted copy.
    output: PathBuf,

    /// Byte offset to flip bit 0 of.
    offset: usize,

    #[arg(short = 'v', default_value = "0")]
    verbose: usize,
}

fn main() -> Result<()> {
    let opt = Opt::parse();
    stderrlog::new()
        .module(module_path!())
        .quiet(false)
        .verbosity(opt.verbose)
        .timestamp(stderrlog::Timestamp::Second)
        .init()?;

    let mut data = Vec::new();
    File::open(&opt.input)?.read_to_end(&mut data)?;
    if opt.offset >= data.len() {
        anyhow::bail!(
            "offset {} beyond end of {} byte file",
            opt.offset,
            data.len()
        );
    }
    data[opt.offset] ^= 0x01;
    info!("flipped bit 0 of byte {}", opt.offset);
    File::create(&opt.output)?.write_all(&data)?;
    Ok(())
}
