//! Component sending one `data.FileLine` frame per line of a file.
//!
//! Wire it into a network with the file name as its `ARGS` initial packet:
//!
//! ```json
//! { "processes": {
//!     "Read": { "component": "target/debug/examples/emit-lines" },
//!     "Show": { "component": "target/debug/examples/print-frames" } },
//!   "connections": [
//!     { "data": "Cargo.toml", "tgt": { "process": "Read", "port": "ARGS" } },
//!     { "src": { "process": "Read", "port": "OUT" },
//!       "tgt": { "process": "Show", "port": "IN" } } ] }
//! ```
//!
//! Run with:
//!   cargo build --examples && cargo run -- --pipe-dir /tmp network.json

use std::fs::File;
use std::io::{BufRead, BufReader};

use flowd::frame::{Frame, FrameWriter};
use flowd::pipe::{NamedPipe, PortArgs};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = PortArgs::parse(std::env::args_os().skip(1))?;
    let out = args.outport("OUT").ok_or("missing -outport=OUT")?;
    let input = args.free.first().ok_or("missing file name argument")?;

    let lines = BufReader::new(File::open(input)?);
    // Blocks until the receiving component opens its end.
    let mut writer = FrameWriter::new(NamedPipe::at(out).open_writer()?);

    let mut sent = 0usize;
    for line in lines.lines() {
        let frame = Frame::data("FileLine", line?)
            .with_port("OUT")
            .with_content_type("text/plain");
        writer.write_frame(&frame)?;
        sent += 1;
    }

    eprintln!("sent {sent} lines from {input}");
    Ok(())
}
