//! Component printing every frame arriving on its `IN` port.
//!
//! Its stdout is collected by the orchestrator and shown as
//! `<process>: <line>`. See `emit-lines` for a network using both.

use flowd::frame::FrameReader;
use flowd::pipe::{NamedPipe, PortArgs};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = PortArgs::parse(std::env::args_os().skip(1))?;
    let inpath = args.inport("IN").ok_or("missing -inport IN")?;

    let mut reader = FrameReader::new(NamedPipe::at(inpath).open_reader()?);
    let mut received = 0usize;
    for frame in reader.frames() {
        let frame = frame?;
        println!(
            "{} port={} {}",
            frame.type_header(),
            frame.port,
            String::from_utf8_lossy(&frame.body)
        );
        received += 1;
    }

    eprintln!("received {received} frames");
    Ok(())
}
