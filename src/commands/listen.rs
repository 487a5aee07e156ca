// Listen command - the IDE side of the reporting socket

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Write};
use std::net::{Ipv4Addr, TcpListener};
use tracing::{info, warn};

use crate::cli::ListenArgs;
use crate::report::wire::{Frame, FrameDecoder};

pub fn handle_listen(args: &ListenArgs) -> Result<()> {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, args.port))
        .with_context(|| format!("Failed to listen on port {}", args.port))?;
    info!("Waiting for a reporter on port {}", args.port);

    let (stream, peer) = listener.accept().context("Failed to accept reporter connection")?;
    info!("Reporter connected from {}", peer);

    let mut stdout = std::io::stdout().lock();
    let frames = print_frames(BufReader::new(stream), &mut stdout, args.json)?;
    info!("Connection closed after {} frame(s)", frames);

    Ok(())
}

/// Decode every line from `reader` and print it to `out`. Returns the number
/// of frames decoded; malformed lines are logged and skipped.
pub fn print_frames<R: BufRead, W: Write>(reader: R, out: &mut W, json: bool) -> Result<usize> {
    let mut decoder = FrameDecoder::new();
    let mut count = 0;

    for line in reader.lines() {
        let line = line.context("Failed to read from reporter")?;
        let frame = match decoder.decode(&line) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Skipping malformed line: {}", e);
                continue;
            }
        };

        if json {
            writeln!(out, "{}", serde_json::to_string(&frame)?)?;
        } else {
            writeln!(out, "{}", describe(&frame))?;
        }
        count += 1;
    }

    out.flush()?;
    Ok(count)
}

fn describe(frame: &Frame) -> String {
    match frame {
        Frame::TestCount { count, version } => format!("run      {} test(s), protocol {}", count, version),
        Frame::Tree {
            index,
            name,
            suite,
            cases,
        } => {
            let kind = if *suite { "suite" } else { "test" };
            format!("tree     #{} {} {} ({} case(s))", index, kind, name, cases)
        }
        Frame::Started { index, name } => format!("start    #{} {}", index, name),
        Frame::Ended { index, name } => format!("end      #{} {}", index, name),
        Frame::Error { index, name } => format!("error    #{} {}", index, name),
        Frame::Failed { index, name } => format!("failed   #{} {}", index, name),
        Frame::TraceStart => "trace    >>>".to_string(),
        Frame::TraceLine { line } => format!("         | {}", line),
        Frame::TraceEnd => "trace    <<<".to_string(),
        Frame::Runtime { millis } => format!("runtime  {}ms", millis),
    }
}
