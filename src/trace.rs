use std::{
    fs,
    io::{self, BufRead, BufReader},
    mem,
    path::{Path, PathBuf},
    thread::{self, JoinHandle},
};

use crossbeam::channel::{Receiver, Sender};
use tracing::{error, trace};
use xz2::read::XzDecoder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessKind {
    Read,
    Write,
}

impl AccessKind {
    pub fn parse(field: &str) -> Option<Self> {
        match field {
            "R" => Some(AccessKind::Read),
            "W" => Some(AccessKind::Write),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record {
    pub address: u64,
    pub kind: AccessKind,
}

/// Parses one `<ignored> <R|W> <hex-address>` trace line.
///
/// Blank lines, `#` comments and anything malformed yield `None`.
pub fn parse_record(line: &str) -> Option<Record> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let mut fields = line.split_whitespace();
    let (Some(_), Some(kind), Some(address), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return None;
    };

    let kind = AccessKind::parse(kind)?;
    let digits = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address);
    let address = u64::from_str_radix(digits, 16).ok()?;
    Some(Record { address, kind })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceSource {
    Stdin,
    File(PathBuf),
}

impl From<&str> for TraceSource {
    fn from(arg: &str) -> Self {
        if arg == "-" {
            TraceSource::Stdin
        } else {
            TraceSource::File(arg.into())
        }
    }
}

impl TraceSource {
    fn open(&self) -> io::Result<Box<dyn BufRead + Send>> {
        match self {
            TraceSource::Stdin => Ok(Box::new(BufReader::new(io::stdin()))),
            TraceSource::File(path) => {
                let stream = fs::File::open(path)?;
                if is_xz(path) {
                    Ok(Box::new(BufReader::new(XzDecoder::new(stream))))
                } else {
                    Ok(Box::new(BufReader::new(stream)))
                }
            }
        }
    }
}

fn is_xz(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "xz")
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TraceSummary {
    pub lines: u64,
    pub records: u64,
    /// Blank, comment and malformed lines.
    pub skipped: u64,
}

/// Trace read on a background thread and delivered in blocks over a bounded
/// channel. The single consumer of `rec` is what serializes cache accesses.
pub struct Trace {
    pub rec: Receiver<Vec<Record>>,
    thread: JoinHandle<io::Result<TraceSummary>>,
}

impl Trace {
    pub fn open(
        source: TraceSource,
        records_per_block: usize,
        blocks_per_queue: usize,
    ) -> io::Result<Trace> {
        let stream = source.open()?;
        Ok(Trace::from_reader(stream, records_per_block, blocks_per_queue))
    }

    pub fn from_reader(
        stream: Box<dyn BufRead + Send>,
        records_per_block: usize,
        blocks_per_queue: usize,
    ) -> Trace {
        let records_per_block = records_per_block.max(1);
        let (sender, receiver) = crossbeam::channel::bounded(blocks_per_queue);

        let thread = thread::spawn(move || {
            let result = Trace::run_thread(stream, records_per_block, sender);
            if let Err(err) = &result {
                error!("trace reader stopped: {err}");
            }
            result
        });

        Trace {
            rec: receiver,
            thread,
        }
    }

    pub fn records(&self) -> impl Iterator<Item = Record> + '_ {
        self.rec.iter().flatten()
    }

    /// Waits for the reader thread. Dropping the receiver first lets a
    /// reader blocked on a full queue exit early.
    pub fn finish(self) -> io::Result<TraceSummary> {
        drop(self.rec);
        self.thread
            .join()
            .unwrap_or_else(|_| Err(io::Error::other("trace reader panicked")))
    }

    fn run_thread(
        mut stream: Box<dyn BufRead + Send>,
        records_per_block: usize,
        queue: Sender<Vec<Record>>,
    ) -> io::Result<TraceSummary> {
        let mut summary = TraceSummary::default();
        let mut block = Vec::with_capacity(records_per_block);
        let mut line = String::new();

        loop {
            line.clear();
            if stream.read_line(&mut line)? == 0 {
                break;
            }
            summary.lines += 1;

            match parse_record(&line) {
                Some(record) => {
                    summary.records += 1;
                    block.push(record);
                }
                None => {
                    summary.skipped += 1;
                    trace!(line = summary.lines, "skipped trace line");
                }
            }

            if block.len() == records_per_block {
                let full = mem::replace(&mut block, Vec::with_capacity(records_per_block));
                if queue.send(full).is_err() {
                    // Consumer hung up.
                    return Ok(summary);
                }
            }
        }

        if !block.is_empty() {
            let _ = queue.send(block);
        }
        Ok(summary)
    }
}
