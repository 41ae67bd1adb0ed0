//! Reading instruction commit traces.
//!
//! Traces come from the "commit logging" of a reference ISA simulator and
//! have one committed instruction per line:
//!
//! ```text
//! [PC]               [instruction] rd [wb-data]
//! 0x0000000000002cd4 (0x05070113) x 2 0x0000000000025180
//! 0x0000000000002cd8 (0xd8070713) x14 0x0000000000024eb0
//! 0x0000000000002cdc (0xea5ff0ef) x 1 0x0000000000002ce0
//! ```
//!
//! Only the program counter and the instruction word are used. These are
//! read from fixed character offsets; everything else on the line is
//! ignored.
//!
//! NOTE: The simulator usually only logs while exceptions are enabled, so
//! there are occasionally "gaps" in a trace.

use std::fmt;
use std::fs::File;
use std::io::{ BufRead, BufReader };
use std::ops::Range;
use std::path::Path;

use crate::branch::*;
use crate::error::TraceError;

/// Characters holding the program counter (without the "0x" prefix).
const PC_FIELD: Range<usize> = 2..18;

/// Characters holding the instruction word (without the "(0x" prefix).
const INST_FIELD: Range<usize> = 22..30;

/// A single committed instruction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TraceRecord {
    /// The program counter value for this instruction
    pub pc: u64,

    /// The raw instruction word
    pub inst: u32,
}
impl TraceRecord {
    pub fn new(pc: u64, inst: u32) -> Self {
        Self { pc, inst }
    }

    /// Parse a single line of a commit log.
    ///
    /// `line_no` is only used for error reporting. Bytes outside of the
    /// pc and instruction fields are never inspected.
    pub fn parse(line_no: usize, line: impl AsRef<[u8]>)
        -> Result<Self, TraceError>
    {
        let line = line.as_ref();
        let err = |reason: String| TraceError::Parse {
            line_no,
            line: String::from_utf8_lossy(line).into_owned(),
            reason,
        };
        let pc = hex_field(line, PC_FIELD, "pc").map_err(err)?;
        let inst = hex_field(line, INST_FIELD, "instruction").map_err(err)?;
        Ok(Self::new(pc, inst as u32))
    }

    /// Return the [InstClass] of this instruction.
    pub fn class(&self) -> InstClass {
        InstClass::from_inst(self.inst)
    }

    /// Return call/return information about this instruction.
    pub fn facts(&self) -> ControlFlowFacts {
        ControlFlowFacts::new(self.class(), self.inst)
    }

    /// The address of the next sequential instruction.
    pub fn fallthrough(&self) -> u64 {
        self.pc.wrapping_add(INST_BYTES)
    }
}

// Renders a record in the commit log format (without the writeback fields).
impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x{:016x} (0x{:08x})", self.pc, self.inst)
    }
}

fn hex_field(line: &[u8], range: Range<usize>, what: &str)
    -> Result<u64, String>
{
    let raw = line.get(range.clone()).ok_or_else(|| {
        format!("{} field (columns {}..{}) is missing",
            what, range.start, range.end)
    })?;
    let s = std::str::from_utf8(raw).map_err(|_| {
        format!("{} field {:?} is not text", what,
            String::from_utf8_lossy(raw))
    })?;
    u64::from_str_radix(s, 16)
        .map_err(|e| format!("bad {} field {:?}: {}", what, s, e))
}


/// An iterator over the records in a commit trace.
///
/// The underlying reader is owned by this object, so the trace is released
/// whenever the reader is dropped (including after a parse error).
pub struct TraceReader<R: BufRead> {
    reader: R,

    /// The line being parsed
    buf: Vec<u8>,

    /// A name for this trace (usually the file name)
    name: String,

    /// Number of lines consumed so far
    line_no: usize,
}
impl<R: BufRead> TraceReader<R> {
    pub fn new(name: impl ToString, reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            name: name.to_string(),
            line_no: 0,
        }
    }

    pub fn name(&self) -> &str { &self.name }

    /// Number of lines consumed so far.
    pub fn line_no(&self) -> usize { self.line_no }
}

impl TraceReader<BufReader<File>> {
    /// Open a trace file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let path = path.as_ref();
        let f = File::open(path)?;
        let name = path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, BufReader::new(f)))
    }
}

impl<R: BufRead> Iterator for TraceReader<R> {
    type Item = Result<TraceRecord, TraceError>;
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {},
                Err(e) => return Some(Err(e.into())),
            }
            self.line_no += 1;
            let line = self.buf.strip_suffix(b"\n").unwrap_or(&self.buf);
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            return Some(TraceRecord::parse(self.line_no, line));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const TRACE: &str = "\
0x0000000000002cd4 (0x05070113) x 2 0x0000000000025180
0x0000000000002cd8 (0xd8070713) x14 0x0000000000024eb0

0x0000000000002cdc (0xea5ff0ef) x 1 0x0000000000002ce0
";

    #[test]
    fn parse_commit_log() {
        let records: Vec<TraceRecord> = TraceReader::new("t", TRACE.as_bytes())
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(records, vec![
            TraceRecord::new(0x2cd4, 0x0507_0113),
            TraceRecord::new(0x2cd8, 0xd807_0713),
            TraceRecord::new(0x2cdc, 0xea5f_f0ef),
        ]);
        assert_eq!(records[2].class(), InstClass::UnconditionalJump);
        assert!(records[2].facts().is_call);
        assert_eq!(records[0].fallthrough(), 0x2cd8);
    }

    #[test]
    fn blank_lines_count_toward_line_numbers() {
        let mut reader = TraceReader::new("t", TRACE.as_bytes());
        assert_eq!(reader.by_ref().count(), 3);
        assert_eq!(reader.line_no(), 4);
        assert_eq!(reader.name(), "t");
    }

    #[test]
    fn display_matches_log_columns() {
        let r = TraceRecord::new(0x8000_0000, 0x0000_8067);
        let line = r.to_string();
        assert_eq!(line, "0x0000000080000000 (0x00008067)");
        assert_eq!(TraceRecord::parse(1, &line).unwrap(), r);
    }

    #[test]
    fn malformed_line_reports_position() {
        let text = "0x0000000000002cd4 (0x05070113) x 2 0x0\nbogus\n";
        let mut reader = TraceReader::new("t", text.as_bytes());
        assert!(reader.next().unwrap().is_ok());
        match reader.next().unwrap() {
            Err(TraceError::Parse { line_no, line, .. }) => {
                assert_eq!(line_no, 2);
                assert_eq!(line, "bogus");
            },
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    #[test]
    fn ignored_columns_may_hold_any_bytes() {
        let text: &[u8] = b"0x0000000000002000 (0x00050863) x 0 \xff\xfe\r\n\
            0x0000000000002004 (0x00000013)\n";
        let records: Vec<TraceRecord> = TraceReader::new("t", text)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(records, vec![
            TraceRecord::new(0x2000, 0x0005_0863),
            TraceRecord::new(0x2004, 0x0000_0013),
        ]);
    }

    #[test]
    fn binary_garbage_in_a_field_is_a_parse_error() {
        let text: &[u8] = b"0x0000000000002000 (0x00050863)\n\
            0x00000000\xff0002004 (0x00000013)\n";
        let mut reader = TraceReader::new("t", text);
        assert!(reader.next().unwrap().is_ok());
        assert!(matches!(reader.next().unwrap(),
            Err(TraceError::Parse { line_no: 2, .. })));
    }

    #[test]
    fn non_hex_digits_are_rejected() {
        let line = "0x00000000000zzzz4 (0x05070113) x 2 0x0";
        assert!(matches!(TraceRecord::parse(7, line),
            Err(TraceError::Parse { line_no: 7, .. })));
    }

    #[test]
    fn missing_file() {
        let res = TraceReader::from_file("/nonexistent/trace/file.trace");
        assert!(matches!(res, Err(TraceError::Io(_))));
    }
}
