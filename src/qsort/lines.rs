/// Record-level plumbing for the fqsort binary.
///
/// Splits input into delimiter-terminated records, wraps each in an ordered
/// key, runs the parallel list sort and writes the records back out. The
/// sorter itself knows nothing about bytes or files.
use std::cmp::{Ordering, Reverse};
use std::collections::LinkedList;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::info;

use super::config::SortConfig;
use super::core::{SortOutcome, SortStats, try_parallel_sort_with};
use crate::common::io::{FileData, read_file, read_stdin};

/// 4MB output buffer; one flush per few thousand records.
const OUTPUT_BUF_SIZE: usize = 4 * 1024 * 1024;

/// Options for sorting records.
#[derive(Debug, Clone, Default)]
pub struct LineSortConfig {
    pub numeric: bool,
    pub reverse: bool,
    pub zero_terminated: bool,
    /// Only report whether the input is already sorted.
    pub check: bool,
    /// Log session statistics at info level.
    pub stats: bool,
    pub output_file: Option<String>,
    pub sort: SortConfig,
}

impl LineSortConfig {
    #[inline]
    fn delimiter(&self) -> u8 {
        if self.zero_terminated { b'\0' } else { b'\n' }
    }
}

/// Output writer enum to avoid Box<dyn Write> dispatch.
enum SortOutput<'a> {
    Stdout(BufWriter<io::StdoutLock<'a>>),
    File(BufWriter<File>),
}

impl Write for SortOutput<'_> {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            SortOutput::Stdout(w) => w.write(buf),
            SortOutput::File(w) => w.write(buf),
        }
    }
    #[inline]
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            SortOutput::Stdout(w) => w.write_all(buf),
            SortOutput::File(w) => w.write_all(buf),
        }
    }
    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        match self {
            SortOutput::Stdout(w) => w.flush(),
            SortOutput::File(w) => w.flush(),
        }
    }
}

/// A record and its sort key. Ordered by numeric value, then by bytes;
/// in lexical mode every value is zero so only the bytes decide.
#[derive(Debug, Clone, Copy)]
struct Record<'a> {
    value: f64,
    bytes: &'a [u8],
}

impl<'a> Record<'a> {
    fn new(bytes: &'a [u8], numeric: bool) -> Self {
        let value = if numeric { parse_number(bytes) } else { 0.0 };
        Record { value, bytes }
    }
}

impl Ord for Record<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value
            .total_cmp(&other.value)
            .then_with(|| self.bytes.cmp(other.bytes))
    }
}

impl PartialOrd for Record<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Record<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Record<'_> {}

/// Parse a leading `[+-]digits[.digits]` after blanks. Anything without
/// digits is 0, and -0 is folded into 0 so the two compare equal.
pub fn parse_number(s: &[u8]) -> f64 {
    let start = s
        .iter()
        .position(|&b| b != b' ' && b != b'\t')
        .unwrap_or(s.len());
    let s = &s[start..];

    let mut i = 0;
    let negative = match s.first() {
        Some(b'-') => {
            i += 1;
            true
        }
        Some(b'+') => {
            i += 1;
            false
        }
        _ => false,
    };

    let digits_start = i;
    while i < s.len() && s[i].is_ascii_digit() {
        i += 1;
    }
    let mut has_digits = i > digits_start;
    if i < s.len() && s[i] == b'.' {
        let frac_start = i + 1;
        let mut j = frac_start;
        while j < s.len() && s[j].is_ascii_digit() {
            j += 1;
        }
        if j > frac_start {
            has_digits = true;
            i = j;
        }
    }
    if !has_digits {
        return 0.0;
    }

    // The scanned prefix is pure ASCII digits and at most one dot.
    let text = std::str::from_utf8(&s[digits_start..i]).unwrap_or("0");
    let value: f64 = text.parse().unwrap_or(0.0);
    if value == 0.0 {
        0.0
    } else if negative {
        -value
    } else {
        value
    }
}

/// Split `data` into records. A trailing record without a delimiter is kept;
/// a trailing delimiter does not produce an empty record.
pub fn split_records(data: &[u8], delimiter: u8) -> Vec<&[u8]> {
    let mut records = Vec::with_capacity(data.len() / 32 + 1);
    let mut start = 0;
    for pos in memchr::memchr_iter(delimiter, data) {
        records.push(&data[start..pos]);
        start = pos + 1;
    }
    if start < data.len() {
        records.push(&data[start..]);
    }
    records
}

/// Index of the first record that sorts before its predecessor.
pub fn find_disorder(records: &[&[u8]], config: &LineSortConfig) -> Option<usize> {
    (1..records.len()).find(|&i| {
        let prev = Record::new(records[i - 1], config.numeric);
        let cur = Record::new(records[i], config.numeric);
        if config.reverse { cur > prev } else { cur < prev }
    })
}

/// Sort records with the parallel list sort.
pub fn sort_records<'a>(
    records: Vec<&'a [u8]>,
    config: &LineSortConfig,
) -> io::Result<(Vec<&'a [u8]>, SortStats)> {
    let numeric = config.numeric;
    if config.reverse {
        let keys: LinkedList<_> = records
            .into_iter()
            .map(|b| Reverse(Record::new(b, numeric)))
            .collect();
        let outcome = run_sort(keys, &config.sort)?;
        Ok((outcome.list.into_iter().map(|r| r.0.bytes).collect(), outcome.stats))
    } else {
        let keys: LinkedList<_> = records.into_iter().map(|b| Record::new(b, numeric)).collect();
        let outcome = run_sort(keys, &config.sort)?;
        Ok((outcome.list.into_iter().map(|r| r.bytes).collect(), outcome.stats))
    }
}

fn run_sort<K: Ord + Send>(keys: LinkedList<K>, config: &SortConfig) -> io::Result<SortOutcome<K>> {
    try_parallel_sort_with(keys, config).map_err(io::Error::other)
}

/// Name used in diagnostics: the first input, or `-` for stdin.
pub(crate) fn display_name(inputs: &[String]) -> &str {
    match inputs.first() {
        Some(name) if name != "-" => name,
        _ => "-",
    }
}

fn open_input(name: &str) -> io::Result<FileData> {
    if name == "-" {
        Ok(FileData::Owned(read_stdin()?))
    } else {
        read_file(Path::new(name))
            .map_err(|e| io::Error::new(e.kind(), format!("open failed: {}: {}", name, e)))
    }
}

/// Read, sort and write records.
///
/// With no inputs, reads stdin. Returns `Ok(false)` only in check mode when
/// the input is out of order; the first offending record is reported on stderr.
pub fn sort_and_output(inputs: &[String], config: &LineSortConfig) -> io::Result<bool> {
    let stdin_only = [String::from("-")];
    let inputs = if inputs.is_empty() { &stdin_only[..] } else { inputs };

    // Read all input BEFORE opening the output file (supports -o same-file)
    let buffers = inputs
        .iter()
        .map(|name| open_input(name))
        .collect::<io::Result<Vec<_>>>()?;
    let delimiter = config.delimiter();
    let records: Vec<&[u8]> = buffers
        .iter()
        .flat_map(|buf| split_records(buf, delimiter))
        .collect();

    if config.check {
        if let Some(i) = find_disorder(&records, config) {
            eprintln!(
                "fqsort: {}:{}: disorder: {}",
                display_name(inputs),
                i + 1,
                String::from_utf8_lossy(records[i])
            );
            return Ok(false);
        }
        return Ok(true);
    }

    let (sorted, stats) = sort_records(records, config)?;
    if config.stats {
        info!(?stats, records = sorted.len(), "sort statistics");
    }

    let stdout = io::stdout();
    let mut writer = if let Some(ref path) = config.output_file {
        SortOutput::File(BufWriter::with_capacity(OUTPUT_BUF_SIZE, File::create(path)?))
    } else {
        SortOutput::Stdout(BufWriter::with_capacity(OUTPUT_BUF_SIZE, stdout.lock()))
    };
    for record in sorted {
        writer.write_all(record)?;
        writer.write_all(&[delimiter])?;
    }
    writer.flush()?;
    Ok(true)
}
