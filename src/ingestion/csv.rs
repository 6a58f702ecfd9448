//! CSV parsing into a [`RawTable`].

use std::io::Read;

use crate::error::{PipelineError, PipelineResult};
use crate::types::RawTable;

/// Parse CSV bytes into a [`RawTable`].
///
/// Rules:
///
/// - The first record is the header row and must be present.
/// - Every data row must have as many fields as the header (otherwise a parse error).
/// - Cell text is kept verbatim; trimming and typing happen in validation.
/// - Each row keeps the 1-based file line it starts on, for error messages. Blank lines
///   and multi-line quoted fields are counted.
pub fn parse_csv_bytes(bytes: &[u8]) -> PipelineResult<RawTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);
    let (headers, rows, offsets) = read_records(&mut rdr)?;
    Ok(RawTable::new(headers, rows).with_lines(start_lines(bytes, &offsets)))
}

/// Parse CSV data from an existing CSV reader.
///
/// Without the source bytes, rows are numbered as if the file had no blank lines.
pub fn parse_csv_from_reader<R: Read>(rdr: &mut csv::Reader<R>) -> PipelineResult<RawTable> {
    let (headers, rows, _) = read_records(rdr)?;
    Ok(RawTable::new(headers, rows))
}

type Records = (Vec<String>, Vec<Vec<String>>, Vec<u64>);

fn read_records<R: Read>(rdr: &mut csv::Reader<R>) -> PipelineResult<Records> {
    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_owned).collect();
    if headers.is_empty() {
        return Err(PipelineError::Parse {
            message: "no columns to parse from file (missing header row)".to_string(),
        });
    }

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut offsets: Vec<u64> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        // Byte offset where the reader stood before this record, ahead of any skipped blank lines.
        offsets.push(record.position().map(|p| p.byte()).unwrap_or(0));
        rows.push(record.iter().map(str::to_owned).collect());
    }

    Ok((headers, rows, offsets))
}

/// Map reader offsets to the 1-based line each record's first byte sits on.
fn start_lines(bytes: &[u8], offsets: &[u64]) -> Vec<u64> {
    let mut line = 1u64;
    let mut pos = 0usize;
    offsets
        .iter()
        .map(|&off| {
            let mut start = usize::try_from(off).unwrap_or(bytes.len()).clamp(pos, bytes.len());
            while start < bytes.len() && matches!(bytes[start], b'\r' | b'\n') {
                start += 1;
            }
            line += bytes[pos..start].iter().filter(|&&b| b == b'\n').count() as u64;
            pos = start;
            line
        })
        .collect()
}
