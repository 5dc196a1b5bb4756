//! CSV input and output.
//!
//! Input files carry one [`RideRequest`] per row under the header
//! `company_name,destination,number_of_rides_requested`. Output files carry one [`Allocation`]
//! per row under `company_name,destination,number_of_rides_approved`. Both header rows are a
//! compatibility contract with downstream consumers and are always present, even when there
//! are no rows.
//!
//! Input columns are located by header name, so extra columns and a different column order
//! are accepted.

use crate::types::{Allocation, RideRequest};
use std::{fs::File, io, path::Path};
use thiserror::Error;

pub const COMPANY_NAME: &str = "company_name";
pub const DESTINATION: &str = "destination";
pub const RIDES_REQUESTED: &str = "number_of_rides_requested";
pub const RIDES_APPROVED: &str = "number_of_rides_approved";

/// Header row written at the top of every output file.
pub const OUTPUT_HEADER: [&str; 3] = [COMPANY_NAME, DESTINATION, RIDES_APPROVED];

/// Result type for record reading and writing.
pub type Result<T> = std::result::Result<T, RecordError>;

/// Errors that can occur while reading or writing records.
#[derive(Debug, Error)]
pub enum RecordError {
    /// A required column is absent from the header row
    #[error("Missing required column '{column}'")]
    MissingColumn { column: &'static str },

    /// A ride count is not a non-negative integer
    #[error("Invalid number_of_rides_requested on row {row}: '{value}' is not a non-negative integer")]
    InvalidCount { row: usize, value: String },

    /// Structurally broken CSV (ragged rows, invalid UTF-8, ...)
    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    /// File could not be opened or written
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

struct Columns {
    company_name: usize,
    destination: usize,
    requested: usize,
}

impl Columns {
    fn locate(headers: &csv::StringRecord) -> Result<Self> {
        let find = |column: &'static str| {
            headers
                .iter()
                .position(|h| h.trim() == column)
                .ok_or(RecordError::MissingColumn { column })
        };

        Ok(Self {
            company_name: find(COMPANY_NAME)?,
            destination: find(DESTINATION)?,
            requested: find(RIDES_REQUESTED)?,
        })
    }
}

/// Parse ride requests from CSV. The first row must be the header.
///
/// Rows are numbered from 1, not counting the header, in [`RecordError::InvalidCount`].
pub fn read_requests<R: io::Read>(reader: R) -> Result<Vec<RideRequest>> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
    let columns = Columns::locate(reader.headers()?)?;

    let mut requests = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let row = i + 1;
        // Row length is checked against the header by the csv reader
        let field = |index: usize| record.get(index).unwrap_or_default();

        let raw_count = field(columns.requested);
        let requested_count = raw_count.trim().parse::<u64>().map_err(|_| RecordError::InvalidCount {
            row,
            value: raw_count.to_string(),
        })?;

        requests.push(RideRequest {
            company_name: field(columns.company_name).to_string(),
            destination: field(columns.destination).to_string(),
            requested_count,
        });
    }

    tracing::debug!(rows = requests.len(), "Parsed ride requests");
    Ok(requests)
}

/// Parse ride requests from a CSV file on disk.
pub fn read_requests_from_path(path: impl AsRef<Path>) -> Result<Vec<RideRequest>> {
    read_requests(File::open(path)?)
}

/// Render allocations as CSV, header first.
pub fn write_allocations<W: io::Write>(writer: W, allocations: &[Allocation]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    writer.write_record(OUTPUT_HEADER)?;
    for allocation in allocations {
        writer.serialize(allocation)?;
    }
    writer.flush()?;
    Ok(())
}

/// Render allocations as an in-memory CSV document.
pub fn allocations_to_csv(allocations: &[Allocation]) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_allocations(&mut buffer, allocations)?;
    Ok(buffer)
}

/// Write allocations to a CSV file, replacing any existing file.
pub fn write_allocations_to_path(path: impl AsRef<Path>, allocations: &[Allocation]) -> Result<()> {
    write_allocations(File::create(path)?, allocations)
}
