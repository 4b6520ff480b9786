//! # UTF-16 (little endian) transcoding
//!
//! The input is processed one 16-bit code unit at a time. Each unit is looked
//! up in the [`SubstitutionTable`] by its value, and either replaced by the
//! encoding of the mapped code point or copied as is. Surrogate pairs are not
//! combined before the lookup, so characters outside the BMP can only be
//! matched half by half.
use std::{
    char::REPLACEMENT_CHARACTER,
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    ops::RangeInclusive,
    path::Path,
};

use log::{debug, info, warn};

use crate::{Error, Result, SubstitutionTable};

/// The UTF-16LE byte-order mark
pub const BOM: [u8; 2] = [0xFF, 0xFE];

const SURROGATES: RangeInclusive<u32> = 0xD800..=0xDFFF;

/// Reads little endian code units from a byte stream
pub struct UnitReader<R> {
    inner: R,
    offset: u64,
}

impl<R: Read> UnitReader<R> {
    /// Create a new reader
    pub fn new(inner: R) -> Self {
        Self { inner, offset: 0 }
    }

    /// Number of bytes consumed so far
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn fill(&mut self, buf: &mut [u8; 2]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(Error::Read(e)),
            }
        }
        self.offset += filled as u64;
        Ok(filled)
    }

    /// Read and return the two bytes of the byte-order mark
    ///
    /// The value is not checked.
    pub fn skip_bom(&mut self) -> Result<[u8; 2]> {
        let mut buf = [0; 2];
        match self.fill(&mut buf)? {
            2 => Ok(buf),
            _ => Err(Error::MissingBom),
        }
    }

    /// Read the next code unit, or `None` at the end of the input
    pub fn read_unit(&mut self) -> Result<Option<u16>> {
        let mut buf = [0; 2];
        match self.fill(&mut buf)? {
            0 => Ok(None),
            1 => Err(Error::TruncatedUnit {
                offset: self.offset - 1,
            }),
            _ => Ok(Some(u16::from_le_bytes(buf))),
        }
    }
}

/// Writes little endian code units to a byte stream
pub struct UnitWriter<W: Write> {
    inner: W,
    units: u64,
}

impl<W: Write> UnitWriter<W> {
    /// Create a new writer
    pub fn new(inner: W) -> Self {
        Self { inner, units: 0 }
    }

    /// Number of code units written (not counting the BOM)
    pub fn units(&self) -> u64 {
        self.units
    }

    /// Write the byte-order mark
    pub fn write_bom(&mut self) -> Result<()> {
        self.inner.write_all(&BOM).map_err(Error::Write)
    }

    /// Write a single code unit, low byte first
    pub fn write_unit(&mut self, unit: u16) -> Result<()> {
        self.inner
            .write_all(&unit.to_le_bytes())
            .map_err(Error::Write)?;
        self.units += 1;
        Ok(())
    }

    /// Write the code units for `code_point`
    pub fn write_code_point(&mut self, code_point: u32) -> Result<()> {
        let mut buf = [0; 2];
        for &unit in encode_code_point(code_point, &mut buf) {
            self.write_unit(unit)?;
        }
        Ok(())
    }

    /// Flush the underlying writer
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush().map_err(Error::Write)
    }
}

/// Encode a code point as UTF-16
///
/// A value in the surrogate range is written as that single unit, a value
/// that is not a code point becomes U+FFFD.
pub fn encode_code_point(code_point: u32, buf: &mut [u16; 2]) -> &[u16] {
    if SURROGATES.contains(&code_point) {
        buf[0] = code_point as u16;
        return &buf[..1];
    }
    let ch = std::char::from_u32(code_point).unwrap_or(REPLACEMENT_CHARACTER);
    ch.encode_utf16(buf)
}

/// Counters for a single run
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Stats {
    /// Code units read from the input
    pub units_read: u64,
    /// Code units that were found in the table
    pub substitutions: u64,
    /// Code units written to the output
    pub units_written: u64,
}

/// Applies a [`SubstitutionTable`] to UTF-16LE streams
#[derive(Debug)]
pub struct Transcoder {
    table: SubstitutionTable,
}

impl Transcoder {
    /// Create a transcoder that owns `table` for the rest of its life
    pub fn new(table: SubstitutionTable) -> Self {
        Self { table }
    }

    /// Transcode the file at `input` to a new file at `output`
    ///
    /// The input is opened before the output is created. If the run fails
    /// after that, the output file is left as it is.
    pub fn transcode_file(&self, input: &Path, output: &Path) -> Result<Stats> {
        let input_file = File::open(input).map_err(|source| Error::OpenInput {
            path: input.to_owned(),
            source,
        })?;
        let output_file = File::create(output).map_err(|source| Error::CreateOutput {
            path: output.to_owned(),
            source,
        })?;
        debug!("Transcoding '{}' to '{}'", input.display(), output.display());
        self.transcode(BufReader::new(input_file), BufWriter::new(output_file))
    }

    /// Transcode `input` to `output`
    ///
    /// Writes the output BOM, skips the input BOM and then maps every code
    /// unit until the end of the input. The output is flushed whether or not
    /// this succeeds.
    pub fn transcode<R: Read, W: Write>(&self, input: R, output: W) -> Result<Stats> {
        let mut reader = UnitReader::new(input);
        let mut writer = UnitWriter::new(output);
        let mut stats = Stats::default();

        let result = self.run(&mut reader, &mut writer, &mut stats);
        stats.units_written = writer.units();

        match (result, writer.flush()) {
            (Ok(()), Ok(())) => {
                info!(
                    "Read {} code unit(s), substituted {}, wrote {}",
                    stats.units_read, stats.substitutions, stats.units_written
                );
                Ok(stats)
            }
            (Ok(()), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(flush)) => {
                warn!("Failed to flush output after error: {}", flush);
                Err(e)
            }
        }
    }

    fn run<R: Read, W: Write>(
        &self,
        reader: &mut UnitReader<R>,
        writer: &mut UnitWriter<W>,
        stats: &mut Stats,
    ) -> Result<()> {
        writer.write_bom()?;
        let bom = reader.skip_bom()?;
        if bom != BOM {
            debug!("Input starts with {:02X?} instead of a UTF-16LE BOM", bom);
        }

        while let Some(unit) = reader.read_unit()? {
            stats.units_read += 1;
            match self.table.get(u32::from(unit)) {
                Some(code_point) => {
                    stats.substitutions += 1;
                    writer.write_code_point(code_point)?;
                }
                None => writer.write_unit(unit)?,
            }
        }
        Ok(())
    }
}
