//! Reference data provider.
//!
//! Two files drive a session, in the formats the MATLAB export pipeline
//! produces:
//!
//! - the *sum file*: one CSV line of floats, the cumulative final
//!   reference for the whole session;
//! - the *dat file*: binary run records, each a little-endian `i32`
//!   element count followed by that many `f32` values. Per run the record
//!   order is V, A, OUT-reference. A truncated or absent record ends the
//!   session.
//!
//! If the dat file is missing but a `.gz` sibling exists, `gunzip` is
//! invoked once and the open retried.
//!
//! Output references are returned 1-based: a reserved 0.0 is prepended at
//! index 0 so they line up with the device output, whose word 0 never
//! carries data. Input vectors A and V are 0-based and packed in full.

use crate::error::{Result, XcorrError};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::Command;

/// Upper bound on a record's element count; counts beyond this are a
/// corrupt or misaligned file, not data.
const MAX_RECORD_ELEMENTS: usize = 1 << 20;

/// One correlation test case from the dat file.
#[derive(Debug, Clone)]
pub struct RunCase {
    /// Input vector A, packed in full.
    pub a: Vec<f32>,
    /// Input vector V, packed in full.
    pub v: Vec<f32>,
    /// Expected output, 1-based (index 0 reserved). Its length is the
    /// run's declared output size.
    pub out_ref: Vec<f32>,
}

/// Streaming reader over the binary dat file.
#[derive(Debug)]
pub struct CaseReader {
    reader: BufReader<File>,
}

impl CaseReader {
    /// Open the dat file, decompressing a `.gz` sibling if needed.
    ///
    /// # Errors
    ///
    /// Returns [`XcorrError::ReferenceData`] if neither the file nor a
    /// decompressible `.gz` variant exists.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            let gz = path.with_extension(format!(
                "{}.gz",
                path.extension().and_then(|e| e.to_str()).unwrap_or("dat")
            ));
            if gz.exists() {
                tracing::info!("decompressing {}", gz.display());
                let status = Command::new("gunzip").arg(&gz).status()?;
                if !status.success() {
                    return Err(XcorrError::reference_data(format!(
                        "gunzip {} failed: {status}",
                        gz.display()
                    )));
                }
            }
        }

        let file = File::open(path).map_err(|e| {
            XcorrError::reference_data(format!("cannot open {}: {e}", path.display()))
        })?;
        Ok(Self {
            reader: BufReader::new(file),
        })
    }

    /// Read the next run's V, A and OUT-reference records.
    ///
    /// Returns `Ok(None)` at a clean end of file. A truncated final
    /// triple also counts as end of data, not as corruption.
    ///
    /// # Errors
    ///
    /// Returns [`XcorrError::ReferenceData`] on a structurally corrupt
    /// record.
    pub fn next_case(&mut self) -> Result<Option<RunCase>> {
        let Some(v) = self.read_record()? else {
            return Ok(None);
        };
        let Some(a) = self.read_record()? else {
            return Ok(None);
        };
        let Some(out) = self.read_record()? else {
            return Ok(None);
        };

        if v.is_empty() || a.is_empty() || out.is_empty() {
            return Ok(None);
        }

        Ok(Some(RunCase {
            a,
            v,
            out_ref: shift_one_based(&out),
        }))
    }

    /// One length-prefixed float record; `None` on end of file.
    fn read_record(&mut self) -> Result<Option<Vec<f32>>> {
        let mut len_buf = [0u8; 4];
        match self.reader.read_exact(&mut len_buf) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let count = i32::from_le_bytes(len_buf);
        let count = usize::try_from(count)
            .map_err(|_| XcorrError::reference_data(format!("negative record count {count}")))?;
        if count > MAX_RECORD_ELEMENTS {
            return Err(XcorrError::reference_data(format!(
                "record count {count} exceeds sanity bound"
            )));
        }

        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            let mut buf = [0u8; 4];
            match self.reader.read_exact(&mut buf) {
                Ok(()) => values.push(f32::from_le_bytes(buf)),
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
                Err(e) => return Err(e.into()),
            }
        }
        Ok(Some(values))
    }
}

impl Iterator for CaseReader {
    type Item = Result<RunCase>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_case().transpose()
    }
}

/// Load the cumulative final reference from the CSV sum file.
///
/// Returns the 1-based reference vector; its length is the session's
/// cumulative output size (`sum_size`).
///
/// # Errors
///
/// Returns [`XcorrError::ReferenceData`] if the file is missing, empty or
/// not parseable as comma-separated floats.
pub fn load_final_reference(path: &Path) -> Result<Vec<f32>> {
    let file = File::open(path)
        .map_err(|e| XcorrError::reference_data(format!("cannot open {}: {e}", path.display())))?;
    let mut line = String::new();
    BufReader::new(file).read_line(&mut line)?;

    let values = line
        .trim()
        .split(',')
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.trim()
                .parse::<f32>()
                .map_err(|e| XcorrError::reference_data(format!("bad float {t:?}: {e}")))
        })
        .collect::<Result<Vec<f32>>>()?;

    if values.is_empty() {
        return Err(XcorrError::reference_data(format!(
            "{} holds no values",
            path.display()
        )));
    }

    Ok(shift_one_based(&values))
}

/// Prepend the reserved slot: `[v0..vn]` becomes `[0.0, v0..v(n-1)]`.
///
/// The file carries the run's declared output count of values, but the
/// device's word 0 is reserved, so the last file value has no partner
/// and is dropped. This matches the comparison alignment of the deployed
/// harness.
fn shift_one_based(values: &[f32]) -> Vec<f32> {
    let mut shifted = Vec::with_capacity(values.len());
    shifted.push(0.0);
    shifted.extend_from_slice(&values[..values.len() - 1]);
    shifted
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_record(out: &mut impl Write, values: &[f32]) {
        out.write_all(&i32::try_from(values.len()).unwrap().to_le_bytes())
            .unwrap();
        for v in values {
            out.write_all(&v.to_le_bytes()).unwrap();
        }
    }

    #[test]
    fn reads_run_triples_in_v_a_out_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ref.dat");
        let mut f = File::create(&path).unwrap();
        write_record(&mut f, &[1.0, 2.0, 3.0, 4.0]); // V
        write_record(&mut f, &[5.0; 8]); // A
        write_record(&mut f, &[9.0, 8.0, 7.0]); // OUT
        drop(f);

        let mut reader = CaseReader::open(&path).unwrap();
        let case = reader.next_case().unwrap().unwrap();
        assert_eq!(case.v, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(case.a, vec![5.0; 8]);
        // 1-based with reserved slot, last file value dropped
        assert_eq!(case.out_ref, vec![0.0, 9.0, 8.0]);
        assert!(reader.next_case().unwrap().is_none());
    }

    #[test]
    fn truncated_trailing_triple_ends_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ref.dat");
        let mut f = File::create(&path).unwrap();
        write_record(&mut f, &[1.0; 4]);
        write_record(&mut f, &[2.0; 4]);
        write_record(&mut f, &[3.0, 4.0]);
        // Second triple cut off after V
        write_record(&mut f, &[5.0; 4]);
        drop(f);

        let mut reader = CaseReader::open(&path).unwrap();
        assert!(reader.next_case().unwrap().is_some());
        assert!(reader.next_case().unwrap().is_none());
    }

    #[test]
    fn corrupt_count_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ref.dat");
        let mut f = File::create(&path).unwrap();
        f.write_all(&(-5i32).to_le_bytes()).unwrap();
        drop(f);

        let mut reader = CaseReader::open(&path).unwrap();
        assert!(reader.next_case().is_err());
    }

    #[test]
    fn missing_dat_file_is_reference_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CaseReader::open(&dir.path().join("nope.dat")).unwrap_err();
        assert!(matches!(err, XcorrError::ReferenceData { .. }));
    }

    #[test]
    fn sum_file_parses_one_csv_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sum.txt");
        std::fs::write(&path, "1.5, -2.25,3.0,0.125\n").unwrap();

        let sum = load_final_reference(&path).unwrap();
        assert_eq!(sum, vec![0.0, 1.5, -2.25, 3.0]);
        assert_eq!(sum.len(), 4); // sum_size
    }

    #[test]
    fn empty_sum_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sum.txt");
        std::fs::write(&path, "\n").unwrap();
        assert!(load_final_reference(&path).is_err());
    }
}
