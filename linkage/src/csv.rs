//! Functions for reading/writing CSV format.
//!
//! Poses are rows of `x0,y0,x1,y1,...`, traces are written one row per
//! sample with the traced joints side by side.
pub use csv::Error;
use crate::Trace;
use csv::{ReaderBuilder, Writer};
use serde::{de::DeserializeOwned, Serialize};
use std::io::Cursor;

/// Parse CSV from string.
pub fn parse_csv<D>(s: &str) -> Result<Vec<D>, Error>
where
    D: DeserializeOwned,
{
    ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .from_reader(Cursor::new(s))
        .deserialize()
        .collect()
}

/// Dump CSV to string.
pub fn dump_csv<'a, C, S>(c: C) -> Result<String, Box<dyn std::error::Error>>
where
    C: IntoIterator<Item = &'a S>,
    S: Serialize + ?Sized + 'a,
{
    let mut w = Writer::from_writer(Vec::new());
    c.into_iter().try_for_each(|row| w.serialize(row))?;
    Ok(String::from_utf8(w.into_inner()?)?)
}

/// Parse poses, one pose per row.
///
/// Rows with an odd number of values are rejected.
pub fn parse_poses(s: &str) -> Result<Vec<Vec<[f64; 2]>>, Box<dyn std::error::Error>> {
    parse_csv::<Vec<f64>>(s)?
        .into_iter()
        .enumerate()
        .map(|(i, row)| -> Result<Vec<[f64; 2]>, Box<dyn std::error::Error>> {
            if row.len() % 2 != 0 {
                return Err(format!("pose {i} has an odd number of coordinates").into());
            }
            Ok(row.chunks_exact(2).map(|c| [c[0], c[1]]).collect())
        })
        .collect()
}

/// Dump the traced paths, one row per sample.
///
/// Shorter paths leave their columns empty.
pub fn dump_trace(trace: &Trace) -> Result<String, Box<dyn std::error::Error>> {
    let paths = trace.paths().map(|(_, p)| p).collect::<Vec<_>>();
    let len = paths.iter().map(|p| p.len()).max().unwrap_or(0);
    let rows = (0..len)
        .map(|i| {
            paths
                .iter()
                .flat_map(|p| match p.get(i) {
                    Some([x, y]) => [Some(*x), Some(*y)],
                    None => [None; 2],
                })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    dump_csv(&rows)
}
