//! Helpers for naming temporary objects.
//!
//! Outfiles in `QTEMP` live for the whole job, so callers usually combine a
//! random name with the current date or time to avoid collisions:
//!
//! ```
//! use iseries_rs::util::{now, rand_filename};
//!
//! let output = format!("T{}", rand_filename(6).unwrap());
//! assert_eq!(output.len(), 7);
//! assert!(now() < 240000);
//! ```

use chrono::{Datelike, Local, NaiveDate, NaiveTime, Timelike};
use rand::Rng;

use crate::error::{Error, Result};

/// Default length of names from [`rand_filename`].
pub const DEFAULT_FILENAME_LENGTH: usize = 6;

/// Generate a random name of uppercase letters `A`-`Z`.
///
/// Fails with `Error::Validation` when `length` is zero.
pub fn rand_filename(length: usize) -> Result<String> {
    if length < 1 {
        return Err(Error::validation("length must be at least 1"));
    }
    let mut rng = rand::thread_rng();
    Ok((0..length)
        .map(|_| char::from(rng.gen_range(b'A'..=b'Z')))
        .collect())
}

/// Today's date as `YYYYMMDD` (e.g. `20231215`).
pub fn today() -> u32 {
    date_stamp(Local::now().date_naive())
}

/// The current time as `HHMMSS` (e.g. `143025` for 14:30:25).
pub fn now() -> u32 {
    time_stamp(Local::now().time())
}

/// Encode a date as `YYYYMMDD`.
pub fn date_stamp(date: NaiveDate) -> u32 {
    date.year() as u32 * 10_000 + date.month() * 100 + date.day()
}

/// Encode a time of day as `HHMMSS`.
pub fn time_stamp(time: NaiveTime) -> u32 {
    time.hour() * 10_000 + time.minute() * 100 + time.second()
}
