//! Random test data tokens

use rand::distributions::Alphanumeric;
use rand::Rng;
use std::sync::atomic::{AtomicI64, Ordering};

/// Prefix for every generated token, so leftovers on a server are easy to spot
pub const PREFIX: &str = "test_";

/// Default length of the random part of a token
pub const DEFAULT_LENGTH: usize = 10;

static LAST_STAMP: AtomicI64 = AtomicI64::new(0);

/// Random token with the default length
pub fn random_string() -> String {
    random_string_of(DEFAULT_LENGTH)
}

/// Random token with a random part of `len` alphanumeric characters
pub fn random_string_of(len: usize) -> String {
    format!("{}{}", PREFIX, alphanumeric(len))
}

/// Random token that never repeats within this process.
///
/// The trailing stamp is a microsecond timestamp bumped past the previously
/// issued one when two calls land in the same tick.
pub fn unique_string() -> String {
    format!("{}{}_{}", PREFIX, alphanumeric(DEFAULT_LENGTH), next_stamp())
}

fn alphanumeric(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn next_stamp() -> i64 {
    let now = chrono::Utc::now().timestamp_micros();
    let prev = LAST_STAMP
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last + 1))
        })
        .unwrap_or(now);
    now.max(prev + 1)
}
