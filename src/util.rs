use std::time::{SystemTime, UNIX_EPOCH};

/// Generates a microsecond-precision timestamp representing the current
/// system time, measured from the Unix epoch.
///
/// Snapshot files record this at write time so operators can tell stale
/// partition images apart.
///
/// # Returns
/// * `u64` - The current timestamp in microseconds
///
/// # Panics
/// * Panics with "Time went backwards" if the system clock is set to a time
///   before the Unix epoch, which should not occur under normal conditions.
pub fn generate_timestamp_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_micros() as u64
}
