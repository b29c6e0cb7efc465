//! Bounded exponential backoff for transient filesystem errors.

use std::io;
use std::time::Duration;

const MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY_MS: u64 = 10;

/// Run `op`, retrying transient IO errors with bounded exponential backoff.
///
/// `NotFound` is never retried: the claim protocol depends on observing it
/// immediately when a peer wins a rename race.
pub(crate) fn retry_io<T>(mut op: impl FnMut() -> io::Result<T>) -> io::Result<T> {
    let mut delay = Duration::from_millis(BASE_DELAY_MS);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op() {
            Ok(v) => return Ok(v),
            Err(e) if attempt < MAX_ATTEMPTS && is_transient(&e) => {
                std::thread::sleep(delay);
                delay *= 2;
            }
            Err(e) => return Err(e),
        }
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn transient_errors_are_retried_then_succeed() {
        let calls = Cell::new(0);
        let result = retry_io(|| {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(io::Error::new(io::ErrorKind::Interrupted, "flaky"))
            } else {
                Ok(42)
            }
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn not_found_fails_immediately() {
        let calls = Cell::new(0);
        let result: io::Result<()> = retry_io(|| {
            calls.set(calls.get() + 1);
            Err(io::Error::new(io::ErrorKind::NotFound, "peer won"))
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 1, "lost races must not be retried");
    }
}
