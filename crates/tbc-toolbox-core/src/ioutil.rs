//! General-purpose I/O helpers.

use std::io;
use std::io::ErrorKind;

/// Retries `f` for as long as it fails with [`ErrorKind::Interrupted`].
///
/// Field reads are long sequential I/O and may be interrupted by signals; every read and seek
/// in the TBC reader goes through this wrapper.
pub fn retry_if_interrupted<F, O>(mut f: F) -> io::Result<O>
where
    F: FnMut() -> io::Result<O>,
{
    loop {
        match f() {
            Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
            result => break result,
        }
    }
}
