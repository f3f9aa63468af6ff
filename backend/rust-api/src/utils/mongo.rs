use mongodb::error::{Error, ErrorKind, WriteFailure};

/// Duplicate-key (E11000) detection. Rows with deterministic ids rely on this
/// to make concurrent inserts idempotent instead of erroring.
pub fn is_duplicate_key(error: &Error) -> bool {
    matches!(
        *error.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref we)) if we.code == 11000
    )
}
