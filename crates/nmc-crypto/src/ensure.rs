//! Helper macros to express precondition checks concisely.

/// Ensures that an expression is true. Otherwise an error is returned.
/// ```
/// use nmc_crypto::ensure;
/// use nmc_crypto::EnvelopeError;
/// fn example(value: bool) -> Result<(), EnvelopeError> {
///   ensure!(value => EnvelopeError::CheckValueMismatch);
///   Ok(())
/// }
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr => $err:expr) => {
        if !$cond {
            return Err($err);
        }
    };
}

/// Ensures that a byte slice has the exact length a field requires. Otherwise an
/// [`EnvelopeError::InvalidLength`](crate::EnvelopeError::InvalidLength) naming the field is
/// returned.
/// ```
/// use nmc_crypto::ensure_len;
/// use nmc_crypto::EnvelopeError;
/// fn example(salt: &[u8]) -> Result<(), EnvelopeError> {
///    ensure_len!(salt, 8, "salt");
///    Ok(())
/// }
/// ```
#[macro_export]
macro_rules! ensure_len {
    ($value:expr, $expected:expr, $field:literal) => {
        if $value.len() != $expected {
            return Err($crate::EnvelopeError::InvalidLength {
                field: $field,
                expected: $expected,
                actual: $value.len(),
            });
        }
    };
}
