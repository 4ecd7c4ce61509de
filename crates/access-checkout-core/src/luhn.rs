//! Luhn (mod-10) checksum used to reject mistyped card numbers.
//!
//! The function is zero-allocation: it walks the byte slice of the input from
//! the right without building intermediate buffers.

/// Verifies the Luhn check digit of a primary account number.
///
/// **Pre-condition:** callers gate on length and digit-only content first.
/// An empty string, or any string containing a byte outside `0`–`9`, returns
/// `false`.
///
/// # Algorithm
///
/// Digits are visited from right to left. Every second digit (the second,
/// fourth, … from the right) is doubled; a doubled value above 9 has 9
/// subtracted. The number is valid when the sum of all resulting digits is a
/// multiple of 10.
///
/// # Examples
///
/// ```
/// use access_checkout_core::luhn::luhn_valid;
///
/// assert!(luhn_valid("4111111111111111"));
/// assert!(!luhn_valid("4111111111111112"));
/// ```
pub fn luhn_valid(digits: &str) -> bool {
    let bytes = digits.as_bytes();
    if bytes.is_empty() {
        return false;
    }

    let mut sum: u32 = 0;
    for (i, byte) in bytes.iter().rev().enumerate() {
        if !byte.is_ascii_digit() {
            return false;
        }
        let mut digit = u32::from(byte - b'0');
        if i % 2 == 1 {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
    }
    sum % 10 == 0
}
