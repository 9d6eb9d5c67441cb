//! Order number validation
//!
//! Order numbers and withdrawal references are decimal digit strings that
//! carry a Luhn (mod 10) check digit.

/// Check an order number against the Luhn algorithm
///
/// Rejects empty input and anything that is not an ASCII digit. Digits whose
/// index has the same parity as the string length are doubled (subtracting 9
/// when the result exceeds 9); the number is valid when the digit sum is
/// divisible by 10.
pub fn is_valid(number: &str) -> bool {
    if number.is_empty() {
        return false;
    }

    let parity = number.len() % 2;
    let mut sum = 0u32;

    for (i, byte) in number.bytes().enumerate() {
        if !byte.is_ascii_digit() {
            return false;
        }

        let mut digit = u32::from(byte - b'0');
        if i % 2 == parity {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
    }

    sum % 10 == 0
}
