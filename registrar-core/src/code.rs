//! One-time verification codes

use rand::Rng;
use subtle::ConstantTimeEq;

/// Number of decimal digits in a verification code
pub const VERIFICATION_CODE_LENGTH: usize = 6;

/// Generate a random 6-digit verification code
///
/// Drawn from the thread-local CSPRNG, so consecutive codes are unrelated.
pub fn generate_verification_code() -> String {
    let code: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    code.to_string()
}

/// Compare a submitted code against the stored one in constant time
pub fn codes_match(submitted: &str, stored: &str) -> bool {
    submitted.trim().as_bytes().ct_eq(stored.as_bytes()).into()
}
