use rand::{CryptoRng, Rng};

/// Symbols from which the characters of a generated identifier are drawn.
const ALPHABET: &[u8] = b"1234567890abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Number of characters in a generated identifier.
const IDENTIFIER_LEN: usize = 10;

/// Generates a random identifier of 10 characters drawn uniformly from a
/// 62-symbol alphabet.
///
/// The entropy source is passed explicitly so that callers decide where the
/// randomness comes from. Production callers pass [`rand::rngs::OsRng`].
///
/// # Example
///
/// ```rust
/// use hypack_shared::generate_identifier;
/// let id = generate_identifier(&mut rand::rngs::OsRng);
/// assert_eq!(id.len(), 10);
/// ```
pub fn generate_identifier<R: Rng + CryptoRng>(rng: &mut R) -> String {
    (0..IDENTIFIER_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}
