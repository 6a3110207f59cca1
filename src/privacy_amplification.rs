use rand::Rng;
use ring::digest::{Context, SHA256};

use crate::bb84_states::random_bits;
use crate::error::{Bb84Error, Result};

fn hash_chunk(chunk: &[u8]) -> Vec<u8> {
    let mut context = Context::new(&SHA256);
    context.update(chunk);
    let digest = context.finish();
    digest.as_ref().to_vec()
}

/// Packs bits little-endian within each byte. The last byte is zero-padded.
pub fn bools_to_bytes(bools: &[bool]) -> Vec<u8> {
    bools
        .chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0, |acc, (i, &bit)| acc | ((bit as u8) << i))
        })
        .collect()
}

/// Hex SHA-256 of the packed key, safe to log in place of the key itself.
pub fn key_fingerprint(key: &[bool]) -> String {
    hex::encode(hash_chunk(&bools_to_bytes(key)))
}

/// Multiplies `key` by the `output_len x key.len()` Toeplitz matrix defined by
/// `seed` over GF(2).
///
/// Entry `(i, j)` of the matrix is `seed[i + key.len() - 1 - j]`, so `seed`
/// must hold exactly `key.len() + output_len - 1` bits.
pub fn toeplitz_hash(key: &[bool], seed: &[bool], output_len: usize) -> Result<Vec<bool>> {
    if output_len == 0 || key.is_empty() {
        return Ok(Vec::new());
    }
    if output_len > key.len() {
        return Err(Bb84Error::InvalidArgument(format!(
            "cannot amplify {} bits into {}",
            key.len(),
            output_len
        )));
    }
    let n = key.len();
    let expected = n + output_len - 1;
    if seed.len() != expected {
        return Err(Bb84Error::LengthMismatch {
            left: seed.len(),
            right: expected,
        });
    }

    Ok((0..output_len)
        .map(|i| {
            key.iter()
                .enumerate()
                .fold(false, |acc, (j, &key_bit)| acc ^ (key_bit & seed[i + n - 1 - j]))
        })
        .collect())
}

/// Compresses `key` to `output_len` bits with a freshly drawn Toeplitz seed.
///
/// The seed is public; both parties must hash with the same one, which is why
/// the driver amplifies a single agreed key.
pub fn amplify<R: Rng + ?Sized>(key: &[bool], output_len: usize, rng: &mut R) -> Result<Vec<bool>> {
    if output_len == 0 || key.is_empty() {
        return Ok(Vec::new());
    }
    let seed = random_bits(key.len() + output_len - 1, rng);
    toeplitz_hash(key, &seed, output_len)
}
