//! AES-256-CBC bulk encryption in the OpenSSL `enc` container
//!
//! The ciphertext stream is `Salted__` followed by an 8-byte salt and the
//! CBC blocks, base64 armored. Key and IV come from PBKDF2-HMAC-SHA512 over
//! the symmetric key bytes read as an OpenSSL password file, so the output
//! can also be read with `openssl enc -d -aes-256-cbc -pbkdf2 -md sha512 -a
//! -pass file:<key>`.
//!
//! Data is processed in fixed chunks; inputs of any size are streamed.

use std::io::{self, Read, Write};

use aes::Aes256;
use cbc::cipher::generic_array::GenericArray;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha512;
use zeroize::Zeroizing;

use crate::error::{CryptError, CryptResult};

use super::armor::{armor_reader, ArmorWriter};
use super::secure_memory::is_password_terminator;
use super::SymmetricKey;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Magic prefix of a salted OpenSSL container
pub const SALT_MAGIC: &[u8; 8] = b"Salted__";

/// Salt length in bytes
pub const SALT_LEN: usize = 8;

/// PBKDF2 iteration count (OpenSSL's `-pbkdf2` default)
pub const PBKDF2_ITERATIONS: u32 = 10_000;

const BLOCK_LEN: usize = 16;
const KEY_LEN: usize = 32;
const CHUNK_LEN: usize = 64 * 1024;

/// The part of the key `openssl enc -pass file:` uses as the password
///
/// OpenSSL keeps the first line of the file and then stops at a NUL.
fn openssl_password(key: &[u8]) -> &[u8] {
    let line = match key.iter().position(|&b| b == b'\n') {
        Some(end) => &key[..end],
        None => key,
    };
    match line.iter().position(|&b| is_password_terminator(b)) {
        Some(end) => &line[..end],
        None => line,
    }
}

/// Derive the AES key and IV for one container
fn derive_key_iv(key: &SymmetricKey, salt: &[u8]) -> Zeroizing<[u8; KEY_LEN + BLOCK_LEN]> {
    let password = openssl_password(key.as_bytes());
    let mut out = Zeroizing::new([0u8; KEY_LEN + BLOCK_LEN]);
    pbkdf2::pbkdf2_hmac::<Sha512>(password, salt, PBKDF2_ITERATIONS, &mut out[..]);
    out
}

/// Encrypt everything from `reader` into armored ciphertext on `writer`
///
/// Returns the number of plaintext bytes consumed.
pub fn encrypt_stream<R: Read, W: Write>(
    key: &SymmetricKey,
    mut reader: R,
    writer: W,
) -> CryptResult<u64> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let key_iv = derive_key_iv(key, &salt);
    let mut cipher = Aes256CbcEnc::new_from_slices(&key_iv[..KEY_LEN], &key_iv[KEY_LEN..])
        .map_err(|e| CryptError::Encryption(format!("Failed to create cipher: {}", e)))?;

    let mut out = ArmorWriter::new(writer);
    out.write_all(SALT_MAGIC)?;
    out.write_all(&salt)?;

    // One spare block so the final chunk can take its padding in place
    let mut buf = Zeroizing::new(vec![0u8; CHUNK_LEN + BLOCK_LEN]);
    let mut total = 0u64;

    let tail = loop {
        let n = read_full(&mut reader, &mut buf[..CHUNK_LEN])?;
        total += n as u64;
        if n < CHUNK_LEN {
            break n;
        }
        encrypt_blocks(&mut cipher, &mut buf[..CHUNK_LEN]);
        out.write_all(&buf[..CHUNK_LEN])?;
    };

    // PKCS#7: always pad, a full block when already aligned
    let pad = BLOCK_LEN - tail % BLOCK_LEN;
    let padded = tail + pad;
    buf[tail..padded].fill(pad as u8);
    encrypt_blocks(&mut cipher, &mut buf[..padded]);
    out.write_all(&buf[..padded])?;

    let mut writer = out.finish()?;
    writer.flush()?;

    Ok(total)
}

/// Decrypt armored ciphertext from `reader` into plaintext on `writer`
///
/// Returns the number of plaintext bytes written. A wrong key or damaged
/// input surfaces as [`CryptError::Decryption`].
pub fn decrypt_stream<R: Read, W: Write>(
    key: &SymmetricKey,
    reader: R,
    mut writer: W,
) -> CryptResult<u64> {
    let mut input = armor_reader(reader);

    let mut header = [0u8; SALT_MAGIC.len() + SALT_LEN];
    input.read_exact(&mut header).map_err(decode_error)?;
    if &header[..SALT_MAGIC.len()] != SALT_MAGIC {
        return Err(CryptError::Decryption(
            "Ciphertext is missing the salted header".into(),
        ));
    }

    let key_iv = derive_key_iv(key, &header[SALT_MAGIC.len()..]);
    let mut cipher = Aes256CbcDec::new_from_slices(&key_iv[..KEY_LEN], &key_iv[KEY_LEN..])
        .map_err(|e| CryptError::Decryption(format!("Failed to create cipher: {}", e)))?;

    let mut buf = Zeroizing::new(vec![0u8; CHUNK_LEN]);
    // Last decrypted block, held back until we know whether it carries padding
    let mut held = Zeroizing::new([0u8; BLOCK_LEN]);
    let mut have_held = false;
    let mut total = 0u64;

    loop {
        let n = read_full(&mut input, &mut buf).map_err(decode_error)?;
        if n == 0 {
            break;
        }
        if n % BLOCK_LEN != 0 {
            return Err(CryptError::Decryption(
                "Ciphertext is truncated or corrupted".into(),
            ));
        }

        decrypt_blocks(&mut cipher, &mut buf[..n]);

        if have_held {
            writer.write_all(&held[..])?;
            total += BLOCK_LEN as u64;
        }
        writer.write_all(&buf[..n - BLOCK_LEN])?;
        total += (n - BLOCK_LEN) as u64;
        held.copy_from_slice(&buf[n - BLOCK_LEN..n]);
        have_held = true;

        if n < CHUNK_LEN {
            break;
        }
    }

    if !have_held {
        return Err(CryptError::Decryption("Ciphertext is empty".into()));
    }

    let keep = unpad(&held[..])?;
    writer.write_all(&held[..keep])?;
    writer.flush()?;

    Ok(total + keep as u64)
}

/// Validate PKCS#7 padding on the final block, returning the data length
fn unpad(block: &[u8]) -> CryptResult<usize> {
    let pad = block[BLOCK_LEN - 1] as usize;
    let valid = (1..=BLOCK_LEN).contains(&pad)
        && block[BLOCK_LEN - pad..].iter().all(|&b| b as usize == pad);

    if !valid {
        return Err(CryptError::Decryption(
            "Bad padding: wrong key or corrupted ciphertext".into(),
        ));
    }
    Ok(BLOCK_LEN - pad)
}

fn encrypt_blocks(cipher: &mut Aes256CbcEnc, data: &mut [u8]) {
    for block in data.chunks_exact_mut(BLOCK_LEN) {
        cipher.encrypt_block_mut(GenericArray::from_mut_slice(block));
    }
}

fn decrypt_blocks(cipher: &mut Aes256CbcDec, data: &mut [u8]) {
    for block in data.chunks_exact_mut(BLOCK_LEN) {
        cipher.decrypt_block_mut(GenericArray::from_mut_slice(block));
    }
}

/// Read until `buf` is full or the stream ends
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn decode_error(err: io::Error) -> CryptError {
    match err.kind() {
        io::ErrorKind::UnexpectedEof => {
            CryptError::Decryption("Ciphertext is too short".into())
        }
        io::ErrorKind::InvalidData => {
            CryptError::Decryption(format!("Invalid base64 armor: {}", err))
        }
        _ => CryptError::Io(err.to_string()),
    }
}
