//! AES-128 in CFB mode, as a stream adapter
//!
//! The encrypted stream is the 16-byte IV in clear, followed by the ciphertext. There is
//! no authentication: corrupted input is only detected by the capture decoder.

use aes::Aes128;
use cfb_mode::cipher::KeyIvInit;
use cfb_mode::{BufDecryptor, BufEncryptor};
use libpcap_tools::Error;
use rand::rngs::OsRng;
use rand::TryRngCore;
use std::fmt;
use std::io::{self, Read, Write};

pub const KEY_LEN: usize = 16;
pub const IV_LEN: usize = 16;

/// Largest chunk encrypted per `write` call
const SCRATCH_LEN: usize = 64 * 1024;

/// Pre-shared AES-128 key
#[derive(Clone, PartialEq, Eq)]
pub struct AesKey([u8; KEY_LEN]);

impl AesKey {
    /// Build a key from exactly 16 bytes
    pub fn from_slice(key: &[u8]) -> Result<Self, Error> {
        let key: [u8; KEY_LEN] = key.try_into().map_err(|_| {
            Error::Config(format!(
                "AES-128 key must be {} bytes long, got {}",
                KEY_LEN,
                key.len()
            ))
        })?;
        Ok(AesKey(key))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for AesKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("AesKey(<redacted>)")
    }
}

/// Encrypting writer: plaintext in, IV and ciphertext out
pub struct CipherWriter<W: Write> {
    inner: W,
    enc: BufEncryptor<Aes128>,
    scratch: Vec<u8>,
}

impl<W: Write> CipherWriter<W> {
    /// Draw a fresh IV from the OS random source and write it to `inner`
    pub fn new(inner: W, key: &AesKey) -> io::Result<Self> {
        let mut iv = [0u8; IV_LEN];
        OsRng.try_fill_bytes(&mut iv).map_err(io::Error::other)?;
        Self::with_iv(inner, key, iv)
    }

    pub(crate) fn with_iv(mut inner: W, key: &AesKey, iv: [u8; IV_LEN]) -> io::Result<Self> {
        inner.write_all(&iv)?;
        let enc = BufEncryptor::<Aes128>::new(&key.0.into(), &iv.into());
        Ok(CipherWriter {
            inner,
            enc,
            scratch: Vec::new(),
        })
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CipherWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = buf.len().min(SCRATCH_LEN);
        self.scratch.clear();
        self.scratch.extend_from_slice(&buf[..n]);
        self.enc.encrypt(&mut self.scratch);
        // the keystream has advanced, so the chunk must be written entirely
        self.inner.write_all(&self.scratch)?;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Decrypting reader: IV and ciphertext in, plaintext out
pub struct CipherReader<R: Read> {
    inner: R,
    dec: BufDecryptor<Aes128>,
}

impl<R: Read> CipherReader<R> {
    /// Read the IV from the first 16 bytes of `inner`
    pub fn new(mut inner: R, key: &AesKey) -> io::Result<Self> {
        let mut iv = [0u8; IV_LEN];
        inner.read_exact(&mut iv).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "encrypted stream is too short to hold an IV",
                )
            } else {
                e
            }
        })?;
        let dec = BufDecryptor::<Aes128>::new(&key.0.into(), &iv.into());
        Ok(CipherReader { inner, dec })
    }
}

impl<R: Read> Read for CipherReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.dec.decrypt(&mut buf[..n]);
        Ok(n)
    }
}
