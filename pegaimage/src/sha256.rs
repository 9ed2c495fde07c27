//! Incremental SHA-256 implementation (FIPS 180-4).
//!
//! The device updater recomputes the container digest with its own baked-in
//! SHA-256, so this implementation is written from first principles and must
//! stay bit-exact: standard round constants, standard initial state, no
//! truncation.

/// SHA-256 digest size in bytes.
pub const DIGEST_LEN: usize = 32;

/// Message block size in bytes.
const BLOCK_LEN: usize = 64;

/// Initial hash state (FIPS 180-4 section 5.3.3).
const H0: [u32; 8] = [
    0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a, 0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19,
];

/// Round constants (FIPS 180-4 section 4.2.2).
const K: [u32; 64] = [
    0x428a2f98, 0x71374491, 0xb5c0fbcf, 0xe9b5dba5, 0x3956c25b, 0x59f111f1, 0x923f82a4, 0xab1c5ed5,
    0xd807aa98, 0x12835b01, 0x243185be, 0x550c7dc3, 0x72be5d74, 0x80deb1fe, 0x9bdc06a7, 0xc19bf174,
    0xe49b69c1, 0xefbe4786, 0x0fc19dc6, 0x240ca1cc, 0x2de92c6f, 0x4a7484aa, 0x5cb0a9dc, 0x76f988da,
    0x983e5152, 0xa831c66d, 0xb00327c8, 0xbf597fc7, 0xc6e00bf3, 0xd5a79147, 0x06ca6351, 0x14292967,
    0x27b70a85, 0x2e1b2138, 0x4d2c6dfc, 0x53380d13, 0x650a7354, 0x766a0abb, 0x81c2c92e, 0x92722c85,
    0xa2bfe8a1, 0xa81a664b, 0xc24b8b70, 0xc76c51a3, 0xd192e819, 0xd6990624, 0xf40e3585, 0x106aa070,
    0x19a4c116, 0x1e376c08, 0x2748774c, 0x34b0bcb5, 0x391c0cb3, 0x4ed8aa4a, 0x5b9cca4f, 0x682e6ff3,
    0x748f82ee, 0x78a5636f, 0x84c87814, 0x8cc70208, 0x90befffa, 0xa4506ceb, 0xbef9a3f7, 0xc67178f2,
];

#[inline]
fn rotr(x: u32, n: u32) -> u32 {
    (x >> n) | (x << (32 - n))
}

#[inline]
fn ch(x: u32, y: u32, z: u32) -> u32 {
    z ^ (x & (y ^ z))
}

#[inline]
fn maj(x: u32, y: u32, z: u32) -> u32 {
    (x & y) | (z & (x | y))
}

#[inline]
fn bsig0(x: u32) -> u32 {
    rotr(x, 2) ^ rotr(x, 13) ^ rotr(x, 22)
}

#[inline]
fn bsig1(x: u32) -> u32 {
    rotr(x, 6) ^ rotr(x, 11) ^ rotr(x, 25)
}

#[inline]
fn ssig0(x: u32) -> u32 {
    rotr(x, 7) ^ rotr(x, 18) ^ (x >> 3)
}

#[inline]
fn ssig1(x: u32) -> u32 {
    rotr(x, 17) ^ rotr(x, 19) ^ (x >> 10)
}

/// Runs the compression function over one 64-byte block.
fn compress(h: &mut [u32; 8], block: &[u8]) {
    debug_assert_eq!(block.len(), BLOCK_LEN);

    let mut w = [0u32; 64];
    for (i, chunk) in block.chunks_exact(4).enumerate() {
        w[i] = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    for i in 16..64 {
        w[i] = ssig1(w[i - 2])
            .wrapping_add(w[i - 7])
            .wrapping_add(ssig0(w[i - 15]))
            .wrapping_add(w[i - 16]);
    }

    let [mut a, mut b, mut c, mut d, mut e, mut f, mut g, mut hh] = *h;

    for i in 0..64 {
        let t1 = hh
            .wrapping_add(bsig1(e))
            .wrapping_add(ch(e, f, g))
            .wrapping_add(K[i])
            .wrapping_add(w[i]);
        let t2 = bsig0(a).wrapping_add(maj(a, b, c));
        hh = g;
        g = f;
        f = e;
        e = d.wrapping_add(t1);
        d = c;
        c = b;
        b = a;
        a = t1.wrapping_add(t2);
    }

    h[0] = h[0].wrapping_add(a);
    h[1] = h[1].wrapping_add(b);
    h[2] = h[2].wrapping_add(c);
    h[3] = h[3].wrapping_add(d);
    h[4] = h[4].wrapping_add(e);
    h[5] = h[5].wrapping_add(f);
    h[6] = h[6].wrapping_add(g);
    h[7] = h[7].wrapping_add(hh);
}

/// Incremental SHA-256 hash state.
///
/// Each instance owns its state independently, so several hashes can run
/// side by side. `finalize` consumes the state; feeding more data after
/// finalization is therefore rejected at compile time.
///
/// # Example
///
/// ```rust
/// use pegaimage::sha256::Sha256;
///
/// let mut sha = Sha256::new();
/// sha.update(b"hello ");
/// sha.update(b"world");
/// let digest = sha.finalize();
/// assert_eq!(digest, Sha256::digest(b"hello world"));
/// ```
pub struct Sha256 {
    /// Total number of message bytes processed so far.
    len: u64,
    /// Working hash state.
    h: [u32; 8],
    /// Pending partial message block.
    buf: [u8; BLOCK_LEN],
}

impl Default for Sha256 {
    fn default() -> Self {
        Self::new()
    }
}

impl Sha256 {
    /// Creates a fresh hash state.
    pub fn new() -> Self {
        Self {
            len: 0,
            h: H0,
            buf: [0; BLOCK_LEN],
        }
    }

    /// Feeds message bytes into the hash.
    ///
    /// May be called any number of times with arbitrary chunk sizes; the
    /// resulting digest does not depend on how the input is split.
    pub fn update(&mut self, mut data: &[u8]) {
        let mut fill = (self.len % BLOCK_LEN as u64) as usize;
        self.len += data.len() as u64;

        if fill > 0 {
            let take = (BLOCK_LEN - fill).min(data.len());
            self.buf[fill..fill + take].copy_from_slice(&data[..take]);
            data = &data[take..];
            fill += take;
            if fill < BLOCK_LEN {
                return;
            }
            compress(&mut self.h, &self.buf);
        }

        while data.len() >= BLOCK_LEN {
            let (block, rest) = data.split_at(BLOCK_LEN);
            compress(&mut self.h, block);
            data = rest;
        }

        self.buf[..data.len()].copy_from_slice(data);
    }

    /// Pads the final block, runs the last compression round(s), and emits
    /// the digest as eight big-endian 32-bit words.
    ///
    /// Consumes the state.
    pub fn finalize(mut self) -> [u8; DIGEST_LEN] {
        let fill = (self.len % BLOCK_LEN as u64) as usize;
        let bit_len = self.len * 8;

        self.buf[fill] = 0x80;
        if fill + 1 > 56 {
            // No room for the length field, roll into an extra block.
            self.buf[fill + 1..].fill(0);
            compress(&mut self.h, &self.buf);
            self.buf.fill(0);
        } else {
            self.buf[fill + 1..56].fill(0);
        }
        self.buf[56..].copy_from_slice(&bit_len.to_be_bytes());
        compress(&mut self.h, &self.buf);

        let mut out = [0u8; DIGEST_LEN];
        for (chunk, word) in out.chunks_exact_mut(4).zip(self.h) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        out
    }

    /// One-shot convenience: digest of `data` in a single call.
    pub fn digest(data: &[u8]) -> [u8; DIGEST_LEN] {
        let mut sha = Sha256::new();
        sha.update(data);
        sha.finalize()
    }
}
