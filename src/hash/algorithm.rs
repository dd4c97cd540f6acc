//! Built-in hash algorithm catalog.
//!
//! The catalog is closed: each algorithm has a stable textual name and a
//! stable integer code that appears in canonical encodings as an ASN.1
//! ENUMERATED value. Codes are never reassigned.

use adler::Adler32;
use blake2::{Blake2b512, Blake2s256};
use crc::{Algorithm, Crc};
use digest::consts::{U32, U48};
use digest::Digest;
use md4::Md4;
use md5::Md5;
use ripemd::Ripemd160;
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512, Sha512_224, Sha512_256};
use sha3::{Sha3_224, Sha3_256, Sha3_384, Sha3_512};

type Blake2b256 = blake2::Blake2b<U32>;
type Blake2b384 = blake2::Blake2b<U48>;

/// Identity of a hash algorithm, including the `None` sentinel used in
/// canonical encodings for absent hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashType {
    None,
    Md4,
    Md5,
    Sha1,
    Sha256,
    Sha224,
    Sha512,
    Sha384,
    Sha512_224,
    Sha512_256,
    Sha3_224,
    Sha3_256,
    Sha3_384,
    Sha3_512,
    Blake2s256,
    Blake2b256,
    Blake2b384,
    Blake2b512,
    Rmd160,
    Crc32,
    Crc32c,
    Crc32k,
    Crc64Iso,
    Crc64Ecma,
    Adler32,
    Fnv32,
    Fnv32a,
    Fnv64,
    Fnv64a,
    Fnv128,
    Fnv128a,
}

impl HashType {
    /// Stable integer code used inside canonical encodings.
    pub fn code(self) -> u32 {
        match self {
            HashType::None => 0,
            HashType::Md4 => 1,
            HashType::Md5 => 2,
            HashType::Sha1 => 3,
            HashType::Sha256 => 4,
            HashType::Sha224 => 5,
            HashType::Sha512 => 6,
            HashType::Sha384 => 7,
            HashType::Sha512_224 => 8,
            HashType::Sha512_256 => 9,
            HashType::Sha3_224 => 10,
            HashType::Sha3_256 => 11,
            HashType::Sha3_384 => 12,
            HashType::Sha3_512 => 13,
            HashType::Blake2s256 => 14,
            HashType::Blake2b256 => 15,
            HashType::Blake2b384 => 16,
            HashType::Blake2b512 => 17,
            HashType::Rmd160 => 18,
            HashType::Crc32 => 19,
            HashType::Crc32c => 20,
            HashType::Crc32k => 21,
            HashType::Crc64Iso => 22,
            HashType::Crc64Ecma => 23,
            HashType::Adler32 => 24,
            HashType::Fnv32 => 25,
            HashType::Fnv32a => 26,
            HashType::Fnv64 => 27,
            HashType::Fnv64a => 28,
            HashType::Fnv128 => 29,
            HashType::Fnv128a => 30,
        }
    }

    /// Stable textual name used in output and algorithm lookup.
    pub fn name(self) -> &'static str {
        match self {
            HashType::None => "none",
            HashType::Md4 => "md4",
            HashType::Md5 => "md5",
            HashType::Sha1 => "sha1",
            HashType::Sha256 => "sha256",
            HashType::Sha224 => "sha224",
            HashType::Sha512 => "sha512",
            HashType::Sha384 => "sha384",
            HashType::Sha512_224 => "sha512-224",
            HashType::Sha512_256 => "sha512-256",
            HashType::Sha3_224 => "sha3-224",
            HashType::Sha3_256 => "sha3-256",
            HashType::Sha3_384 => "sha3-384",
            HashType::Sha3_512 => "sha3-512",
            HashType::Blake2s256 => "blake2s256",
            HashType::Blake2b256 => "blake2b256",
            HashType::Blake2b384 => "blake2b384",
            HashType::Blake2b512 => "blake2b512",
            HashType::Rmd160 => "rmd160",
            HashType::Crc32 => "crc32",
            HashType::Crc32c => "crc32c",
            HashType::Crc32k => "crc32k",
            HashType::Crc64Iso => "crc64iso",
            HashType::Crc64Ecma => "crc64ecma",
            HashType::Adler32 => "adler32",
            HashType::Fnv32 => "fnv32",
            HashType::Fnv32a => "fnv32a",
            HashType::Fnv64 => "fnv64",
            HashType::Fnv64a => "fnv64a",
            HashType::Fnv128 => "fnv128",
            HashType::Fnv128a => "fnv128a",
        }
    }

    /// Resolve a user-supplied algorithm name. Dashes, underscores, dots,
    /// and slashes are interchangeable; common abbreviations are accepted.
    ///
    /// Names may not contain `:` (it separates fields in the wire form).
    pub fn parse(name: &str) -> Option<HashType> {
        let folded: String = name
            .chars()
            .map(|c| match c {
                '_' | '.' | '/' => '-',
                c => c.to_ascii_lowercase(),
            })
            .collect();
        // Order within each family: least info to most info, shorter
        // abbreviation before longer, no dash before dash.
        Some(match folded.as_str() {
            "md4" => HashType::Md4,
            "md5" => HashType::Md5,

            "sha1" => HashType::Sha1,
            "sha256" | "sha2256" | "sha2-256" => HashType::Sha256,
            "sha224" | "sha2224" | "sha2-224" => HashType::Sha224,
            "sha512" | "sha2512" | "sha2-512" => HashType::Sha512,
            "sha384" | "sha2384" | "sha2-384" => HashType::Sha384,
            "sha512224" | "sha512-224" | "sha2512224" | "sha2-512224" | "sha2-512-224" => {
                HashType::Sha512_224
            }
            "sha512256" | "sha512-256" | "sha2512256" | "sha2-512256" | "sha2-512-256" => {
                HashType::Sha512_256
            }
            "sha3224" | "sha3-224" => HashType::Sha3_224,
            "sha3256" | "sha3-256" => HashType::Sha3_256,
            "sha3384" | "sha3-384" => HashType::Sha3_384,
            "sha3512" | "sha3-512" => HashType::Sha3_512,

            "b2s256" | "b2s-256" | "blake2s256" | "blake2s-256" => HashType::Blake2s256,
            "b2b256" | "b2b-256" | "blake2b256" | "blake2b-256" => HashType::Blake2b256,
            "b2b384" | "b2b-384" | "blake2b384" | "blake2b-384" => HashType::Blake2b384,
            "b2b512" | "b2b-512" | "blake2b512" | "blake2b-512" => HashType::Blake2b512,

            "rmd160" | "rmd-160" | "ripemd160" | "ripemd-160" => HashType::Rmd160,

            "crc32" | "crc32ieee" | "crc32-ieee" => HashType::Crc32,
            "crc32c" | "crc32-c" | "crc32castagnoli" | "crc32-castagnoli" => HashType::Crc32c,
            "crc32k" | "crc32-k" | "crc32koopman" | "crc32-koopman" => HashType::Crc32k,
            "crc64iso" | "crc64-iso" => HashType::Crc64Iso,
            "crc64ecma" | "crc64-ecma" => HashType::Crc64Ecma,

            "adler32" => HashType::Adler32,

            "fnv32" => HashType::Fnv32,
            "fnv32a" => HashType::Fnv32a,
            "fnv64" => HashType::Fnv64,
            "fnv64a" => HashType::Fnv64a,
            "fnv128" => HashType::Fnv128,
            "fnv128a" => HashType::Fnv128a,

            _ => return None,
        })
    }

    /// Construct a fresh hasher. Each call produces independent state.
    pub(crate) fn new_state(self) -> Box<dyn HashState> {
        match self {
            HashType::None => Box::new(NullState),
            HashType::Md4 => Box::new(DigestState(Md4::new())),
            HashType::Md5 => Box::new(DigestState(Md5::new())),
            HashType::Sha1 => Box::new(DigestState(Sha1::new())),
            HashType::Sha256 => Box::new(DigestState(Sha256::new())),
            HashType::Sha224 => Box::new(DigestState(Sha224::new())),
            HashType::Sha512 => Box::new(DigestState(Sha512::new())),
            HashType::Sha384 => Box::new(DigestState(Sha384::new())),
            HashType::Sha512_224 => Box::new(DigestState(Sha512_224::new())),
            HashType::Sha512_256 => Box::new(DigestState(Sha512_256::new())),
            HashType::Sha3_224 => Box::new(DigestState(Sha3_224::new())),
            HashType::Sha3_256 => Box::new(DigestState(Sha3_256::new())),
            HashType::Sha3_384 => Box::new(DigestState(Sha3_384::new())),
            HashType::Sha3_512 => Box::new(DigestState(Sha3_512::new())),
            HashType::Blake2s256 => Box::new(DigestState(Blake2s256::new())),
            HashType::Blake2b256 => Box::new(DigestState(Blake2b256::new())),
            HashType::Blake2b384 => Box::new(DigestState(Blake2b384::new())),
            HashType::Blake2b512 => Box::new(DigestState(Blake2b512::new())),
            HashType::Rmd160 => Box::new(DigestState(Ripemd160::new())),
            HashType::Crc32 => Box::new(Crc32State(CRC32_IEEE.digest())),
            HashType::Crc32c => Box::new(Crc32State(CRC32_CASTAGNOLI.digest())),
            HashType::Crc32k => Box::new(Crc32State(CRC32_KOOPMAN.digest())),
            HashType::Crc64Iso => Box::new(Crc64State(CRC64_ISO.digest())),
            HashType::Crc64Ecma => Box::new(Crc64State(CRC64_ECMA.digest())),
            HashType::Adler32 => Box::new(AdlerState(Adler32::new())),
            HashType::Fnv32 => Box::new(Fnv32State::new(false)),
            HashType::Fnv32a => Box::new(Fnv32State::new(true)),
            HashType::Fnv64 => Box::new(Fnv64State::new(false)),
            HashType::Fnv64a => Box::new(Fnv64State::new(true)),
            HashType::Fnv128 => Box::new(Fnv128State::new(false)),
            HashType::Fnv128a => Box::new(Fnv128State::new(true)),
        }
    }
}

/// Incremental hasher state behind the built-in algorithms.
pub(crate) trait HashState: Send {
    fn update(&mut self, data: &[u8]);
    fn finalize(self: Box<Self>) -> Vec<u8>;
}

struct NullState;

impl HashState for NullState {
    fn update(&mut self, _data: &[u8]) {}
    fn finalize(self: Box<Self>) -> Vec<u8> {
        Vec::new()
    }
}

struct DigestState<D: Digest>(D);

impl<D: Digest + Send> HashState for DigestState<D> {
    fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.0, data);
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        self.0.finalize().to_vec()
    }
}

// CRC parameters matching the classic IEEE, Castagnoli, Koopman, ISO, and
// ECMA table constructions (reflected, all-ones init and xorout).
const CRC_32_KOOPMAN: Algorithm<u32> = Algorithm {
    width: 32,
    poly: 0x741b8cd7,
    init: 0xffffffff,
    refin: true,
    refout: true,
    xorout: 0xffffffff,
    check: 0x2d3dd0ae,
    residue: 0x00000000,
};

static CRC32_IEEE: Crc<u32> = Crc::<u32>::new(&crc::CRC_32_ISO_HDLC);
static CRC32_CASTAGNOLI: Crc<u32> = Crc::<u32>::new(&crc::CRC_32_ISCSI);
static CRC32_KOOPMAN: Crc<u32> = Crc::<u32>::new(&CRC_32_KOOPMAN);
static CRC64_ISO: Crc<u64> = Crc::<u64>::new(&crc::CRC_64_GO_ISO);
static CRC64_ECMA: Crc<u64> = Crc::<u64>::new(&crc::CRC_64_XZ);

struct Crc32State(crc::Digest<'static, u32>);

impl HashState for Crc32State {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        self.0.finalize().to_be_bytes().to_vec()
    }
}

struct Crc64State(crc::Digest<'static, u64>);

impl HashState for Crc64State {
    fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        self.0.finalize().to_be_bytes().to_vec()
    }
}

struct AdlerState(Adler32);

impl HashState for AdlerState {
    fn update(&mut self, data: &[u8]) {
        self.0.write_slice(data);
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        self.0.checksum().to_be_bytes().to_vec()
    }
}

// FNV-1 and FNV-1a folds. No registry crate covers all six widths, so the
// standard constants are applied directly.
const FNV32_OFFSET: u32 = 0x811c9dc5;
const FNV32_PRIME: u32 = 0x01000193;
const FNV64_OFFSET: u64 = 0xcbf29ce484222325;
const FNV64_PRIME: u64 = 0x00000100000001b3;
const FNV128_OFFSET: u128 = 0x6c62272e07bb014262b821756295c58d;
const FNV128_PRIME: u128 = 0x0000000001000000000000000000013b;

struct Fnv32State {
    hash: u32,
    fnv1a: bool,
}

impl Fnv32State {
    fn new(fnv1a: bool) -> Self {
        Fnv32State {
            hash: FNV32_OFFSET,
            fnv1a,
        }
    }
}

impl HashState for Fnv32State {
    fn update(&mut self, data: &[u8]) {
        for &b in data {
            if self.fnv1a {
                self.hash = (self.hash ^ u32::from(b)).wrapping_mul(FNV32_PRIME);
            } else {
                self.hash = self.hash.wrapping_mul(FNV32_PRIME) ^ u32::from(b);
            }
        }
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        self.hash.to_be_bytes().to_vec()
    }
}

struct Fnv64State {
    hash: u64,
    fnv1a: bool,
}

impl Fnv64State {
    fn new(fnv1a: bool) -> Self {
        Fnv64State {
            hash: FNV64_OFFSET,
            fnv1a,
        }
    }
}

impl HashState for Fnv64State {
    fn update(&mut self, data: &[u8]) {
        for &b in data {
            if self.fnv1a {
                self.hash = (self.hash ^ u64::from(b)).wrapping_mul(FNV64_PRIME);
            } else {
                self.hash = self.hash.wrapping_mul(FNV64_PRIME) ^ u64::from(b);
            }
        }
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        self.hash.to_be_bytes().to_vec()
    }
}

struct Fnv128State {
    hash: u128,
    fnv1a: bool,
}

impl Fnv128State {
    fn new(fnv1a: bool) -> Self {
        Fnv128State {
            hash: FNV128_OFFSET,
            fnv1a,
        }
    }
}

impl HashState for Fnv128State {
    fn update(&mut self, data: &[u8]) {
        for &b in data {
            if self.fnv1a {
                self.hash = (self.hash ^ u128::from(b)).wrapping_mul(FNV128_PRIME);
            } else {
                self.hash = self.hash.wrapping_mul(FNV128_PRIME) ^ u128::from(b);
            }
        }
    }

    fn finalize(self: Box<Self>) -> Vec<u8> {
        self.hash.to_be_bytes().to_vec()
    }
}
