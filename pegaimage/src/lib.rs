//! # pegaimage - pega firmware container library
//!
//! A Rust library for packaging raw firmware images into the vendor "pega"
//! container format accepted by the device updater.
//!
//! ## Features
//!
//! - Byte-exact pega container assembly (big-endian TLV records)
//! - First-principles incremental SHA-256 (no external crypto crate)
//! - Keyed digest sealing over the exact output bytes
//! - Atomic output writes (temp file + rename, no half-written containers)
//! - Verification of sealed containers by digest recomputation
//!
//! ## Quick Start
//!
//! ```rust
//! use pegaimage::signer;
//!
//! let image = b"raw firmware bytes";
//! let container = signer::sign_image(image).unwrap();
//! signer::verify_container(&container).unwrap();
//! ```
//!
//! ## Security properties
//!
//! The digest is keyed only by two constant strings compiled into the tool;
//! anyone with a copy of the binary can extract and reuse them. It is an
//! integrity check against accidental corruption and casual tampering, not
//! a cryptographic authentication mechanism.
//!
//! ## Modules
//!
//! - [`sha256`] - Incremental SHA-256 implementation
//! - [`tlv`] - TLV record encoding and decoding
//! - [`signer`] - Container assembly, sealing, and verification
//! - [`error`] - Error types and result definitions

/// Error types and result definitions for pega container operations.
pub mod error;

/// Incremental SHA-256 implementation (FIPS 180-4).
pub mod sha256;

/// Container assembly, digest sealing, and verification.
pub mod signer;

/// TLV record encoding and decoding.
pub mod tlv;

// Re-export main types for convenience
pub use error::{Result, SignError};
pub use sha256::Sha256;
pub use signer::{output_path_for, sign_file, sign_image, verify_container};

/// Current version of the pegaimage implementation
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
