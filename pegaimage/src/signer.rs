//! Container assembly and digest sealing.
//!
//! A pega container is a fixed sequence of TLV records followed by the raw
//! firmware image:
//!
//! | Offset | Field                | Size |
//! |--------|----------------------|------|
//! | 0      | digest record header | 4    |
//! | 4      | digest value         | 32   |
//! | 36     | terminator record    | 4    |
//! | 40     | build-id record      | 4+N  |
//! | ...    | version record       | 4+M  |
//! | ...    | end-marker record    | 4    |
//! | ...    | raw firmware image   | any  |
//!
//! The record order is load-bearing: the device updater walks the records
//! positionally and rejects any other layout.
//!
//! The digest is SHA-256 over a fixed prefix string, the container bytes
//! from offset 36 to the end, and a fixed suffix string. Both strings are
//! compiled into the tool and extractable from any copy of it, so the
//! digest guards against accidental corruption and casual tampering only —
//! it is not a message-authentication code and must not be treated as one.
//!
//! The container is assembled in memory with a zeroed digest, sealed in
//! memory, and written out in one atomic step (temp file + rename). This
//! keeps the output free of the truncated/stale-digest states a seek-and-
//! patch write sequence can leave behind on interruption, while the digest
//! still covers the bytes exactly as written.

use std::{
    fs,
    io::{Cursor, Write},
    path::{Path, PathBuf},
};

use log::{debug, info};
use tempfile::NamedTempFile;

use crate::{
    error::{Result, SignError},
    sha256::{Sha256, DIGEST_LEN},
    tlv,
};

/// Record type of the terminator record.
pub const RECORD_TERMINATOR: u16 = 0;
/// Record type of the digest record; reused with length zero as the
/// end marker.
pub const RECORD_DIGEST: u16 = 1;
/// Record type of the build-id string record.
pub const RECORD_BUILD_ID: u16 = 2;
/// Record type of the version string record.
pub const RECORD_VERSION: u16 = 3;

/// Build identifier embedded in the container.
pub const BUILD_ID: &str = "V1.0.2.46_1.0.1";
/// Bootloader version embedded in the container.
pub const BOOTLOADER_VERSION: &str = "V1.20";

/// Constant hashed before the container bytes.
pub const HASH_PREFIX: &[u8] = b"hr89sdfgjkehx";
/// Constant hashed after the container bytes.
pub const HASH_SUFFIX: &[u8] = b"nohsli9fjh3f";

/// Extension appended to the source image path for the output file.
pub const OUTPUT_EXTENSION: &str = "pega";

/// Offset where the hashed region begins: the digest record's own header
/// and value are excluded so the digest never covers itself.
pub const HASHED_REGION_START: usize = tlv::HEADER_LEN + DIGEST_LEN;

/// Computes the keyed digest over the hashed region of a container.
///
/// `tail` must be the container bytes from [`HASHED_REGION_START`] to the
/// end, exactly as they appear in the output file.
pub fn keyed_digest(tail: &[u8]) -> [u8; DIGEST_LEN] {
    let mut sha = Sha256::new();
    sha.update(HASH_PREFIX);
    sha.update(tail);
    sha.update(HASH_SUFFIX);
    sha.finalize()
}

/// Assembles an unsealed container: records in fixed order with a zeroed
/// digest value, then the raw image appended verbatim.
pub fn build_container(image: &[u8]) -> Result<Vec<u8>> {
    let record_area = HASHED_REGION_START
        + 4 * tlv::HEADER_LEN
        + BUILD_ID.len()
        + BOOTLOADER_VERSION.len();
    let mut out = Vec::with_capacity(record_area + image.len());

    tlv::write_record(&mut out, RECORD_DIGEST, &[0u8; DIGEST_LEN])?;
    tlv::write_empty_record(&mut out, RECORD_TERMINATOR)?;
    tlv::write_string_record(&mut out, RECORD_BUILD_ID, BUILD_ID)?;
    tlv::write_string_record(&mut out, RECORD_VERSION, BOOTLOADER_VERSION)?;
    tlv::write_empty_record(&mut out, RECORD_DIGEST)?;
    out.extend_from_slice(image);

    Ok(out)
}

/// Computes the keyed digest over `container[36..]` and splices it into
/// the digest record's value field.
pub fn seal_container(container: &mut [u8]) -> Result<()> {
    if container.len() < HASHED_REGION_START {
        return Err(SignError::invalid_container(
            "container shorter than the digest record",
        ));
    }
    let digest = keyed_digest(&container[HASHED_REGION_START..]);
    container[tlv::HEADER_LEN..HASHED_REGION_START].copy_from_slice(&digest);
    debug!("sealed container, digest {}", hex::encode(digest));
    Ok(())
}

/// Builds and seals a container for `image` in memory.
pub fn sign_image(image: &[u8]) -> Result<Vec<u8>> {
    let mut container = build_container(image)?;
    seal_container(&mut container)?;
    Ok(container)
}

/// Checks that `container` is a structurally valid, correctly sealed pega
/// image.
///
/// Walks the record sequence (digest, terminator, then records up to the
/// end marker) and recomputes the keyed digest over the hashed region.
///
/// # Errors
///
/// Returns [`SignError::InvalidContainer`] describing the first structural
/// or digest mismatch found.
pub fn verify_container(container: &[u8]) -> Result<()> {
    if container.len() < HASHED_REGION_START + tlv::HEADER_LEN {
        return Err(SignError::invalid_container(
            "container too small for the fixed record sequence",
        ));
    }

    let mut cursor = Cursor::new(container);
    let digest_record = tlv::read_record(&mut cursor)?;
    if digest_record.rtype != RECORD_DIGEST || digest_record.value.len() != DIGEST_LEN {
        return Err(SignError::invalid_container(
            "first record is not a 32-byte digest record",
        ));
    }

    let terminator = tlv::read_record(&mut cursor)?;
    if terminator.rtype != RECORD_TERMINATOR || !terminator.value.is_empty() {
        return Err(SignError::invalid_container(
            "digest record is not followed by the terminator",
        ));
    }

    // Skip the string records up to the end marker (type 1, length 0).
    loop {
        let record = tlv::read_record(&mut cursor)?;
        if record.rtype == RECORD_DIGEST {
            if !record.value.is_empty() {
                return Err(SignError::invalid_container(
                    "end marker carries value bytes",
                ));
            }
            break;
        }
    }

    let expected = keyed_digest(&container[HASHED_REGION_START..]);
    if digest_record.value != expected {
        return Err(SignError::invalid_container(format!(
            "digest mismatch: embedded {}, computed {}",
            hex::encode(&digest_record.value),
            hex::encode(expected)
        )));
    }
    Ok(())
}

/// Derives the output path: the source path with `.pega` appended.
pub fn output_path_for(src: &Path) -> PathBuf {
    let mut name = src.as_os_str().to_os_string();
    name.push(".");
    name.push(OUTPUT_EXTENSION);
    PathBuf::from(name)
}

/// Reads the source image, signs it, and writes the sealed container to
/// `dst` in one atomic step.
///
/// # Errors
///
/// Any read or write failure is fatal; the error names the failing path.
/// On failure no partial output is left at `dst`.
pub fn sign_file(src: &Path, dst: &Path) -> Result<()> {
    let image = fs::read(src).map_err(|e| SignError::source_io(src, e))?;
    info!("read {} byte image from {}", image.len(), src.display());

    let container = sign_image(&image)?;
    write_atomic(dst, &container)?;
    info!(
        "wrote {} byte container to {}",
        container.len(),
        dst.display()
    );
    Ok(())
}

/// Writes `bytes` to `dst` via a temp file in the same directory and a
/// rename, so `dst` is never observable in a half-written state.
fn write_atomic(dst: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match dst.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| SignError::destination_io(dst, e))?;
    tmp.write_all(bytes)
        .map_err(|e| SignError::destination_io(dst, e))?;
    tmp.persist(dst)
        .map_err(|e| SignError::destination_io(dst, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_image_container_layout() {
        let container = sign_image(&[]).expect("signing should succeed");
        assert_eq!(container.len(), 72);

        // Digest record header: type 1, length 32.
        assert_eq!(&container[0..4], [0x00, 0x01, 0x00, 0x20]);
        // Terminator record.
        assert_eq!(&container[36..40], [0x00, 0x00, 0x00, 0x00]);
        // Build-id record.
        assert_eq!(&container[40..44], [0x00, 0x02, 0x00, 0x0F]);
        assert_eq!(&container[44..59], BUILD_ID.as_bytes());
        // Version record.
        assert_eq!(&container[59..63], [0x00, 0x03, 0x00, 0x05]);
        assert_eq!(&container[63..68], BOOTLOADER_VERSION.as_bytes());
        // End marker: type 1, length 0.
        assert_eq!(&container[68..72], [0x00, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn test_image_appended_verbatim() {
        let image: Vec<u8> = (0u8..=255).collect();
        let container = sign_image(&image).expect("signing should succeed");
        assert_eq!(&container[container.len() - image.len()..], &image[..]);
    }

    #[test]
    fn test_embedded_digest_matches_recomputation() {
        let image = b"firmware payload bytes";
        let container = sign_image(image).expect("signing should succeed");

        let expected = keyed_digest(&container[HASHED_REGION_START..]);
        assert_eq!(&container[4..36], expected);

        // Same digest through an independent incremental computation.
        let mut sha = Sha256::new();
        sha.update(HASH_PREFIX);
        sha.update(&container[HASHED_REGION_START..]);
        sha.update(HASH_SUFFIX);
        assert_eq!(&container[4..36], sha.finalize());
    }

    #[test]
    fn test_signing_is_deterministic() {
        let image = vec![0x5A; 4096];
        let first = sign_image(&image).expect("signing should succeed");
        let second = sign_image(&image).expect("signing should succeed");
        assert_eq!(first, second);
    }

    #[test]
    fn test_single_byte_change_flips_digest() {
        let image = vec![0u8; 100];
        let baseline = sign_image(&image).expect("signing should succeed");

        let mut tweaked = image.clone();
        tweaked[50] ^= 0x01;
        let changed = sign_image(&tweaked).expect("signing should succeed");

        assert_ne!(&baseline[4..36], &changed[4..36]);
    }

    #[test]
    fn test_verify_accepts_sealed_container() {
        let container = sign_image(b"payload").expect("signing should succeed");
        verify_container(&container).expect("sealed container must verify");
    }

    #[test]
    fn test_verify_rejects_tampered_image() {
        let mut container = sign_image(b"payload").expect("signing should succeed");
        let last = container.len() - 1;
        container[last] ^= 0xFF;

        let err = verify_container(&container).expect_err("tampered container must fail");
        assert!(matches!(err, SignError::InvalidContainer(_)));
    }

    #[test]
    fn test_verify_rejects_unsealed_container() {
        let container = build_container(b"payload").expect("build should succeed");
        assert!(verify_container(&container).is_err());
    }

    #[test]
    fn test_output_path_appends_extension() {
        assert_eq!(
            output_path_for(Path::new("firmware.img")),
            Path::new("firmware.img.pega")
        );
        assert_eq!(
            output_path_for(Path::new("/srv/fw/image.bin")),
            Path::new("/srv/fw/image.bin.pega")
        );
    }

    #[test]
    fn test_sign_file_round_trip() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let src = dir.path().join("fw.bin");
        let image = b"boot code goes here";
        fs::write(&src, image).expect("failed to write source image");

        let dst = output_path_for(&src);
        sign_file(&src, &dst).expect("signing should succeed");

        let container = fs::read(&dst).expect("failed to read output");
        verify_container(&container).expect("output must verify");
        assert_eq!(&container[container.len() - image.len()..], image);
        assert_eq!(container, sign_image(image).expect("signing should succeed"));
    }

    #[test]
    fn test_sign_file_missing_source_names_path() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let src = dir.path().join("missing.bin");
        let dst = dir.path().join("missing.bin.pega");

        let err = sign_file(&src, &dst).expect_err("missing source must fail");
        assert!(matches!(err, SignError::Source { .. }));
        assert!(err.to_string().contains("missing.bin"));
        assert!(!dst.exists(), "no output may be created on failure");
    }
}
