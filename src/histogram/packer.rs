//! Packed float32 blobs: `4 * N` bytes, little-endian IEEE-754 binary32 in
//! order, no header and no length prefix. Consumers learn `N` out of band.

use std::path::Path;

use crate::error::{Error, Result};

pub fn pack(values: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 4);
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

pub fn unpack(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(Error::MalformedBlob { len: bytes.len() });
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

pub fn write_blob(path: &Path, values: &[f32]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, pack(values))?;
    log::info!("Wrote {} values ({} bytes) to {}", values.len(), values.len() * 4, path.display());
    Ok(())
}

pub fn read_blob(path: &Path) -> Result<Vec<f32>> {
    let bytes = std::fs::read(path)?;
    unpack(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_two_values() {
        let bytes = pack(&[1.5, -2.25]);
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[..4], &[0x00, 0x00, 0xc0, 0x3f]);
        assert_eq!(unpack(&bytes).unwrap(), vec![1.5, -2.25]);
    }

    #[test]
    fn roundtrip_keeps_order_and_values() {
        let bins: Vec<f32> = (0..90).map(|i| (i as f32 * 0.37).sin()).collect();
        assert_eq!(unpack(&pack(&bins)).unwrap(), bins);
    }

    #[test]
    fn empty_is_empty() {
        assert!(pack(&[]).is_empty());
        assert!(unpack(&[]).unwrap().is_empty());
    }

    #[test]
    fn ragged_blob_rejected() {
        assert!(matches!(unpack(&[0, 0, 0]), Err(Error::MalformedBlob { len: 3 })));
    }

    #[test]
    fn blob_file_roundtrip() {
        let dir = std::env::temp_dir().join(format!("pulseframe_blob_{}", std::process::id()));
        let path = dir.join("nested").join("bins.f32");
        write_blob(&path, &[0.25, 0.5]).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 8);
        assert_eq!(read_blob(&path).unwrap(), vec![0.25, 0.5]);
        std::fs::remove_dir_all(&dir).ok();
    }
}
