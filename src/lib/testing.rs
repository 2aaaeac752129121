//! Fixtures shared by the unit tests.

use std::fs;
use std::io;
use std::path::Path;

const STREAM_SERIAL: u32 = 0x6d68_7276;
const PRE_SKIP: u16 = 312;
const FRAME_SAMPLES: u64 = 960;

/// CRC-32 used by Ogg pages (polynomial 0x04C11DB7, no reflection, zero init)
fn ogg_crc(data: &[u8]) -> u32 {
    let mut crc = 0u32;
    for &byte in data {
        crc ^= u32::from(byte) << 24;
        for _ in 0..8 {
            crc = if crc & 0x8000_0000 != 0 {
                (crc << 1) ^ 0x04C1_1DB7
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// One Ogg page carrying a single complete packet
fn ogg_page(header_type: u8, granule: u64, sequence: u32, packet: &[u8]) -> Vec<u8> {
    let mut lacing = vec![255u8; packet.len() / 255];
    lacing.push((packet.len() % 255) as u8);

    let mut page = Vec::with_capacity(27 + lacing.len() + packet.len());
    page.extend_from_slice(b"OggS");
    page.push(0);
    page.push(header_type);
    page.extend_from_slice(&granule.to_le_bytes());
    page.extend_from_slice(&STREAM_SERIAL.to_le_bytes());
    page.extend_from_slice(&sequence.to_le_bytes());
    page.extend_from_slice(&[0; 4]);
    page.push(lacing.len() as u8);
    page.extend_from_slice(&lacing);
    page.extend_from_slice(packet);

    let crc = ogg_crc(&page);
    page[22..26].copy_from_slice(&crc.to_le_bytes());
    page
}

/// Bytes of a tiny stereo Ogg Opus stream: identification header, empty
/// comment header and one 20 ms audio packet.
pub fn minimal_opus() -> Vec<u8> {
    let mut head = Vec::new();
    head.extend_from_slice(b"OpusHead");
    head.push(1);
    head.push(2);
    head.extend_from_slice(&PRE_SKIP.to_le_bytes());
    head.extend_from_slice(&48_000u32.to_le_bytes());
    head.extend_from_slice(&0i16.to_le_bytes());
    head.push(0);

    let vendor = b"mharvest tests";
    let mut tags = Vec::new();
    tags.extend_from_slice(b"OpusTags");
    tags.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
    tags.extend_from_slice(vendor);
    tags.extend_from_slice(&0u32.to_le_bytes());

    let audio = [0xFC, 0xFF, 0xFE];

    let mut stream = ogg_page(0x02, 0, 0, &head);
    stream.extend(ogg_page(0x00, 0, 1, &tags));
    stream.extend(ogg_page(
        0x04,
        u64::from(PRE_SKIP) + FRAME_SAMPLES,
        2,
        &audio,
    ));
    stream
}

pub fn write_minimal_opus(path: &Path) -> io::Result<()> {
    fs::write(path, minimal_opus())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ogg_crc_known_value() {
        // Reference value for the ASCII digits 1..9 with this CRC variant
        assert_eq!(ogg_crc(b"123456789"), 0x89A1_897F);
    }

    #[test]
    fn test_ogg_page_lacing() {
        let page = ogg_page(0, 0, 0, &[7u8; 300]);
        assert_eq!(page[26], 2);
        assert_eq!(&page[27..29], &[255, 45]);
        assert_eq!(page.len(), 27 + 2 + 300);
    }
}
