//! RIFF/WAVE header parsing
//!
//! A canonical WAV file is a RIFF container: a 12-byte preamble followed by
//! a sequence of tagged chunks. We only need two of them:
//!
//! ```text
//! Offset  Size  Field
//! 0       4     "RIFF"
//! 4       4     RIFF size (file length - 8)
//! 8       4     "WAVE"
//! 12      4     "fmt "
//! 16      4     fmt chunk size (16, 18 or 40)
//! 20      2     format code (1 = PCM, 3 = IEEE float, 0xFFFE = extensible)
//! 22      2     channel count
//! 24      4     sample rate
//! 28      4     byte rate
//! 32      2     block align
//! 34      2     bits per sample
//! ...           optional chunks (LIST, fact, ...)
//! n       4     "data"
//! n+4     4     data size
//! n+8     ...   interleaved samples, little-endian
//! ```
//!
//! A 40-byte extensible `fmt ` chunk (format code 0xFFFE) carries the real
//! format code in the first two bytes of its sub-format GUID, at fmt
//! offset 24 (absolute offset 44).
//!
//! Everything between `fmt ` and `data` is skipped by its declared size.
//! The scan never reads past the stream length; a chunk claiming more
//! bytes than remain rejects the whole file.

use crate::config::MIN_HEADER_SIZE;
use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::io::{Read, Seek, SeekFrom};
use tracing::{debug, warn};

/// Upper bound on chunks visited while looking for `data`
const MAX_CHUNK_SCAN: usize = 64;

const FORMAT_PCM: u16 = 1;
const FORMAT_IEEE_FLOAT: u16 = 3;
const FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// Size of a `fmt ` chunk that carries the extensible fields
const EXTENSIBLE_FMT_SIZE: u64 = 40;
/// Absolute offset of the sub-format GUID in an extensible header
const SUBFORMAT_OFFSET: u64 = 20 + 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Encoding {
    PcmInteger,
    IeeeFloat,
    Unsupported(u16),
}

impl Encoding {
    pub fn from_format_code(code: u16) -> Self {
        match code {
            FORMAT_PCM => Encoding::PcmInteger,
            FORMAT_IEEE_FLOAT => Encoding::IeeeFloat,
            other => Encoding::Unsupported(other),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::PcmInteger => write!(f, "PCM (Pulse Code Modulation)"),
            Encoding::IeeeFloat => write!(f, "IEEE Float"),
            Encoding::Unsupported(code) => write!(f, "Other (Format Code: {})", code),
        }
    }
}

/// Concrete on-disk sample layout, resolved from encoding + bit depth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// 8-bit PCM is unsigned, centred on 128
    U8,
    I16,
    I24,
    I32,
    F32,
    F64,
}

impl SampleFormat {
    /// Bytes per sample
    pub fn width(self) -> usize {
        match self {
            SampleFormat::U8 => 1,
            SampleFormat::I16 => 2,
            SampleFormat::I24 => 3,
            SampleFormat::I32 | SampleFormat::F32 => 4,
            SampleFormat::F64 => 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioStreamHeader {
    pub encoding: Encoding,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    /// Absolute offset of the first sample byte
    pub data_offset: u64,
    /// Declared length of the sample data in bytes
    pub data_len: u64,
}

impl AudioStreamHeader {
    /// Resolve the sample layout, or fail for encodings we can't decode
    pub fn sample_format(&self) -> Result<SampleFormat> {
        let format = match (self.encoding, self.bits_per_sample) {
            (Encoding::PcmInteger, 8) => SampleFormat::U8,
            (Encoding::PcmInteger, 16) => SampleFormat::I16,
            (Encoding::PcmInteger, 24) => SampleFormat::I24,
            (Encoding::PcmInteger, 32) => SampleFormat::I32,
            (Encoding::IeeeFloat, 32) => SampleFormat::F32,
            (Encoding::IeeeFloat, 64) => SampleFormat::F64,
            (encoding, bits) => {
                let format_code = match encoding {
                    Encoding::PcmInteger => FORMAT_PCM,
                    Encoding::IeeeFloat => FORMAT_IEEE_FLOAT,
                    Encoding::Unsupported(code) => code,
                };
                return Err(Error::UnsupportedEncoding {
                    format_code,
                    bits_per_sample: bits,
                });
            }
        };
        Ok(format)
    }

    /// End of the sample data (exclusive)
    pub fn data_end(&self) -> u64 {
        self.data_offset + self.data_len
    }
}

fn read_array<R: Read, const N: usize>(reader: &mut R) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

fn read_u16<R: Read>(reader: &mut R) -> Result<u16> {
    Ok(u16::from_le_bytes(read_array(reader)?))
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    Ok(u32::from_le_bytes(read_array(reader)?))
}

/// Parse the header of a WAV stream `len` bytes long.
///
/// On success the reader is left positioned at the first sample byte.
pub fn read_header<R: Read + Seek>(reader: &mut R, len: u64) -> Result<AudioStreamHeader> {
    if len < MIN_HEADER_SIZE {
        return Err(Error::HeaderTooSmall {
            len,
            min: MIN_HEADER_SIZE,
        });
    }

    reader.seek(SeekFrom::Start(0))?;
    let riff: [u8; 4] = read_array(reader)?;
    let _riff_size = read_u32(reader)?;
    let wave: [u8; 4] = read_array(reader)?;
    if &riff != b"RIFF" || &wave != b"WAVE" {
        warn!("missing RIFF/WAVE magic, parsing anyway");
    }

    let fmt_id: [u8; 4] = read_array(reader)?;
    if &fmt_id != b"fmt " {
        warn!(
            "expected 'fmt ' chunk at offset 12, found {:?}",
            String::from_utf8_lossy(&fmt_id)
        );
    }
    let fmt_size = read_u32(reader)? as u64;
    let format_code = read_u16(reader)?;
    let channels = read_u16(reader)?;
    let sample_rate = read_u32(reader)?;
    let byte_rate = read_u32(reader)?;
    let block_align = read_u16(reader)?;
    let bits_per_sample = read_u16(reader)?;

    let format_code = if format_code == FORMAT_EXTENSIBLE
        && fmt_size >= EXTENSIBLE_FMT_SIZE
        && 20 + fmt_size <= len
    {
        reader.seek(SeekFrom::Start(SUBFORMAT_OFFSET))?;
        let sub_format = read_u16(reader)?;
        debug!("extensible fmt chunk, sub-format {}", sub_format);
        sub_format
    } else {
        format_code
    };

    // Other extended fmt fields are not used
    let fmt_size = fmt_size.max(16);
    let mut pos = 20 + fmt_size + (fmt_size & 1);

    for _ in 0..MAX_CHUNK_SCAN {
        if pos + 8 > len {
            return Err(Error::MissingDataChunk);
        }
        reader.seek(SeekFrom::Start(pos))?;
        let id: [u8; 4] = read_array(reader)?;
        let size = read_u32(reader)? as u64;
        let body = pos + 8;

        if &id == b"data" {
            if body + size > len {
                return Err(Error::DataOutOfBounds {
                    offset: body,
                    size,
                    len,
                });
            }
            return Ok(AudioStreamHeader {
                encoding: Encoding::from_format_code(format_code),
                channels,
                sample_rate,
                byte_rate,
                block_align,
                bits_per_sample,
                data_offset: body,
                data_len: size,
            });
        }

        if body + size >= len {
            return Err(Error::ChunkOutOfBounds {
                id: String::from_utf8_lossy(&id).into_owned(),
                offset: pos,
                size,
                len,
            });
        }

        debug!(
            "skipping '{}' chunk ({} bytes)",
            String::from_utf8_lossy(&id),
            size
        );
        // RIFF chunks are word aligned
        pos = body + size + (size & 1);
    }

    Err(Error::MissingDataChunk)
}

/// Build an in-memory WAV file. Shared by tests across the crate.
#[cfg(test)]
pub(crate) fn build_wav(format_code: u16, channels: u16, bits: u16, data: &[u8]) -> Vec<u8> {
    build_wav_with_chunks(format_code, channels, bits, &[], data)
}

#[cfg(test)]
pub(crate) fn build_wav_with_chunks(
    format_code: u16,
    channels: u16,
    bits: u16,
    extra: &[(&[u8; 4], &[u8])],
    data: &[u8],
) -> Vec<u8> {
    let sample_rate: u32 = 8000;
    let block_align = channels * (bits / 8).max(1);
    let byte_rate = sample_rate * block_align as u32;

    let mut chunks = Vec::new();
    for (id, body) in extra {
        chunks.extend_from_slice(*id);
        chunks.extend_from_slice(&(body.len() as u32).to_le_bytes());
        chunks.extend_from_slice(body);
        if body.len() % 2 == 1 {
            chunks.push(0);
        }
    }

    let mut out = Vec::new();
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&((36 + chunks.len() + data.len()) as u32).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&format_code.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&bits.to_le_bytes());
    out.extend_from_slice(&chunks);
    out.extend_from_slice(b"data");
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(data);
    out
}

/// Same as `build_wav`, but with a 40-byte extensible `fmt ` chunk whose
/// sub-format GUID names `sub_format`.
#[cfg(test)]
pub(crate) fn build_extensible_wav(sub_format: u16, bits: u16, data: &[u8]) -> Vec<u8> {
    let mut wav = build_wav(FORMAT_EXTENSIBLE, 1, bits, data);
    wav[16..20].copy_from_slice(&40u32.to_le_bytes());

    let mut ext = Vec::with_capacity(24);
    ext.extend_from_slice(&22u16.to_le_bytes()); // cbSize
    ext.extend_from_slice(&bits.to_le_bytes()); // valid bits
    ext.extend_from_slice(&4u32.to_le_bytes()); // channel mask (front centre)
    ext.extend_from_slice(&sub_format.to_le_bytes());
    ext.extend_from_slice(&[
        0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xAA, 0x00, 0x38, 0x9B, 0x71,
    ]);
    wav.splice(36..36, ext);

    let riff_size = (wav.len() - 8) as u32;
    wav[4..8].copy_from_slice(&riff_size.to_le_bytes());
    wav
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(bytes: &[u8]) -> Result<AudioStreamHeader> {
        let mut cursor = Cursor::new(bytes);
        read_header(&mut cursor, bytes.len() as u64)
    }

    // ==========================================================================
    // CANONICAL HEADERS
    // ==========================================================================

    #[test]
    fn test_parse_pcm16_header() {
        let data = vec![0u8; 1000];
        let wav = build_wav(1, 1, 16, &data);
        let header = parse(&wav).unwrap();

        assert_eq!(header.encoding, Encoding::PcmInteger);
        assert_eq!(header.channels, 1);
        assert_eq!(header.sample_rate, 8000);
        assert_eq!(header.bits_per_sample, 16);
        assert_eq!(header.data_offset, 44);
        assert_eq!(header.data_len, 1000);
        assert_eq!(header.sample_format().unwrap(), SampleFormat::I16);
    }

    #[test]
    fn test_parse_float_header() {
        let wav = build_wav(3, 2, 32, &[0u8; 64]);
        let header = parse(&wav).unwrap();

        assert_eq!(header.encoding, Encoding::IeeeFloat);
        assert_eq!(header.channels, 2);
        assert_eq!(header.sample_format().unwrap(), SampleFormat::F32);
    }

    #[test]
    fn test_reader_left_at_sample_data() {
        let wav = build_wav(1, 1, 16, &[0xAB, 0xCD]);
        let mut cursor = Cursor::new(&wav[..]);
        read_header(&mut cursor, wav.len() as u64).unwrap();

        assert_eq!(cursor.position(), 44);
    }

    #[test]
    fn test_skips_list_chunk_before_data() {
        let list_body = b"INFOISFT\x05\x00\x00\x00test\x00";
        let wav = build_wav_with_chunks(1, 1, 16, &[(b"LIST", &list_body[..])], &[0u8; 32]);
        let header = parse(&wav).unwrap();

        // 44 + 8-byte LIST header + 17-byte body + 1 pad byte
        assert_eq!(header.data_offset, 44 + 8 + 18);
        assert_eq!(header.data_len, 32);
    }

    #[test]
    fn test_extended_fmt_chunk() {
        // fmt size 18 (cbSize field present), typical of float exports
        let mut wav = build_wav(3, 1, 32, &[0u8; 16]);
        wav[16..20].copy_from_slice(&18u32.to_le_bytes());
        wav.splice(36..36, [0u8, 0u8]);
        let header = parse(&wav).unwrap();

        assert_eq!(header.data_offset, 46);
        assert_eq!(header.data_len, 16);
    }

    #[test]
    fn test_extensible_pcm_resolves_sub_format() {
        let wav = build_extensible_wav(1, 16, &[0u8; 32]);
        let header = parse(&wav).unwrap();

        assert_eq!(header.encoding, Encoding::PcmInteger);
        assert_eq!(header.sample_format().unwrap(), SampleFormat::I16);
        // 44-byte canonical layout + 24 extensible bytes
        assert_eq!(header.data_offset, 68);
        assert_eq!(header.data_len, 32);
    }

    #[test]
    fn test_extensible_float_resolves_sub_format() {
        let wav = build_extensible_wav(3, 32, &[0u8; 16]);
        let header = parse(&wav).unwrap();

        assert_eq!(header.encoding, Encoding::IeeeFloat);
        assert_eq!(header.sample_format().unwrap(), SampleFormat::F32);
    }

    #[test]
    fn test_extensible_unknown_sub_format() {
        let wav = build_extensible_wav(0x55, 16, &[0u8; 8]);
        let header = parse(&wav).unwrap();
        assert_eq!(header.encoding, Encoding::Unsupported(0x55));
    }

    // ==========================================================================
    // REJECTED HEADERS
    // ==========================================================================
    //
    // Every rejection here is fatal to the file only; the batch moves on.
    // ==========================================================================

    #[test]
    fn test_too_small() {
        let err = parse(&[0u8; 43]).unwrap_err();
        assert!(matches!(err, Error::HeaderTooSmall { len: 43, min: 44 }));
    }

    #[test]
    fn test_missing_data_chunk() {
        // Valid fmt, then a chunk that ends exactly at EOF and no data
        let mut wav = build_wav(1, 1, 16, &[]);
        wav.truncate(36);
        wav.extend_from_slice(b"junk");
        wav.extend_from_slice(&0u32.to_le_bytes());
        wav.extend_from_slice(b"pad!");
        // junk chunk of size 0 ends before EOF, then "pad!" is too short to be a chunk header
        let err = parse(&wav).unwrap_err();
        assert!(matches!(err, Error::MissingDataChunk));
    }

    #[test]
    fn test_oversized_skip_chunk_rejected() {
        let mut wav = build_wav_with_chunks(1, 1, 16, &[(b"LIST", &[0u8; 4][..])], &[0u8; 8]);
        // Inflate the LIST size past the end of the file
        wav[40..44].copy_from_slice(&10_000u32.to_le_bytes());
        let err = parse(&wav).unwrap_err();
        assert!(matches!(err, Error::ChunkOutOfBounds { .. }));
    }

    #[test]
    fn test_data_size_past_end_rejected() {
        let mut wav = build_wav(1, 1, 16, &[0u8; 100]);
        wav[40..44].copy_from_slice(&5000u32.to_le_bytes());
        let err = parse(&wav).unwrap_err();
        assert!(matches!(
            err,
            Error::DataOutOfBounds {
                offset: 44,
                size: 5000,
                ..
            }
        ));
    }

    #[test]
    fn test_bad_magic_still_parses() {
        let mut wav = build_wav(1, 1, 16, &[0u8; 8]);
        wav[0..4].copy_from_slice(b"RIFX");
        assert!(parse(&wav).is_ok());
    }

    // ==========================================================================
    // ENCODINGS
    // ==========================================================================

    #[test]
    fn test_unrecognized_format_code() {
        let wav = build_wav(0x55, 1, 16, &[0u8; 8]);
        let header = parse(&wav).unwrap();

        assert_eq!(header.encoding, Encoding::Unsupported(0x55));
        assert!(matches!(
            header.sample_format(),
            Err(Error::UnsupportedEncoding {
                format_code: 0x55,
                ..
            })
        ));
    }

    #[test]
    fn test_sample_format_widths() {
        let mut header = parse(&build_wav(1, 1, 8, &[0u8; 4])).unwrap();
        assert_eq!(header.sample_format().unwrap(), SampleFormat::U8);
        header.bits_per_sample = 24;
        assert_eq!(header.sample_format().unwrap().width(), 3);
        header.bits_per_sample = 12;
        assert!(header.sample_format().is_err());

        header.encoding = Encoding::IeeeFloat;
        header.bits_per_sample = 64;
        assert_eq!(header.sample_format().unwrap().width(), 8);
        header.bits_per_sample = 16;
        assert!(header.sample_format().is_err());
    }

    #[test]
    fn test_encoding_display() {
        assert_eq!(Encoding::IeeeFloat.to_string(), "IEEE Float");
        assert_eq!(
            Encoding::Unsupported(2).to_string(),
            "Other (Format Code: 2)"
        );
    }
}
