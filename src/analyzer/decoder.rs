//! Chunk decoding: raw sample bytes → normalized real samples
//!
//! Each call fills exactly one `SampleWindow`. Integer PCM is scaled into
//! [-1.0, 1.0) by the encoding's full-scale magnitude; IEEE float is taken
//! as-is, except that NaN and ±inf become 0.0 so they never reach the FFT.
//!
//! The window is reused for every chunk, so positions past the end of the
//! stream are explicitly zeroed rather than left over from the previous
//! chunk.

use super::spectral::SampleWindow;
use super::try_alloc;
use crate::config::MAX_SAMPLE_WIDTH;
use crate::error::{Error, Result};
use crate::wav::{AudioStreamHeader, SampleFormat};
use std::io::{self, Read};
use tracing::warn;

/// Convert one little-endian sample to a real value.
///
/// `bytes` must hold exactly `format.width()` bytes.
pub fn decode_sample(format: SampleFormat, bytes: &[u8]) -> f64 {
    match format {
        SampleFormat::U8 => (bytes[0] as f64 - 128.0) / 128.0,
        SampleFormat::I16 => i16::from_le_bytes([bytes[0], bytes[1]]) as f64 / 32768.0,
        SampleFormat::I24 => {
            // Shift into the top three bytes so the sign extends on >>
            let v = i32::from_le_bytes([0, bytes[0], bytes[1], bytes[2]]) >> 8;
            v as f64 / 8_388_608.0
        }
        SampleFormat::I32 => {
            i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64 / 2_147_483_648.0
        }
        SampleFormat::F32 => {
            let v = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            if v.is_finite() {
                v as f64
            } else {
                0.0
            }
        }
        SampleFormat::F64 => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&bytes[..8]);
            let v = f64::from_le_bytes(raw);
            if v.is_finite() {
                v
            } else {
                0.0
            }
        }
    }
}

/// Reads successive chunks of samples into a caller-owned window.
///
/// Holds one byte buffer sized for the widest encoding, allocated once.
pub struct SampleDecoder {
    raw: Vec<u8>,
}

impl SampleDecoder {
    pub fn new(fft_size: usize) -> Result<Self> {
        let len = fft_size
            .checked_mul(MAX_SAMPLE_WIDTH)
            .ok_or_else(|| Error::Allocation(format!("{} samples overflows byte buffer", fft_size)))?;
        Ok(Self {
            raw: try_alloc(len, "sample byte buffer")?,
        })
    }

    /// Decode the next chunk into `window`.
    ///
    /// `available` is the number of sample-data bytes left in the stream;
    /// nothing beyond it is read. Returns the number of samples actually
    /// read. The reader advances by exactly the bytes consumed.
    pub fn decode_chunk<R: Read>(
        &mut self,
        reader: &mut R,
        header: &AudioStreamHeader,
        available: u64,
        window: &mut SampleWindow,
    ) -> Result<usize> {
        let format = match header.sample_format() {
            Ok(f) => f,
            Err(e) => {
                warn!("Unsupported audio format: {}", e);
                return Err(e);
            }
        };

        let width = format.width();
        let capacity = window.len();
        let wanted = ((available / width as u64).min(capacity as u64)) as usize;
        let buf = &mut self.raw[..wanted * width];

        let filled = read_fully(reader, buf)?;
        let samples = filled / width;

        let (real, imag) = window.parts_mut();
        for (i, bytes) in buf[..samples * width].chunks_exact(width).enumerate() {
            real[i] = decode_sample(format, bytes);
            imag[i] = 0.0;
        }
        real[samples..].fill(0.0);
        imag[samples..].fill(0.0);

        if samples < wanted {
            warn!(
                "short read: expected {} samples, got {} (zero-padded)",
                wanted, samples
            );
        }

        Ok(samples)
    }
}

/// Read until `buf` is full or the source is exhausted
fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wav::Encoding;
    use std::io::Cursor;

    fn header(encoding: Encoding, bits: u16) -> AudioStreamHeader {
        AudioStreamHeader {
            encoding,
            channels: 1,
            sample_rate: 8000,
            byte_rate: 16000,
            block_align: 2,
            bits_per_sample: bits,
            data_offset: 0,
            data_len: 0,
        }
    }

    fn pcm16_bytes(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    fn f32_bytes(samples: &[f32]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    // ==========================================================================
    // PER-SAMPLE CONVERSION
    // ==========================================================================
    //
    // 16-bit PCM spans -32768..=32767, so dividing by 32768 maps it onto
    // [-1.0, 1.0): the negative extreme reaches -1.0 exactly, the positive
    // extreme stops one step short of 1.0.
    // ==========================================================================

    #[test]
    fn test_pcm16_scaling() {
        let cases: [(i16, f64); 5] = [
            (0, 0.0),
            (16384, 0.5),
            (-16384, -0.5),
            (i16::MIN, -1.0),
            (i16::MAX, 32767.0 / 32768.0),
        ];
        for (raw, expected) in cases {
            let v = decode_sample(SampleFormat::I16, &raw.to_le_bytes());
            assert_eq!(v, expected, "sample {}", raw);
            assert!((-1.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_pcm8_is_unsigned() {
        assert_eq!(decode_sample(SampleFormat::U8, &[128]), 0.0);
        assert_eq!(decode_sample(SampleFormat::U8, &[0]), -1.0);
        assert_eq!(decode_sample(SampleFormat::U8, &[192]), 0.5);
    }

    #[test]
    fn test_pcm24_sign_extension() {
        // -1 in 24-bit two's complement
        let v = decode_sample(SampleFormat::I24, &[0xFF, 0xFF, 0xFF]);
        assert_eq!(v, -1.0 / 8_388_608.0);
        // Most negative 24-bit value
        assert_eq!(decode_sample(SampleFormat::I24, &[0x00, 0x00, 0x80]), -1.0);
        assert_eq!(decode_sample(SampleFormat::I24, &[0x00, 0x00, 0x40]), 0.5);
    }

    #[test]
    fn test_pcm32_scaling() {
        let v = decode_sample(SampleFormat::I32, &i32::MIN.to_le_bytes());
        assert_eq!(v, -1.0);
    }

    #[test]
    fn test_non_finite_floats_become_zero() {
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            assert_eq!(decode_sample(SampleFormat::F32, &bad.to_le_bytes()), 0.0);
        }
        for bad in [f64::NAN, f64::INFINITY] {
            assert_eq!(decode_sample(SampleFormat::F64, &bad.to_le_bytes()), 0.0);
        }
        assert_eq!(decode_sample(SampleFormat::F32, &0.25f32.to_le_bytes()), 0.25);
    }

    // ==========================================================================
    // WHOLE-CHUNK DECODING
    // ==========================================================================

    #[test]
    fn test_full_chunk() {
        let mut decoder = SampleDecoder::new(4).unwrap();
        let mut window = SampleWindow::new(4).unwrap();
        let bytes = pcm16_bytes(&[16384, -16384, 0, 8192, 1234]);
        let mut cursor = Cursor::new(bytes.clone());

        let n = decoder
            .decode_chunk(&mut cursor, &header(Encoding::PcmInteger, 16), 10, &mut window)
            .unwrap();

        assert_eq!(n, 4);
        assert_eq!(window.real(), &[0.5, -0.5, 0.0, 0.25]);
        assert!(window.imag().iter().all(|&v| v == 0.0));
        // Exactly four 2-byte samples consumed
        assert_eq!(cursor.position(), 8);
    }

    #[test]
    fn test_short_chunk_zero_pads_stale_buffer() {
        let mut decoder = SampleDecoder::new(8).unwrap();
        let mut window = SampleWindow::new(8).unwrap();
        let (real, imag) = window.parts_mut();
        real.fill(9.0);
        imag.fill(9.0);

        let bytes = pcm16_bytes(&[16384, 16384, 16384]);
        let mut cursor = Cursor::new(bytes);
        let n = decoder
            .decode_chunk(&mut cursor, &header(Encoding::PcmInteger, 16), 6, &mut window)
            .unwrap();

        assert_eq!(n, 3);
        assert_eq!(&window.real()[..3], &[0.5, 0.5, 0.5]);
        assert!(window.real()[3..].iter().all(|&v| v == 0.0));
        assert!(window.imag().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_available_limits_read() {
        // Trailing bytes after the data section must not be decoded
        let mut decoder = SampleDecoder::new(4).unwrap();
        let mut window = SampleWindow::new(4).unwrap();
        let mut cursor = Cursor::new(pcm16_bytes(&[100, 200, 300, 400]));

        let n = decoder
            .decode_chunk(&mut cursor, &header(Encoding::PcmInteger, 16), 4, &mut window)
            .unwrap();

        assert_eq!(n, 2);
        assert_eq!(cursor.position(), 4);
        assert_eq!(window.real()[2], 0.0);
    }

    #[test]
    fn test_float_chunk_sanitized() {
        let mut decoder = SampleDecoder::new(4).unwrap();
        let mut window = SampleWindow::new(4).unwrap();
        let mut cursor = Cursor::new(f32_bytes(&[0.5, f32::NAN, -0.25, f32::INFINITY]));

        decoder
            .decode_chunk(&mut cursor, &header(Encoding::IeeeFloat, 32), 16, &mut window)
            .unwrap();

        assert_eq!(window.real(), &[0.5, 0.0, -0.25, 0.0]);
    }

    #[test]
    fn test_truncated_stream_pads() {
        // Declared bytes exceed what the reader actually holds
        let mut decoder = SampleDecoder::new(4).unwrap();
        let mut window = SampleWindow::new(4).unwrap();
        let mut cursor = Cursor::new(f32_bytes(&[0.5]));

        let n = decoder
            .decode_chunk(&mut cursor, &header(Encoding::IeeeFloat, 32), 16, &mut window)
            .unwrap();

        assert_eq!(n, 1);
        assert_eq!(window.real(), &[0.5, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_unsupported_encoding_aborts_without_reading() {
        let mut decoder = SampleDecoder::new(4).unwrap();
        let mut window = SampleWindow::new(4).unwrap();
        let mut cursor = Cursor::new(vec![1u8; 16]);

        let err = decoder
            .decode_chunk(&mut cursor, &header(Encoding::Unsupported(2), 4), 16, &mut window)
            .unwrap_err();

        assert!(matches!(err, Error::UnsupportedEncoding { format_code: 2, .. }));
        assert_eq!(cursor.position(), 0);
    }
}
