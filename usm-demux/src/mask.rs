//! Payload masking used by `@SFV` and `@SFA` sectors.
//!
//! Both streams are XORed with 32-byte masks derived from a 64-bit key.
//! Audio uses a plain repeating mask. Video uses two passes whose mask for
//! each slot evolves with the decoded bytes, so processing order matters.

/// Bytes of codec-private header at the start of a video payload that are never masked.
pub const VIDEO_HEADER_SIZE: usize = 0x40;
/// Video payloads shorter than this (after the header) are stored in clear.
pub const VIDEO_MIN_MASKED_SIZE: usize = 0x200;
/// Bytes at the start of an audio payload that are never masked.
pub const AUDIO_HEADER_SIZE: usize = 0x140;

const MASK_SIZE: usize = 0x20;
const SLOT: usize = MASK_SIZE - 1;
const SECOND_PASS_SIZE: usize = 0x100;
const AUDIO_ODD_BYTES: &[u8; 4] = b"URUC";

/// Expand two 32-bit keys into the 32-byte table that all masks derive from.
pub fn key_schedule(key1: u32, key2: u32) -> [u8; MASK_SIZE] {
    let [k1_0, k1_1, k1_2, k1_3] = key1.to_le_bytes();
    let [k2_0, k2_1, k2_2, _] = key2.to_le_bytes();
    let mut t = [0u8; MASK_SIZE];

    t[0x00] = k1_0;
    t[0x01] = k1_1;
    t[0x02] = k1_2;
    t[0x03] = k1_3.wrapping_sub(0x34);
    t[0x04] = k2_0.wrapping_add(0xF9);
    t[0x05] = k2_1 ^ 0x13;
    t[0x06] = k2_2.wrapping_add(0x61);
    t[0x07] = t[0x00] ^ 0xFF;
    t[0x08] = t[0x02].wrapping_add(t[0x01]);
    t[0x09] = t[0x01].wrapping_sub(t[0x07]);
    t[0x0A] = t[0x02] ^ 0xFF;
    t[0x0B] = t[0x01] ^ 0xFF;
    t[0x0C] = t[0x0B].wrapping_add(t[0x09]);
    t[0x0D] = t[0x08].wrapping_sub(t[0x03]);
    t[0x0E] = t[0x0D] ^ 0xFF;
    t[0x0F] = t[0x0A].wrapping_sub(t[0x0B]);
    t[0x10] = t[0x08].wrapping_sub(t[0x0F]);
    t[0x11] = t[0x10] ^ t[0x07];
    t[0x12] = t[0x0F] ^ 0xFF;
    t[0x13] = t[0x03] ^ 0x10;
    t[0x14] = t[0x04].wrapping_sub(0x32);
    t[0x15] = t[0x05].wrapping_add(0xED);
    t[0x16] = t[0x06] ^ 0xF3;
    t[0x17] = t[0x13].wrapping_sub(t[0x0F]);
    t[0x18] = t[0x15].wrapping_add(t[0x07]);
    t[0x19] = 0x21u8.wrapping_sub(t[0x13]);
    t[0x1A] = t[0x14] ^ t[0x17];
    t[0x1B] = t[0x16].wrapping_add(t[0x16]);
    t[0x1C] = t[0x17].wrapping_add(0x44);
    t[0x1D] = t[0x03].wrapping_add(t[0x04]);
    t[0x1E] = t[0x05].wrapping_sub(t[0x16]);
    t[0x1F] = t[0x1D] ^ t[0x13];
    t
}

/// Immutable masks for one key. Safe to share between concurrent demux operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaskEngine {
    video_mask_a: [u8; MASK_SIZE],
    video_mask_b: [u8; MASK_SIZE],
    audio_mask: [u8; MASK_SIZE],
}

impl MaskEngine {
    pub fn new(key1: u32, key2: u32) -> Self {
        let table = key_schedule(key1, key2);
        let mut video_mask_b = [0; MASK_SIZE];
        let mut audio_mask = [0; MASK_SIZE];

        for i in 0..MASK_SIZE {
            video_mask_b[i] = table[i] ^ 0xFF;
            audio_mask[i] = if i & 1 == 1 {
                AUDIO_ODD_BYTES[(i >> 1) & 3]
            } else {
                table[i] ^ 0xFF
            };
        }

        Self {
            video_mask_a: table,
            video_mask_b,
            audio_mask,
        }
    }

    /// Split a 64-bit key: the low half is key one, the high half key two.
    pub fn from_key(key: u64) -> Self {
        Self::new(key as u32, (key >> 32) as u32)
    }

    pub fn video_mask_a(&self) -> &[u8; MASK_SIZE] {
        &self.video_mask_a
    }

    pub fn video_mask_b(&self) -> &[u8; MASK_SIZE] {
        &self.video_mask_b
    }

    pub fn audio_mask(&self) -> &[u8; MASK_SIZE] {
        &self.audio_mask
    }

    /// Remove the video mask from one `@SFV` data payload in place.
    pub fn unmask_video(&self, payload: &mut [u8]) {
        let Some(data) = video_body(payload) else {
            return;
        };

        let mut mask = self.video_mask_b;

        for i in SECOND_PASS_SIZE..data.len() {
            data[i] ^= mask[i & SLOT];
            mask[i & SLOT] = data[i] ^ self.video_mask_b[i & SLOT];
        }

        mask = self.video_mask_a;

        for i in 0..SECOND_PASS_SIZE {
            mask[i & SLOT] ^= data[SECOND_PASS_SIZE + i];
            data[i] ^= mask[i & SLOT];
        }
    }

    /// Apply the video mask to a plain payload in place; inverse of [`MaskEngine::unmask_video`].
    pub fn mask_video(&self, payload: &mut [u8]) {
        let Some(data) = video_body(payload) else {
            return;
        };

        // the head is keyed by plain bytes of the tail, so mask it first
        let mut mask = self.video_mask_a;

        for i in 0..SECOND_PASS_SIZE {
            mask[i & SLOT] ^= data[SECOND_PASS_SIZE + i];
            data[i] ^= mask[i & SLOT];
        }

        mask = self.video_mask_b;

        for i in SECOND_PASS_SIZE..data.len() {
            let plain = data[i];
            data[i] ^= mask[i & SLOT];
            mask[i & SLOT] = plain ^ self.video_mask_b[i & SLOT];
        }
    }

    /// Remove the audio mask from one `@SFA` data payload in place.
    ///
    /// The audio mask has no feedback, so this is its own inverse.
    pub fn unmask_audio(&self, payload: &mut [u8]) {
        let Some(data) = payload.get_mut(AUDIO_HEADER_SIZE..) else {
            return;
        };

        for (i, byte) in data.iter_mut().enumerate() {
            *byte ^= self.audio_mask[i & SLOT];
        }
    }

    /// Apply the audio mask to a plain payload in place.
    pub fn mask_audio(&self, payload: &mut [u8]) {
        self.unmask_audio(payload);
    }
}

fn video_body(payload: &mut [u8]) -> Option<&mut [u8]> {
    payload
        .get_mut(VIDEO_HEADER_SIZE..)
        .filter(|x| x.len() >= VIDEO_MIN_MASKED_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY1: u32 = 0x0BADF00D;
    const KEY2: u32 = 0xCAFEBABE;

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_key_schedule_vectors() {
        assert_eq!(
            key_schedule(KEY1, KEY2),
            [
                0x0D, 0xF0, 0xAD, 0xD7, 0xB7, 0xA9, 0x5F, 0xF2, 0x9D, 0xFE, 0x52, 0x0F, 0x0D,
                0xC6, 0x39, 0x43, 0x5A, 0xA8, 0xBC, 0xC7, 0x85, 0x96, 0xAC, 0x84, 0x88, 0x5A,
                0x01, 0x58, 0xC8, 0x8E, 0xFD, 0x49,
            ]
        );
        assert_eq!(
            key_schedule(0, 0),
            [
                0x00, 0x00, 0x00, 0xCC, 0xF9, 0x13, 0x61, 0xFF, 0x00, 0x01, 0xFF, 0xFF, 0x00,
                0x34, 0xCB, 0x00, 0x00, 0xFF, 0xFF, 0xDC, 0xC7, 0x00, 0x92, 0xDC, 0xFF, 0x45,
                0x1B, 0x24, 0x20, 0xC5, 0x81, 0x19,
            ]
        );
    }

    #[test]
    fn test_derived_masks() {
        let engine = MaskEngine::new(KEY1, KEY2);
        let table = key_schedule(KEY1, KEY2);

        assert_eq!(engine.video_mask_a(), &table);
        assert!(
            engine
                .video_mask_b()
                .iter()
                .zip(table)
                .all(|(b, t)| *b == t ^ 0xFF)
        );
        assert_eq!(
            engine.audio_mask(),
            &[
                0xF2, 0x55, 0x52, 0x52, 0x48, 0x55, 0xA0, 0x43, 0x62, 0x55, 0xAD, 0x52, 0xF2,
                0x55, 0xC6, 0x43, 0xA5, 0x55, 0x43, 0x52, 0x7A, 0x55, 0x53, 0x43, 0x77, 0x55,
                0xFE, 0x52, 0x37, 0x55, 0x02, 0x43,
            ]
        );
    }

    #[test]
    fn test_from_key_splits_halves() {
        let combined = ((KEY2 as u64) << 32) | KEY1 as u64;
        assert_eq!(MaskEngine::from_key(combined), MaskEngine::new(KEY1, KEY2));
        assert_eq!(MaskEngine::new(KEY1, KEY2), MaskEngine::new(KEY1, KEY2));
    }

    #[test]
    fn test_unmask_video_vector() {
        let engine = MaskEngine::new(KEY1, KEY2);
        let mut data = sample(0x40 + 0x240);
        engine.unmask_video(&mut data);

        assert_eq!(&data[..0x40], &sample(0x40)[..]);
        assert_eq!(&data[0x40..0x48], &[0xFA, 0xF8, 0xFA, 0xF4, 0xF2, 0xF0, 0xF2, 0xF4]);
        assert_eq!(&data[0x140..0x148], &[0xB7, 0x49, 0x15, 0x60, 0x01, 0x1C, 0xEB, 0x41]);
        assert_eq!(&data[data.len() - 4..], &[0xE7, 0xE5, 0xEB, 0xED]);
    }

    #[test]
    fn test_short_video_is_untouched() {
        let engine = MaskEngine::new(KEY1, KEY2);

        for len in [0, 0x20, 0x40, 0x40 + 0x1FF] {
            let mut data = sample(len);
            engine.unmask_video(&mut data);
            assert_eq!(data, sample(len));
        }
    }

    #[test]
    fn test_video_mask_round_trip() {
        let engine = MaskEngine::new(KEY1, KEY2);
        let plain = sample(0x40 + 0x200 + 77);

        let mut data = plain.clone();
        engine.mask_video(&mut data);
        assert_ne!(data, plain);
        assert_eq!(&data[..0x40], &plain[..0x40]);

        engine.unmask_video(&mut data);
        assert_eq!(data, plain);
    }

    #[test]
    fn test_audio_mask_is_involutive() {
        let engine = MaskEngine::new(KEY1, KEY2);
        let plain = sample(0x140 + 100);

        let mut data = plain.clone();
        engine.unmask_audio(&mut data);
        assert_eq!(&data[..0x140], &plain[..0x140]);
        assert_eq!(data[0x140], plain[0x140] ^ engine.audio_mask()[0]);
        assert_eq!(data[0x141], plain[0x141] ^ b'U');

        engine.unmask_audio(&mut data);
        assert_eq!(data, plain);
    }

    #[test]
    fn test_short_audio_is_untouched() {
        let engine = MaskEngine::new(KEY1, KEY2);

        for len in [0, 0x13F, 0x140] {
            let mut data = sample(len);
            engine.unmask_audio(&mut data);
            assert_eq!(data, sample(len));
        }
    }
}
