/// Descrambling of "SAVE !" protected program sectors
///
/// The operating system obfuscated protected program sectors with a two
/// pass chained subtraction. There is no checksum: the order of the passes,
/// the seed offsets and the strides all have to be exactly right or the
/// output is silently garbage.

use crate::image::sector::{Sector, SECTOR_SIZE};

/// Offset of the 16 bit seed for the pair pass
const PAIR_SEED_OFFSET: usize = SECTOR_SIZE - 0x22;

/// Stride of the pair pass
const PAIR_STRIDE: usize = 26;

/// First offset visited by the byte pass
const BYTE_START_OFFSET: usize = 0x22;

/// Stride of the byte pass
const BYTE_STRIDE: usize = 34;

/// Does this sector carry the scrambled signature?
///
/// A protected (0x1x or 0x3x) non-header record whose second byte has the
/// MSB clear. Only such sectors may be passed to [`unscramble`].
#[inline]
pub fn is_scrambled(sector: &Sector) -> bool {
    (sector[0] & 0xD0) == 0x10 && (sector[1] & 0x80) == 0
}

/// Swap the two middle nibbles of a 16 bit value (0xABCD becomes 0xACBD)
#[inline]
fn swap_middle_nibbles(value: u16) -> u16 {
    (value & 0xF00F) | ((value & 0x0F00) >> 4) | ((value & 0x00F0) << 4)
}

#[inline]
fn read_pair(sector: &Sector, pos: usize) -> u16 {
    u16::from_be_bytes([sector[pos], sector[pos + 1]])
}

#[inline]
fn write_pair(sector: &mut Sector, pos: usize, value: u16) {
    sector[pos..pos + 2].copy_from_slice(&value.to_be_bytes());
}

/// Undo the scrambling of one sector
pub fn unscramble(input: &Sector) -> Sector {
    let mut sec = *input;
    let b0 = input[0];
    let b1 = input[1];

    // recover the control byte and the key byte stashed in the body
    let key_pos = 5 + (b1 & 0x60) as usize;
    let control = (b1 & 0xF0) | (b0 >> 4);
    sec[0] = control;
    sec[1] = sec[key_pos];
    sec[key_pos] = ((b1 & 0x0F) << 4) | (b0 & 0x0F);

    // pair pass; must run before the byte pass
    let mut prev = read_pair(&sec, PAIR_SEED_OFFSET);
    let mut pos = PAIR_SEED_OFFSET;
    loop {
        pos = (pos + PAIR_STRIDE) % SECTOR_SIZE;
        if pos == PAIR_SEED_OFFSET {
            break;
        }
        if pos == 0 {
            continue;
        }
        let cur = read_pair(&sec, pos);
        let nibs = swap_middle_nibbles(prev.rotate_left(1));
        write_pair(&mut sec, pos, cur.wrapping_sub(nibs).wrapping_sub(1));
        prev = cur;
    }

    // byte pass, seeded from the key
    let mut prev = sec[1];
    let mut pos = BYTE_START_OFFSET;
    while pos != 0 {
        let cur = sec[pos];
        let nibs = prev.rotate_left(1).rotate_left(4);
        sec[pos] = cur.wrapping_sub(nibs).wrapping_sub(1);
        prev = cur;
        pos = (pos + BYTE_STRIDE) % SECTOR_SIZE;
    }

    sec[0] = control & 0xF0;
    sec[1] = 0xFE | (control & 0x01);
    sec
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn scrambled_sector(b0: u8, b1: u8, fill: u8) -> Sector {
        let mut sec = [fill; SECTOR_SIZE];
        sec[0] = b0;
        sec[1] = b1;
        sec
    }

    #[test]
    fn test_detection() {
        assert!(is_scrambled(&scrambled_sector(0x10, 0x12, 0)));
        assert!(is_scrambled(&scrambled_sector(0x3A, 0x7F, 0)));
        assert!(!is_scrambled(&scrambled_sector(0x10, 0xFF, 0)));
        assert!(!is_scrambled(&scrambled_sector(0x00, 0x12, 0)));
        assert!(!is_scrambled(&scrambled_sector(0x50, 0x12, 0)));
        assert!(!is_scrambled(&scrambled_sector(0x90, 0x12, 0)));
    }

    #[test]
    fn test_swap_middle_nibbles() {
        assert_eq!(swap_middle_nibbles(0xABCD), 0xACBD);
        assert_eq!(swap_middle_nibbles(0x0000), 0x0000);
        assert_eq!(swap_middle_nibbles(0x0F00), 0x00F0);
    }

    #[test]
    fn test_recovers_header_control_nibble() {
        let sec = scrambled_sector(0x10, 0x50, 0x3C);
        assert!(is_scrambled(&sec));
        let out = unscramble(&sec);
        assert!(matches!(out[0] >> 4, 0x4 | 0x5));
        assert_eq!(out[1], 0xFF);
    }

    #[test]
    fn test_recovers_body_control_nibble() {
        let out = unscramble(&scrambled_sector(0x30, 0x14, 0x00));
        assert_eq!(out[0], 0x10);
        assert_eq!(out[1], 0xFF);

        let out = unscramble(&scrambled_sector(0x20 | 0x10, 0x10, 0x00));
        assert_eq!(out[0] & 0xF0, 0x10);
    }

    /// Regression vector for the current output; the expected bytes were
    /// recorded from this implementation, not from a historical disk, so
    /// the round trip tests below are what pin down the offsets and strides
    #[test]
    fn test_reference_vector() {
        // key lives at 5 + (b1 & 0x60)
        let mut sec = scrambled_sector(0x1A, 0x2B, 0x00);
        sec[5 + 0x20] = 0x99;
        let out = unscramble(&sec);
        assert_eq!(out[..6], [0x20, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(out[34..38], [0xCB, 0xFF, 0x00, 0xB9]);
    }

    /// Scramble a protected body sector (`10 xx ..`) with `key`
    ///
    /// Runs the byte pass then the pair pass forwards, then hides the key
    /// at offset 5 and folds the displaced byte into the two control bytes.
    fn scramble(plain: &Sector, key: u8) -> Sector {
        let mut sec = *plain;

        let mut prev = key;
        let mut pos = BYTE_START_OFFSET;
        while pos != 0 {
            let nibs = prev.rotate_left(1).rotate_left(4);
            sec[pos] = sec[pos].wrapping_add(nibs).wrapping_add(1);
            prev = sec[pos];
            pos = (pos + BYTE_STRIDE) % SECTOR_SIZE;
        }

        let mut prev = read_pair(&sec, PAIR_SEED_OFFSET);
        let mut pos = PAIR_SEED_OFFSET;
        loop {
            pos = (pos + PAIR_STRIDE) % SECTOR_SIZE;
            if pos == PAIR_SEED_OFFSET {
                break;
            }
            if pos == 0 {
                continue;
            }
            let nibs = swap_middle_nibbles(prev.rotate_left(1));
            let value = read_pair(&sec, pos).wrapping_add(nibs).wrapping_add(1);
            write_pair(&mut sec, pos, value);
            prev = value;
        }

        // b1 & 0x60 == 0 puts the key at offset 5
        let displaced = sec[5];
        sec[0] = 0x10 | (displaced & 0x0F);
        sec[1] = 0x10 | (displaced >> 4);
        sec[5] = key;
        sec
    }

    /// `10 PRINT 1` as a protected body record
    fn plain_body() -> Sector {
        let mut sec = [0u8; SECTOR_SIZE];
        sec[0] = 0x10;
        sec[1] = 0xFF;
        sec[2..12].copy_from_slice(&[0xFF, 0x00, 0x10, 0x20, 0xA0, b'1', 0x0D, 0x00, 0x00, 0xFD]);
        for (i, b) in sec[12..].iter_mut().enumerate() {
            *b = (i * 7) as u8;
        }
        sec
    }

    #[test]
    fn test_round_trip_known_program_sector() {
        let plain = plain_body();
        for key in [0x00, 0x5A, 0xFF] {
            let scrambled = scramble(&plain, key);
            assert!(is_scrambled(&scrambled));
            assert_ne!(scrambled[2..], plain[2..]);
            assert_eq!(unscramble(&scrambled), plain);
        }
    }

    #[test]
    fn test_deterministic() {
        let sec = scrambled_sector(0x10, 0x23, 0x5A);
        assert_eq!(unscramble(&sec), unscramble(&sec));
    }

    fn scrambled_strategy() -> impl Strategy<Value = Sector> {
        (
            prop::collection::vec(any::<u8>(), SECTOR_SIZE),
            0u8..16,
            any::<bool>(),
            0u8..0x80,
        )
            .prop_map(|(body, low, trailer, b1)| {
                let mut sec = [0u8; SECTOR_SIZE];
                sec.copy_from_slice(&body);
                let trailer_bit = if trailer { 0x20 } else { 0x00 };
                sec[0] = 0x10 | trailer_bit | low;
                sec[1] = b1;
                sec
            })
    }

    proptest! {
        #[test]
        fn prop_not_self_inverse(sec in scrambled_strategy()) {
            prop_assert!(is_scrambled(&sec));
            let once = unscramble(&sec);
            let twice = unscramble(&once);
            prop_assert_ne!(twice, sec);
        }

        #[test]
        fn prop_round_trip(body in prop::collection::vec(any::<u8>(), SECTOR_SIZE), key in any::<u8>()) {
            let mut plain = [0u8; SECTOR_SIZE];
            plain.copy_from_slice(&body);
            plain[0] = 0x10;
            plain[1] = 0xFF;
            prop_assert_eq!(unscramble(&scramble(&plain, key)), plain);
        }

        #[test]
        fn prop_output_never_looks_scrambled(sec in scrambled_strategy()) {
            let out = unscramble(&sec);
            prop_assert!(!is_scrambled(&out));
            prop_assert_eq!(out[1] & 0xFE, 0xFE);
        }
    }
}
