/// Catalog filename hash functions
///
/// Both functions must match the historical operating system bit for bit,
/// otherwise files land in (or are searched for in) the wrong index sector.

/// Hash used by old style (type 0) catalogs
///
/// XOR of all name bytes, times three, with the carry folded back in.
pub fn old_hash(name: &[u8; 8]) -> u8 {
    let xor = name.iter().fold(0u32, |acc, &c| acc ^ c as u32);
    let product = xor * 3;
    ((product >> 8) + (product & 0xFF)) as u8
}

/// Hash used by new style (type 1) and tri-byte (type 2) catalogs
///
/// Even position bytes are nibble swapped before being summed.
pub fn new_hash(name: &[u8; 8]) -> u8 {
    let sum = name.iter().enumerate().fold(0u32, |acc, (i, &c)| {
        let c = c as u32;
        if i % 2 == 0 {
            acc + 16 * (c & 0x0F) + (c >> 4)
        } else {
            acc + c
        }
    });
    (sum % 256) as u8
}
