/// Computes the Internet checksum (RFC 1071) of `data`.
///
/// The buffer is summed as big-endian 16-bit words, a trailing odd byte is
/// padded with zero on the right, the 32-bit accumulator is folded twice and
/// the one's complement of the low 16 bits is returned. The result is the
/// numeric value of the checksum field; write it with `to_be_bytes` to get the
/// on-wire layout.
pub fn checksum(data: &[u8]) -> u16 {
    let mut words = data.chunks_exact(2);
    let mut sum = words
        .by_ref()
        .map(|word| u16::from_be_bytes([word[0], word[1]]) as u32)
        .fold(0u32, u32::wrapping_add);

    if let [last] = words.remainder() {
        sum = sum.wrapping_add((*last as u32) << 8);
    }

    sum = (sum >> 16) + (sum & 0xffff);
    sum += sum >> 16;
    !(sum as u16)
}

/// True when `data` (checksum field included) sums to zero.
pub fn verify_checksum(data: &[u8]) -> bool {
    checksum(data) == 0
}
