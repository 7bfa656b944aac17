//! Frame checksum.

/// XOR-reduction of every byte in `data`.
///
/// Autolabor frames carry this value as their final byte, computed over
/// everything that precedes it (header, length, sequence, id and payload).
pub fn xor_checksum(data: &[u8]) -> u8 {
    data.iter().fold(0, |acc, byte| acc ^ byte)
}

#[cfg(test)]
mod tests {
    use super::xor_checksum;

    #[test]
    fn empty_is_zero() {
        assert_eq!(xor_checksum(&[]), 0);
    }

    #[test]
    fn battery_query_frame() {
        // 55 AA 02 00 02 00
        assert_eq!(xor_checksum(&[0x55, 0xAA, 0x02, 0x00, 0x02, 0x00]), 0xFF);
    }

    #[test]
    fn appending_checksum_zeroes_reduction() {
        let data = [0x55, 0xAA, 0x09, 0x03, 0x01, 0x00, 0x05, 0x00, 0x07];
        let mut frame = data.to_vec();
        frame.push(xor_checksum(&data));

        assert_eq!(xor_checksum(&frame), 0);
    }
}
