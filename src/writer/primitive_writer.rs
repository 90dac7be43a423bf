use crate::SmfError;

/// Exclusive upper bound of the quantities the writer can encode (3 bytes).
pub const MAX_QUANTITY: u32 = 0x0020_0000;

/// Write a variable length quantity on at most 3 bytes.
pub fn write_vlq(out: &mut Vec<u8>, value: u32) -> Result<(), SmfError> {
    if value < 0x80 {
        out.push(value as u8);
    } else if value < 0x4000 {
        out.push(((value >> 7) & 0x7F) as u8 | 0x80);
        out.push((value & 0x7F) as u8);
    } else if value < MAX_QUANTITY {
        out.push(((value >> 14) & 0x7F) as u8 | 0x80);
        out.push(((value >> 7) & 0x7F) as u8 | 0x80);
        out.push((value & 0x7F) as u8);
    } else {
        log::error!("Cannot encode quantity {value:#X}");
        return Err(SmfError::QuantityOverflow(value));
    }
    Ok(())
}

pub fn write_be_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub fn write_be_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Overwrite a previously written big endian u32 at `position`.
pub fn patch_be_u32(out: &mut [u8], position: usize, value: u32) {
    out[position..position + 4].copy_from_slice(&value.to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::primitive_parser::parse_vlq;

    fn encode(value: u32) -> Vec<u8> {
        let mut out = Vec::new();
        write_vlq(&mut out, value).unwrap();
        out
    }

    #[test]
    fn test_write_vlq_tiers() {
        assert_eq!(encode(0), vec![0x00]);
        assert_eq!(encode(0x7F), vec![0x7F]);
        assert_eq!(encode(0x80), vec![0x81, 0x00]);
        assert_eq!(encode(480), vec![0x83, 0x60]);
        assert_eq!(encode(0x3FFF), vec![0xFF, 0x7F]);
        assert_eq!(encode(0x4000), vec![0x81, 0x80, 0x00]);
        assert_eq!(encode(0x1F_FFFF), vec![0xFF, 0xFF, 0x7F]);
    }

    #[test]
    fn test_write_vlq_overflow() {
        let mut out = Vec::new();
        let res = write_vlq(&mut out, MAX_QUANTITY);
        assert!(matches!(res, Err(SmfError::QuantityOverflow(0x20_0000))));
        assert!(out.is_empty());
        assert!(write_vlq(&mut out, u32::MAX).is_err());
    }

    #[test]
    fn test_vlq_round_trip_whole_range() {
        let mut out = Vec::with_capacity(3);
        for value in 0..MAX_QUANTITY {
            out.clear();
            write_vlq(&mut out, value).unwrap();
            let (rest, decoded) = parse_vlq(&out).unwrap();
            assert!(rest.is_empty());
            assert_eq!(decoded, value);
        }
    }

    #[test]
    fn test_patch_be_u32() {
        let mut out = Vec::new();
        out.extend_from_slice(b"MTrk");
        write_be_u32(&mut out, 0);
        write_be_u16(&mut out, 0x1234);
        patch_be_u32(&mut out, 4, 0x0102_0304);
        assert_eq!(out, b"MTrk\x01\x02\x03\x04\x12\x34");
    }
}
