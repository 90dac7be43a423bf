use encoding_rs::WINDOWS_1252;
use nom::error::{Error, ErrorKind};
use nom::{bytes, number, IResult};

/// Parse unsigned byte
pub fn parse_u8(i: &[u8]) -> IResult<&[u8], u8> {
    number::complete::u8(i)
}

/// Parse big endian unsigned short
pub fn parse_be_u16(i: &[u8]) -> IResult<&[u8], u16> {
    number::complete::be_u16(i)
}

/// Parse big endian unsigned 32
pub fn parse_be_u32(i: &[u8]) -> IResult<&[u8], u32> {
    number::complete::be_u32(i)
}

/// Peek the next byte without consuming it.
pub fn peek_u8(i: &[u8]) -> IResult<&[u8], u8> {
    let (_, b) = parse_u8(i)?;
    Ok((i, b))
}

/// Take exactly `n` bytes.
pub fn take_bytes(n: usize) -> impl Fn(&[u8]) -> IResult<&[u8], &[u8]> {
    move |i: &[u8]| bytes::complete::take(n)(i)
}

/// Four bytes chunk signature such as `MThd`.
pub fn parse_chunk_tag<'a>(
    signature: &'static [u8; 4],
) -> impl Fn(&'a [u8]) -> IResult<&'a [u8], &'a [u8]> {
    move |i: &'a [u8]| bytes::complete::tag(&signature[..])(i)
}

/// Parse a variable length quantity.
///
/// 7 bits per byte, most significant group first, the high bit flags a continuation.
/// Fails instead of wrapping when the value does not fit in 32 bits.
pub fn parse_vlq(i: &[u8]) -> IResult<&[u8], u32> {
    let mut i = i;
    let mut quantity: u32 = 0;
    loop {
        let (rest, byte) = parse_u8(i)?;
        if quantity > (u32::MAX >> 7) {
            log::error!("Variable length quantity overflows 32 bits");
            return Err(nom::Err::Failure(Error::new(i, ErrorKind::TooLarge)));
        }
        quantity = (quantity << 7) | u32::from(byte & 0x7F);
        i = rest;
        if byte & 0x80 == 0 {
            return Ok((i, quantity));
        }
    }
}

/// Materialize text payload, MIDI files carry no encoding information
pub fn make_string(i: &[u8]) -> String {
    let (cow, encoding_used, had_errors) = WINDOWS_1252.decode(i);
    if had_errors {
        log::debug!("Error parsing string with {encoding_used:?}");
        match std::str::from_utf8(i) {
            Ok(s) => s.to_string(),
            Err(e) => {
                log::debug!("Error UTF-8 string parsing:{e}");
                String::new()
            }
        }
    } else {
        cow.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vlq_single_byte() {
        let (rest, v) = parse_vlq(&[0x00, 0xAA]).unwrap();
        assert_eq!(v, 0);
        assert_eq!(rest, &[0xAA]);
        let (_, v) = parse_vlq(&[0x7F]).unwrap();
        assert_eq!(v, 0x7F);
    }

    #[test]
    fn test_parse_vlq_multi_bytes() {
        assert_eq!(parse_vlq(&[0x81, 0x00]).unwrap().1, 0x80);
        assert_eq!(parse_vlq(&[0x83, 0x60]).unwrap().1, 480);
        assert_eq!(parse_vlq(&[0xFF, 0x7F]).unwrap().1, 0x3FFF);
        assert_eq!(parse_vlq(&[0x81, 0x80, 0x00]).unwrap().1, 0x4000);
        assert_eq!(parse_vlq(&[0xFF, 0xFF, 0xFF, 0x7F]).unwrap().1, 0x0FFF_FFFF);
    }

    #[test]
    fn test_parse_vlq_truncated() {
        assert!(parse_vlq(&[0x81]).is_err());
        assert!(parse_vlq(&[]).is_err());
    }

    #[test]
    fn test_parse_vlq_overflow_is_rejected() {
        // 5 groups of 7 bits = 35 bits
        let res = parse_vlq(&[0xFF, 0xFF, 0xFF, 0xFF, 0x7F]);
        assert!(matches!(res, Err(nom::Err::Failure(_))));
        // largest value that still fits
        let (_, v) = parse_vlq(&[0x8F, 0xFF, 0xFF, 0xFF, 0x7F]).unwrap();
        assert_eq!(v, u32::MAX);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let data = [0x3C, 0x64];
        let (rest, b) = peek_u8(&data).unwrap();
        assert_eq!(b, 0x3C);
        assert_eq!(rest.len(), 2);
    }

    #[test]
    fn test_parse_chunk_tag() {
        let data = b"MThd\x00";
        let (rest, _) = parse_chunk_tag(b"MThd")(data).unwrap();
        assert_eq!(rest, &[0x00]);
        assert!(parse_chunk_tag(b"MTrk")(data).is_err());
    }

    #[test]
    fn test_make_string() {
        assert_eq!(make_string(b"Piano"), "Piano");
        assert_eq!(make_string(&[0x43, 0x61, 0x66, 0xE9]), "Café");
    }
}
