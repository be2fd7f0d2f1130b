//! ASN.1 tag and length decoding for the two encoding dialects spoken during
//! RDP security negotiation.
//!
//! Every reader takes a [`ByteCursor`] and either consumes exactly the bytes
//! it decoded or fails without moving the cursor. Readers keep no state
//! between calls.
//!
//! # References
//!
//! - [A Layman's Guide to a Subset of ASN.1, BER, and DER](https://luca.ntop.org/Teaching/Appunti/asn1.html)
//! - X.690 Section 8.1 General rules for encoding

mod ber;
mod er;

use crate::{ByteCursor, Error, Result};

/// Identifier octet class bits.
///
/// # References
///
/// - X.690 Section 8.1.2.2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    Universal = 0b00,
    Application = 0b01,
    ContextSpecific = 0b10,
    Private = 0b11,
}

impl Class {
    fn from_identifier(octet: u8) -> Self {
        match octet >> 6 {
            0b00 => Class::Universal,
            0b01 => Class::Application,
            0b10 => Class::ContextSpecific,
            _ => Class::Private,
        }
    }

    fn bits(self) -> u8 {
        (self as u8) << 6
    }
}

/// Constructed bit of the identifier octet.
pub(crate) const CONSTRUCTED: u8 = 0x20;
/// Low five bits of the identifier octet; all ones selects the high-tag form.
pub(crate) const TAG_MASK: u8 = 0x1F;

/// Universal class tag numbers.
///
/// # References
///
/// - X.680 Section 8.4
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tag {
    /// `BOOLEAN` tag: `1`.
    Boolean,
    /// `INTEGER` tag: `2`.
    Integer,
    /// `BIT STRING` tag: `3`.
    BitString,
    /// `OCTET STRING` tag: `4`.
    OctetString,
    /// `NULL` tag: `5`.
    Null,
    /// `OBJECT IDENTIFIER` tag: `6`.
    ObjectIdentifier,
    /// `ENUMERATED` tag: `10`.
    Enumerated,
    /// `UTF8String` tag: `12`.
    Utf8String,
    /// `SEQUENCE` and `SEQUENCE OF` tag: `16`.
    Sequence,
    /// `SET` and `SET OF` tag: `17`.
    Set,
    /// `PrintableString` tag: `19`.
    PrintableString,
    /// `TeletexString` tag: `20`.
    TeletexString,
    /// `IA5String` tag: `22`.
    Ia5String,
    /// `UTCTime` tag: `23`.
    UtcTime,
    /// `GeneralizedTime` tag: `24`.
    GeneralizedTime,
    /// `VisibleString` tag: `26`.
    VisibleString,
    /// `UniversalString` tag: `28`.
    UniversalString,
    /// `BMPString` tag: `30`.
    BmpString,
    /// Everything else.
    Unknown(u32),
}

impl From<Tag> for u32 {
    fn from(value: Tag) -> Self {
        match value {
            Tag::Boolean => 1,
            Tag::Integer => 2,
            Tag::BitString => 3,
            Tag::OctetString => 4,
            Tag::Null => 5,
            Tag::ObjectIdentifier => 6,
            Tag::Enumerated => 10,
            Tag::Utf8String => 12,
            Tag::Sequence => 16,
            Tag::Set => 17,
            Tag::PrintableString => 19,
            Tag::TeletexString => 20,
            Tag::Ia5String => 22,
            Tag::UtcTime => 23,
            Tag::GeneralizedTime => 24,
            Tag::VisibleString => 26,
            Tag::UniversalString => 28,
            Tag::BmpString => 30,
            Tag::Unknown(other) => other,
        }
    }
}

impl From<u32> for Tag {
    fn from(value: u32) -> Self {
        match value {
            1 => Tag::Boolean,
            2 => Tag::Integer,
            3 => Tag::BitString,
            4 => Tag::OctetString,
            5 => Tag::Null,
            6 => Tag::ObjectIdentifier,
            10 => Tag::Enumerated,
            12 => Tag::Utf8String,
            16 => Tag::Sequence,
            17 => Tag::Set,
            19 => Tag::PrintableString,
            20 => Tag::TeletexString,
            22 => Tag::Ia5String,
            23 => Tag::UtcTime,
            24 => Tag::GeneralizedTime,
            26 => Tag::VisibleString,
            28 => Tag::UniversalString,
            30 => Tag::BmpString,
            other => Tag::Unknown(other),
        }
    }
}

/// Length octets, X.690 Section 8.1.3.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentLength {
    Definite(usize),
    /// Only valid for constructed BER encodings; never accepted by the
    /// bounded readers.
    Indefinite,
}

/// A decoded identifier plus length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TagHeader {
    pub class: Class,
    pub constructed: bool,
    pub tag_number: u32,
    pub content_length: ContentLength,
}

/// Encoding dialect.
///
/// `Ber` is the general form used by X.509 certificates. `Er` is the
/// restricted form used by the older negotiation layer: lengths are at most
/// two octets and high tag numbers occupy exactly one extra octet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dialect {
    Ber,
    Er,
}

impl Dialect {
    fn read_identifier(self, cursor: &mut ByteCursor<'_>) -> Result<(Class, bool, u32)> {
        match self {
            Dialect::Ber => ber::read_identifier(cursor),
            Dialect::Er => er::read_identifier(cursor),
        }
    }

    fn read_length_octets(self, cursor: &mut ByteCursor<'_>) -> Result<ContentLength> {
        match self {
            Dialect::Ber => ber::read_length(cursor),
            Dialect::Er => er::read_length(cursor),
        }
    }

    /// Reads a definite length and checks it against the bytes that follow.
    pub fn read_length(self, cursor: &mut ByteCursor<'_>) -> Result<usize> {
        let mut c: ByteCursor = *cursor;

        let len: usize = match self.read_length_octets(&mut c)? {
            ContentLength::Definite(len) => len,
            ContentLength::Indefinite => {
                log::error!("{self:?} indefinite length is not supported here");
                return Err(Error::InvalidLength);
            }
        };

        if len > c.remaining() {
            log::error!(
                "{self:?} declared length {len} exceeds the {} remaining bytes",
                c.remaining()
            );
            return Err(Error::InvalidLength);
        }

        *cursor = c;
        Ok(len)
    }

    /// Reads identifier and length octets without any expectation.
    pub fn read_tag_header(self, cursor: &mut ByteCursor<'_>) -> Result<TagHeader> {
        let mut c: ByteCursor = *cursor;

        let (class, constructed, tag_number) = self.read_identifier(&mut c)?;
        let content_length: ContentLength = self.read_length_octets(&mut c)?;

        match content_length {
            ContentLength::Definite(len) if len > c.remaining() => {
                log::error!(
                    "{self:?} {class:?} tag {tag_number} declares {len} bytes with {} remaining",
                    c.remaining()
                );
                return Err(Error::InvalidLength);
            }
            ContentLength::Indefinite if !constructed => {
                log::error!("{self:?} primitive {class:?} tag {tag_number} has indefinite length");
                return Err(Error::InvalidLength);
            }
            _ => (),
        }

        *cursor = c;
        Ok(TagHeader {
            class,
            constructed,
            tag_number,
            content_length,
        })
    }

    fn expect_identifier(
        self,
        cursor: &mut ByteCursor<'_>,
        class: Class,
        number: u32,
        constructed: bool,
    ) -> Result<()> {
        let mut c: ByteCursor = *cursor;

        let (got_class, got_constructed, got_number) = match self.read_identifier(&mut c) {
            Ok(id) => id,
            // an unrepresentable tag can never equal the expected one
            Err(Error::InvalidTag) => return Err(Error::TagMismatch),
            Err(e) => return Err(e),
        };

        if got_class != class || got_constructed != constructed || got_number != number {
            log::debug!(
                "{self:?} expected {class:?} tag {number} constructed={constructed}, got {got_class:?} tag {got_number} constructed={got_constructed}"
            );
            return Err(Error::TagMismatch);
        }

        *cursor = c;
        Ok(())
    }

    /// Consumes a universal class identifier. Length octets are left in place.
    pub fn read_universal_tag(
        self,
        cursor: &mut ByteCursor<'_>,
        tag: Tag,
        constructed: bool,
    ) -> Result<()> {
        self.expect_identifier(cursor, Class::Universal, tag.into(), constructed)
    }

    /// Consumes an application class header, returning the tag number and
    /// content length.
    pub fn read_application_tag(self, cursor: &mut ByteCursor<'_>) -> Result<(u32, usize)> {
        let mut c: ByteCursor = *cursor;

        let (class, _, number) = self.read_identifier(&mut c)?;
        if class != Class::Application {
            log::debug!("{self:?} expected application class, got {class:?}");
            return Err(Error::TagMismatch);
        }

        let len: usize = self.read_length(&mut c)?;

        *cursor = c;
        Ok((number, len))
    }

    /// Consumes a context-specific header, returning the content length.
    pub fn read_contextual_tag(
        self,
        cursor: &mut ByteCursor<'_>,
        number: u32,
        constructed: bool,
    ) -> Result<usize> {
        let mut c: ByteCursor = *cursor;
        self.expect_identifier(&mut c, Class::ContextSpecific, number, constructed)?;
        let len: usize = self.read_length(&mut c)?;
        *cursor = c;
        Ok(len)
    }

    /// Consumes a `SEQUENCE` header, returning the content length.
    pub fn read_sequence_tag(self, cursor: &mut ByteCursor<'_>) -> Result<usize> {
        let mut c: ByteCursor = *cursor;
        self.read_universal_tag(&mut c, Tag::Sequence, true)?;
        let len: usize = self.read_length(&mut c)?;
        *cursor = c;
        Ok(len)
    }

    /// Consumes a whole universal element and returns its content octets.
    pub fn read_element<'a>(
        self,
        cursor: &mut ByteCursor<'a>,
        tag: Tag,
        constructed: bool,
    ) -> Result<&'a [u8]> {
        let mut c: ByteCursor = *cursor;
        self.read_universal_tag(&mut c, tag, constructed)?;
        let len: usize = self.read_length(&mut c)?;
        let content: &[u8] = c.read(len)?;
        *cursor = c;
        Ok(content)
    }

    /// Consumes a `SEQUENCE` and returns a cursor over its content.
    pub fn read_sequence<'a>(self, cursor: &mut ByteCursor<'a>) -> Result<ByteCursor<'a>> {
        Ok(ByteCursor::new(self.read_element(cursor, Tag::Sequence, true)?))
    }

    /// Content octets of an `INTEGER`, including any sign padding.
    pub fn read_integer<'a>(self, cursor: &mut ByteCursor<'a>) -> Result<&'a [u8]> {
        let mut c: ByteCursor = *cursor;
        let content: &[u8] = self.read_element(&mut c, Tag::Integer, false)?;
        if content.is_empty() {
            log::error!("{self:?} INTEGER has no content octets");
            return Err(Error::InvalidLength);
        }
        *cursor = c;
        Ok(content)
    }

    /// An `INTEGER` that must be non-negative and fit in 32 bits.
    pub fn read_integer_u32(self, cursor: &mut ByteCursor<'_>) -> Result<u32> {
        let mut c: ByteCursor = *cursor;
        let content: &[u8] = self.read_integer(&mut c)?;

        if content[0] & 0x80 != 0 {
            log::error!("{self:?} INTEGER is negative");
            return Err(Error::InvalidLength);
        }

        let significant: &[u8] = strip_leading_zeros(content);
        if significant.len() > 4 {
            log::error!("{self:?} INTEGER of {} octets exceeds 32 bits", content.len());
            return Err(Error::InvalidLength);
        }

        let val: u32 = significant
            .iter()
            .fold(0, |acc, &byte| (acc << 8) | u32::from(byte));

        *cursor = c;
        Ok(val)
    }

    pub fn read_boolean(self, cursor: &mut ByteCursor<'_>) -> Result<bool> {
        let mut c: ByteCursor = *cursor;
        let content: &[u8] = self.read_element(&mut c, Tag::Boolean, false)?;
        let val: bool = match content {
            [val] => *val != 0,
            _ => {
                log::error!("{self:?} BOOLEAN must have 1 content octet, got {}", content.len());
                return Err(Error::InvalidLength);
            }
        };
        *cursor = c;
        Ok(val)
    }

    pub fn read_octet_string<'a>(self, cursor: &mut ByteCursor<'a>) -> Result<&'a [u8]> {
        self.read_element(cursor, Tag::OctetString, false)
    }

    /// Returns the unused bit count of the final octet and the bit octets.
    pub fn read_bit_string<'a>(self, cursor: &mut ByteCursor<'a>) -> Result<(u8, &'a [u8])> {
        let mut c: ByteCursor = *cursor;
        let content: &[u8] = self.read_element(&mut c, Tag::BitString, false)?;

        let (unused, bits) = match content.split_first() {
            Some((&unused, bits)) => (unused, bits),
            None => {
                log::error!("{self:?} BIT STRING is missing the unused bits octet");
                return Err(Error::InvalidLength);
            }
        };

        if unused > 7 || (bits.is_empty() && unused != 0) {
            log::error!(
                "{self:?} BIT STRING unused bit count {unused} is invalid for {} octets",
                bits.len()
            );
            return Err(Error::InvalidLength);
        }

        *cursor = c;
        Ok((unused, bits))
    }

    /// Raw content octets of an `OBJECT IDENTIFIER`.
    pub fn read_object_identifier<'a>(self, cursor: &mut ByteCursor<'a>) -> Result<&'a [u8]> {
        self.read_element(cursor, Tag::ObjectIdentifier, false)
    }

    pub fn read_null(self, cursor: &mut ByteCursor<'_>) -> Result<()> {
        let mut c: ByteCursor = *cursor;
        let content: &[u8] = self.read_element(&mut c, Tag::Null, false)?;
        if !content.is_empty() {
            log::error!("{self:?} NULL has {} content octets", content.len());
            return Err(Error::InvalidLength);
        }
        *cursor = c;
        Ok(())
    }

    /// Consumes any element with a definite length, returning its header and
    /// content.
    pub fn read_any<'a>(self, cursor: &mut ByteCursor<'a>) -> Result<(TagHeader, &'a [u8])> {
        let mut c: ByteCursor = *cursor;
        let header: TagHeader = self.read_tag_header(&mut c)?;

        let len: usize = match header.content_length {
            ContentLength::Definite(len) => len,
            ContentLength::Indefinite => {
                log::error!("{self:?} cannot skip an element of indefinite length");
                return Err(Error::InvalidLength);
            }
        };

        let content: &[u8] = c.read(len)?;
        *cursor = c;
        Ok((header, content))
    }

    pub fn write_length(self, out: &mut Vec<u8>, len: usize) -> Result<()> {
        match self {
            Dialect::Ber => {
                ber::write_length(out, len);
                Ok(())
            }
            Dialect::Er => er::write_length(out, len),
        }
    }

    pub fn write_tag(
        self,
        out: &mut Vec<u8>,
        class: Class,
        constructed: bool,
        number: u32,
    ) -> Result<()> {
        let leading: u8 = class.bits() | if constructed { CONSTRUCTED } else { 0 };
        match self {
            Dialect::Ber => {
                ber::write_identifier(out, leading, number);
                Ok(())
            }
            Dialect::Er => er::write_identifier(out, leading, number),
        }
    }

    pub fn write_universal_tag(self, out: &mut Vec<u8>, tag: Tag, constructed: bool) -> Result<()> {
        self.write_tag(out, Class::Universal, constructed, tag.into())
    }

    /// Writes a constructed application class header.
    pub fn write_application_tag(self, out: &mut Vec<u8>, number: u32, len: usize) -> Result<()> {
        self.write_tag(out, Class::Application, true, number)?;
        self.write_length(out, len)
    }

    pub fn write_contextual_tag(
        self,
        out: &mut Vec<u8>,
        number: u32,
        len: usize,
        constructed: bool,
    ) -> Result<()> {
        self.write_tag(out, Class::ContextSpecific, constructed, number)?;
        self.write_length(out, len)
    }

    pub fn write_sequence_tag(self, out: &mut Vec<u8>, len: usize) -> Result<()> {
        self.write_universal_tag(out, Tag::Sequence, true)?;
        self.write_length(out, len)
    }

    /// Writes a complete primitive universal element.
    pub fn write_element(self, out: &mut Vec<u8>, tag: Tag, content: &[u8]) -> Result<()> {
        self.write_universal_tag(out, tag, false)?;
        self.write_length(out, content.len())?;
        out.extend_from_slice(content);
        Ok(())
    }

    pub fn write_octet_string(self, out: &mut Vec<u8>, content: &[u8]) -> Result<()> {
        self.write_element(out, Tag::OctetString, content)
    }

    pub fn write_boolean(self, out: &mut Vec<u8>, val: bool) -> Result<()> {
        self.write_element(out, Tag::Boolean, &[if val { 0xFF } else { 0x00 }])
    }

    /// Writes a non-negative `INTEGER` in minimal two's complement form.
    pub fn write_integer(self, out: &mut Vec<u8>, magnitude: &[u8]) -> Result<()> {
        let magnitude: &[u8] = strip_leading_zeros(magnitude);

        let mut content: Vec<u8> = Vec::with_capacity(magnitude.len() + 1);
        match magnitude.first() {
            None => content.push(0),
            Some(&first) if first & 0x80 != 0 => {
                content.push(0);
                content.extend_from_slice(magnitude);
            }
            Some(_) => content.extend_from_slice(magnitude),
        }

        self.write_element(out, Tag::Integer, &content)
    }
}

/// Drops leading zero octets; an all-zero input becomes empty.
pub(crate) fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start: usize = bytes
        .iter()
        .position(|&byte| byte != 0)
        .unwrap_or(bytes.len());
    &bytes[start..]
}

#[cfg(test)]
mod tests {
    use super::{Class, ContentLength, Dialect, Tag, TagHeader};
    use crate::{ByteCursor, Error};

    #[test]
    fn sequence_tag() {
        let buf = [0x30, 0x03, 0x02, 0x01, 0x05];
        let mut cursor = ByteCursor::new(&buf);
        assert_eq!(Dialect::Ber.read_sequence_tag(&mut cursor).unwrap(), 3);
        assert_eq!(cursor.position(), 2);
        assert_eq!(Dialect::Ber.read_integer_u32(&mut cursor).unwrap(), 5);
        assert!(cursor.is_empty());
    }

    #[test]
    fn universal_tag_mismatch_leaves_cursor() {
        let buf = [0x31, 0x00];
        let mut cursor = ByteCursor::new(&buf);
        assert!(matches!(
            Dialect::Ber.read_universal_tag(&mut cursor, Tag::Sequence, true),
            Err(Error::TagMismatch)
        ));
        assert_eq!(cursor.position(), 0);

        // right number, wrong constructed bit
        let buf = [0x10, 0x00];
        let mut cursor = ByteCursor::new(&buf);
        assert!(matches!(
            Dialect::Er.read_universal_tag(&mut cursor, Tag::Sequence, true),
            Err(Error::TagMismatch)
        ));
    }

    #[test]
    fn length_overrun() {
        // declares 5 content bytes, 2 present
        let buf = [0x04, 0x05, 0xAA, 0xBB];
        for dialect in [Dialect::Ber, Dialect::Er] {
            let mut cursor = ByteCursor::new(&buf);
            assert!(matches!(
                dialect.read_octet_string(&mut cursor),
                Err(Error::InvalidLength)
            ));
            assert_eq!(cursor.position(), 0);
        }
    }

    #[test]
    fn ber_long_form_length() {
        let mut buf = vec![0x82, 0x01, 0x00];
        buf.resize(3 + 256, 0xEE);
        let mut cursor = ByteCursor::new(&buf);
        assert_eq!(Dialect::Ber.read_length(&mut cursor).unwrap(), 256);
        assert_eq!(cursor.remaining(), 256);
    }

    #[test]
    fn ber_length_overflow() {
        let buf = [0x89, 0x01, 0, 0, 0, 0, 0, 0, 0, 0];
        let mut cursor = ByteCursor::new(&buf);
        assert!(matches!(
            Dialect::Ber.read_length(&mut cursor),
            Err(Error::InvalidLength)
        ));
    }

    #[test]
    fn er_rejects_three_octet_length() {
        let buf = [0x83, 0x00, 0x00, 0x01, 0x00];
        let mut cursor = ByteCursor::new(&buf);
        assert!(matches!(
            Dialect::Er.read_length(&mut cursor),
            Err(Error::InvalidLength)
        ));
        let mut cursor = ByteCursor::new(&buf);
        assert_eq!(Dialect::Ber.read_length(&mut cursor).unwrap(), 1);
    }

    #[test]
    fn indefinite_length() {
        let buf = [0x30, 0x80, 0x00, 0x00];
        let mut cursor = ByteCursor::new(&buf);
        assert_eq!(
            Dialect::Ber.read_tag_header(&mut cursor).unwrap(),
            TagHeader {
                class: Class::Universal,
                constructed: true,
                tag_number: 16,
                content_length: ContentLength::Indefinite,
            }
        );

        let mut cursor = ByteCursor::new(&buf);
        assert!(matches!(
            Dialect::Ber.read_sequence_tag(&mut cursor),
            Err(Error::InvalidLength)
        ));
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn high_tag_numbers() {
        // application 200: BER uses base-128, ER one raw octet
        let ber = [0x7F, 0x81, 0x48, 0x00];
        let mut cursor = ByteCursor::new(&ber);
        assert_eq!(
            Dialect::Ber.read_application_tag(&mut cursor).unwrap(),
            (200, 0)
        );

        let er = [0x7F, 0xC8, 0x00];
        let mut cursor = ByteCursor::new(&er);
        assert_eq!(Dialect::Er.read_application_tag(&mut cursor).unwrap(), (200, 0));

        // ER high form must not encode a low tag number
        let er = [0x7F, 0x05, 0x00];
        let mut cursor = ByteCursor::new(&er);
        assert!(matches!(
            Dialect::Er.read_application_tag(&mut cursor),
            Err(Error::InvalidTag)
        ));
    }

    #[test]
    fn contextual_tag() {
        let buf = [0xA3, 0x02, 0x05, 0x00];
        let mut cursor = ByteCursor::new(&buf);
        assert!(matches!(
            Dialect::Ber.read_contextual_tag(&mut cursor, 2, true),
            Err(Error::TagMismatch)
        ));
        assert_eq!(Dialect::Ber.read_contextual_tag(&mut cursor, 3, true).unwrap(), 2);
        Dialect::Ber.read_null(&mut cursor).unwrap();
    }

    #[test]
    fn bit_string() {
        let buf = [0x03, 0x03, 0x00, 0x12, 0x34];
        let mut cursor = ByteCursor::new(&buf);
        assert_eq!(
            Dialect::Ber.read_bit_string(&mut cursor).unwrap(),
            (0, &[0x12, 0x34][..])
        );

        let buf = [0x03, 0x01, 0x03];
        let mut cursor = ByteCursor::new(&buf);
        assert!(matches!(
            Dialect::Ber.read_bit_string(&mut cursor),
            Err(Error::InvalidLength)
        ));
    }

    #[test]
    fn integers() {
        let mut out = Vec::new();
        Dialect::Ber.write_integer(&mut out, &[0x00, 0x80, 0x01]).unwrap();
        assert_eq!(out, [0x02, 0x03, 0x00, 0x80, 0x01]);

        let mut out = Vec::new();
        Dialect::Ber.write_integer(&mut out, &[]).unwrap();
        assert_eq!(out, [0x02, 0x01, 0x00]);

        let buf = [0x02, 0x01, 0xFF];
        let mut cursor = ByteCursor::new(&buf);
        assert!(matches!(
            Dialect::Ber.read_integer_u32(&mut cursor),
            Err(Error::InvalidLength)
        ));

        let buf = [0x02, 0x05, 0x00, 0xFF, 0xFF, 0xFF, 0xFF];
        let mut cursor = ByteCursor::new(&buf);
        assert_eq!(Dialect::Ber.read_integer_u32(&mut cursor).unwrap(), u32::MAX);
    }

    #[test]
    fn boolean() {
        let mut out = Vec::new();
        Dialect::Er.write_boolean(&mut out, true).unwrap();
        let mut cursor = ByteCursor::new(&out);
        assert!(Dialect::Er.read_boolean(&mut cursor).unwrap());

        let buf = [0x01, 0x02, 0xFF, 0xFF];
        let mut cursor = ByteCursor::new(&buf);
        assert!(matches!(
            Dialect::Ber.read_boolean(&mut cursor),
            Err(Error::InvalidLength)
        ));
    }
}
