use std::fmt;

use super::{Context as _, oid::ObjectIdentifier};
use crate::{
    ByteCursor, Result,
    asn1::{Class, Dialect, Tag},
};

/// # References
///
/// - [RFC 5280 Section 4.1.2.4](https://datatracker.ietf.org/doc/html/rfc5280#section-4.1.2.4)
///
/// ```text
/// AttributeTypeAndValue ::= SEQUENCE {
///   type     AttributeType,
///   value    AttributeValue }
///
/// DirectoryString ::= CHOICE {
///       teletexString           TeletexString (SIZE (1..MAX)),
///       printableString         PrintableString (SIZE (1..MAX)),
///       universalString         UniversalString (SIZE (1..MAX)),
///       utf8String              UTF8String (SIZE (1..MAX)),
///       bmpString               BMPString (SIZE (1..MAX)) }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AttributeTypeAndValue {
    oid: ObjectIdentifier,
    value: String,
}

impl AttributeTypeAndValue {
    fn deser(name: &str, cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let mut atav: ByteCursor = Dialect::Ber.read_sequence(cursor).context(name)?;

        let oid: ObjectIdentifier = ObjectIdentifier::deser(&format!("{name}.type"), &mut atav)?;

        let value_name: String = format!("{name}.value");
        let (header, content) = Dialect::Ber.read_any(&mut atav).context(&value_name)?;

        if header.class != Class::Universal || header.constructed {
            log::error!(
                "{value_name} expected a primitive universal string, got {:?} tag {} constructed={}",
                header.class,
                header.tag_number,
                header.constructed
            );
            return None.context(&value_name);
        }

        let value: String = decode_string(&value_name, Tag::from(header.tag_number), content)
            .context(&value_name)?;

        if !atav.is_empty() {
            log::error!("{name} contains {} bytes of extra data", atav.remaining());
            return None.context(name);
        }

        Ok(Self { oid, value })
    }

    /// OpenSSL short name of the attribute type, or the dotted OID.
    fn short_name(&self) -> &str {
        match self.oid.as_str() {
            "2.5.4.3" => "CN",
            "2.5.4.5" => "serialNumber",
            "2.5.4.6" => "C",
            "2.5.4.7" => "L",
            "2.5.4.8" => "ST",
            "2.5.4.9" => "street",
            "2.5.4.10" => "O",
            "2.5.4.11" => "OU",
            "0.9.2342.19200300.100.1.25" => "DC",
            "1.2.840.113549.1.9.1" => "emailAddress",
            other => other,
        }
    }
}

fn decode_string(name: &str, tag: Tag, content: &[u8]) -> Option<String> {
    match tag {
        Tag::Utf8String => match String::from_utf8(content.to_vec()) {
            Ok(s) => Some(s),
            Err(e) => {
                log::error!("{name} is not a valid UTF-8 string: {e:?}");
                None
            }
        },
        Tag::PrintableString | Tag::VisibleString | Tag::Ia5String => {
            if !content.is_ascii() {
                log::error!("{name} {tag:?} contains non-ASCII bytes");
                return None;
            }
            if tag == Tag::Ia5String {
                // not in the DirectoryString CHOICE but some CA's use it anyway
                log::warn!("{name} uses Ia5String for DirectoryString");
            }
            Some(content.iter().copied().map(char::from).collect())
        }
        // T.61 is treated as Latin-1, like most decoders do
        Tag::TeletexString => Some(content.iter().copied().map(char::from).collect()),
        Tag::BmpString => {
            if content.len() % 2 != 0 {
                log::error!("{name} BMPString has an odd length {}", content.len());
                return None;
            }
            let units = content
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
            match char::decode_utf16(units).collect::<Result<String, _>>() {
                Ok(s) => Some(s),
                Err(e) => {
                    log::error!("{name} BMPString is not valid UTF-16: {e}");
                    None
                }
            }
        }
        Tag::UniversalString => {
            if content.len() % 4 != 0 {
                log::error!("{name} UniversalString has length {}", content.len());
                return None;
            }
            content
                .chunks_exact(4)
                .map(|quad| {
                    let val = u32::from_be_bytes([quad[0], quad[1], quad[2], quad[3]]);
                    let ch = char::from_u32(val);
                    if ch.is_none() {
                        log::error!("{name} UniversalString contains invalid code point {val:#x}");
                    }
                    ch
                })
                .collect()
        }
        tag => {
            log::error!("{name} unsupported tag for DirectoryString: {tag:?}");
            None
        }
    }
}

/// # References
///
/// - [RFC 5280 Section 4.1.2.4](https://datatracker.ietf.org/doc/html/rfc5280#section-4.1.2.4)
///
/// ```text
/// Name ::= CHOICE { -- only one possibility for now --
///   rdnSequence  RDNSequence }
///
/// RDNSequence ::= SEQUENCE OF RelativeDistinguishedName
///
/// RelativeDistinguishedName ::=
///   SET SIZE (1..MAX) OF AttributeTypeAndValue
/// ```
///
/// Displays in the one-line form `CN = example.com, O = Example Org`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Name {
    rdn_sequence: Vec<AttributeTypeAndValue>,
}

impl Name {
    pub(crate) fn deser(name: &str, cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let mut rdns: ByteCursor = Dialect::Ber.read_sequence(cursor).context(name)?;

        let mut rdn_sequence: Vec<AttributeTypeAndValue> = Vec::new();
        let mut x: usize = 0;

        while !rdns.is_empty() {
            let set_name: String = format!("{name}.rdnSequence[{x}]");
            let mut set: ByteCursor = ByteCursor::new(
                Dialect::Ber
                    .read_element(&mut rdns, Tag::Set, true)
                    .context(&set_name)?,
            );

            if set.is_empty() {
                log::error!("{set_name} is an empty RelativeDistinguishedName");
                return None.context(&set_name);
            }

            let mut y: usize = 0;
            while !set.is_empty() {
                let atav_name: String = format!("{set_name}[{y}]");
                rdn_sequence.push(AttributeTypeAndValue::deser(&atav_name, &mut set)?);
                y += 1;
            }

            x += 1;
        }

        Ok(Self { rdn_sequence })
    }

    /// Returns the first commonName in the sequence.
    pub fn common_name(&self) -> Option<&str> {
        self.rdn_sequence
            .iter()
            .find(|atav| atav.oid.as_str() == super::oid::COMMON_NAME)
            .map(|atav| atav.value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.rdn_sequence.is_empty()
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, atav) in self.rdn_sequence.iter().enumerate() {
            if idx != 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} = {}", atav.short_name(), atav.value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Name, decode_string};
    use crate::{ByteCursor, asn1::Tag};

    #[test]
    fn one_line() {
        // SEQUENCE { SET { SEQUENCE { 2.5.4.6, PrintableString "NZ" } },
        //            SET { SEQUENCE { 2.5.4.3, UTF8String "host" } } }
        let der = [
            0x30, 0x1C, 0x31, 0x0B, 0x30, 0x09, 0x06, 0x03, 0x55, 0x04, 0x06, 0x13, 0x02, b'N',
            b'Z', 0x31, 0x0D, 0x30, 0x0B, 0x06, 0x03, 0x55, 0x04, 0x03, 0x0C, 0x04, b'h', b'o',
            b's', b't',
        ];
        let mut cursor = ByteCursor::new(&der);
        let name = Name::deser("Name", &mut cursor).unwrap();
        assert!(cursor.is_empty());
        assert_eq!(name.to_string(), "C = NZ, CN = host");
        assert_eq!(name.common_name(), Some("host"));
    }

    #[test]
    fn empty_rdn_set() {
        let der = [0x30, 0x02, 0x31, 0x00];
        let mut cursor = ByteCursor::new(&der);
        assert!(Name::deser("Name", &mut cursor).is_err());
    }

    #[test]
    fn wide_strings() {
        assert_eq!(
            decode_string("t", Tag::BmpString, &[0x00, 0x52, 0x00, 0xE9]).as_deref(),
            Some("Ré")
        );
        assert_eq!(
            decode_string("t", Tag::UniversalString, &[0, 0x01, 0xF6, 0x00]).as_deref(),
            Some("\u{1F600}")
        );
        assert!(decode_string("t", Tag::BmpString, &[0xD8, 0x00]).is_none());
        assert!(decode_string("t", Tag::PrintableString, &[0xC3, 0xA9]).is_none());
    }
}
