use rdp_trust::{
    Error,
    encoding::{self, Base64Codec, DEFAULT_MAX_DECODED_LEN},
};

fn init_logger() {
    stderrlog::new()
        .verbosity(4)
        .timestamp(stderrlog::Timestamp::Microsecond)
        .init()
        .ok();
}

// RFC 4648 section 10
const VECTORS: [(&str, &str); 7] = [
    ("", ""),
    ("f", "Zg=="),
    ("fo", "Zm8="),
    ("foo", "Zm9v"),
    ("foob", "Zm9vYg=="),
    ("fooba", "Zm9vYmE="),
    ("foobar", "Zm9vYmFy"),
];

#[test]
fn rfc4648_vectors() {
    init_logger();

    for (plain, encoded) in VECTORS {
        assert_eq!(encoding::encode(plain.as_bytes()), encoded);
        assert_eq!(encoding::decode(encoded).unwrap(), plain.as_bytes());
    }
}

#[test]
fn binary_round_trip() {
    init_logger();

    let codec = Base64Codec::new();
    for len in [0, 1, 2, 3, 255, 256, 4096, DEFAULT_MAX_DECODED_LEN] {
        let bytes: Vec<u8> = (0..len).map(|i| (i * 7 + 3) as u8).collect();
        let text: String = codec.encode(&bytes);
        assert_eq!(text.len(), len.div_ceil(3) * 4);
        assert_eq!(codec.decode(&text).unwrap(), bytes, "len {len}");
    }
}

#[test]
fn output_bound() {
    init_logger();

    let bytes: Vec<u8> = vec![0xA5; DEFAULT_MAX_DECODED_LEN + 1];
    let text: String = encoding::encode(&bytes);
    assert!(matches!(encoding::decode(&text), Err(Error::OutputTooLarge)));

    let codec = Base64Codec::new().max_decoded_len(DEFAULT_MAX_DECODED_LEN + 1);
    assert_eq!(codec.decode(&text).unwrap(), bytes);

    let codec = Base64Codec::new().max_decoded_len(0);
    assert!(codec.decode("").unwrap().is_empty());
    assert!(matches!(codec.decode("Zg=="), Err(Error::OutputTooLarge)));
}

#[test]
fn rejects_non_canonical() {
    init_logger();

    for bad in ["QQ=", "Zg", "Zh==", "Zm9=", "Zm9v\r\n", " Zm9v", "Zm9v=", "Zm+_", "Zm9v===="] {
        assert!(
            matches!(encoding::decode(bad), Err(Error::InvalidEncoding)),
            "{bad:?}"
        );
    }
}
