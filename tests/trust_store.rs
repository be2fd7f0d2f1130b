use std::fs;
use std::path::PathBuf;

use rdp_trust::asn1::{Dialect, Tag};
use rdp_trust::{Certificate, CertificateStore, Decision, Error, Trust, TrustRecord};
use tempfile::TempDir;

const EXAMPLE_COM_PEM: &[u8] = include_bytes!("data/example_com.pem");
const EXAMPLE_NET_PEM: &[u8] = include_bytes!("data/example_net.pem");

fn init_logger() {
    stderrlog::new()
        .verbosity(4)
        .timestamp(stderrlog::Timestamp::Microsecond)
        .init()
        .ok();
}

fn certs() -> (Certificate, Certificate) {
    (
        Certificate::parse(EXAMPLE_COM_PEM).unwrap(),
        Certificate::parse(EXAMPLE_NET_PEM).unwrap(),
    )
}

fn store_path(dir: &TempDir) -> PathBuf {
    dir.path().join("nested").join("known_hosts2")
}

fn open(path: &PathBuf) -> CertificateStore {
    CertificateStore::builder().set_path(path).open().unwrap()
}

fn wrap(tag: Tag, constructed: bool, content: &[u8]) -> Vec<u8> {
    let mut out: Vec<u8> = Vec::new();
    Dialect::Ber
        .write_universal_tag(&mut out, tag, constructed)
        .unwrap();
    Dialect::Ber.write_length(&mut out, content.len()).unwrap();
    out.extend_from_slice(content);
    out
}

fn common_name(cn: &str) -> Vec<u8> {
    // 2.5.4.3
    let mut atav: Vec<u8> = wrap(Tag::ObjectIdentifier, false, &[0x55, 0x04, 0x03]);
    atav.extend(wrap(Tag::Utf8String, false, cn.as_bytes()));
    let rdn: Vec<u8> = wrap(Tag::Set, true, &wrap(Tag::Sequence, true, &atav));
    wrap(Tag::Sequence, true, &rdn)
}

fn algorithm(oid: &[u8]) -> Vec<u8> {
    let mut seq: Vec<u8> = wrap(Tag::ObjectIdentifier, false, oid);
    seq.extend(wrap(Tag::Null, false, &[]));
    wrap(Tag::Sequence, true, &seq)
}

/// Unsigned v1 certificate for `cn` reusing the RSA key of `key_of`.
fn v1_certificate(cn: &str, key_of: &Certificate) -> Certificate {
    const SHA256_WITH_RSA: &[u8] = &[0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x01, 0x0B];
    const RSA_ENCRYPTION: &[u8] = &[0x2A, 0x86, 0x48, 0x86, 0xF7, 0x0D, 0x01, 0x01, 0x01];

    let mut tbs: Vec<u8> = Vec::new();
    Dialect::Ber.write_integer(&mut tbs, &[0x2A]).unwrap();
    tbs.extend(algorithm(SHA256_WITH_RSA));
    tbs.extend(common_name("Test CA"));
    let mut validity: Vec<u8> = wrap(Tag::UtcTime, false, b"250101000000Z");
    validity.extend(wrap(Tag::UtcTime, false, b"350101000000Z"));
    tbs.extend(wrap(Tag::Sequence, true, &validity));
    tbs.extend(common_name(cn));

    let key: &rdp_trust::RsaPublicKey = key_of.public_key();
    let mut rsa: Vec<u8> = Vec::new();
    Dialect::Ber.write_integer(&mut rsa, key.modulus()).unwrap();
    Dialect::Ber.write_integer(&mut rsa, &[0x01, 0x00, 0x01]).unwrap();
    let mut bits: Vec<u8> = vec![0x00];
    bits.extend(wrap(Tag::Sequence, true, &rsa));
    let mut spki: Vec<u8> = algorithm(RSA_ENCRYPTION);
    spki.extend(wrap(Tag::BitString, false, &bits));
    tbs.extend(wrap(Tag::Sequence, true, &spki));

    let mut certificate: Vec<u8> = wrap(Tag::Sequence, true, &tbs);
    certificate.extend(algorithm(SHA256_WITH_RSA));
    certificate.extend(wrap(Tag::BitString, false, &[0x00, 0x5A]));

    Certificate::from_der(&wrap(Tag::Sequence, true, &certificate)).unwrap()
}

#[test]
fn first_use_then_match_then_mismatch() {
    init_logger();

    let dir: TempDir = TempDir::new().unwrap();
    let path: PathBuf = store_path(&dir);
    let (first, second) = certs();
    let mut store: CertificateStore = open(&path);
    assert!(store.records().is_empty());

    let Decision::Trusted(Trust::New(pinned)) = store.r#match("Host.Example", 3389, &first).unwrap()
    else {
        panic!("first contact must pin");
    };
    assert_eq!(pinned.host, "host.example");
    assert_eq!(pinned.port, 3389);
    assert_eq!(pinned.fingerprint, *first.fingerprint());
    assert_eq!(pinned.subject, "CN = example.com, O = Example Org");

    let decision: Decision = store.r#match("host.example", 3389, &first).unwrap();
    assert!(decision.is_trusted());
    assert_eq!(decision, Decision::Trusted(Trust::Match(pinned.clone())));

    let Decision::Mismatch(mismatch) = store.r#match("host.example", 3389, &second).unwrap()
    else {
        panic!("a different certificate must not be trusted");
    };
    assert_eq!(mismatch.stored, pinned);
    assert_eq!(mismatch.presented.fingerprint, *second.fingerprint());
    assert_eq!(mismatch.old_subject(), "CN = example.com, O = Example Org");
    assert_eq!(mismatch.new_subject(), "CN = rdp.example.net");
    assert_eq!(mismatch.store_path, path);

    let warning: String = mismatch.to_string();
    assert!(warning.contains("host.example:3389"));
    assert!(warning.contains(&first.fingerprint().to_string()));
    assert!(warning.contains(&second.fingerprint().to_string()));
    assert!(warning.contains(&path.display().to_string()));

    // the pinned record is untouched until an explicit update
    assert_eq!(store.lookup("host.example", 3389).unwrap(), Some(pinned.clone()));
    assert!(!store.r#match("host.example", 3389, &second).unwrap().is_trusted());

    let updated: TrustRecord = store.update("host.example", 3389, &second).unwrap();
    assert_eq!(updated.fingerprint, *second.fingerprint());
    assert!(matches!(
        store.r#match("host.example", 3389, &second).unwrap(),
        Decision::Trusted(Trust::Match(_))
    ));
    assert!(!store.r#match("host.example", 3389, &first).unwrap().is_trusted());
}

#[test]
fn port_is_part_of_the_key() {
    init_logger();

    let dir: TempDir = TempDir::new().unwrap();
    let path: PathBuf = store_path(&dir);
    let (first, second) = certs();
    let mut store: CertificateStore = open(&path);

    assert!(matches!(
        store.r#match("host.example", 3389, &first).unwrap(),
        Decision::Trusted(Trust::New(_))
    ));
    assert!(matches!(
        store.r#match("host.example", 3390, &second).unwrap(),
        Decision::Trusted(Trust::New(_))
    ));
    assert_eq!(store.records().len(), 2);
    assert_eq!(store.lookup("host.example", 443).unwrap(), None);
}

#[test]
fn persists_across_handles() {
    init_logger();

    let dir: TempDir = TempDir::new().unwrap();
    let path: PathBuf = store_path(&dir);
    let (first, second) = certs();

    let mut a: CertificateStore = open(&path);
    let mut b: CertificateStore = open(&path);

    assert!(a.r#match("one.example", 3389, &first).unwrap().is_trusted());
    // b has not seen a's insert yet; its write must merge rather than clobber
    assert!(b.r#match("two.example", 3389, &second).unwrap().is_trusted());

    assert!(a.lookup("two.example", 3389).unwrap().is_some());
    assert!(b.lookup("one.example", 3389).unwrap().is_some());

    // b pinning a host a already pinned sees a's record
    assert!(!b.r#match("one.example", 3389, &second).unwrap().is_trusted());

    a.close().unwrap();
    b.close().unwrap();

    let reopened: CertificateStore = open(&path);
    let hosts: Vec<&str> = reopened
        .records()
        .iter()
        .map(|record| record.host.as_str())
        .collect();
    assert_eq!(hosts, ["one.example", "two.example"]);
}

#[test]
fn remove() {
    init_logger();

    let dir: TempDir = TempDir::new().unwrap();
    let path: PathBuf = store_path(&dir);
    let (first, second) = certs();
    let mut store: CertificateStore = open(&path);

    store.r#match("host.example", 3389, &first).unwrap();
    assert!(store.remove("HOST.example", 3389).unwrap());
    assert!(!store.remove("host.example", 3389).unwrap());
    assert_eq!(store.lookup("host.example", 3389).unwrap(), None);

    // removed hosts are pinned afresh
    assert!(matches!(
        store.r#match("host.example", 3389, &second).unwrap(),
        Decision::Trusted(Trust::New(_))
    ));
}

#[test]
fn update_requires_a_record() {
    init_logger();

    let dir: TempDir = TempDir::new().unwrap();
    let (first, _) = certs();
    let mut store: CertificateStore = open(&store_path(&dir));

    assert!(matches!(
        store.update("host.example", 3389, &first),
        Err(Error::NotFound)
    ));
    assert!(store.records().is_empty());
}

#[test]
fn invalid_host_names() {
    init_logger();

    let dir: TempDir = TempDir::new().unwrap();
    let (first, _) = certs();
    let mut store: CertificateStore = open(&store_path(&dir));

    for host in ["", "#host", "two words", "tab\there"] {
        assert!(
            matches!(
                store.r#match(host, 3389, &first),
                Err(Error::InvalidEncoding)
            ),
            "{host:?}"
        );
    }
    assert!(store.records().is_empty());
}

#[test]
fn hand_edited_file() {
    init_logger();

    let dir: TempDir = TempDir::new().unwrap();
    let path: PathBuf = dir.path().join("known_hosts2");
    let (first, _) = certs();

    fs::write(
        &path,
        format!(
            "# pinned by hand\n\n  Host.Example 3389 {}\n",
            first.fingerprint()
        ),
    )
    .unwrap();

    let mut store: CertificateStore = open(&path);
    let record: TrustRecord = store.lookup("host.example", 3389).unwrap().unwrap();
    assert_eq!(record.fingerprint, *first.fingerprint());
    assert!(record.subject.is_empty());
    assert!(matches!(
        store.r#match("host.example", 3389, &first).unwrap(),
        Decision::Trusted(Trust::Match(_))
    ));
}

#[test]
fn malformed_line() {
    init_logger();

    let dir: TempDir = TempDir::new().unwrap();
    let path: PathBuf = dir.path().join("known_hosts2");

    fs::write(&path, "# comment\nhost.example 3389\n").unwrap();
    assert!(matches!(
        CertificateStore::builder().set_path(&path).open(),
        Err(Error::StoreFormat { line: 2 })
    ));

    fs::write(&path, "host.example 70000 00\n").unwrap();
    assert!(matches!(
        CertificateStore::builder().set_path(&path).open(),
        Err(Error::StoreFormat { line: 1 })
    ));
}

#[test]
fn missing_file_without_create() {
    init_logger();

    let dir: TempDir = TempDir::new().unwrap();
    let path: PathBuf = store_path(&dir);

    assert!(matches!(
        CertificateStore::builder()
            .set_path(&path)
            .set_create(false)
            .open(),
        Err(Error::NotFound)
    ));
    assert!(!path.exists());

    open(&path);
    assert!(path.exists());
    assert!(
        CertificateStore::builder()
            .set_path(&path)
            .set_create(false)
            .open()
            .is_ok()
    );
}

#[test]
fn oversized_subject_stays_readable() {
    init_logger();

    let dir: TempDir = TempDir::new().unwrap();
    let path: PathBuf = store_path(&dir);
    let (first, second) = certs();
    let huge: Certificate = v1_certificate(&"a".repeat(70_000), &first);
    assert!(huge.subject().to_string().len() > 64 * 1024);

    let mut store: CertificateStore = open(&path);
    assert!(matches!(
        store.r#match("huge.example", 3389, &huge).unwrap(),
        Decision::Trusted(Trust::New(_))
    ));

    // every later read goes through the oversized line
    assert!(matches!(
        store.r#match("rdp.example.com", 3389, &second).unwrap(),
        Decision::Trusted(Trust::New(_))
    ));
    assert!(matches!(
        store.r#match("huge.example", 3389, &huge).unwrap(),
        Decision::Trusted(Trust::Match(_))
    ));

    let mut reopened: CertificateStore = open(&path);
    assert_eq!(reopened.records().len(), 2);
    let record: TrustRecord = reopened.lookup("huge.example", 3389).unwrap().unwrap();
    assert_eq!(record.subject, huge.subject().to_string());
    assert_eq!(record.issuer, "CN = Test CA");
    assert_eq!(record.fingerprint, *huge.fingerprint());
}
