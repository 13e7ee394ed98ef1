use std::io::Cursor;

use inlinable_string::InlinableString;
use uuid::Uuid;

use satchel::provider::{Manifest, ManifestItem, Resolver};

fn uuid(v: u8) -> Uuid {
    Uuid::from_bytes([v; 16])
}

fn testbed() -> Manifest {
    Manifest {
        items: vec![
            ManifestItem {
                path: InlinableString::from("textures/crate.png"),
                uuid: uuid(1),
                location: InlinableString::from("01010101"),
            },
            ManifestItem {
                path: InlinableString::from("audio/birds.ogg"),
                uuid: uuid(2),
                location: InlinableString::from("02020202"),
            },
        ],
    }
}

#[test]
fn round_trip() {
    let manifest = testbed();

    let mut buf = Vec::new();
    manifest.save_into(&mut buf).unwrap();

    let decoded = Manifest::load_from(&mut Cursor::new(&buf)).unwrap();
    assert_eq!(decoded.items.len(), 2);
    assert_eq!(decoded.items[0].path, manifest.items[0].path);
    assert_eq!(decoded.items[0].uuid, manifest.items[0].uuid);
    assert_eq!(decoded.items[1].location, manifest.items[1].location);
}

#[test]
fn magic_mismatch_is_rejected() {
    let manifest = testbed();

    let mut buf = Vec::new();
    manifest.save_into(&mut buf).unwrap();
    buf[0] ^= 0xff;

    assert!(Manifest::load_from(&mut Cursor::new(&buf)).is_err());
}

#[test]
fn truncated_input_is_rejected() {
    assert!(Manifest::load_from(&mut Cursor::new(&[0u8; 4])).is_err());
}

#[test]
fn resolver_lookups() {
    let mut resolver = Resolver::new();
    resolver.add(&testbed());

    assert_eq!(resolver.len(), 2);
    assert_eq!(resolver.find("textures/crate.png"), Some(uuid(1)));
    assert_eq!(resolver.find("textures/unknown.png"), None);
    assert_eq!(resolver.locate(uuid(2)), Some("02020202"));
    assert!(resolver.contains(uuid(1)));
    assert!(!resolver.contains(uuid(9)));
}
