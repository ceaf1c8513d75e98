//! Property-based tests using proptest
//!
//! These tests validate framing invariants across a wide range of randomly
//! generated inputs: well-formed frames always decode to what was encoded,
//! and any frame whose length field disagrees with its size is rejected.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use mesh_link::core::identity::{NodeIdentity, NodeType, IDENTITY_SIZE, MAX_NAME_LEN};
use mesh_link::core::packet::{decode, encode, DataType, Packet, HEADER_SIZE};
use mesh_link::error::{ErrorKind, MeshError};
use mesh_link::MeshAddr;
use proptest::prelude::*;

// Property: encode then decode yields the same type and payload
proptest! {
    #[test]
    fn prop_frame_roundtrip(
        data_type in any::<u8>(),
        payload in prop::collection::vec(any::<u8>(), 1..2048),
    ) {
        let data_type = DataType::from_raw(data_type);
        let frame = encode(data_type, &payload).expect("encode should not fail");

        prop_assert_eq!(frame.len(), HEADER_SIZE + payload.len());
        prop_assert_eq!(frame[3], 0);

        let view = decode(&frame).expect("decode should not fail");
        prop_assert_eq!(view.data_type, data_type);
        prop_assert_eq!(usize::from(view.length), payload.len());
        prop_assert_eq!(view.payload, payload.as_slice());
    }
}

// Property: a frame one byte short or one byte long is always rejected
proptest! {
    #[test]
    fn prop_length_off_by_one_rejected(
        payload in prop::collection::vec(any::<u8>(), 1..512),
        extra in any::<u8>(),
    ) {
        let frame = encode(DataType::SENSOR, &payload).unwrap();

        let short = &frame[..frame.len() - 1];
        let is_short_rejected = matches!(
            decode(short),
            Err(MeshError::LengthMismatch { .. }) | Err(MeshError::FrameTooShort { .. })
        );
        prop_assert!(is_short_rejected);

        let mut long = frame.clone();
        long.push(extra);
        let is_long_rejected = matches!(decode(&long), Err(MeshError::LengthMismatch { .. }));
        prop_assert!(is_long_rejected);
    }
}

// Property: decoding arbitrary bytes never panics, and failures are malformed-frame errors
proptest! {
    #[test]
    fn prop_decode_arbitrary_bytes(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        match decode(&bytes) {
            Ok(view) => {
                prop_assert_eq!(usize::from(view.length), bytes.len() - HEADER_SIZE);
            }
            Err(e) => prop_assert_eq!(e.kind(), ErrorKind::MalformedFrame),
        }
    }
}

// Property: the reserved byte is ignored on receive
proptest! {
    #[test]
    fn prop_reserved_byte_ignored(
        reserved in any::<u8>(),
        payload in prop::collection::vec(any::<u8>(), 1..64),
    ) {
        let mut frame = encode(DataType::STATUS, &payload).unwrap();
        frame[3] = reserved;

        let packet = Packet::from_bytes(&frame).unwrap();
        prop_assert_eq!(packet.data_type, DataType::STATUS);
        prop_assert_eq!(packet.payload, payload);
    }
}

// Property: any valid identity survives the 18-byte record
proptest! {
    #[test]
    fn prop_identity_record(
        node_id in 1u8..=255,
        node_type in any::<u8>(),
        name in "[A-Za-z0-9_]{0,15}",
    ) {
        let identity = NodeIdentity::new(node_id, NodeType::from_raw(node_type), &name).unwrap();
        let bytes = identity.to_bytes();
        prop_assert_eq!(bytes.len(), IDENTITY_SIZE);

        let parsed = NodeIdentity::from_bytes(&bytes).unwrap();
        prop_assert_eq!(parsed.node_id(), node_id);
        prop_assert_eq!(parsed.node_type().raw(), node_type);
        prop_assert_eq!(parsed.name(), name.as_str());
    }
}

// Property: any 18-byte record either fails to decode or re-encodes to itself
proptest! {
    #[test]
    fn prop_identity_arbitrary_record(bytes in any::<[u8; IDENTITY_SIZE]>()) {
        if let Ok(identity) = NodeIdentity::from_bytes(&bytes) {
            prop_assert!(identity.name().len() <= MAX_NAME_LEN);
            let encoded = identity.to_bytes();
            prop_assert_eq!(&encoded[..2], &bytes[..2]);
            prop_assert_eq!(NodeIdentity::from_bytes(&encoded).unwrap(), identity);
        }
    }
}

// Property: MAC addresses format and parse back
proptest! {
    #[test]
    fn prop_address_text(octets in any::<[u8; 6]>()) {
        let addr = MeshAddr::new(octets);
        let parsed: MeshAddr = addr.to_string().parse().unwrap();
        prop_assert_eq!(parsed, addr);
    }
}
