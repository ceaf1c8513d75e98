#![no_main]

use libfuzzer_sys::fuzz_target;
use mesh_link::core::identity::NodeIdentity;
use mesh_link::core::packet::{decode, DataType};

fuzz_target!(|data: &[u8]| {
    // frame decoding must reject, never panic
    if let Ok(view) = decode(data) {
        assert_eq!(usize::from(view.length), view.payload.len());
        if view.data_type == DataType::CONFIG {
            if let Ok(identity) = NodeIdentity::from_bytes(view.payload) {
                assert_eq!(NodeIdentity::from_bytes(&identity.to_bytes()).ok(), Some(identity));
            }
        }
    }
    if let Ok(identity) = NodeIdentity::from_bytes(data) {
        let _ = identity.to_bytes();
    }
});
