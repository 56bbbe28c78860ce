#![no_main]

use libfuzzer_sys::fuzz_target;

use framebus::{Envelope, MessageKind};

fuzz_target!(|data: &[u8]| {
    // Декодер не должен паниковать ни на каких байтах.
    let Ok(envelope) = Envelope::from_slice(data) else {
        return;
    };

    // Всё, что разобралось, должно кодироваться обратно и разбираться так же.
    let bytes = match envelope.to_bytes() {
        Ok(bytes) => bytes,
        Err(err) => panic!("Encoding failed for {envelope:?}: {err}"),
    };
    let again = match Envelope::from_slice(&bytes) {
        Ok(again) => again,
        Err(err) => panic!("Re-decoding failed for {envelope:?}: {err}"),
    };
    assert_eq!(again, envelope);

    if envelope.kind == MessageKind::Implicit {
        assert_eq!(envelope.to_value()["type"], serde_json::json!(""));
    }
});
