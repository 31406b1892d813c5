#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|raw_data: &[u8]| {
    let mut decoder = aplimg::decode::Decoder::new();
    let _ = decoder.decode(raw_data);
});
