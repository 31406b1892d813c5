#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|raw_data: &[u8]| {
    let _ = aplimg::Image::from_bytes(raw_data);
});
