#![no_main]
use aplimg::{decode, encode, CompressionLevel, Configuration};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let (level, data) = match data.split_first() {
        Some((0, rest)) => (CompressionLevel::Low, rest),
        Some((_, rest)) => (CompressionLevel::High, rest),
        None => (CompressionLevel::High, data),
    };
    let config = Configuration::new().with_append_total(true);

    let mut encoder = encode::Encoder::with_config(level, config.clone());
    let buffer = encoder.encode(data).expect("in-memory encoding cannot fail");

    let mut decoder = decode::Decoder::with_config(config);
    let result = decoder.decode(&buffer);
    assert!(result.is_ok(), "{:?}", result);
    assert_eq!(result.unwrap(), data);
});
