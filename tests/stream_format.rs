//! Checks on the code sequence the encoder emits.
use aplimg::{encode::Encoder, CompressionLevel};
use rand::{rngs::StdRng, Rng, SeedableRng};

const END_OF_STREAM: u16 = 256;
const INCREASE_CODE_SIZE: u16 = 257;
const CLEAR_DICTIONARY: u16 = 258;
const FIRST_CODE: u16 = 260;

/// One emitted code and the width it was written with.
#[derive(Clone, Copy, Debug)]
struct Emitted {
    code: u16,
    width: u8,
}

/// Split a compressed stream into its codes, following the size escapes.
fn emitted_codes(stream: &[u8]) -> Vec<Emitted> {
    let mut bytes = stream[1..].iter();
    let mut width = 9u8;
    let mut acc = 0u32;
    let mut bits = 0u8;
    let mut codes = vec![];

    loop {
        while bits < width {
            let byte = bytes.next().expect("stream ends before the end code");
            acc |= u32::from(*byte) << bits;
            bits += 8;
        }
        let code = (acc & ((1 << width) - 1)) as u16;
        acc >>= width;
        bits -= width;
        codes.push(Emitted { code, width });

        match code {
            END_OF_STREAM => break,
            INCREASE_CODE_SIZE => width += 1,
            CLEAR_DICTIONARY => width = 9,
            _ => {}
        }
    }

    assert!(bytes.next().is_none(), "bytes after the end code");
    codes
}

/// Split the codes into dictionary epochs at each clear code.
fn epochs(codes: &[Emitted]) -> Vec<&[Emitted]> {
    codes.split(|e| e.code == CLEAR_DICTIONARY).collect()
}

fn small_alphabet(len: usize, alphabet: u8) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(u64::from(alphabet));
    (0..len).map(|_| rng.gen_range(0..alphabet)).collect()
}

#[test]
fn ascending_bytes_stay_at_nine_bits() {
    let data: Vec<u8> = (0..=255).collect();
    let stream = Encoder::new(CompressionLevel::Low).encode(&data).unwrap();
    let codes = emitted_codes(&stream);

    assert_eq!(codes.len(), 257);
    assert!(codes.iter().all(|e| e.width == 9));
    let literals: Vec<u8> = codes[..256].iter().map(|e| e.code as u8).collect();
    assert_eq!(literals, data);
}

#[test]
fn one_escape_before_first_wide_code() {
    let data = small_alphabet(20_000, 16);
    let stream = Encoder::new(CompressionLevel::High).encode(&data).unwrap();
    let codes = emitted_codes(&stream);
    let first_epoch = epochs(&codes)[0];

    let first_wide = first_epoch
        .iter()
        .position(|e| e.code != INCREASE_CODE_SIZE && e.code >= 511)
        .expect("no code beyond nine bits");
    let escapes: Vec<usize> = first_epoch[..first_wide]
        .iter()
        .enumerate()
        .filter(|(_, e)| e.code == INCREASE_CODE_SIZE)
        .map(|(i, _)| i)
        .collect();

    assert_eq!(escapes, [first_wide - 1]);
    assert_eq!(first_epoch[first_wide].width, 10);
}

#[test]
fn widths_grow_monotonically_per_epoch() {
    let data = small_alphabet(60_000, 16);
    for &level in &[CompressionLevel::Low, CompressionLevel::High] {
        let stream = Encoder::new(level).encode(&data).unwrap();
        let codes = emitted_codes(&stream);

        for epoch in epochs(&codes) {
            assert!(epoch.windows(2).all(|w| w[0].width <= w[1].width));
            assert!(epoch.iter().all(|e| e.width <= level.code_size()));
            assert!(epoch.iter().all(|e| u32::from(e.code) < 1 << e.width));
            let escapes = epoch.iter().filter(|e| e.code == INCREASE_CODE_SIZE).count();
            assert!(escapes <= usize::from(level.code_size() - 9));
        }
    }
}

#[test]
fn overflow_clears_exactly_once() {
    let data = small_alphabet(200_000, 4);
    let stream = Encoder::new(CompressionLevel::Low).encode(&data).unwrap();
    let codes = emitted_codes(&stream);
    let epochs = epochs(&codes);
    assert!(epochs.len() >= 2, "input too small to fill the dictionary");

    // Every full epoch assigns all codes from 260 up to 4094, one per emitted string, and the
    // string emitted on overflow is followed by a single clear code.
    let full_epoch_strings = usize::from(4095 - FIRST_CODE) + 1;
    for epoch in &epochs[..epochs.len() - 1] {
        let strings = epoch.iter().filter(|e| e.code != INCREASE_CODE_SIZE).count();
        assert_eq!(strings, full_epoch_strings);
        assert_eq!(epoch.last().map(|e| e.width), Some(12));
    }

    // After a clear the encoder starts over at nine bit literals.
    for epoch in &epochs[1..] {
        assert_eq!(epoch[0].width, 9);
        assert!(epoch[0].code < 256);
    }
}
