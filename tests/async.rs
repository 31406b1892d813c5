use std::sync::{Arc, Mutex};
use std::{env, fs};

use aplimg::{
    decode, encode, CancelToken, Compression, CompressionLevel, Configuration, Error, Image,
    LzwStatus, Palette, Progress, Rgb,
};
use futures::executor::block_on;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::compat::{TokioAsyncReadCompatExt as _, TokioAsyncWriteCompatExt as _};

async fn pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("localhost:0")
        .await
        .expect("No loop tcp for testing");
    let addr = listener.local_addr().expect("No address for listener");

    let connect = TcpStream::connect(addr);
    let accept = listener.accept();

    let (a, (b, _)) = tokio::try_join!(connect, accept).expect("Can connect");
    (a, b)
}

async fn assert_send_through(data: &[u8], send: &mut TcpStream, recv: &mut TcpStream) {
    let mut send = send.compat_write();
    let mut recv = recv.compat();

    let config = Configuration::new().with_append_total(true);
    let mut encoder = encode::Encoder::with_config(CompressionLevel::High, config.clone());
    let encode = encoder.into_async(&mut send).encode_all(data, data.len());

    let mut recv_buffer = vec![];
    let mut decoder = decode::Decoder::with_config(config);
    let decode = decoder.into_async(&mut recv_buffer).decode_all(&mut recv, None);

    let (encode, decode) = tokio::join!(encode, decode);
    encode.status.expect("Could send/encoded data");
    decode.status.expect("Could recv/decode data");

    assert_eq!(encode.bytes_read, data.len());
    assert_eq!(encode.bytes_written, decode.bytes_read);
    assert_eq!(decode.bytes_written, data.len());
    assert_eq!(recv_buffer, data);
}

async fn assert_image_through(image: &Image, send: &mut TcpStream, recv: &mut TcpStream) {
    let send = send.compat_write();
    let recv = recv.compat();

    let save = image.save(send, Compression::Lzw, CompressionLevel::Medium);
    let load = Image::load(recv);

    let (saved, loaded) = tokio::join!(save, load);
    saved.expect("Could save image");
    assert_eq!(&loaded.expect("Could load image"), image);
}

#[test]
fn with_streams() {
    let file = env::args().next().unwrap();
    let data = fs::read(file).unwrap();

    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let _enter = rt.enter();
    let (mut send, mut recv) = rt.block_on(pair());

    for chunk in data.chunks(1 << 17).take(4) {
        rt.block_on(assert_send_through(chunk, &mut send, &mut recv));
    }
}

#[tokio::test]
async fn through_small_pipe() {
    let data: Vec<u8> = (0..20_000u32).map(|i| (i % 97) as u8 ^ (i / 500) as u8).collect();
    let (client, server) = tokio::io::duplex(64);
    let mut client = client.compat_write();

    let mut encoder = encode::Encoder::new(CompressionLevel::Low);
    let encode = encoder.into_async(&mut client).encode_all(&data[..], data.len());

    let mut recv_buffer = vec![];
    let mut decoder = decode::Decoder::new();
    let decode = decoder
        .into_async(&mut recv_buffer)
        .decode_all(server.compat(), Some(data.len()));

    let (encode, decode) = tokio::join!(encode, decode);
    encode.status.expect("Could send/encoded data");
    decode.status.expect("Could recv/decode data");
    assert_eq!(recv_buffer, data);
}

#[test]
fn image_over_stream() {
    let palette: Palette = (0..=255u8).map(|i| Rgb::new(i, 255 - i, i / 2)).collect();
    let mut image = Image::new(320, 200, 8)
        .unwrap()
        .with_palette(palette)
        .unwrap();
    for (i, pixel) in image.buffer_mut().iter_mut().enumerate() {
        *pixel = ((i % 320) ^ (i / 320)) as u8;
    }

    let rt = tokio::runtime::Runtime::new().expect("runtime");
    let _enter = rt.enter();
    let (mut send, mut recv) = rt.block_on(pair());
    rt.block_on(assert_image_through(&image, &mut send, &mut recv));
}

#[test]
fn progress_reaches_total() {
    let data: Vec<u8> = (0..50_000u32).map(|i| (i * i % 251) as u8).collect();

    let seen = Arc::new(Mutex::new(Vec::<Progress>::new()));
    let sink = Arc::clone(&seen);
    let config = Configuration::new()
        .with_progress_increment(4096)
        .on_progress(move |p| sink.lock().unwrap().push(p));

    let compressed = encode::Encoder::with_config(CompressionLevel::Low, config.clone())
        .encode(&data)
        .unwrap();
    let encoded: Vec<Progress> = seen.lock().unwrap().drain(..).collect();
    assert!(encoded.len() > 10);
    assert!(encoded.windows(2).all(|w| w[0].current < w[1].current));
    assert!(encoded.iter().all(|p| p.max == data.len()));
    assert_eq!(encoded.last().map(|p| p.current), Some(data.len()));

    let decoded = decode::Decoder::with_config(config)
        .decode_exact(&compressed, data.len())
        .unwrap();
    assert_eq!(decoded, data);
    let last = seen.lock().unwrap().last().copied();
    assert_eq!(
        last,
        Some(Progress {
            max: data.len(),
            current: data.len()
        })
    );
}

#[test]
fn cancel_from_progress_callback() {
    let data = vec![0x42; 100_000];
    let token = CancelToken::new();
    let trigger = token.clone();
    let config = Configuration::new()
        .with_progress_increment(1000)
        .with_cancel_token(token)
        .on_progress(move |p| {
            if p.current >= 10_000 {
                trigger.cancel();
            }
        });

    let mut encoder = encode::Encoder::with_config(CompressionLevel::High, config.clone());
    let mut out = vec![];
    let result = block_on(encoder.into_async(&mut out).encode_all(&data[..], data.len()));
    assert_eq!(result.status.unwrap(), LzwStatus::Cancelled);
    assert!(result.bytes_read < data.len());

    // The token stays cancelled, so a later save stops right away.
    let image = Image::from_buffer(400, 250, 8, data).unwrap();
    let mut sink = vec![];
    let save = image.save_with(&mut sink, Compression::Lzw, CompressionLevel::Low, &config);
    let saved = block_on(save);
    assert!(matches!(saved, Err(Error::Cancelled)));
}
