//! Compresses the input from stdin and writes the result to stdout.

use std::io::{self, BufWriter, Read};

use aplimg::{encode::Encoder, CompressionLevel, Configuration};
use futures::executor::block_on;
use futures::io::AllowStdIo;

fn main() {
    match (|| -> aplimg::error::Result<()> {
        let mut data = vec![];
        io::stdin().lock().read_to_end(&mut data)?;

        let config = Configuration::new().with_append_total(true);
        let mut encoder = Encoder::with_config(CompressionLevel::High, config);
        let stdout = AllowStdIo::new(BufWriter::new(io::stdout().lock()));
        block_on(encoder.into_async(stdout).encode_all(&data[..], data.len())).status?;
        Ok(())
    })() {
        Ok(()) => (),
        Err(err) => eprintln!("{}", err),
    }
}
