//! Decompresses the input from stdin and writes the result to stdout.

use std::io::{self, BufWriter};

use aplimg::{decode::Decoder, Configuration};
use futures::executor::block_on;
use futures::io::AllowStdIo;

fn main() {
    match (|| -> aplimg::error::Result<()> {
        let config = Configuration::new().with_append_total(true);
        let mut decoder = Decoder::with_config(config);
        let stdin = AllowStdIo::new(io::stdin().lock());
        let stdout = AllowStdIo::new(BufWriter::new(io::stdout().lock()));
        block_on(decoder.into_async(stdout).decode_all(stdin, None)).status?;
        Ok(())
    })() {
        Ok(()) => (),
        Err(err) => eprintln!("{}", err),
    }
}
