//! Command line access to the LZW coder and the APLIMG container.
#![forbid(unsafe_code)]
use std::io::{self, Read, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::process::ExitCode;
use std::{fs, time::Instant};

use aplimg::error::{Error, Result};
use aplimg::image::HEADER_LEN;
use aplimg::{decode, encode, Compression, CompressionLevel, Configuration, Header, Image, Palette};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use futures::executor::block_on;
use futures::io::AllowStdIo;

fn main() -> CodingResult {
    env_logger::builder().format_timestamp(None).init();
    let matches = command().get_matches();
    CodingResult::catch_panic(|| run(&matches))
}

fn run(matches: &ArgMatches) -> Result<()> {
    let start = Instant::now();
    let result = match matches.subcommand() {
        Some(("encode", args)) => encode_raw(args),
        Some(("decode", args)) => decode_raw(args),
        Some(("pack", args)) => pack(args),
        Some(("unpack", args)) => unpack(args),
        Some(("info", args)) => info(args),
        _ => unreachable!("subcommand is required"),
    };
    log::debug!("finished in {:.3} seconds", start.elapsed().as_secs_f32());
    result
}

fn encode_raw(args: &ArgMatches) -> Result<()> {
    let data = read_input(args)?;
    let mut encoder = encode::Encoder::with_config(level(args), config(args));
    let output = AllowStdIo::new(open_output(args)?);

    let written = block_on(encoder.into_async(output).encode_all(&data[..], data.len()))
        .into_result()?;
    log::info!("Compressed from {} to {} bytes.", data.len(), written);
    Ok(())
}

fn decode_raw(args: &ArgMatches) -> Result<()> {
    let input: Box<dyn Read> = match input_path(args) {
        Some(path) => Box::new(io::BufReader::new(fs::File::open(path)?)),
        None => Box::new(io::stdin().lock()),
    };
    let mut decoder = decode::Decoder::with_config(config(args));
    let output = AllowStdIo::new(open_output(args)?);

    let result = block_on(decoder.into_async(output).decode_all(AllowStdIo::new(input), None));
    let read = result.bytes_read;
    let written = result.into_result()?;
    log::info!("Decompressed from {} to {} bytes.", read, written);
    Ok(())
}

fn pack(args: &ArgMatches) -> Result<()> {
    let width = *args.get_one::<u16>("width").unwrap_or(&0);
    let height = *args.get_one::<u16>("height").unwrap_or(&0);
    let bpp = *args.get_one::<u8>("bpp").unwrap_or(&8);
    let planes = *args.get_one::<u8>("planes").unwrap_or(&1);

    let pixels = read_input(args)?;
    let mut image = Image::from_buffer(width, height, bpp, pixels)?.with_planes(planes)?;
    if let Some(path) = args.get_one::<PathBuf>("palette") {
        let palette = Palette::from_bytes(&fs::read(path)?);
        image = image.with_palette(palette)?;
    }

    let compression = if args.get_flag("store") {
        Compression::None
    } else {
        Compression::Lzw
    };
    let mut output = AllowStdIo::new(open_output(args)?);
    let written = block_on(image.save(&mut output, compression, level(args)))?;
    log::info!(
        "Packed {}x{} image of {} bytes into {} bytes.",
        width,
        height,
        image.data_size(),
        written
    );
    Ok(())
}

fn unpack(args: &ArgMatches) -> Result<()> {
    let data = read_input(args)?;
    let image = Image::from_bytes(&data)?;
    log::info!(
        "Unpacked {}x{} image, {} bits per pixel, {} planes.",
        image.width(),
        image.height(),
        image.bpp(),
        image.planes()
    );

    let mut output = open_output(args)?;
    output.write_all(image.buffer())?;
    output.flush()?;

    if let Some(path) = args.get_one::<PathBuf>("palette") {
        match image.palette() {
            Some(palette) => fs::write(path, palette.to_bytes())?,
            None => log::warn!("image has no palette, {} not written", path.display()),
        }
    }
    Ok(())
}

fn info(args: &ArgMatches) -> Result<()> {
    let data = read_input(args)?;
    let mut raw = [0; HEADER_LEN];
    match data.get(..HEADER_LEN) {
        Some(bytes) => raw.copy_from_slice(bytes),
        None => return Err(Error::UnexpectedEndOfStream),
    }
    let header = Header::parse(&raw)?;

    let mut out = io::stdout().lock();
    writeln!(out, "version:     {}.{}", header.major_version, header.minor_version)?;
    writeln!(out, "dimensions:  {}x{}", header.width, header.height)?;
    writeln!(out, "bpp:         {}", header.bpp)?;
    writeln!(out, "planes:      {}", header.planes)?;
    if header.has_palette {
        writeln!(out, "palette:     {} colors", header.palette_size)?;
    } else {
        writeln!(out, "palette:     none")?;
    }
    writeln!(out, "compression: {:?}", header.compression)?;
    writeln!(out, "level:       {:?}", header.compression_level)?;
    writeln!(out, "data size:   {}", header.data_size)?;
    writeln!(out, "file size:   {}", data.len())?;
    if let Err(err) = header.validate() {
        writeln!(out, "invalid:     {}", err)?;
    }
    Ok(())
}

fn level(args: &ArgMatches) -> CompressionLevel {
    match args.get_one::<String>("level").map(String::as_str) {
        Some("low") => CompressionLevel::Low,
        Some("medium") => CompressionLevel::Medium,
        Some("high") | None => CompressionLevel::High,
        Some(_) => unreachable!("unparsed level"),
    }
}

fn config(args: &ArgMatches) -> Configuration {
    Configuration::new().with_append_total(args.get_flag("total"))
}

/// The input file, `None` for stdin.
fn input_path(args: &ArgMatches) -> Option<&PathBuf> {
    args.get_one::<PathBuf>("input").filter(|path| path.as_os_str() != "-")
}

fn read_input(args: &ArgMatches) -> io::Result<Vec<u8>> {
    match input_path(args) {
        Some(path) => fs::read(path),
        None => {
            let mut data = vec![];
            io::stdin().lock().read_to_end(&mut data)?;
            Ok(data)
        }
    }
}

fn open_output(args: &ArgMatches) -> io::Result<Box<dyn Write>> {
    match args.get_one::<PathBuf>("output") {
        Some(path) => Ok(Box::new(io::BufWriter::new(fs::File::create(path)?))),
        None => Ok(Box::new(io::BufWriter::new(io::stdout().lock()))),
    }
}

fn input_arg() -> Arg {
    Arg::new("input")
        .help("Input file, '-' for stdin")
        .default_value("-")
        .value_parser(value_parser!(PathBuf))
}

fn output_arg() -> Arg {
    Arg::new("output")
        .short('o')
        .long("output")
        .value_name("FILE")
        .help("Output file, stdout when missing")
        .value_parser(value_parser!(PathBuf))
}

fn level_arg() -> Arg {
    Arg::new("level")
        .short('l')
        .long("level")
        .help("Compression level, high uses 13 bit codes")
        .default_value("high")
        .value_parser(["low", "medium", "high"])
}

fn total_arg() -> Arg {
    Arg::new("total")
        .long("total")
        .help("The stream stores its uncompressed length")
        .action(ArgAction::SetTrue)
}

fn command() -> Command {
    Command::new("aplimg")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Interact with LZW streams and APLIMG containers")
        .subcommand_required(true)
        .subcommand(
            Command::new("encode")
                .about("Compress raw bytes into an LZW stream")
                .arg(level_arg())
                .arg(total_arg())
                .arg(output_arg())
                .arg(input_arg()),
        )
        .subcommand(
            Command::new("decode")
                .about("Decompress an LZW stream")
                .arg(total_arg())
                .arg(output_arg())
                .arg(input_arg()),
        )
        .subcommand(
            Command::new("pack")
                .about("Wrap raw pixels into a container")
                .arg(
                    Arg::new("width")
                        .long("width")
                        .required(true)
                        .value_parser(value_parser!(u16)),
                )
                .arg(
                    Arg::new("height")
                        .long("height")
                        .required(true)
                        .value_parser(value_parser!(u16)),
                )
                .arg(
                    Arg::new("bpp")
                        .long("bpp")
                        .default_value("8")
                        .value_parser(value_parser!(u8).range(1..=32)),
                )
                .arg(
                    Arg::new("planes")
                        .long("planes")
                        .default_value("1")
                        .value_parser(value_parser!(u8).range(1..)),
                )
                .arg(
                    Arg::new("palette")
                        .long("palette")
                        .value_name("FILE")
                        .help("Palette as packed RGB triples")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("store")
                        .long("store")
                        .help("Store the pixels without compression")
                        .action(ArgAction::SetTrue),
                )
                .arg(level_arg())
                .arg(output_arg())
                .arg(input_arg()),
        )
        .subcommand(
            Command::new("unpack")
                .about("Extract the raw pixels of a container")
                .arg(
                    Arg::new("palette")
                        .long("palette")
                        .value_name("FILE")
                        .help("Also write the palette as packed RGB triples")
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(output_arg())
                .arg(input_arg()),
        )
        .subcommand(
            Command::new("info")
                .about("Print the header of a container")
                .arg(input_arg()),
        )
}

enum CodingResult {
    Ok,
    Err(Error),
    Panic,
}

impl CodingResult {
    fn catch_panic(op: impl FnOnce() -> Result<()>) -> Self {
        panic::catch_unwind(AssertUnwindSafe(|| match op() {
            Ok(()) => CodingResult::Ok,
            Err(err) => CodingResult::Err(err),
        }))
        .unwrap_or(CodingResult::Panic)
    }
}

impl std::process::Termination for CodingResult {
    fn report(self) -> ExitCode {
        match self {
            CodingResult::Ok => ExitCode::SUCCESS,
            CodingResult::Err(err) => {
                eprintln!("{}", err);
                ExitCode::FAILURE
            }
            CodingResult::Panic => {
                eprintln!(
                    "The process failed irrecoverably! This should never happen and is a bug."
                );
                ExitCode::from(128)
            }
        }
    }
}
