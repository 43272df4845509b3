//Enable more cargo lint tests
#![warn(rust_2018_idioms)]
#![warn(clippy::disallowed_types)]

use std::{
    fs::{self, File, OpenOptions},
    io::{self, BufWriter, Read, Write},
    path::Path,
};

use bzip2_engine::session::{open, Method, Mode as SessionMode};
use bzip2_engine::tools::cli::{bzopts_init, BzOpts, Mode, Output};

use log::{error, info, warn};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

/// Bytes read from the input per feed.
const CHUNK: usize = 64 * 1024;

fn main() -> Result<(), io::Error> {
    let options = bzopts_init()?;

    // Available log levels are Error, Warn, Info, Debug, Trace
    if TermLogger::init(
        options.verbosity,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )
    .is_err()
    {
        eprintln!("bzip2-engine: logging is unavailable");
    }
    options.report();

    let result = run(&options);
    match &result {
        Ok(()) => info!("Done."),
        Err(e) => error!("{}", e),
    }
    result
}

/// Name of the file to write, or None when output goes to stdout or nowhere.
fn output_name(opts: &BzOpts) -> Option<String> {
    let file = opts.file.as_ref()?;
    if opts.output == Output::Stdout {
        return None;
    }
    match opts.op_mode {
        Mode::Zip => Some(format!("{}.bz2", file)),
        Mode::Unzip => Some(match file.strip_suffix(".bz2") {
            Some(stem) if !stem.is_empty() => stem.to_string(),
            _ => format!("{}.out", file),
        }),
        Mode::Test => None,
    }
}

/// Compress, decompress or test according to `opts`.
fn run(opts: &BzOpts) -> io::Result<()> {
    let mut input: Box<dyn Read> = match &opts.file {
        Some(name) => Box::new(File::open(name)?),
        None => Box::new(io::stdin().lock()),
    };

    let out_name = output_name(opts);
    let mut output: Box<dyn Write> = match (&out_name, opts.op_mode) {
        (Some(name), _) => {
            if Path::new(name).exists() && !opts.force_overwrite {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("output file {} already exists", name),
                ));
            }
            let f_out = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(name)?;
            Box::new(BufWriter::new(f_out))
        }
        (None, Mode::Test) => Box::new(io::sink()),
        (None, _) => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let result = pump(opts, &mut input, &mut output);

    match (&result, &out_name) {
        (Err(_), Some(name)) => {
            // Partial output is never valid.
            drop(output);
            if let Err(e) = fs::remove_file(name) {
                warn!("Could not remove partial output {}: {}", name, e);
            }
        }
        (Ok(()), _) => {
            if opts.op_mode == Mode::Test {
                if let Some(name) = &opts.file {
                    info!("{}: ok", name);
                }
            } else if let (Some(name), Some(_), false) =
                (&opts.file, &out_name, opts.keep_input_files)
            {
                fs::remove_file(name)?;
            }
        }
        _ => {}
    }
    result
}

/// Stream input through a session in CHUNK sized pieces.
fn pump(opts: &BzOpts, input: &mut dyn Read, output: &mut dyn Write) -> io::Result<()> {
    let mode = match opts.op_mode {
        Mode::Zip => SessionMode::Compress,
        Mode::Unzip | Mode::Test => SessionMode::Decompress,
    };
    let mut session = open(Method::Bzip2, mode, opts.config)?;

    let mut buf = vec![0_u8; CHUNK];
    let mut total_in = 0_u64;
    let mut total_out = 0_u64;
    loop {
        let n = match input.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        total_in += n as u64;
        session.feed(&buf[..n])?;
        let produced = session.poll()?;
        total_out += produced.len() as u64;
        output.write_all(&produced)?;
    }
    let produced = session.finish()?;
    total_out += produced.len() as u64;
    output.write_all(&produced)?;
    output.flush()?;
    session.close();

    if total_in > 0 {
        info!(
            "{} bytes in, {} bytes out ({:.3}:1).",
            total_in,
            total_out,
            total_in as f64 / total_out.max(1) as f64
        );
    }
    Ok(())
}
