//! Command line handling for the bzip2-engine binary.
use std::ffi::OsString;
use std::fmt::{Display, Formatter};

use clap::Parser;
use log::{info, LevelFilter};

use super::options::BzConfig;
use crate::error::Result;

/// Zip, Unzip, Test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Zip,
    Unzip,
    Test,
}
impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Define the two output channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    File,
    Stdout,
}
impl Display for Output {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Command Line Interpretation - uses external CLAP crate.
#[derive(Parser, Debug)]
#[clap(
    name = "bzip2-engine",
    version,
    about = "A block-sorting file compressor, bzip2 format",
    long_about = "
    Compresses FILE to FILE.bz2, or decompresses FILE.bz2 to FILE. With no FILE, reads standard
    input and writes standard output. Short flags may be combined, so `-v -4' means the same as
    -v4 or -4v."
)]
pub struct Args {
    /// Filename of file to process
    #[clap()]
    filename: Option<String>,

    /// Force compression
    #[clap(short = 'z', long = "compress")]
    compress: bool,

    /// Force decompression
    #[clap(short = 'd', long = "decompress")]
    decompress: bool,

    /// Test compressed file integrity
    #[clap(short = 't', long = "test")]
    test: bool,

    /// Force overwriting output file
    #[clap(short = 'f', long = "force")]
    force: bool,

    /// Keep (don't delete) input file
    #[clap(short = 'k', long = "keep")]
    keep: bool,

    /// Send output to standard out
    #[clap(short = 'c', long = "stdout")]
    stdout: bool,

    /// Block size 1..9 for 100k..900k blocks (same as -1 .. -9)
    #[clap(long = "block-size", value_parser = clap::value_parser!(u8).range(1..=9))]
    block_size: Option<u8>,

    /// Alias for -1
    #[clap(long = "fast")]
    fast: bool,

    /// Alias for -9
    #[clap(long = "best")]
    best: bool,

    /// Effort spent sorting repetitive data before switching to the fallback sort (0..250)
    #[clap(long = "workfactor", default_value_t = 30)]
    work_factor: u32,

    /// Huffman table refinement passes. 4 is the value used by the reference encoder.
    #[clap(short = 'i', long, default_value_t = 4)]
    iterations: usize,

    /// Be verbose. Repeat for more detail, -vvvvv is trace level.
    #[clap(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all messages
    #[clap(short = 'q', long = "quiet")]
    quiet: bool,
}

/// Everything the binary needs to know about one run.
#[derive(Debug)]
pub struct BzOpts {
    pub config: BzConfig,
    /// Input file; standard input when absent.
    pub file: Option<String>,
    pub op_mode: Mode,
    pub output: Output,
    /// Don't remove input files after processing
    pub keep_input_files: bool,
    /// Silently overwrite existing files with the same name
    pub force_overwrite: bool,
    pub verbosity: LevelFilter,
}

/// Turn the bzip2 style digit flags (-1 .. -9, also inside a group such as -9k) into
/// --block-size, which clap can parse.
fn expand_level_flags<I: IntoIterator<Item = OsString>>(args: I) -> Vec<OsString> {
    let mut out = Vec::new();
    for arg in args {
        let text = match arg.to_str() {
            Some(t) if t.starts_with('-') && !t.starts_with("--") && t.len() > 1 => t.to_owned(),
            _ => {
                out.push(arg);
                continue;
            }
        };
        let mut level = None;
        let mut rest = String::new();
        let mut chars = text[1..].chars();
        while let Some(c) = chars.next() {
            match c {
                '1'..='9' => level = Some(c),
                // -i takes a value; the rest of the group is that value.
                'i' => {
                    rest.push(c);
                    rest.extend(chars.by_ref());
                }
                _ => rest.push(c),
            }
        }
        if !rest.is_empty() {
            out.push(OsString::from(format!("-{}", rest)));
        }
        if let Some(level) = level {
            out.push(OsString::from(format!("--block-size={}", level)));
        }
    }
    out
}

impl BzOpts {
    /// Build the run options from parsed arguments. Later size flags win over earlier ones, and
    /// an explicit size beats --fast/--best.
    pub fn from_args(args: Args) -> Result<Self> {
        let mut block_size = 9;
        if args.fast {
            block_size = 1;
        }
        if args.best {
            block_size = 9;
        }
        if let Some(size) = args.block_size {
            block_size = size;
        }
        let config = BzConfig::new()
            .with_block_size(block_size)
            .with_work_factor(args.work_factor)
            .with_iterations(args.iterations);
        config.validate()?;

        let op_mode = if args.test {
            Mode::Test
        } else if args.decompress {
            Mode::Unzip
        } else {
            Mode::Zip
        };

        let verbosity = if args.quiet {
            LevelFilter::Off
        } else {
            match args.verbose {
                0 => LevelFilter::Off,
                1 => LevelFilter::Error,
                2 => LevelFilter::Warn,
                3 => LevelFilter::Info,
                4 => LevelFilter::Debug,
                _ => LevelFilter::Trace,
            }
        };

        // Without a file name there is nowhere to write but stdout.
        let output = if args.stdout || args.filename.is_none() {
            Output::Stdout
        } else {
            Output::File
        };

        Ok(Self {
            config,
            file: args.filename,
            op_mode,
            output,
            keep_input_files: args.keep,
            force_overwrite: args.force,
            verbosity,
        })
    }

    /// Below we report initialization status to the user
    pub fn report(&self) {
        info!("---- Bzip2 Initialization Start ----");
        info!("Verbosity set to {}", self.verbosity);
        info!("Operational mode set to {}", self.op_mode);
        match &self.file {
            Some(s) => info!("Getting input from the file {}", s),
            None => info!("Getting input from stdin"),
        }
        info!("Output goes to {}", self.output);
        info!("Block size set to {}00k", self.config.block_size);
        if self.force_overwrite {
            info!("Forcing file overwriting")
        };
        if self.keep_input_files {
            info!("Keeping input files")
        };
        info!("---- Bzip2 Initialization End ----");
    }
}

/// Parse the process command line.
pub fn bzopts_init() -> Result<BzOpts> {
    let args = Args::parse_from(expand_level_flags(std::env::args_os()));
    BzOpts::from_args(args)
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(line: &[&str]) -> BzOpts {
        let args = expand_level_flags(line.iter().map(OsString::from));
        BzOpts::from_args(Args::parse_from(args)).unwrap()
    }

    #[test]
    fn defaults_test() {
        let opts = parse(&["bzip2-engine", "file.txt"]);
        assert_eq!(opts.op_mode, Mode::Zip);
        assert_eq!(opts.output, Output::File);
        assert_eq!(opts.config, BzConfig::default());
        assert_eq!(opts.verbosity, LevelFilter::Off);
    }

    #[test]
    fn grouped_flags_test() {
        let opts = parse(&["bzip2-engine", "-4dkvv", "file.txt.bz2"]);
        assert_eq!(opts.op_mode, Mode::Unzip);
        assert_eq!(opts.config.block_size, 4);
        assert!(opts.keep_input_files);
        assert_eq!(opts.verbosity, LevelFilter::Warn);
    }

    #[test]
    fn fast_and_stdin_test() {
        let opts = parse(&["bzip2-engine", "--fast", "-t"]);
        assert_eq!(opts.config.block_size, 1);
        assert_eq!(opts.op_mode, Mode::Test);
        assert_eq!(opts.output, Output::Stdout);
        assert!(opts.file.is_none());
    }

    #[test]
    fn verbosity_levels_test() {
        let opts = parse(&["bzip2-engine", "-vvvvv", "file.txt"]);
        assert_eq!(opts.verbosity, LevelFilter::Trace);
        let opts = parse(&["bzip2-engine", "-v", "-v", "-v", "file.txt"]);
        assert_eq!(opts.verbosity, LevelFilter::Info);
        let opts = parse(&["bzip2-engine", "--verbose", "file.txt"]);
        assert_eq!(opts.verbosity, LevelFilter::Error);
        let opts = parse(&["bzip2-engine", "-vvvv", "-q", "file.txt"]);
        assert_eq!(opts.verbosity, LevelFilter::Off);
    }

    #[test]
    fn iterations_value_kept_test() {
        let opts = parse(&["bzip2-engine", "-2i6", "file.txt"]);
        assert_eq!(opts.config.block_size, 2);
        assert_eq!(opts.config.iterations, 6);
    }

    #[test]
    fn bad_work_factor_test() {
        let args = Args::parse_from(["bzip2-engine", "--workfactor", "300"]);
        assert!(BzOpts::from_args(args).is_err());
    }
}
