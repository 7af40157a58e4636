//! Command-line front end for the volume filters

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use voxfilter::{
    read_volume, write_volume, AdaptiveMedianFilter, AdaptiveMedianParams, AdaptiveWienerFilter, MedianFilter,
    MedianParams, VolumeGrid, VolumeResult, WienerParams, WienerStrategy, WriteOptions,
};

const USAGE: &str = "Usage:
  voxfilter median          <input> <output> <radius> [--compress]
  voxfilter adaptive-median <input> <output> <radius> <max-radius> [--compress]
  voxfilter wiener          <input> <output> <radius> <noise-variance> [--compress]
  voxfilter wiener-global   <input> <output> <radius> <noise-variance> [--compress]";

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Median(MedianParams),
    AdaptiveMedian(AdaptiveMedianParams),
    Wiener(WienerParams),
}

#[derive(Debug)]
struct Invocation {
    command: Command,
    input: PathBuf,
    output: PathBuf,
    options: WriteOptions,
}

fn parse_value<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid {}: '{}'\n{}", name, value, USAGE))
}

/// Parse the command line; `Ok(None)` means help was requested
fn parse_args(args: &[String]) -> Result<Option<Invocation>> {
    let mut options = WriteOptions::default();
    let mut positional: Vec<&str> = Vec::new();
    for arg in args {
        match arg.as_str() {
            "--compress" => options.compress = true,
            "-h" | "--help" => return Ok(None),
            flag if flag.starts_with("--") => bail!("Unknown option '{}'\n{}", flag, USAGE),
            value => positional.push(value),
        }
    }

    let (name, rest) = match positional.split_first() {
        Some((name, rest)) => (*name, rest),
        None => bail!("Missing filter name\n{}", USAGE),
    };

    let expected = match name {
        "median" => 3,
        "adaptive-median" | "wiener" | "wiener-global" => 4,
        other => bail!("Unknown filter '{}'\n{}", other, USAGE),
    };
    if rest.len() != expected {
        bail!(
            "'{}' expects {} arguments, got {}\n{}",
            name,
            expected,
            rest.len(),
            USAGE
        );
    }

    let radius: usize = parse_value("radius", rest[2])?;
    let command = match name {
        "median" => Command::Median(MedianParams { radius }),
        "adaptive-median" => Command::AdaptiveMedian(AdaptiveMedianParams {
            radius,
            max_radius: parse_value("max radius", rest[3])?,
        }),
        "wiener" | "wiener-global" => Command::Wiener(WienerParams {
            radius,
            noise_variance: parse_value("noise variance", rest[3])?,
            strategy: if name == "wiener" {
                WienerStrategy::LocalStatistics
            } else {
                WienerStrategy::GlobalVariance
            },
            stencil: None,
        }),
        other => bail!("Unknown filter '{}'\n{}", other, USAGE),
    };

    Ok(Some(Invocation {
        command,
        input: PathBuf::from(rest[0]),
        output: PathBuf::from(rest[1]),
        options,
    }))
}

enum Filter {
    Median(MedianFilter),
    AdaptiveMedian(AdaptiveMedianFilter),
    Wiener(AdaptiveWienerFilter),
}

impl Filter {
    /// Build and validate the filter before any input is read
    fn build(command: &Command) -> VolumeResult<Self> {
        Ok(match command {
            Command::Median(params) => Filter::Median(MedianFilter::new(*params)),
            Command::AdaptiveMedian(params) => Filter::AdaptiveMedian(AdaptiveMedianFilter::new(*params)?),
            Command::Wiener(params) => Filter::Wiener(AdaptiveWienerFilter::new(params.clone())?),
        })
    }

    fn apply(&self, input: &VolumeGrid) -> VolumeResult<VolumeGrid> {
        match self {
            Filter::Median(filter) => filter.apply_filter(input),
            Filter::AdaptiveMedian(filter) => filter.apply_filter(input),
            Filter::Wiener(filter) => filter.apply_filter(input),
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = match parse_args(&args)? {
        Some(invocation) => invocation,
        None => {
            println!("{}", USAGE);
            return Ok(());
        }
    };
    log::debug!("Invocation: {:?}", invocation);

    let filter = Filter::build(&invocation.command).context("Invalid filter parameters")?;

    let input = read_volume(&invocation.input)
        .with_context(|| format!("Failed to read volume {}", invocation.input.display()))?;
    let output = filter.apply(&input).context("Filtering failed")?;
    write_volume(&invocation.output, &output, invocation.options)
        .with_context(|| format!("Failed to write volume {}", invocation.output.display()))?;

    Ok(())
}
