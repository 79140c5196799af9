//! Minimal CLI parsing for the probe binary.

use std::env;

use anyhow::{Context, Result, bail};

pub const USAGE: &str =
    "usage: freightline <entity> [--keywords TEXT] [--page N] [--page-size N] [--print-query]";

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CliOptions {
    pub entity: String,
    pub keywords: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub print_query: bool,
}

fn number(flag: &str, value: Option<String>) -> Result<u32> {
    let value = value.with_context(|| format!("{} needs a value", flag))?;
    value
        .parse()
        .with_context(|| format!("{} expects a number, got {:?}", flag, value))
}

impl CliOptions {
    pub fn from_args() -> Result<Self> {
        Self::parse(env::args().skip(1))
    }

    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut options = CliOptions::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--keywords" => options.keywords = args.next(),
                "--page" => options.page = Some(number("--page", args.next())?),
                "--page-size" => options.page_size = Some(number("--page-size", args.next())?),
                "--print-query" => options.print_query = true,
                _ if arg.starts_with("--keywords=") => {
                    options.keywords = arg.split_once('=').map(|(_, v)| v.to_string());
                }
                _ if arg.starts_with("--") => bail!("unknown option {}\n{}", arg, USAGE),
                _ if options.entity.is_empty() => options.entity = arg,
                _ => bail!("unexpected argument {}\n{}", arg, USAGE),
            }
        }
        if options.entity.is_empty() {
            bail!("missing entity\n{}", USAGE);
        }
        Ok(options)
    }
}
