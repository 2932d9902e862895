// Copyright (c) 2018-2025  Brendan Molloy <brendan@bbqsrc.net>,
//                          Ilya Solovyiov <ilya.solovyiov@gmail.com>,
//                          Kai Ren <tyranron@gmail.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Replays a recorded Cucumber Messages stream, printing the reporting
//! messages as newline-delimited JSON.

use std::{
    fs::File,
    io::{self, BufReader},
    path::PathBuf,
    process::ExitCode,
};

use clap::Parser;
use cucumber_lifecycle::{
    Config, Error, Hooks, Result, Runtime, read_ndjson, writer,
};
use futures::executor::block_on;
use tracing_subscriber::{
    EnvFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

/// Replays a Cucumber Messages NDJSON stream through the lifecycle
/// translator.
#[derive(Debug, Parser)]
#[command(name = "cucumber-lifecycle", version, about)]
struct Cli {
    /// NDJSON file to read envelopes from. Standard input is read if absent.
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// JSON file with reporting options (`{"tagsInTitle": true, ...}`).
    ///
    /// Flags given on the command line are enabled on top of it.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbosity of the diagnostics printed to standard error, in the
    /// `RUST_LOG` syntax. `RUST_LOG` itself takes precedence, if set.
    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    log_level: String,

    /// Reporting options.
    #[command(flatten)]
    options: Config,
}

impl Cli {
    /// Resolves the final [`Config`] out of the configuration file and the
    /// flags.
    fn resolve_config(&self) -> Result<Config> {
        let Some(path) = &self.config else {
            return Ok(self.options);
        };
        let file: Config =
            serde_json::from_reader(BufReader::new(File::open(path)?))?;
        let flags = self.options;
        Ok(Config {
            tags_in_title: file.tags_in_title || flags.tags_in_title,
            ignore_undefined_definitions: file.ignore_undefined_definitions
                || flags.ignore_undefined_definitions,
            fail_ambiguous_definitions: file.fail_ambiguous_definitions
                || flags.fail_ambiguous_definitions,
            scenario_level_reporter: file.scenario_level_reporter
                || flags.scenario_level_reporter,
            fail_fast: file.fail_fast || flags.fail_fast,
        })
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match block_on(replay(&cli)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %e, "replay failed");
            ExitCode::FAILURE
        }
    }
}

/// Replays the input described by the given [`Cli`], returning whether the
/// run succeeded.
async fn replay(cli: &Cli) -> Result<bool> {
    let config = cli.resolve_config()?;
    let input: Box<dyn io::Read> = match &cli.input {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(io::stdin().lock()),
    };

    let output = writer::Json::new(io::stdout().lock());
    let mut runtime = Runtime::new(config, Hooks::new(), output);
    let mut decoding: Option<Error> = None;
    for envelope in read_ndjson(input) {
        match envelope {
            Ok(envelope) => runtime.handle(envelope).await,
            Err(e) => {
                decoding = Some(e);
                break;
            }
        }
        if runtime.is_aborted() {
            break;
        }
    }

    let (summary, writer) = runtime.finish().await;
    drop(writer.into_inner()?);
    if let Some(e) = decoding {
        return Err(e);
    }
    Ok(summary.success)
}
