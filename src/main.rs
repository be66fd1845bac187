use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::Result;
use is_terminal::IsTerminal;
use tracing_subscriber::EnvFilter;

use modelrun::cli::Cli;
use modelrun::config::Config;
use modelrun::params::{ParamValue, Params};
use modelrun::pipeline;
use modelrun::registry::Registry;
use modelrun::table::DatasetSource;

const USAGE: &str = "Usage: modelrun <technique> <data_file> [param=value ...]";

fn main() -> Result<()> {
    let args = Cli::parse();
    let cfg = Config::load();

    // Diagnostics go to stderr; stdout carries exactly one JSON document.
    let filter = EnvFilter::try_from_env("MODELRUN_LOG")
        .unwrap_or_else(|_| EnvFilter::new(cfg.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let (technique, data_file) = match (args.technique, args.data_file) {
        (Some(technique), Some(data_file)) => (technique, data_file),
        _ => {
            println!("{}", serde_json::json!({ "error": USAGE }));
            std::process::exit(1);
        }
    };

    let mut params = Params::from_cli_tokens(&args.params);
    if !params.contains("random_state") {
        params.insert("random_state", ParamValue::Int(cfg.random_seed() as i64));
    }
    if !params.contains("periods") {
        params.insert("periods", ParamValue::Int(cfg.forecast_horizon() as i64));
    }

    let source = if data_file == "-" {
        let mut buf = String::new();
        if !io::stdin().is_terminal() {
            io::stdin().read_to_string(&mut buf)?;
        }
        DatasetSource::Inline(buf)
    } else {
        DatasetSource::File(PathBuf::from(data_file))
    };

    let registry = Registry::builtin();
    let envelope = pipeline::execute(&registry, &technique, &source, params);

    let doc = if args.pretty || cfg.get_bool("PRETTY_JSON") {
        serde_json::to_string_pretty(&envelope)?
    } else {
        serde_json::to_string(&envelope)?
    };
    println!("{doc}");
    Ok(())
}
