use std::collections::HashMap;
use std::process;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use docgate::transport::{ServerConfig, serve};
use docgate::{DOCGATE_VERSION, GateConfig, SubmissionService};

const USAGE: &str = "\
Usage: docgate [--host <addr>] [--port <port>] [--endpoint <url>] [--capacity <n>] [--window <duration>]

Options:
  --host <addr>          Listen address [default: 0.0.0.0]
  --port <port>          Listen port [default: 5000]
  --endpoint <url>       Registration endpoint [env: DOCGATE_ENDPOINT]
  --capacity <n>         Admissions per window [env: DOCGATE_CAPACITY, default: 10]
  --window <duration>    second, minute, hour, day or <n>ms|s|m|h [env: DOCGATE_WINDOW, default: second]";

#[derive(Debug, Default)]
struct Args {
    server: ServerConfig,
    /// Flag values keyed by the environment variable they override.
    overrides: HashMap<&'static str, String>,
}

fn init_tracing() {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match std::env::var("DOCGATE_LOG").as_deref() {
            Ok("debug") => "debug",
            Ok("trace") => "trace",
            Ok("warn") | Ok("warning") => "warn",
            Ok("error") => "error",
            _ => "info",
        };
        EnvFilter::new(format!("docgate={level}"))
    };

    let use_json = std::env::var("LOG_FORMAT").as_deref() == Ok("json");

    if use_json {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    }
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut parsed = Args::default();

    let mut i = 1; // skip argv[0]
    while i < args.len() {
        let flag = args[i].as_str();
        let mut value = |name: &str| -> Result<String, String> {
            i += 1;
            args.get(i)
                .cloned()
                .ok_or_else(|| format!("{name} requires a value"))
        };

        match flag {
            "--host" => parsed.server.host = value("--host")?,
            "--port" => {
                let raw = value("--port")?;
                parsed.server.port = raw
                    .parse()
                    .map_err(|_| format!("invalid port: {raw}"))?;
            }
            "--endpoint" => {
                let raw = value("--endpoint")?;
                parsed.overrides.insert("DOCGATE_ENDPOINT", raw);
            }
            "--capacity" => {
                let raw = value("--capacity")?;
                parsed.overrides.insert("DOCGATE_CAPACITY", raw);
            }
            "--window" => {
                let raw = value("--window")?;
                parsed.overrides.insert("DOCGATE_WINDOW", raw);
            }
            "--help" | "-h" => return Err(String::new()),
            arg => return Err(format!("unknown argument: {arg}")),
        }
        i += 1;
    }

    Ok(parsed)
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    let args = match parse_args(&args) {
        Ok(v) => v,
        Err(msg) => {
            if !msg.is_empty() {
                eprintln!("error: {msg}");
                eprintln!();
            }
            eprintln!("{USAGE}");
            process::exit(2);
        }
    };

    init_tracing();

    if let Err(e) = run(args).await {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    info!("docgate {}", DOCGATE_VERSION);

    let overrides = args.overrides;
    let gate = GateConfig::from_lookup(|key| {
        overrides
            .get(key)
            .cloned()
            .or_else(|| std::env::var(key).ok())
    })?;

    let service = Arc::new(SubmissionService::start(&gate)?);
    serve(args.server, service).await
}
