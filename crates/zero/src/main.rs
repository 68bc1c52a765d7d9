//! zero demo server.
//!
//! Runs a small application on the zero engine: greetings with path
//! parameters, a wildcard route, two versioned API groups with their own
//! middleware and an optional static directory.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use zero::{handler, Engine, Routes, ServerConfig, StatusCode};
use zero_telemetry::{LogFormat, TelemetryConfig};

#[derive(Parser, Debug)]
#[command(name = "zero", about = "zero web framework demo server", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the demo application.
    Serve {
        /// Listen address.
        #[arg(long, env = "ZERO_LISTEN", default_value = "127.0.0.1:8080")]
        listen: String,

        /// Log level (overridden by RUST_LOG).
        #[arg(long, env = "ZERO_LOG_LEVEL", default_value = "info")]
        log_level: String,

        /// Log format (json or pretty).
        #[arg(long, env = "ZERO_LOG_FORMAT", default_value = "json")]
        log_format: LogFormat,

        /// Directory served under /static.
        #[arg(long, env = "ZERO_STATIC_DIR")]
        static_dir: Option<PathBuf>,

        /// Maximum request body size in bytes (default: 1048576 = 1MB).
        #[arg(long, env = "ZERO_MAX_BODY_SIZE", default_value = "1048576")]
        max_body_size: usize,
    },

    /// Print the demo application's route table.
    Routes {
        /// Include the /static route as if a directory were configured.
        #[arg(long)]
        with_static: bool,
    },
}

/// Build the demo application.
fn build_app(static_dir: Option<PathBuf>) -> Result<Engine, zero::Error> {
    let mut engine = Engine::with_defaults();

    engine.get(
        "/",
        [handler(|c| c.string(StatusCode::OK, "hello from zero\n"))],
    )?;
    engine.get(
        "/hello/:name",
        [handler(|c| {
            let greeting = format!("hello {}, you're at {}\n", c.param("name"), c.path());
            c.string(StatusCode::OK, greeting);
        })],
    )?;
    engine.get(
        "/assets/*filepath",
        [handler(|c| {
            let body = serde_json::json!({ "filepath": c.param("filepath") });
            c.json(StatusCode::OK, &body);
        })],
    )?;
    #[allow(clippy::panic)]
    engine.get(
        "/panic",
        [handler(|_| panic!("demo panic"))],
    )?;

    {
        let mut v1 = engine.group("/v1");
        v1.use_middleware([handler(|c| {
            c.set("api_version", "v1");
            c.next();
            c.set_header("x-api-version", "v1");
        })]);
        v1.get(
            "/hello",
            [handler(|c| {
                let name = c.query("name").unwrap_or_else(|| "stranger".to_string());
                c.string(StatusCode::OK, format!("hello {name}\n"));
            })],
        )?;
        v1.get(
            "/version",
            [handler(|c| {
                let version = c.get_string("api_version").unwrap_or_default().to_string();
                c.json(StatusCode::OK, &serde_json::json!({ "version": version }));
            })],
        )?;
    }

    {
        let mut v2 = engine.group("/v2");
        v2.use_middleware([handler(|c| {
            if c.header("authorization").is_none() {
                c.fail(StatusCode::UNAUTHORIZED, "missing authorization");
            }
        })]);
        v2.post(
            "/login",
            [handler(|c| {
                let body = serde_json::json!({
                    "username": c.query("username").unwrap_or_default(),
                    "received_bytes": c.body().len(),
                });
                c.json(StatusCode::OK, &body);
            })],
        )?;
        v2.get(
            "/hello/:name",
            [handler(|c| {
                let greeting = format!("hello {}, authorized\n", c.param("name"));
                c.string(StatusCode::OK, greeting);
            })],
        )?;
    }

    if let Some(dir) = static_dir {
        engine.static_files("/static", dir)?;
    }

    Ok(engine)
}

async fn run_serve(listen: &str, static_dir: Option<PathBuf>, config: ServerConfig) -> ExitCode {
    let engine = match build_app(static_dir) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(1);
        }
    };

    let addr: SocketAddr = match listen.parse() {
        Ok(a) => a,
        Err(_) => {
            eprintln!("error: invalid listen address: {}", listen);
            return ExitCode::from(1);
        }
    };

    match engine.run_with(addr, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(1)
        }
    }
}

fn run_routes(with_static: bool) -> ExitCode {
    let static_dir = with_static.then(|| PathBuf::from("."));
    match build_app(static_dir) {
        Ok(engine) => {
            for (method, pattern, handlers) in engine.routes() {
                println!("{:<8} {:<24} {} handler(s)", method.as_str(), pattern, handlers);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(1)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            listen,
            log_level,
            log_format,
            static_dir,
            max_body_size,
        } => {
            let config = TelemetryConfig::new()
                .with_log_level(log_level)
                .with_log_format(log_format);
            if let Err(e) = zero_telemetry::init(&config) {
                eprintln!("error: {}", e);
                return ExitCode::from(1);
            }
            let server = ServerConfig::default().with_max_body_size(max_body_size);
            run_serve(&listen, static_dir, server).await
        }
        Commands::Routes { with_static } => run_routes(with_static),
    }
}
