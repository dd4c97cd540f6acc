//! xsum CLI binary.

use clap::Parser;
use std::process;

use xsum::cli::{self, Cli};
use xsum::config::XsumConfig;
use xsum::logging::{init_logging, LoggingConfig};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match XsumConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("xsum: {}", e);
            process::exit(2);
        }
    };

    let logging = build_logging_config(&cli, &config);
    if let Err(e) = init_logging(Some(&logging)) {
        eprintln!("xsum: failed to initialize logging: {}", e);
        process::exit(2);
    }

    let code = cli::run(cli, &config).await;
    process::exit(code);
}

fn build_logging_config(cli: &Cli, config: &XsumConfig) -> LoggingConfig {
    if cli.verbose {
        let mut logging = config.logging.clone();
        if logging.level == "off" || logging.level == "warn" {
            logging.level = "debug".to_string();
        }
        return logging;
    }
    config.logging.clone()
}
