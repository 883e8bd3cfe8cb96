use clap::{App, Arg};
use log::info;

use socks5d::config::Config;
use socks5d::error::{Error, Result};
use socks5d::socks5::Socks5Listener;

fn app() -> App<'static, 'static> {
    App::new("socks5d")
        .version("0.1.0")
        .author("南浦月 <nanpuyue@gmail.com>")
        .about("SOCKS5 proxy server")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("CONFIG")
                .help("Specify the config file")
                .takes_value(true)
                .required(true),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = app().get_matches();

    let config_path = matches
        .value_of("config")
        .ok_or_else(|| Error::Config("missing --config".into()))?;
    let config = Config::load(config_path)?;

    let mut logger = env_logger::Builder::new();
    logger.filter_level(config.log_level());
    if let Ok(filters) = std::env::var("RUST_LOG") {
        logger.parse_filters(&filters);
    }
    logger.init();

    let policy = config.policy()?;
    if policy.credentials.is_some() {
        info!("username/password authentication enabled");
    }

    let listener = Socks5Listener::listen(config.local(), policy, config.timeout()).await?;
    info!("listening on {}", listener.local_addr()?);
    listener.handle_incoming().await
}
