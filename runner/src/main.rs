use clap::{App, Arg};
use ferrite::config::ServerConfig;
use ferrite::logging;
use ferrite::net::endpoint::Endpoint;

fn main() {
    let matches = App::new("KV Server")
        .version("1.0")
        .about("Runs the in-memory key-value server.")
        .arg(
            Arg::with_name("CONFIG_FILE")
                .help("Path to the config file")
                .required(false),
        )
        .get_matches();

    let config = match matches.value_of("CONFIG_FILE") {
        Some(path) => ServerConfig::load(path),
        None => ServerConfig::default(),
    };

    let log = config.build_logger();
    let address = config.address();

    let mut endpoint = Endpoint::new(&address, &log).expect("Error starting server");

    logging::info!(log, "server listening"; "address" => %address);

    endpoint.run().expect("Fatal poll failure");
}
