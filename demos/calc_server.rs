use std::time::Duration;

use calc_rpc::{OperationTable, ServerConfig, TcpServer, DEFAULT_HOST, DEFAULT_PORT};
use clap::Parser;

#[derive(Parser)]
#[command(name = "calc_server")]
#[command(about = "line-delimited calculator rpc server", long_about = None)]
struct Args {
    /// interface to bind
    #[arg(long, env = "CALC_HOST", default_value = DEFAULT_HOST)]
    host: String,
    /// port to bind
    #[arg(long, env = "CALC_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,
    /// close sessions idle for this many seconds
    #[arg(long)]
    idle_timeout: Option<u64>,
    /// number of may worker threads
    #[arg(long, default_value_t = 2)]
    workers: usize,
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    may::config().set_workers(args.workers);

    let config = ServerConfig {
        host: args.host,
        port: args.port,
        idle_timeout: args.idle_timeout.map(Duration::from_secs),
    };

    let server = match OperationTable::standard().start_with_config(&config) {
        Ok(server) => server,
        Err(e) => {
            eprintln!("calc_server: {e}");
            std::process::exit(1);
        }
    };
    println!("Server ready");
    server.join().ok();
}
