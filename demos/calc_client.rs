use std::time::Duration;

use calc_rpc::{CalcClient, ClientConfig, Response, DEFAULT_HOST, DEFAULT_PORT};
use clap::Parser;

#[derive(Parser)]
#[command(name = "calc_client")]
#[command(about = "calls the calculator rpc server", long_about = None)]
struct Args {
    /// server host
    #[arg(long, env = "CALC_HOST", default_value = DEFAULT_HOST)]
    host: String,
    /// server port
    #[arg(long, env = "CALC_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,
    /// give up on a response after this many milliseconds
    #[arg(long)]
    timeout: Option<u64>,
    /// calls to make, each as `<operation> <a> <b>`, e.g. `add 3 4 div 10 0`
    #[arg(num_args = 3.., required = true, allow_hyphen_values = true)]
    calls: Vec<String>,
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if args.calls.len() % 3 != 0 {
        eprintln!("calc_client: every call needs an operation and two operands");
        std::process::exit(2);
    }

    let config = ClientConfig {
        host: args.host,
        port: args.port,
        timeout: args.timeout.map(Duration::from_millis),
    };
    let mut client = match CalcClient::connect_with_config(&config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("calc_client: {e}");
            std::process::exit(1);
        }
    };

    for call in args.calls.chunks(3) {
        let op = call[0].to_ascii_lowercase();
        match client.call_raw(&op, &call[1], &call[2]) {
            Ok(rsp @ Response::Ok { .. }) => println!("{rsp}"),
            Ok(rsp) => println!("fault: {rsp}"),
            Err(e) => {
                eprintln!("calc_client: {e}");
                std::process::exit(1);
            }
        }
    }
}
