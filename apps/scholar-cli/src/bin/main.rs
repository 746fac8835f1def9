use std::env;

use scholar_cli::{init_tracing, load_config, read_stdin, request_from_args};
use scholar_hybrid::SearchGateway;

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        eprintln!("Usage: {} <query|request> [args...]", prog);
        eprintln!("  query <text> [--method embedding|keyword] [--size N]");
        eprintln!("  request            read {{\"query\",\"method\",\"size\"}} JSON from stdin");
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let (cmd, args) = parse_args();
    if cmd != "query" && cmd != "request" {
        eprintln!("Unknown command: {}", cmd);
        std::process::exit(1);
    }

    let config = load_config()?;
    let settings = config.settings()?;
    let gateway = SearchGateway::connect(&settings, config.posture())?;

    let response = if cmd == "query" {
        gateway.handle(request_from_args(&args)?).await
    } else {
        gateway.handle_json(&read_stdin()?).await
    };
    println!("{}", serde_json::to_string_pretty(&response.body)?);
    if !response.is_success() {
        std::process::exit(i32::from(response.status / 100));
    }
    Ok(())
}
