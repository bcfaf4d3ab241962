//! Memorabilia CLI Client
//!
//! Interactive command-line client.

use bytes::Bytes;
use clap::Parser;
use memorabilia::protocol::Command;
use memorabilia::Client;
use std::io::{self, Write};

/// Memorabilia CLI - Interactive Client
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Server host
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = 50051)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    println!("Connecting to Memorabilia at {}...", addr);

    let mut client = Client::connect(&addr).await?;

    println!("Connected! Type 'help' for available commands, 'quit' to exit.\n");

    loop {
        print!("memorabilia> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit") {
            println!("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("help") {
            print_help();
            continue;
        }

        match parse_command(input) {
            Ok(cmd) => match client.request(cmd).await {
                Ok(response) => println!("{}", response),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    break;
                }
            },
            Err(e) => {
                eprintln!("Error: {}", e);
            }
        }
    }

    Ok(())
}

fn parse_command(input: &str) -> anyhow::Result<Command> {
    let parts: Vec<&str> = input.split_whitespace().collect();

    let Some(first) = parts.first() else {
        anyhow::bail!("Empty command");
    };
    let cmd = first.to_uppercase();

    match cmd.as_str() {
        "ECHO" => Ok(Command::Echo {
            message: Bytes::from(parts[1..].join(" ")),
        }),

        "GET" => {
            if parts.len() != 2 {
                anyhow::bail!("GET requires a key: GET <key>");
            }
            Ok(Command::Get {
                key: parts[1].to_string(),
            })
        }

        "SET" => {
            if parts.len() < 3 || parts.len() > 4 {
                anyhow::bail!("SET requires key and value: SET <key> <value> [ttl_ms]");
            }
            let ttl_ms = match parts.get(3) {
                Some(ttl) => ttl.parse::<u64>()?,
                None => 0,
            };
            Ok(Command::Set {
                key: parts[1].to_string(),
                value: parts[2].to_string(),
                ttl_ms,
            })
        }

        "DEL" => {
            if parts.len() < 2 {
                anyhow::bail!("DEL requires at least one key: DEL <key> [key ...]");
            }
            if parts.len() == 2 {
                Ok(Command::Del {
                    key: parts[1].to_string(),
                })
            } else {
                Ok(Command::BatchDel {
                    keys: parts[1..].iter().map(|k| k.to_string()).collect(),
                })
            }
        }

        "EXPIRED" => Ok(Command::ExpiredKeys),

        "CLEANUP" => Ok(Command::Cleanup),

        _ => anyhow::bail!("Unknown command: {}. Type 'help' for available commands.", cmd),
    }
}

fn print_help() {
    println!(
        r#"
Available commands:

  ECHO <message>              - Check server connectivity
  GET <key>                   - Get value for key
  SET <key> <value> [ttl_ms]  - Set key-value pair with optional TTL in milliseconds
  DEL <key> [key ...]         - Delete one or more keys
  EXPIRED                     - List keys past their TTL
  CLEANUP                     - Remove expired keys now

  help                        - Show this help
  quit / exit                 - Exit the CLI

Examples:
  SET counter 10
  SET session abc 60000   (expires in 60 seconds)
  GET counter
  DEL counter session
"#
    );
}
