use std::env;
use std::error::Error;
use std::io::{self, BufRead, Write};

use kosa::config::{self, ClientConfig};
use kosa::BaseClient;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

struct Config {
    client: ClientConfig,
    expect_output: bool,
}

fn parse_args() -> Result<Config, Box<dyn Error>> {
    let args: Vec<String> = env::args().collect();
    let mut config = Config {
        client: ClientConfig::from_env()?,
        expect_output: true,
    };

    let mut positional = 0;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--no-output" => config.expect_output = false,
            "-h" | "--help" => {
                return Err("Usage: kosa_shell [host] [port] [--no-output]".into());
            }
            arg if positional == 0 => {
                config.client.host = arg.to_string();
                positional += 1;
            }
            arg if positional == 1 => {
                config.client.port = config::parse_port(arg)?;
                positional += 1;
            }
            arg => warn!(arg, "ignoring extra argument"),
        }
        i += 1;
    }
    config.client.validate()?;
    Ok(config)
}

fn print_unsolicited(client: &mut BaseClient, out: &mut impl Write) -> Result<(), Box<dyn Error>> {
    while let Some(message) = client.get_message_non_blocking()? {
        write!(out, "{}", message)?;
    }
    out.flush()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let config = parse_args()?;
    let mut client = BaseClient::with_config(&config.client)?;
    info!(host = %config.client.host, port = config.client.port, "connected");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line = String::new();

    loop {
        print_unsolicited(&mut client, &mut stdout)?;
        write!(stdout, "> ")?;
        stdout.flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let command = line.trim_end_matches(['\r', '\n']);
        if command.is_empty() {
            continue;
        }
        if command.eq_ignore_ascii_case("quit") {
            break;
        }

        // Broadcasts and replies that arrived after the prompt was drawn
        // are drained before the command goes out; show them.
        let mut drained = Vec::new();
        let reply = client.perform_command_with(command, config.expect_output, |stale| {
            drained.push(stale.to_owned())
        })?;
        for message in drained {
            write!(stdout, "{}", message)?;
        }

        match reply {
            Some(reply) => writeln!(stdout, "{}", reply)?,
            None if config.expect_output => {
                warn!("server closed the connection");
                break;
            }
            None => {}
        }
    }

    client.close()?;
    Ok(())
}
