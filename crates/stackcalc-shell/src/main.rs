//! Line-oriented interactive shell for the stack calculator.
//!
//! Run with: cargo run -p stackcalc-shell
//!
//! Commands: `create [depth]`, `destroy <id>`, `list [limit]`,
//! `eval <id> <tokens…>`, `get <id>`, `interact <id>`. Statement tokens
//! are integer literals, `+ - * /` for arithmetic and `.` for drop.

use std::{
    io::{self, Write},
    sync::Arc,
};

use stackcalc_core::{CalcState, Statement};
use stackcalc_session::Dispatcher;
use stackcalc_transport::{ClientMessage, LocalClient, ServerMessage};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Keep the prompt clean unless the user opts into logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let dispatcher = Arc::new(Dispatcher::new());
    let mut rpc = LocalClient::connect_rpc(Arc::clone(&dispatcher));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    prompt("stackcalc> ")?;
    while let Some(line) = lines.next_line().await? {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = parts.split_first() else {
            println!("Please enter a command.");
            prompt("stackcalc> ")?;
            continue;
        };

        match command {
            "create" => create_calc(&mut rpc, args).await,
            "destroy" => destroy_calc(&mut rpc, args).await,
            "list" => list_calcs(&mut rpc, args).await,
            "eval" => eval_statement(&mut rpc, args).await,
            "get" => get_state(&mut rpc, args).await,
            "interact" => interact(&dispatcher, &mut lines, args).await?,
            _ => println!("Command not found: {command}"),
        }
        prompt("stackcalc> ")?;
    }
    println!("Finished");
    Ok(())
}

fn prompt(text: &str) -> io::Result<()> {
    print!("{text}");
    io::stdout().flush()
}

async fn create_calc(rpc: &mut LocalClient, args: &[&str]) {
    let stack_depth = match args.first().map(|s| s.parse::<usize>()) {
        Some(Ok(depth)) => depth,
        Some(Err(_)) => {
            println!("create expects a numeric depth");
            return;
        }
        None => 3,
    };
    let resp = rpc.call(ClientMessage::CreateCalc { stack_depth }).await;
    print_response(resp);
}

async fn destroy_calc(rpc: &mut LocalClient, args: &[&str]) {
    let Some(calc_id) = args.first() else {
        println!("destroy expects a calc id");
        return;
    };
    let resp = rpc
        .call(ClientMessage::DestroyCalc {
            calc_id: (*calc_id).to_string(),
        })
        .await;
    print_response(resp);
}

async fn list_calcs(rpc: &mut LocalClient, args: &[&str]) {
    let limit = match args.first().map(|s| s.parse::<usize>()) {
        Some(Ok(limit)) => limit,
        Some(Err(_)) => {
            println!("list expects a numeric limit");
            return;
        }
        None => 10,
    };
    let resp = rpc.call(ClientMessage::ListCalcs { limit }).await;
    print_response(resp);
}

async fn eval_statement(rpc: &mut LocalClient, args: &[&str]) {
    let Some((&calc_id, tokens)) = args.split_first() else {
        println!("eval expects a calc id and tokens");
        return;
    };
    let statement = match tokens.join(" ").parse::<Statement>() {
        Ok(statement) => statement,
        Err(e) => {
            println!("Error parsing statement: {e}");
            return;
        }
    };
    let resp = rpc
        .call(ClientMessage::Evaluate {
            calc_id: calc_id.to_string(),
            statement,
        })
        .await;
    print_response(resp);
}

async fn get_state(rpc: &mut LocalClient, args: &[&str]) {
    let [calc_id] = args else {
        println!("get expects one argument");
        return;
    };
    let resp = rpc
        .call(ClientMessage::GetState {
            calc_id: (*calc_id).to_string(),
        })
        .await;
    print_response(resp);
}

/// Interactive mode: a sub-prompt bound to one calc, streaming statements
/// until `stop`, end-of-input, or a stream-ending error.
async fn interact(
    dispatcher: &Arc<Dispatcher>,
    lines: &mut Lines<BufReader<Stdin>>,
    args: &[&str],
) -> anyhow::Result<()> {
    let Some(calc_id) = args.first().map(|s| (*s).to_string()) else {
        println!("interact expects a calc id");
        return Ok(());
    };

    let mut stream = LocalClient::connect_interact(Arc::clone(dispatcher));

    prompt(&format!("stackcalc [{calc_id}]> "))?;
    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("stop") {
            break;
        }
        let statement = match trimmed.parse::<Statement>() {
            Ok(statement) => statement,
            Err(e) => {
                println!("Error parsing statement: {e}");
                break;
            }
        };

        let resp = stream
            .call(ClientMessage::Evaluate {
                calc_id: calc_id.clone(),
                statement,
            })
            .await;
        let stream_ended = matches!(resp, None | Some(ServerMessage::Error { .. }));
        print_response(resp);
        if stream_ended {
            break;
        }
        prompt(&format!("stackcalc [{calc_id}]> "))?;
    }
    Ok(())
}

fn print_response(resp: Option<ServerMessage>) {
    match resp {
        None => println!("connection closed"),
        Some(ServerMessage::CalcCreated { calc_id }) => println!("calc_id: {calc_id}"),
        Some(ServerMessage::CalcDestroyed) => println!("destroyed"),
        Some(ServerMessage::CalcList { calc_ids }) => println!("calc_ids: {calc_ids:?}"),
        Some(ServerMessage::Evaluation { state, err }) => {
            print_state(&state);
            match err {
                Some(err) => println!("err: {err}"),
                None => println!("err: none"),
            }
        }
        Some(ServerMessage::State { state }) => print_state(&state),
        Some(ServerMessage::Error { message }) => println!("error: {message}"),
    }
}

fn print_state(state: &CalcState) {
    println!("stack_depth: {}", state.stack_depth);
    println!("vals: {:?}", state.vals);
}
