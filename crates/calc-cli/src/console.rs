//! Interactive console over the stream client.

use anyhow::{Context, Result};
use calc_core::{MemoryOp, Number, Response};
use calc_server::StreamClient;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

const HELP: &str = "\
expressions are evaluated on the server, e.g. sqrt(2) * pi
  :ms [v]   store v (or the last result) in memory
  :ma [v]   add v (or the last result) to memory
  :mr       recall memory
  :mc       clear memory
  :ping     check the server
  :help     show this text
  :quit     leave";

/// One parsed console line.
#[derive(Debug, PartialEq)]
pub enum ConsoleCommand {
    /// Blank line.
    Empty,
    /// Evaluate an expression.
    Calculate(String),
    /// Memory operation with optional explicit operand.
    Memory(MemoryOp, Option<Number>),
    /// Liveness check.
    Ping,
    /// Print help.
    Help,
    /// Leave the console.
    Quit,
}

/// Parse one line of console input.
pub fn parse_line(line: &str) -> Result<ConsoleCommand, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(ConsoleCommand::Empty);
    }
    let Some(rest) = line.strip_prefix(':') else {
        return Ok(ConsoleCommand::Calculate(line.to_owned()));
    };

    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let operand = parts.next().map(parse_number).transpose()?;
    if parts.next().is_some() {
        return Err(format!("too many arguments for :{name}"));
    }

    let no_operand = |cmd: ConsoleCommand| match operand {
        Some(_) => Err(format!(":{name} takes no argument")),
        None => Ok(cmd),
    };
    match name {
        "ms" => Ok(ConsoleCommand::Memory(MemoryOp::Store, operand)),
        "ma" => Ok(ConsoleCommand::Memory(MemoryOp::Add, operand)),
        "mr" => no_operand(ConsoleCommand::Memory(MemoryOp::Recall, None)),
        "mc" => no_operand(ConsoleCommand::Memory(MemoryOp::Clear, None)),
        "ping" => no_operand(ConsoleCommand::Ping),
        "help" | "h" | "?" => no_operand(ConsoleCommand::Help),
        "quit" | "q" | "exit" => no_operand(ConsoleCommand::Quit),
        _ => Err(format!("unknown command :{name} (try :help)")),
    }
}

fn parse_number(text: &str) -> Result<Number, String> {
    if let Ok(i) = text.parse::<i64>() {
        return Ok(Number::Int(i));
    }
    match text.parse::<f64>() {
        Ok(f) if f.is_finite() => Ok(Number::Float(f)),
        _ => Err(format!("not a number: {text}")),
    }
}

/// Render a response for the terminal.
pub fn render(response: &Response) -> String {
    if let Some(error) = &response.error {
        return format!("error: {error}");
    }
    if let Some(formatted) = &response.formatted_result {
        return format!("= {formatted}");
    }
    if let Some(memory) = response.memory {
        let op = response.operation.as_deref().unwrap_or("memory");
        return format!("M = {memory} ({op})");
    }
    response
        .message
        .clone()
        .unwrap_or_else(|| "ok".to_owned())
}

/// Read commands from `input` until EOF or `:quit`, writing one line of
/// output per command.
pub async fn repl<R, W>(client: &mut StreamClient, input: R, output: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        let text = match parse_line(&line) {
            Ok(ConsoleCommand::Empty) => continue,
            Ok(ConsoleCommand::Quit) => break,
            Ok(ConsoleCommand::Help) => HELP.to_owned(),
            Ok(ConsoleCommand::Calculate(expr)) => render(&client.calculate(&expr).await?),
            Ok(ConsoleCommand::Memory(op, value)) => render(&client.memory(op, value).await?),
            Ok(ConsoleCommand::Ping) => render(&client.ping().await?),
            Err(message) => format!("error: {message}"),
        };
        output.write_all(text.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }
    Ok(())
}

/// Connect to `addr` and run the console on stdin/stdout.
pub async fn run(addr: &str) -> Result<()> {
    let mut client = StreamClient::connect(addr)
        .await
        .with_context(|| format!("Failed to connect to calculator server at {addr}"))?;

    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(format!("connected to {addr}; :help for commands\n").as_bytes())
        .await?;
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    repl(&mut client, stdin, &mut stdout).await?;
    let _ = client.close().await;
    Ok(())
}
