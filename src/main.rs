use anyhow::{Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use tubenote::catalog::{Catalog, CatalogClient};
use tubenote::config::{ApiKeyProvider, Config, ProcessKeyProvider, StaticKeyProvider};
use tubenote::error::CatalogError;
use tubenote::notes::{FileNotesStore, Note, NotesStore};
use tubenote::reachability::Reachability;
use tubenote::search::{SearchOrchestrator, SearchPhase, SortOption};

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// Catalog API key; overrides TUBENOTE_API_KEY and the config file.
  #[arg(long)]
  api_key: Option<String>,
}

// --- Commands ---

enum Command<'a> {
  Query(&'a str),
  More,
  Sort(&'a str),
  Detail(&'a str),
  Note(&'a str),
  Notes(&'a str),
  Help,
  Quit,
  Unknown(&'a str),
}

fn parse_command(line: &str) -> Command<'_> {
  if !line.starts_with(':') {
    return Command::Query(line);
  }
  let (head, rest) = line.split_once(' ').map(|(h, r)| (h, r.trim())).unwrap_or((line, ""));
  match head {
    ":quit" | ":q" => Command::Quit,
    ":more" => Command::More,
    ":sort" => Command::Sort(rest),
    ":detail" => Command::Detail(rest),
    ":note" => Command::Note(rest),
    ":notes" => Command::Notes(rest),
    ":help" => Command::Help,
    _ => Command::Unknown(head),
  }
}

/// Parse `:note` arguments: a 1-based row index, an optional seconds token,
/// and the note text. e.g. `:note 2 95.5 remember the borrow checker`.
fn split_note_input(rest: &str) -> Option<(usize, f64, String)> {
  let mut tokens = rest.trim().splitn(2, ' ');
  let index: usize = tokens.next()?.parse().ok()?;
  if index == 0 {
    return None;
  }
  let remainder = tokens.next()?.trim();
  if remainder.is_empty() || remainder.parse::<f64>().is_ok() {
    // A bare seconds token carries no note text.
    return None;
  }
  let mut at = 0.0;
  let mut text = remainder;
  let mut head = remainder.splitn(2, ' ');
  if let (Some(first), Some(rest_text)) = (head.next(), head.next())
    && let Ok(secs) = first.parse::<f64>()
  {
    at = secs;
    text = rest_text.trim();
  }
  if text.is_empty() {
    return None;
  }
  Some((index - 1, at, text.to_string()))
}

/// Parse a 1-based row index argument into a 0-based offset.
fn parse_row(rest: &str) -> Option<usize> {
  rest.trim().parse::<usize>().ok().filter(|n| *n > 0).map(|n| n - 1)
}

// --- Rendering ---

fn render_results(orchestrator: &SearchOrchestrator) {
  if let SearchPhase::Errored(e) = orchestrator.phase() {
    println!("search failed: {e}");
    return;
  }
  let visible = orchestrator.visible();
  if visible.is_empty() {
    println!("no results.");
    return;
  }
  for (i, video) in visible.iter().enumerate() {
    println!("{:2}. {} — {} ({})", i + 1, video.title, video.channel_name, video.published_at.format("%Y-%m-%d"));
  }
  if orchestrator.more_available() {
    println!("    … {} more, :more to show", orchestrator.result_count() - visible.len());
  }
}

async fn show_detail(client: &CatalogClient, orchestrator: &SearchOrchestrator, rest: &str) {
  let Some(index) = parse_row(rest) else {
    println!("usage: :detail N");
    return;
  };
  let Some(video) = orchestrator.visible().get(index) else {
    println!("no such result row.");
    return;
  };
  match client.video_detail(&video.id).await {
    Ok(detail) => {
      println!("{} — {}", detail.title, detail.channel_name);
      if let Some(views) = detail.view_count {
        println!("views: {views}");
      }
      if let Some(likes) = detail.like_count {
        println!("likes: {likes}");
      }
      if !detail.description.is_empty() {
        println!("{}", detail.description);
      }
    }
    Err(CatalogError::NotFound) => println!("that video no longer exists."),
    Err(e) => println!("detail fetch failed: {e}"),
  }
}

fn print_help() {
  println!("type a query to search; empty queries show the popular view");
  println!(":sort latest|oldest|popular   change result order");
  println!(":more                         show more results");
  println!(":detail N                     details for result row N");
  println!(":note N [secs] <text>         attach a note to row N");
  println!(":notes N                      list notes for row N");
  println!(":quit                         exit");
}

// --- Orchestrator polling ---

/// Poll until the in-flight fetch lands; transitions happen in check_pending.
async fn settle(orchestrator: &mut SearchOrchestrator) {
  loop {
    orchestrator.check_pending();
    if !matches!(orchestrator.phase(), SearchPhase::Loading | SearchPhase::Typing) {
      break;
    }
    tokio::time::sleep(Duration::from_millis(25)).await;
  }
}

// --- Main ---

fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
  let proj_dirs = ProjectDirs::from("", "", "tubenote")?;
  let log_dir = proj_dirs.data_dir().join("logs");
  std::fs::create_dir_all(&log_dir).ok()?;
  let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(log_dir, "tubenote.log"));
  tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(writer).with_ansi(false).init();
  Some(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();
  // Logs go to a file; stdout belongs to the shell. Guard must outlive run().
  let _log_guard = init_logging();
  run(args).await
}

async fn run(args: Args) -> Result<()> {
  let keys: Arc<dyn ApiKeyProvider> = match args.api_key {
    Some(key) => Arc::new(StaticKeyProvider(key)),
    None => Arc::new(ProcessKeyProvider),
  };
  let client = Arc::new(CatalogClient::new(keys)?);
  let catalog: Arc<dyn Catalog> = client.clone();
  let notes = FileNotesStore::open_default()?;
  let reachability = Reachability::system();
  let mut orchestrator = SearchOrchestrator::new(catalog, reachability.clone());

  if let Some(ref sort) = Config::load().default_sort {
    orchestrator.on_sort_change(SortOption::from_config(sort));
  }

  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  let mut was_reachable = reachability.is_reachable();

  println!("tubenote — type a query, :help for commands");
  // Session entry starts on the popular catalog view (empty query fallback).
  orchestrator.on_submit();
  settle(&mut orchestrator).await;
  render_results(&orchestrator);
  loop {
    print!("> ");
    std::io::stdout().flush().context("Failed to flush prompt")?;
    let Some(line) = lines.next_line().await.context("Failed to read stdin")? else { break };
    let line = line.trim();
    if line.is_empty() {
      continue;
    }

    // Reconnect wiring: a probe transition back to reachable re-runs the
    // last attempted fetch before the next command is handled.
    let now_reachable = reachability.is_reachable();
    if now_reachable && !was_reachable {
      orchestrator.on_reconnect();
      settle(&mut orchestrator).await;
      render_results(&orchestrator);
    }
    was_reachable = now_reachable;

    match parse_command(line) {
      Command::Quit => break,
      Command::Help => print_help(),
      Command::Query(query) => {
        orchestrator.on_keystroke(query);
        orchestrator.on_submit();
        settle(&mut orchestrator).await;
        render_results(&orchestrator);
      }
      Command::More => {
        orchestrator.on_show_more();
        render_results(&orchestrator);
      }
      Command::Sort(rest) => match rest {
        "latest" | "oldest" | "popular" => {
          let sort = SortOption::from_config(rest);
          orchestrator.on_sort_change(sort);
          settle(&mut orchestrator).await;
          render_results(&orchestrator);
          let mut config = Config::load();
          config.default_sort = Some(sort.label().to_string());
          config.save();
        }
        _ => println!("usage: :sort latest|oldest|popular"),
      },
      Command::Detail(rest) => {
        show_detail(&client, &orchestrator, rest).await;
      }
      Command::Note(rest) => {
        let Some((index, at, text)) = split_note_input(rest) else {
          println!("usage: :note N [secs] <text>");
          continue;
        };
        let Some(video) = orchestrator.visible().get(index) else {
          println!("no such result row.");
          continue;
        };
        let mut existing = notes.get(&video.id)?;
        existing.push(Note { text, timestamp_seconds: at });
        notes.put(&video.id, existing)?;
        println!("noted.");
      }
      Command::Notes(rest) => {
        let Some(index) = parse_row(rest) else {
          println!("usage: :notes N");
          continue;
        };
        let Some(video) = orchestrator.visible().get(index) else {
          println!("no such result row.");
          continue;
        };
        let list = notes.get(&video.id)?;
        if list.is_empty() {
          println!("no notes for '{}'.", video.title);
        } else {
          for note in list {
            println!("[{:>7.1}s] {}", note.timestamp_seconds, note.text);
          }
        }
      }
      Command::Unknown(head) => {
        println!("unknown command {head}; :help lists commands");
      }
    }
  }

  orchestrator.teardown();
  Ok(())
}
