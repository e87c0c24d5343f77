use std::cmp;
use std::error::Error;
use std::io::{self, BufRead, Write};

use atty::Stream;
use clap::{Args, Parser, Subcommand};
use lugat_rs::{
    MonospaceMetrics, PrefixMatch, Rect, SearchController, SearchState, SearchView, Size, Tooltip,
    Viewport, VocabularyDataset, WidgetConfig, decode_fragment,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

/// Character advance used to estimate tooltip and ghost widths in a terminal.
const TERMINAL_ADVANCE: f64 = 0.6;
const TERMINAL_VIEWPORT_WIDTH: f64 = 1024.0;

#[derive(Parser, Debug)]
#[command(name = "lugat-rs", about = "Look up words in a vocabulary file", version)]
pub struct Cli {
    /// Emit JSON instead of human-readable output.
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    source: SourceArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Vocabulary JSON file or http(s) URL.
    #[arg(long, global = true, default_value = "vocabulary.json")]
    dataset: String,

    /// Locale used to collate headwords.
    #[arg(long, global = true, default_value = lugat_rs::config::DEFAULT_LOCALE)]
    locale: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Find the best prefix match and render its definition.
    Lookup {
        /// Query as typed into the search box.
        query: String,
        /// Treat the query as a percent-encoded URL fragment.
        #[arg(long)]
        fragment: bool,
    },
    /// List headwords that start with the provided prefix.
    Prefix {
        /// Prefix to search for.
        prefix: String,
        /// Maximum number of matches to return.
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Render raw definition text with the loaded special terms.
    Annotate {
        /// Raw text to annotate.
        text: String,
    },
    /// Show the tooltip content for a cross-reference word.
    Meanings {
        /// Cross-reference word.
        word: String,
        /// Number of consecutive clicks to simulate.
        #[arg(short, long, default_value_t = 1)]
        clicks: usize,
    },
    /// Read queries from stdin, one per line, as if typed into the widget.
    Interactive,
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing();
    let mut controller = open_controller(&cli.source)?;
    match cli.command {
        Command::Lookup { query, fragment } => {
            handle_lookup(&mut controller, query, fragment, cli.json)
        }
        Command::Prefix { prefix, limit } => handle_prefix(&controller, prefix, limit, cli.json),
        Command::Annotate { text } => handle_annotate(&controller, text, cli.json),
        Command::Meanings { word, clicks } => {
            handle_meanings(&mut controller, word, clicks, cli.json)
        }
        Command::Interactive => handle_interactive(&mut controller, cli.json),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn open_controller(source: &SourceArgs) -> Result<SearchController, Box<dyn Error>> {
    let config = WidgetConfig {
        locale: source.locale.clone(),
        ..WidgetConfig::default()
    };
    let mut controller = SearchController::new(config, MonospaceMetrics {
        advance: TERMINAL_ADVANCE,
    });
    let dataset = VocabularyDataset::load(&source.dataset)?;
    controller.load(dataset)?;
    Ok(controller)
}

fn handle_lookup(
    controller: &mut SearchController,
    query: String,
    fragment: bool,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let query = if fragment {
        decode_fragment(&query)
    } else {
        query
    };
    let outcome = controller
        .on_input(&query)
        .ok_or("vocabulary is not loaded")?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_view(&outcome.view);
    }
    Ok(())
}

fn handle_prefix(
    controller: &SearchController,
    prefix: String,
    limit: usize,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let limit = cmp::max(1, limit);
    let vocabulary = controller.vocabulary().ok_or("vocabulary is not loaded")?;
    let matches = vocabulary.prefix(&prefix, limit);

    if as_json {
        let payload = json!({
            "prefix": prefix,
            "limit": limit,
            "results": matches,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_prefix_table(&prefix, &matches);
    }
    Ok(())
}

fn handle_annotate(
    controller: &SearchController,
    text: String,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let html = controller
        .annotate(&text)
        .ok_or("vocabulary is not loaded")?;
    if as_json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "text": text, "html": html }))?
        );
    } else {
        println!("{html}");
    }
    Ok(())
}

fn handle_meanings(
    controller: &mut SearchController,
    word: String,
    clicks: usize,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let clicks = cmp::max(1, clicks);
    let viewport = Viewport {
        width: TERMINAL_VIEWPORT_WIDTH,
        ..Viewport::default()
    };
    let anchor = Rect {
        left: TERMINAL_VIEWPORT_WIDTH / 2.0,
        top: 200.0,
        width: word.chars().count() as f64 * TERMINAL_ADVANCE * 16.0,
        height: 16.0,
    };

    let mut shown = Vec::with_capacity(clicks);
    for _ in 0..clicks {
        match controller.click_word(&word, anchor, viewport, estimate_size) {
            Some(placed) => shown.push(placed),
            None => break,
        }
    }

    if as_json {
        println!("{}", serde_json::to_string_pretty(&shown)?);
        return Ok(());
    }
    if shown.is_empty() {
        println!("No meanings stored for \"{word}\".");
        return Ok(());
    }
    for placed in &shown {
        let tooltip = &placed.tooltip;
        println!(
            "[{} {}/{}]",
            tooltip.word,
            tooltip.group + 1,
            tooltip.group_count
        );
        for line in tooltip.html.split("<br>").filter(|line| !line.is_empty()) {
            println!("  {line}");
        }
    }
    Ok(())
}

fn handle_interactive(
    controller: &mut SearchController,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let prompt = atty::is(Stream::Stdin) && atty::is(Stream::Stdout);
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    if prompt {
        write!(stdout, "> ")?;
        stdout.flush()?;
    }
    for line in stdin.lock().lines() {
        let query = line?;
        if let Some(outcome) = controller.on_input(&query) {
            if as_json {
                println!("{}", serde_json::to_string(&outcome)?);
            } else {
                print_view(&outcome.view);
            }
        }
        if prompt {
            write!(stdout, "> ")?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn estimate_size(tooltip: &Tooltip) -> Size {
    let lines: Vec<&str> = tooltip
        .html
        .split("<br>")
        .filter(|line| !line.is_empty())
        .collect();
    let widest = lines
        .iter()
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0);
    Size {
        width: widest as f64 * TERMINAL_ADVANCE * 16.0,
        height: lines.len() as f64 * 20.0,
    }
}

fn print_view(view: &SearchView) {
    match &view.state {
        SearchState::Idle => println!("(empty query)"),
        SearchState::Blank => {
            println!("! \"{}\" starts with whitespace", view.query)
        }
        SearchState::NoMatch => println!("! no headword starts with \"{}\"", view.query),
        SearchState::Matched { headword } => {
            println!("{}[{}] -> {headword}", view.query, view.ghost.text);
            if let Some(html) = &view.html {
                println!("{html}");
            }
            if !view.ranges.is_empty() {
                let words: Vec<&str> = view.ranges.iter().map(|r| r.key.as_str()).collect();
                println!("Cross-references: {}", words.join(", "));
            }
        }
    }
}

fn print_prefix_table(prefix: &str, rows: &[PrefixMatch]) {
    if rows.is_empty() {
        println!("No headwords matched prefix \"{prefix}\".");
        return;
    }
    let width = rows
        .iter()
        .map(|row| row.headword.chars().count())
        .max()
        .unwrap_or(prefix.len())
        .max("HEADWORD".len());
    println!("Matches for prefix \"{prefix}\":");
    println!("{:<width$}  {}", "HEADWORD", "NORMALIZED", width = width);
    println!("{:-<width$}  {}", "", "----------", width = width);
    for row in rows {
        println!("{:<width$}  {}", row.headword, row.normalized, width = width);
    }
}
