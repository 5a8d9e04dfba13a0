//! tsf-quiz - Terminal quiz client
//!
//! Walks through both quiz levels against a running tsf-query service. With
//! `--account` the results are stored server-side and earlier guest results
//! are attached on startup; without it they go to the local guest cache.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tsf_common::config::load_config;
use tsf_quiz::{flow, Answer, GuestCache, HttpBackend, Level1Choice, QuizBackend, QuizError, QuizSession};

#[derive(Debug, Parser)]
#[command(name = "tsf-quiz", version, about = "Find a study programme that fits you")]
struct Args {
    /// Config file (TOML)
    #[arg(short, long, env = "TSF_CONFIG")]
    config: Option<PathBuf>,

    /// Query service URL, overrides config
    #[arg(long, env = "TSF_BASE_URL")]
    base_url: Option<String>,

    /// Account to store results for; guest mode when absent
    #[arg(short, long)]
    account: Option<i64>,

    /// Guest result cache file
    #[arg(long)]
    guest_cache: Option<PathBuf>,
}

/// Line-based terminal input
struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Show `text` and read one trimmed, lowercased line; `None` on end of input
    async fn ask(&mut self, text: &str) -> Result<Option<String>> {
        println!("{}", text);
        let line = self.lines.next_line().await.context("Failed to read input")?;
        Ok(line.map(|l| l.trim().to_lowercase()))
    }

    async fn confirm(&mut self, text: &str) -> Result<bool> {
        let answer = self.ask(&format!("{} [y/n]", text)).await?;
        Ok(matches!(answer.as_deref(), Some("y" | "yes" | "j" | "ja")))
    }

    /// Ask whether a failed request should be repeated
    async fn retry(&mut self, error: QuizError) -> Result<()> {
        if error.is_retryable() && self.confirm(&format!("{}. Retry?", error)).await? {
            return Ok(());
        }
        Err(error.into())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref()).context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let base_url = args.base_url.unwrap_or(config.client.base_url.clone());
    let backend = HttpBackend::new(
        &base_url,
        Duration::from_millis(config.client.request_timeout_ms),
    )
    .context("Failed to create HTTP client")?;
    info!("Query service: {}", backend.base_url());

    let cache = GuestCache::new(args.guest_cache.unwrap_or_else(GuestCache::default_path));

    if let Some(account) = args.account {
        match flow::reconcile_guest_results(&backend, &cache, account).await {
            Ok(Some(report)) => println!(
                "Attached {} earlier result(s) to your account ({} already saved, {} failed)",
                report.attached.len(),
                report.already_present.len(),
                report.failed.len()
            ),
            Ok(None) => {}
            Err(e) => warn!("Could not attach earlier results: {}", e),
        }
    }

    let mut prompt = Prompt::new();
    let mut session = QuizSession::new();

    // Level 1
    let choice = loop {
        let Some(input) = prompt
            .ask("What are you looking for? 1) Bachelor  2) Master  3) Not sure yet")
            .await?
        else {
            return Ok(());
        };
        match input.parse::<Level1Choice>() {
            Ok(choice) => break choice,
            Err(_) => println!("Please enter 1, 2 or 3"),
        }
    };

    let candidates = loop {
        match flow::submit_level1(&backend, &mut session, choice).await {
            Ok(count) => break count,
            Err(e) => prompt.retry(e).await?,
        }
    };
    println!("{} programme(s) match your choice", candidates);

    let questions = loop {
        match flow::start_level2(&backend, &mut session).await {
            Ok(count) => break count,
            Err(e) => prompt.retry(e).await?,
        }
    };

    // Level 2
    println!("Answer {} statements with y (yes), n (no) or s (skip); u undoes, q quits", questions);
    loop {
        while let Some(question) = session.current_question().cloned() {
            let text = format!(
                "[{}/{}] {}",
                session.current_index() + 1,
                questions,
                question.text
            );
            let Some(input) = prompt.ask(&text).await? else {
                println!("Quiz abandoned");
                return Ok(());
            };
            match input.as_str() {
                "y" | "yes" | "j" | "ja" => session.answer(Answer::Yes)?,
                "n" | "no" | "nein" => session.answer(Answer::No)?,
                "s" | "skip" => session.answer(Answer::Skip)?,
                "u" | "undo" => {
                    if let Err(e) = session.undo() {
                        println!("{}", e);
                    }
                }
                "q" | "quit" => {
                    println!("Quiz abandoned");
                    return Ok(());
                }
                _ => println!("Please answer y, n or s"),
            }
        }

        if questions == 0 || prompt.confirm("Show my results?").await? {
            break;
        }
        session.undo()?;
    }

    let top: Vec<String> = session
        .top_three()
        .iter()
        .map(|(t, score)| format!("{} ({})", t, score))
        .collect();
    println!("Your strongest traits: {}", top.join(", "));

    let results = loop {
        match flow::submit_level2(&backend, &mut session).await {
            Ok(ids) => break ids,
            Err(e) => prompt.retry(e).await?,
        }
    };

    if results.is_empty() {
        println!("No programme matches your profile");
    } else {
        match backend.programmes(&results).await {
            Ok(programmes) => {
                for p in programmes {
                    println!(
                        "  {} - {} ({}, {})",
                        p.id,
                        p.name.unwrap_or_default(),
                        p.institution.unwrap_or_default(),
                        p.city.unwrap_or_default()
                    );
                }
            }
            Err(e) => {
                warn!("Could not load programme details: {}", e);
                println!("Matching programme ids: {:?}", results);
            }
        }
    }

    match args.account {
        Some(account) if !results.is_empty() => {
            if let Err(e) = backend.save_results(account, &results).await {
                warn!("Could not save results for account {}: {}", account, e);
            }
        }
        None if !results.is_empty() => {
            cache.save(&results).context("Failed to cache guest results")?;
            println!("Results kept locally until you log in");
        }
        _ => {}
    }

    Ok(())
}
