use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use crate::content::{parse_blocks, ContentSource};
use crate::db::Database;
use crate::highlight::{ContainerTarget, DocumentHandle};
use crate::reader::{ControllerConfig, OptionsPatch, ReadingController, ReadingEvent};
use crate::settings::SettingsStore;
use crate::shell::{command_for_key, Key, PlayerShell, ShellCommand, ShellMode, SHORTCUTS};

const DATA_DIR_NAME: &str = ".speedread";

#[derive(Debug, Parser)]
#[command(name = "speedread", version, about = "Read an HTML or text file one word at a time")]
pub struct Args {
    /// HTML or plain-text file to read
    pub file: PathBuf,

    /// Words per minute, saved as the preferred speed
    #[arg(long)]
    pub wpm: Option<u32>,

    /// Container the file is loaded under
    #[arg(long, default_value = "main")]
    pub selector: String,

    /// Words shown per step
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Skip over code blocks
    #[arg(long)]
    pub skip_code: bool,

    /// Start in the compact mini-player
    #[arg(long)]
    pub mini: bool,

    /// Key used to remember progress; defaults to the file stem
    #[arg(long)]
    pub slug: Option<String>,

    /// Progress database path
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Settings file path
    #[arg(long)]
    pub settings: Option<PathBuf>,
}

impl Args {
    fn slug(&self) -> String {
        self.slug.clone().unwrap_or_else(|| {
            self.file
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "untitled".to_string())
        })
    }

    fn overrides(&self) -> OptionsPatch {
        OptionsPatch {
            chunk_size: self.chunk_size,
            skip_code_blocks: self.skip_code.then_some(true),
            ..OptionsPatch::default()
        }
    }
}

fn data_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_DIR_NAME)
}

fn print_shortcuts() {
    for shortcut in SHORTCUTS {
        println!("  {:<8} {}", shortcut.keys, shortcut.description);
    }
}

pub async fn run(args: Args) -> Result<()> {
    let html = read_source(&args.file).await?;
    let slug = args.slug();

    let settings = SettingsStore::new(
        args.settings
            .clone()
            .unwrap_or_else(|| data_dir().join("settings.json")),
    )?;
    if let Some(wpm) = args.wpm {
        let speed = settings.set_words_per_minute(wpm)?;
        log::info!("Preferred speed is now {} wpm ({:?})", speed.words_per_minute, speed.preset);
    }
    let options = settings.reading_options().merged(&args.overrides());

    let word_count: usize = parse_blocks(&html)
        .iter()
        .map(|block| block.words().count())
        .sum();
    println!(
        "{} ({} words, about {} min at {} wpm)",
        args.file.display(),
        word_count,
        settings.reading_time_minutes(word_count),
        settings.reading_speed().words_per_minute
    );

    let db = Database::new(args.db.clone().unwrap_or_else(|| data_dir().join("progress.db")))?;
    let stored = db.get_progress(&slug).await?;

    let document = DocumentHandle::default();
    document.insert(args.selector.clone(), &html);

    let controller = ReadingController::new(
        Box::new(document),
        ControllerConfig {
            target: ContainerTarget {
                slug: Some(slug.clone()),
                selector: Some(args.selector.clone()),
            },
            options,
            ..ControllerConfig::default()
        },
    );
    let mut events = controller.subscribe();

    let mode = if args.mini {
        ShellMode::MiniPlayer
    } else {
        ShellMode::Focus
    };
    let mut shell = PlayerShell::new(controller, mode);

    let total = match shell
        .open(ContentSource::Selector(args.selector.clone()), 0)
        .await
    {
        Ok(total) => total,
        Err(err) => {
            println!("{}", shell.view().await.render_line());
            return Err(err.into());
        }
    };
    if total == 0 {
        println!("{}", shell.view().await.render_line());
        return Ok(());
    }

    if let Some(progress) = &stored {
        let index = progress.resume_index(total);
        if index > 0 {
            log::info!("Resuming {} at chunk {} of {}", slug, index + 1, total);
            shell.controller().start_from_index(index).await;
        }
    }

    shell.handle(ShellCommand::TogglePlay).await?;

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = true;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted, saving progress");
                break;
            }
            line = input.next_line(), if input_open => {
                match line {
                    Ok(Some(line)) => {
                        let Some(key) = Key::parse(&line) else {
                            continue;
                        };
                        if command_for_key(key) == Some(ShellCommand::Close) {
                            break;
                        }
                        if let Err(err) = shell.handle_key(key).await {
                            log::warn!("Ignoring key {:?}: {}", key, err);
                        }
                        let view = shell.view().await;
                        if view.show_shortcuts && key == Key::Char('?') {
                            print_shortcuts();
                        }
                        println!("{}", view.render_line());
                    }
                    Ok(None) => input_open = false,
                    Err(err) => {
                        log::warn!("Failed to read input: {}", err);
                        input_open = false;
                    }
                }
            }
            event = events.recv() => {
                match event {
                    Ok(ReadingEvent::Highlight { .. }) => {
                        println!("{}", shell.view().await.render_line());
                    }
                    Ok(event @ ReadingEvent::Complete { .. }) => {
                        shell.observe(&event);
                        println!("{}", shell.view().await.render_line());
                        break;
                    }
                    Ok(ReadingEvent::StateChanged { .. }) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        log::warn!("Display fell behind by {} events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    let snapshot = shell.controller().snapshot().await;
    if snapshot.is_active {
        db.save_progress(&slug, snapshot.progress, Utc::now())
            .await
            .context("failed to save reading progress")?;
    }
    shell.handle(ShellCommand::Close).await?;

    Ok(())
}

async fn read_source(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}
