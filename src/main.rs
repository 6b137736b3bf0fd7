use anyhow::{bail, Context, Result};
use clipforge::cli::{Cli, Command, USAGE};
use clipforge::export_pipeline::reveal;
use clipforge::ffmpeg::{ExportProgress, FFmpegWrapper};
use clipforge::player::{ClockPlayer, PlaybackEvent};
use clipforge::project::QualityPreset;
use clipforge::utils::format_time;
use clipforge::{Editor, EditorConfig};
use crossbeam_channel::{unbounded, Receiver};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// How often the headless player is polled during `play`
const PLAYBACK_TICK: Duration = Duration::from_millis(100);

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("clipforge=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();

    let cli = match Cli::parse(std::env::args().skip(1)) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("error: {}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };
    if cli.command == Command::Help {
        println!("{}", USAGE);
        return Ok(());
    }

    let runtime = Runtime::new().context("Failed to create Tokio runtime")?;
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let config = EditorConfig::from_env();
    let engine = Arc::new(FFmpegWrapper::from_config(&config));
    if !engine.is_available() && matches!(cli.command, Command::Export { .. } | Command::Import(_)) {
        warn!(ffmpeg = %config.ffmpeg_path, "FFmpeg not found; set CLIPFORGE_FFMPEG to its location");
    }

    let (events_tx, events_rx) = unbounded();
    let mut editor = Editor::open(&cli.project, config, ClockPlayer::new(), events_tx, engine)
        .with_context(|| format!("Failed to open project in {}", cli.project.display()))?;

    let result = execute(&mut editor, cli.command, &events_rx).await;
    if result.is_ok() && !editor.status_message.is_empty() {
        info!("{}", editor.status_message);
    }
    editor.close().await;
    result
}

async fn execute(editor: &mut Editor<ClockPlayer>, command: Command, events: &Receiver<PlaybackEvent>) -> Result<()> {
    match command {
        Command::Help => println!("{}", USAGE),
        Command::Init => println!("Project ready: {}", editor.store().project_file().display()),
        Command::List => print_project(editor),
        Command::Import(paths) => {
            let ids = editor.import(&paths)?;
            for id in &ids {
                editor.select_video(id)?;
                match editor.probe_selected().await {
                    Ok(Some(clip)) => println!("{} -> {}", id, clip),
                    Ok(None) => println!("{} (already on the timeline)", id),
                    Err(e) => warn!(video = %id, error = %e, "Could not read duration, no clip created"),
                }
            }
        }
        Command::Split(time) => match editor.split_at(time) {
            Some((left, right)) => println!("Split into {} and {}", left, right),
            None => bail!("No clip can be split at {}", format_time(time)),
        },
        Command::Delete(id) => {
            let clip = editor.delete_clip(&id)?;
            println!("Deleted {} ({:.3}s)", clip.id, clip.duration);
        }
        Command::Glue => {
            editor.glue_clips();
            println!("Timeline is {}", format_time(editor.timeline().total_duration()));
        }
        Command::RemoveVideo(id) => {
            let video = editor.remove_video(&id)?;
            println!("Removed {} and its clips", video.name);
        }
        Command::Play { from } => preview(editor, from, events).await?,
        Command::Export { output, quality, reveal: open_folder } => {
            export(editor, &output, quality, open_folder).await?
        }
    }
    Ok(())
}

fn print_project(editor: &Editor<ClockPlayer>) {
    let meta = editor.meta();
    let timeline = editor.timeline();
    println!("{} ({})", meta.name, meta.id);

    println!("\nVideos:");
    let selected = timeline.selected_video().map(|v| v.id.clone());
    for video in timeline.videos() {
        let marker = if Some(&video.id) == selected.as_ref() { "*" } else { " " };
        println!(
            "{} {:<10} {:<30} {:>10}  {}",
            marker,
            video.id,
            video.name,
            video.size_string(),
            video.path.display()
        );
    }

    println!("\nClips (total {}):", format_time(timeline.total_duration()));
    for clip in timeline.ordered_clips() {
        let video = clip.video_id.as_ref().map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<10} {:<10} {} -> {}   source {} -> {}",
            clip.id,
            video,
            format_time(clip.timeline_start),
            format_time(clip.timeline_end()),
            format_time(clip.source_start),
            format_time(clip.source_end)
        );
    }

    for issue in timeline.validate() {
        println!("  ! {}", issue);
    }
}

/// Play from `from` to the end of the timeline on the headless player,
/// resuming after every pause at a source change or gap.
async fn preview(editor: &mut Editor<ClockPlayer>, from: f64, events: &Receiver<PlaybackEvent>) -> Result<()> {
    let total = editor.timeline().total_duration();
    if total <= 0.0 {
        bail!("The timeline is empty");
    }

    let mut position = from.min(total);
    let mut ticker = tokio::time::interval(PLAYBACK_TICK);
    let mut last_second = -1i64;

    while position < total {
        if !editor.seek(position) {
            let next = editor
                .timeline()
                .ordered_clips()
                .into_iter()
                .find(|c| c.timeline_start > position)
                .map(|c| c.timeline_start);
            match next {
                Some(start) => {
                    println!("Gap, skipping to {}", format_time(start));
                    position = start;
                    continue;
                }
                None => break,
            }
        }

        editor.play();
        while editor.playback().is_playing() {
            ticker.tick().await;
            if let Some(pos) = editor.tick() {
                position = pos;
            }
            for event in events.try_iter() {
                match event {
                    PlaybackEvent::ClipActivated(id) => println!("Playing {}", id),
                    PlaybackEvent::Paused(at) => println!("Paused at {}", format_time(at)),
                    PlaybackEvent::Position(at) => {
                        let second = at.floor() as i64;
                        if second != last_second {
                            last_second = second;
                            println!("  {}", format_time(at));
                        }
                    }
                }
            }
        }
    }

    println!("End of timeline at {}", format_time(position));
    Ok(())
}

async fn export(editor: &Editor<ClockPlayer>, output: &Path, quality: QualityPreset, open_folder: bool) -> Result<()> {
    info!(output = %output.display(), quality = quality.name(), "Exporting timeline");
    let (tx, rx) = unbounded::<ExportProgress>();
    let printer = std::thread::spawn(move || {
        for update in rx {
            println!("[{:>3}%] {}", update.percent, update.stage);
        }
    });

    let outcome = editor.export(output, quality, tx).await;
    let _ = printer.join();
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if !outcome.is_success() {
        bail!("Export failed");
    }
    if open_folder {
        reveal(output)?;
    }
    Ok(())
}
