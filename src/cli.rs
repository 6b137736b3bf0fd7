//! Argument parsing for the `clipforge` binary.

use crate::project::{ClipId, QualityPreset, VideoId};
use crate::utils::parse_time;
use anyhow::{anyhow, bail, Result};
use std::path::PathBuf;

pub const USAGE: &str = "\
Usage: clipforge <command> [args] [--project <dir>]

Commands:
  init                          Create the project if it does not exist
  import <files..>              Copy videos into the project and add their clips
  list                          Show videos, clips and timeline length
  split <time>                  Split the clip under <time>
  delete <clip-id>              Ripple-delete a clip
  glue                          Close every gap between clips
  remove-video <video-id>       Remove a video and all of its clips
  play [--from <time>]          Trace preview playback through the timeline
  export <output> [--quality high|medium|low] [--reveal]
                                Render the timeline to one file

Times accept SS, MM:SS or HH:MM:SS with fractions.
The project directory defaults to the current directory.";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Init,
    Import(Vec<PathBuf>),
    List,
    Split(f64),
    Delete(ClipId),
    Glue,
    RemoveVideo(VideoId),
    Play { from: f64 },
    Export {
        output: PathBuf,
        quality: QualityPreset,
        reveal: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cli {
    pub project: PathBuf,
    pub command: Command,
}

fn flag_value(iter: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    iter.next().ok_or_else(|| anyhow!("{} needs a value", flag))
}

fn time_arg(value: &str) -> Result<f64> {
    parse_time(value).ok_or_else(|| anyhow!("invalid time '{}'", value))
}

impl Cli {
    /// Parse arguments, program name excluded
    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self> {
        let mut project = PathBuf::from(".");
        let mut quality = None;
        let mut from = None;
        let mut reveal = false;
        let mut positional = Vec::new();

        let mut iter = args.into_iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--project" | "-p" => project = PathBuf::from(flag_value(&mut iter, "--project")?),
                "--quality" | "-q" => {
                    let value = flag_value(&mut iter, "--quality")?;
                    quality = Some(value.parse::<QualityPreset>().map_err(|e| anyhow!(e))?);
                }
                "--from" => from = Some(time_arg(&flag_value(&mut iter, "--from")?)?),
                "--reveal" => reveal = true,
                "--help" | "-h" => {
                    return Ok(Self {
                        project,
                        command: Command::Help,
                    })
                }
                flag if flag.starts_with("--") => bail!("unknown option '{}'", flag),
                _ => positional.push(arg),
            }
        }

        let Some((name, rest)) = positional.split_first() else {
            bail!("missing command");
        };

        let is_export = name == "export";
        if (quality.is_some() || reveal) && !is_export {
            bail!("--quality and --reveal only apply to export");
        }
        if from.is_some() && name != "play" {
            bail!("--from only applies to play");
        }

        let command = match (name.as_str(), rest) {
            ("help", []) => Command::Help,
            ("init", []) => Command::Init,
            ("list", []) => Command::List,
            ("glue", []) => Command::Glue,
            ("import", files) if !files.is_empty() => Command::Import(files.iter().map(PathBuf::from).collect()),
            ("split", [time]) => Command::Split(time_arg(time)?),
            ("delete", [id]) => Command::Delete(ClipId::from(id.as_str())),
            ("remove-video", [id]) => Command::RemoveVideo(VideoId::from(id.as_str())),
            ("play", []) => Command::Play {
                from: from.unwrap_or(0.0),
            },
            ("export", [output]) => Command::Export {
                output: PathBuf::from(output),
                quality: quality.unwrap_or_default(),
                reveal,
            },
            ("init" | "list" | "glue" | "import" | "split" | "delete" | "remove-video" | "play" | "export", _) => {
                bail!("wrong arguments for '{}'", name)
            }
            _ => bail!("unknown command '{}'", name),
        };

        Ok(Self { project, command })
    }
}
