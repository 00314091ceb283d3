//! `studio` command: route prompts and run the helper flows from a terminal.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context as _, bail};
use clap::{Parser, Subcommand};
use serde_json::Value;
use studio_router::prelude::*;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "studio")]
#[command(about = "Route prompts to Gemini text, image, and video models")]
#[command(version)]
struct Cli {
    /// Optional .env file to load before reading the environment
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify a prompt and generate text, an image, or a video
    Generate {
        /// Prompt text (may be empty when attachments are given)
        #[arg(default_value = "")]
        prompt: String,
        /// Media files to attach, in order
        #[arg(short, long = "attach")]
        attachments: Vec<PathBuf>,
        /// JSON file with earlier conversation turns
        #[arg(long)]
        history: Option<PathBuf>,
        /// Directory generated media is written to
        #[arg(short, long, default_value = "out")]
        out_dir: PathBuf,
    },
    /// Suggest a short conversation title for a prompt
    Title { prompt: String },
    /// Print starter prompts for a model tier (Pro, Flash, Flash-Lite, Image)
    Suggest {
        #[arg(default_value = "Flash")]
        tier: ModelTier,
    },
    /// Analyze the sentiment of a text
    Sentiment { text: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("failed to load env file {}", path.display()))?;
        }
        None => {
            let _ = dotenvy::dotenv();
        }
    }
    init_observability();

    let studio = Studio::from_env()?;
    match cli.command {
        Command::Generate {
            prompt,
            attachments,
            history,
            out_dir,
        } => {
            let attachments = attachments
                .iter()
                .map(|path| read_media(path))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let history = match history {
                Some(path) => read_history(&path)?,
                None => Vec::new(),
            };
            let envelope = studio.generate_response(prompt, attachments, history).await;
            let failed = envelope.is_error();
            let printed = render_envelope(&envelope, &out_dir)?;
            println!("{}", serde_json::to_string_pretty(&printed)?);
            Ok(if failed {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Command::Title { prompt } => {
            println!("{}", studio.conversation_title(&prompt).await?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Suggest { tier } => {
            for suggestion in studio.prompt_suggestions(tier).await? {
                println!("{suggestion}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Sentiment { text } => {
            let sentiment = studio.analyze_sentiment(&text).await?;
            println!("{}", serde_json::to_string(&sentiment)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    Some(match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        _ => return None,
    })
}

fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "video/mp4" => "mp4",
        "video/quicktime" => "mov",
        "video/webm" => "webm",
        _ => "bin",
    }
}

fn read_media(path: &Path) -> anyhow::Result<MediaRef> {
    let Some(mime) = mime_for_path(path) else {
        bail!("cannot tell the media type of {} from its extension", path.display());
    };
    let data = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(MediaRef::new(mime, data)?)
}

fn read_history(path: &Path) -> anyhow::Result<Vec<HistoryTurn>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("invalid history JSON in {}", path.display()))
}

/// Writes produced media to `out_dir` and returns the envelope JSON with the
/// media field replaced by the written file path.
fn render_envelope(envelope: &ResponseEnvelope, out_dir: &Path) -> anyhow::Result<Value> {
    let mut value = serde_json::to_value(envelope)?;
    let ResponseEnvelope::Data(result) = envelope else {
        return Ok(value);
    };
    let Some(media) = result.media() else {
        return Ok(value);
    };
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;
    let id = media.content_id();
    let file = out_dir.join(format!(
        "{}.{}",
        &id.as_str()[..16.min(id.as_str().len())],
        extension_for_mime(media.mime_type())
    ));
    std::fs::write(&file, media.data())
        .with_context(|| format!("failed to write {}", file.display()))?;
    info!(path = %file.display(), bytes = media.data().len() as u64, "wrote generated media");

    let field = match result.kind() {
        TaskKind::VideoGeneration => "video",
        _ => "image",
    };
    value["data"][field] = Value::String(file.display().to_string());
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_is_guessed_from_extension() {
        assert_eq!(mime_for_path(Path::new("cat.PNG")), Some("image/png"));
        assert_eq!(mime_for_path(Path::new("clip.mov")), Some("video/quicktime"));
        assert_eq!(mime_for_path(Path::new("notes.txt")), None);
        assert_eq!(mime_for_path(Path::new("noext")), None);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = read_media(Path::new("doc.pdf")).expect_err("unsupported");
        assert!(err.to_string().contains("doc.pdf"));
    }

    #[test]
    fn image_result_is_written_and_path_printed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let uri = "data:image/png;base64,AQID";
        let envelope: ResponseEnvelope = serde_json::from_value(serde_json::json!({
            "data": {"type": "image", "model": "imagen", "label": "Imagen", "image": uri}
        }))
        .expect("envelope");
        let printed = render_envelope(&envelope, dir.path()).expect("render");
        let path = printed["data"]["image"].as_str().expect("path");
        assert!(path.ends_with(".png"));
        assert_eq!(std::fs::read(path).expect("written"), vec![1u8, 2, 3]);
    }

    #[test]
    fn error_envelope_is_printed_unchanged() {
        let dir = tempfile::tempdir().expect("tempdir");
        let envelope = ResponseEnvelope::Error("boom".into());
        let printed = render_envelope(&envelope, dir.path()).expect("render");
        assert_eq!(printed, serde_json::json!({"error": "boom"}));
    }

    #[test]
    fn cli_parses_generate_with_attachments() {
        let cli = Cli::try_parse_from([
            "studio",
            "generate",
            "make it blue",
            "-a",
            "cat.png",
            "-a",
            "dog.jpg",
        ])
        .expect("parse");
        match cli.command {
            Command::Generate { prompt, attachments, .. } => {
                assert_eq!(prompt, "make it blue");
                assert_eq!(attachments.len(), 2);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        let suggest = Cli::try_parse_from(["studio", "suggest", "flash-lite"]).expect("parse");
        assert!(matches!(suggest.command, Command::Suggest { tier: ModelTier::FlashLite }));
    }
}
