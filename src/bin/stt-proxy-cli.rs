use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::multipart::{Form, Part};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "stt-proxy-cli")]
#[command(about = "Inspect and exercise a running STT proxy", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:10241")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check proxy liveness
    Health,
    /// Show request counters
    Stats,
    /// Send an audio file through the transcription route
    Transcribe {
        /// Audio file to upload
        file: PathBuf,

        #[arg(short, long, default_value = "whisper-1")]
        model: String,

        /// Extra form field, repeatable (`--field language=en`)
        #[arg(short, long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,

        #[arg(long, default_value = "/v1/audio/transcriptions")]
        path: String,
    },
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got `{}`", raw))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{}/health", base)).send().await?;
            print_response(res).await?;
        }
        Commands::Stats => {
            let res = client.get(format!("{}/stats", base)).send().await?;
            print_response(res).await?;
        }
        Commands::Transcribe {
            file,
            model,
            fields,
            path,
        } => {
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "audio".to_string());
            let bytes = tokio::fs::read(&file).await?;
            let mime = guess_audio_mime(&filename);

            let mut form = Form::new()
                .part("file", Part::bytes(bytes).file_name(filename).mime_str(mime)?)
                .text("model", model);
            for (key, value) in fields {
                form = form.text(key, value);
            }

            let res = client
                .post(format!("{}{}", base, path))
                .multipart(form)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

fn guess_audio_mime(filename: &str) -> &'static str {
    let ext = filename.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    match ext.as_str() {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "ogg" | "oga" => "audio/ogg",
        "flac" => "audio/flac",
        "webm" => "audio/webm",
        _ => "application/octet-stream",
    }
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: proxy returned status {}", status);
        eprintln!("Response: {}", text);
        return Ok(());
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
