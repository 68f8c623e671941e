//! `lecturegen` -- command-line driver for the lecture generation server.
//!
//! Each subcommand is one page load of the lecture tool: `new` is the
//! intake page, `edit`/`save`/`generate` the editor, `result` the result
//! page. The job id travels with `--job`; without it the id remembered from
//! the previous run is used.
//!
//! Status messages go to stdout, logs to stderr (`RUST_LOG`, default
//! `lecturegen_client=info`).

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use lecturegen_core::config::{
    JobConfig, RenderOptions, VoiceMode, DEFAULT_GENDER, DEFAULT_LANGUAGE,
};
use lecturegen_core::status::{JobState, StatusUpdate};
use lecturegen_core::types::JobId;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lecturegen_client::config::{parse_url, ClientConfig};
use lecturegen_client::flows::{self, EditSession, IntakeRequest};
use lecturegen_client::identity::resolve_job_id;
use lecturegen_client::sink::{StatusSink, TracingSink};
use lecturegen_client::stages::LectureClient;

#[derive(Parser, Debug)]
#[command(name = "lecturegen")]
#[command(about = "Generate narrated lecture videos on a lecture server")]
#[command(version)]
struct Cli {
    /// Lecture server base URL (overrides LECTUREGEN_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Directory holding the remembered job id (overrides LECTUREGEN_STATE_DIR)
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    /// Send status messages to the log instead of stdout
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a job from a teacher image and a slide deck
    New {
        /// Teacher image
        #[arg(long)]
        image: Option<PathBuf>,
        /// Slide deck (.pptx)
        #[arg(long)]
        pptx: Option<PathBuf>,
        #[command(flatten)]
        voice: VoiceArgs,
        #[command(flatten)]
        render: RenderArgs,
    },
    /// Clone a reusable voice from a sample recording
    CloneVoice {
        #[arg(long)]
        job: Option<String>,
        /// Voice sample (wav/mp3)
        sample: Option<PathBuf>,
    },
    /// List available voices
    Voices {
        #[command(subcommand)]
        catalog: VoicesCommand,
    },
    /// Print the slide text of a job
    Edit {
        #[arg(long)]
        job: Option<String>,
        /// Also print the stored voice/render configuration
        #[arg(long)]
        show_config: bool,
    },
    /// Save edited slide text from a file ("-" reads stdin)
    Save {
        #[arg(long)]
        job: Option<String>,
        file: PathBuf,
    },
    /// Save slide text, start generation, and wait for it to finish
    Generate {
        #[arg(long)]
        job: Option<String>,
        /// Text to save first; defaults to the job's current text
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Wait for a job and print where its video can be viewed
    Result {
        #[arg(long)]
        job: Option<String>,
        /// Also download the video to this path
        #[arg(long)]
        download: Option<PathBuf>,
    },
    /// Print a job's status once
    Status {
        #[arg(long)]
        job: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum VoicesCommand {
    /// Server voices for a language and gender
    Builtin {
        #[arg(long, default_value = DEFAULT_LANGUAGE)]
        lang: String,
        #[arg(long, default_value = DEFAULT_GENDER)]
        gender: String,
    },
    /// Voices cloned so far
    Cloned,
}

#[derive(Args, Debug)]
struct VoiceArgs {
    /// `builtin` or `clone`
    #[arg(long, default_value = "builtin")]
    voice_mode: String,
    #[arg(long, default_value = DEFAULT_LANGUAGE)]
    lang: String,
    #[arg(long, default_value = DEFAULT_GENDER)]
    gender: String,
    /// Builtin voice id
    #[arg(long)]
    voice: Option<String>,
    /// Cloned voice name
    #[arg(long)]
    cloned_voice: Option<String>,
    /// Language the cloned voice speaks
    #[arg(long)]
    cloned_lang: Option<String>,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[arg(long)]
    preprocess: Option<String>,
    /// Keep the head still
    #[arg(long)]
    still: bool,
    /// Run the face enhancer
    #[arg(long)]
    enhancer: bool,
    #[arg(long)]
    batch_size: Option<u32>,
    #[arg(long)]
    size: Option<u32>,
    #[arg(long)]
    pose_style: Option<u32>,
    #[arg(long)]
    speech_rate: Option<f32>,
}

impl VoiceArgs {
    fn job_config(&self, render: &RenderArgs) -> JobConfig {
        let mut config = match VoiceMode::from_label(&self.voice_mode) {
            VoiceMode::Builtin => {
                JobConfig::builtin(&self.lang, &self.gender, self.voice.as_deref())
            }
            VoiceMode::Clone => JobConfig::cloned(
                &self.lang,
                self.cloned_voice.as_deref().unwrap_or_default(),
                self.cloned_lang.as_deref(),
            ),
        };
        config.gender = self.gender.clone();
        config.render = RenderOptions {
            preprocess_type: render.preprocess.clone(),
            is_still_mode: render.still.then_some(true),
            enhancer: render.enhancer.then_some(true),
            batch_size: render.batch_size,
            size_of_image: render.size,
            pose_style: render.pose_style,
            speech_rate: render.speech_rate,
        };
        config
    }
}

/// Prints status messages for the operator.
struct ConsoleSink;

impl StatusSink for ConsoleSink {
    fn emit(&self, update: StatusUpdate) {
        println!("{update}");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lecturegen_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "lecturegen failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = ClientConfig::from_env().context("Invalid configuration")?;
    if let Some(raw) = &cli.api_url {
        config.api_url = parse_url("--api-url", raw)?;
    }
    if let Some(dir) = cli.state_dir {
        config.state_dir = Some(dir);
    }
    tracing::debug!(api_url = %config.api_url, "Loaded client configuration");

    let transport = config.transport().context("Failed to build HTTP client")?;
    let client = LectureClient::new(transport);
    let store = config.identity_store()?;
    let poll = config.poll_config();

    let sink: Box<dyn StatusSink> = if cli.quiet {
        Box::new(TracingSink)
    } else {
        Box::new(ConsoleSink)
    };
    let sink = sink.as_ref();

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    match cli.command {
        Command::New { image, pptx, voice, render } => {
            let request = IntakeRequest {
                source_image: image,
                slide_deck: pptx,
                config: voice.job_config(&render),
            };
            let next = flows::intake(&client, &store, sink, &request).await?;
            println!("Job: {}", next.job_id);
            println!("Editor: {}", next.location(client.transport())?);
        }

        Command::CloneVoice { job, sample } => {
            let job = job.as_deref().and_then(JobId::parse);
            let cloned = flows::clone_voice(&client, &store, sink, job, sample.as_deref()).await?;
            println!("Job: {}", cloned.job_id);
            for name in &cloned.voices {
                println!("{name}");
            }
        }

        Command::Voices { catalog } => match catalog {
            VoicesCommand::Builtin { lang, gender } => {
                for voice in client.builtin_voices(&lang, &gender).await? {
                    println!("{}", voice.label());
                }
            }
            VoicesCommand::Cloned => {
                for name in client.cloned_voices().await? {
                    println!("{name}");
                }
            }
        },

        Command::Edit { job, show_config } => {
            let session = EditSession::open(&client, &store, sink, job.as_deref()).await?;
            if show_config {
                let stored = session.config().await?;
                println!("{}", serde_json::to_string_pretty(&stored)?);
            }
            println!("{}", session.text());
        }

        Command::Save { job, file } => {
            let text = read_text(&file)?;
            let mut session = EditSession::open(&client, &store, sink, job.as_deref()).await?;
            session.save(&text).await?;
        }

        Command::Generate { job, file } => {
            let text = file.as_deref().map(read_text).transpose()?;
            let mut session = EditSession::open(&client, &store, sink, job.as_deref()).await?;
            let text = text.unwrap_or_else(|| session.text().to_string());
            let next = session.generate(&text, &poll, &cancel).await?;
            println!("Result: {}", next.location(client.transport())?);
        }

        Command::Result { job, download } => {
            let result =
                flows::show_result(&client, &store, sink, job.as_deref(), &poll, &cancel).await?;
            println!("View: {}", result.view);
            println!("Download: {}", result.download);
            if let Some(dest) = download {
                let bytes = client.download_result(&result.job_id, &dest).await?;
                sink.emit(StatusUpdate::Success(format!(
                    "Saved {bytes} bytes to {}",
                    dest.display()
                )));
            }
        }

        Command::Status { job } => {
            let job_id = resolve_job_id(job.as_deref(), &store)?;
            let status = client.job_status(&job_id).await?;
            let update = match status.state {
                JobState::Done => StatusUpdate::Success(status.done_message()),
                JobState::Failed => StatusUpdate::Error(status.failure_message()),
                JobState::Queued | JobState::Processing => {
                    StatusUpdate::Info(status.progress_message())
                }
            };
            sink.emit(update);
        }
    }

    Ok(())
}

fn read_text(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read slide text from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read slide text from {}", path.display()))
}
