use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};

use lyrisync::collab::{AlignmentSource as _, FixedSaveChoice, JsonAlignmentFile, SaveChoice};
use lyrisync::render::lyrics::resolve_target_line;
use lyrisync::subtitle::lrc::lrc_to_plain_text;
use lyrisync::{
    AudioInput, AudioSource, Background, FfmpegSinkFactory, FrameRenderer, Lines,
    OfflineRenderer, RenderConfig, RenderJob, RenderOutcome, SinkOutput, SmoothState,
};

#[derive(Parser, Debug)]
#[command(name = "lyrisync", version)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the recovered lines.
    Lines(LinesArgs),
    /// Export an LRC file.
    Lrc(ExportArgs),
    /// Export an SRT file.
    Srt(ExportArgs),
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Render a lyric video (requires `ffmpeg` on PATH).
    Render(RenderArgs),
}

#[derive(Args, Debug)]
struct WordsArgs {
    /// Alignment JSON (`{"aligned_words": [...]}` or a bare array).
    #[arg(long)]
    words: PathBuf,

    /// Reference lyrics; `.lrc` timestamps are dropped.
    #[arg(long)]
    lyrics: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct LinesArgs {
    #[command(flatten)]
    input: WordsArgs,

    /// Print line groups as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[command(flatten)]
    input: WordsArgs,

    /// Output path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct FrameArgs {
    #[command(flatten)]
    input: WordsArgs,

    /// Render config JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Timeline time in seconds.
    #[arg(long)]
    time: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    input: WordsArgs,

    /// Track audio, a file path or an http(s) URL.
    #[arg(long)]
    audio: String,

    /// Render config JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Background image or video.
    #[arg(long)]
    background: Option<PathBuf>,

    /// Stream the MP4 to this path.
    #[arg(long, conflicts_with = "memory_out", required_unless_present = "memory_out")]
    out: Option<PathBuf>,

    /// Encode into memory, then write the finished MP4 here.
    #[arg(long)]
    memory_out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Lines(args) => cmd_lines(args),
        Command::Lrc(args) => cmd_export(args, lyrisync::to_lrc),
        Command::Srt(args) => cmd_export(args, lyrisync::to_srt),
        Command::Frame(args) => cmd_frame(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn load_lines(input: &WordsArgs) -> anyhow::Result<Lines> {
    let words = JsonAlignmentFile::new(&input.words).fetch_alignment("", None)?;
    let reference = match &input.lyrics {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read lyrics '{}'", path.display()))?;
            if is_lrc(path) {
                lrc_to_plain_text(&text)
            } else {
                text
            }
        }
        None => String::new(),
    };
    let lines = lyrisync::match_lines(&words, &reference);
    tracing::info!(words = words.len(), lines = lines.len(), "recovered lines");
    Ok(lines)
}

fn is_lrc(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("lrc"))
}

fn load_config(path: Option<&Path>) -> anyhow::Result<RenderConfig> {
    let cfg = match path {
        Some(p) => RenderConfig::from_path(p)?,
        None => RenderConfig::default(),
    };
    cfg.validate()?;
    Ok(cfg)
}

fn load_background(cfg: &RenderConfig, path: Option<&Path>) -> anyhow::Result<Background> {
    Ok(match path {
        Some(p) => Background::from_path(p, Duration::from_millis(cfg.seek_timeout_ms))?,
        None => Background::Solid(cfg.visual.background_color),
    })
}

fn write_output(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("write '{}'", path.display()))
}

fn cmd_lines(args: LinesArgs) -> anyhow::Result<()> {
    let lines = load_lines(&args.input)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&lines)?);
        return Ok(());
    }
    for line in &lines {
        println!("[{:8.3} - {:8.3}] {}", line.start_s(), line.end_s(), line.text());
    }
    Ok(())
}

fn cmd_export(args: ExportArgs, export: fn(&[lyrisync::LineGroup]) -> String) -> anyhow::Result<()> {
    let lines = load_lines(&args.input)?;
    write_output(&args.out, export(&lines).as_bytes())?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let lines = load_lines(&args.input)?;
    let cfg = load_config(args.config.as_deref())?;
    let background = Background::Solid(cfg.visual.background_color);
    let mut renderer = FrameRenderer::new(cfg.canvas(), cfg.visual.clone(), background)?;

    // A still frame shows the scroll at rest on its target line.
    let mut smooth = SmoothState::new();
    smooth.advance(resolve_target_line(&lines, args.time), 1.0);
    let frame = renderer.render_frame(args.time, &lines, &mut smooth, None)?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let lines = load_lines(&args.input)?;
    let cfg = load_config(args.config.as_deref())?;
    let background = load_background(&cfg, args.background.as_deref())?;

    let choice = match (&args.out, &args.memory_out) {
        (Some(out), _) => SaveChoice::File(out.clone()),
        (None, Some(_)) => SaveChoice::Memory,
        (None, None) => SaveChoice::Cancelled,
    };
    let mut renderer = OfflineRenderer::new(cfg, Box::new(FfmpegSinkFactory))?;
    let job = RenderJob {
        lines: &lines,
        audio: AudioInput::Source(AudioSource::parse(&args.audio)),
        background,
    };
    let mut smooth = SmoothState::new();
    let outcome = renderer.render(
        job,
        &mut FixedSaveChoice(choice),
        &mut smooth,
        &mut |p| eprint!("\rrendering {:5.1}%", p.fraction() * 100.0),
    )?;
    eprintln!();

    match outcome {
        RenderOutcome::Cancelled => eprintln!("render cancelled"),
        RenderOutcome::Completed { output, stats } => {
            match (output, &args.memory_out) {
                (SinkOutput::Streamed(path), _) => eprintln!("wrote {}", path.display()),
                (SinkOutput::Buffer(bytes), Some(path)) => {
                    write_output(path, &bytes)?;
                    eprintln!("wrote {} ({} bytes)", path.display(), bytes.len());
                }
                (SinkOutput::Buffer(bytes), None) => {
                    anyhow::bail!("encoder returned {} bytes with nowhere to write them", bytes.len())
                }
            }
            tracing::info!(
                frames = stats.frames_total,
                max_in_flight = stats.max_in_flight,
                "render finished"
            );
        }
    }
    Ok(())
}
