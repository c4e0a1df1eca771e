use std::{fs::File, io::{self, BufReader, Write}, path::{Path, PathBuf}, thread, time::{Duration, Instant}};

use anyhow::{bail, Context, Result};
use clap::Parser;
use image::RgbImage;
use marker_tracker::{ContrastMode, ReplayDetector, TimeProfileStatistics, TrackerBuilder, TrackerConfig, TrackerSnapshot};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Track fiducial markers through a sequence of frames")]
struct Args {
    /// Replay recorded detections (JSON lines) instead of running a detector
    #[arg(long)]
    detections: Option<PathBuf>,
    /// ArUco dictionary to detect
    #[cfg(feature="opencv")]
    #[arg(long, default_value = "4x4_50")]
    dictionary: String,
    /// Process frames on the calling thread instead of the worker
    #[arg(long, default_value_t=false)]
    sync: bool,
    /// Target tracking rate (Hz)
    #[arg(long, default_value_t=30.0)]
    fps: f64,
    /// Binarization level for contrast normalization
    #[arg(short, long, default_value_t=100)]
    contrast: u8,
    /// Gamma-correct instead of binarizing
    #[arg(short, long)]
    gamma: Option<f64>,
    /// Upscale factor for fiducial detection
    #[arg(short='x', long, default_value_t=1.5)]
    scale: f32,
    /// Disable motion-history recovery
    #[arg(long, default_value_t=false)]
    no_motion: bool,
    /// Print stage timings when done
    #[arg(short, long, default_value_t=false)]
    stats: bool,
    input_files: Vec<PathBuf>,
}

impl Args {
    fn config(&self) -> TrackerConfig {
        let mut config = TrackerConfig::default();
        config.fps = self.fps;
        config.detect_scale = self.scale;
        config.preprocess.contrast_threshold = self.contrast;
        if let Some(gamma) = self.gamma {
            config.preprocess.mode = ContrastMode::Gamma(gamma);
        }
        config.motion.enabled = !self.no_motion;
        config
    }
}

fn configure_detector(builder: &mut TrackerBuilder, args: &Args) -> Result<()> {
    if let Some(path) = &args.detections {
        let file = File::open(path)
            .with_context(|| format!("opening {}", path.display()))?;
        let replay = ReplayDetector::from_jsonl(BufReader::new(file))
            .with_context(|| format!("reading {}", path.display()))?;
        info!(frames = replay.remaining(), "replaying detections");
        builder.set_detector(replay);
        return Ok(());
    }

    #[cfg(feature="opencv")]
    {
        use marker_tracker::{ArucoDetector, ArucoDictionary};
        let dictionary: ArucoDictionary = args.dictionary.parse()
            .map_err(anyhow::Error::msg)?;
        builder.set_detector(ArucoDetector::new(dictionary)?);
        Ok(())
    }

    #[cfg(not(feature="opencv"))]
    bail!("no fiducial backend: pass --detections, or build with the `opencv` feature")
}

fn load_image(path: &Path) -> Result<RgbImage> {
    let image = image::open(path)
        .with_context(|| format!("loading {}", path.display()))?;
    Ok(image.into_rgb8())
}

fn emit(out: &mut impl Write, snapshot: &TrackerSnapshot) -> Result<()> {
    serde_json::to_writer(&mut *out, snapshot)?;
    writeln!(out)?;
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    if args.input_files.is_empty() {
        bail!("no input frames");
    }

    let mut builder = TrackerBuilder::new(args.config());
    configure_detector(&mut builder, &args)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let stats = if args.sync {
        let mut tracker = builder.build()?;
        let period = tracker.config().period();
        let mut stats = TimeProfileStatistics::default();
        for (i, path) in args.input_files.iter().enumerate() {
            let frame = match load_image(path) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("{e:#}");
                    continue;
                }
            };
            let tp = tracker.track_at(&frame, period * i as u32);
            stats.add(&tp);
            emit(&mut out, &tracker.snapshot())?;
        }
        stats
    } else {
        let worker = builder.spawn()?;
        let period = worker.config().period();
        for path in args.input_files.iter() {
            let frame = match load_image(path) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("{e:#}");
                    continue;
                }
            };
            let passes = worker.passes();
            worker.set_frame(frame);

            let deadline = Instant::now() + Duration::from_secs(1).max(period * 4);
            while worker.passes() == passes {
                if Instant::now() > deadline {
                    warn!(frame = %path.display(), "tracker did not pick up frame");
                    break;
                }
                thread::sleep(period / 4);
            }
            emit(&mut out, &worker.snapshot())?;
        }
        let stats = worker.statistics();
        worker.stop();
        stats
    };

    if args.stats {
        eprint!("{stats}");
    }
    Ok(())
}
