use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use roitrack::{
    config::{HandConfig, Size, Source},
    cv::{CvTrackers, DnnHandDetector, VideoSource, Window},
    Config, Registry, Session,
};

/// Track user selected regions of a camera feed or a video file.
///
/// Keys: `s` selects a region, `1`..`9` switch the tracking algorithm, `q` quits.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Video file to read instead of a camera
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Camera index
    #[arg(short, long)]
    camera: Option<i32>,

    /// Tracking algorithm (csrt, kcf, boosting, mil, tld, medianflow, mosse)
    #[arg(short, long)]
    tracker: Option<String>,

    /// Requested capture width
    #[arg(long)]
    width: Option<u32>,

    /// Requested capture height
    #[arg(long)]
    height: Option<u32>,

    /// Resize every frame to WIDTHxHEIGHT
    #[arg(long)]
    resize: Option<Size>,

    /// Track several regions at once
    #[arg(long)]
    multi: bool,

    /// Hand landmark ONNX model, enables finger counting
    #[arg(long)]
    hands: Option<PathBuf>,

    /// Palm detection ONNX model used with --hands
    #[arg(long)]
    palms: Option<PathBuf>,

    /// JSON config file, command line flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// Key wait per frame in milliseconds
    #[arg(long)]
    wait: Option<i32>,

    /// Print the available trackers and exit
    #[arg(long)]
    list_trackers: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(path) = self.input {
            config.source = Source::File(path);
        } else if let Some(idx) = self.camera {
            config.source = Source::Camera(idx);
        }

        if let Some(tracker) = self.tracker {
            config.tracker = tracker;
        }

        match (self.width, self.height) {
            (Some(width), Some(height)) => config.frame_size = Some(Size::new(width, height)),
            (None, None) => (),
            _ => anyhow::bail!("--width and --height must be given together"),
        }

        if self.resize.is_some() {
            config.resize = self.resize;
        }

        config.multi |= self.multi;

        if let Some(model) = self.hands {
            let hands = config.hands.get_or_insert_with(HandConfig::default);
            hands.model = model;
        }

        if let Some(model) = self.palms {
            match config.hands.as_mut() {
                Some(hands) => hands.detection_model = model,
                None => anyhow::bail!("--palms requires --hands or a hands config"),
            }
        }

        if let Some(wait) = self.wait {
            config.wait_ms = wait;
        }

        config.validate()?;

        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if args.list_trackers {
        for (idx, alg) in Registry::discover(&CvTrackers::new()).iter().enumerate() {
            println!("{}: {}", idx + 1, alg);
        }

        return Ok(());
    }

    let config = args.into_config()?;

    let capture = VideoSource::open(&config.source, config.frame_size, config.resize)
        .with_context(|| format!("opening {}", config.source))?;
    let window = Window::open(&config.window)?;
    let hands = config
        .hands
        .as_ref()
        .map(DnnHandDetector::new)
        .transpose()
        .context("loading hand models")?;

    let mut session = Session::new(config, capture, window, CvTrackers::new())?;
    if let Some(detector) = hands {
        session = session.with_hands(Box::new(detector));
    }

    let summary = session.run()?;
    log::info!("processed {} frames", summary.frames);

    Ok(())
}
