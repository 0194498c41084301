//! Texel - texture cache driver
//!
//! Loads every file in a directory into the residency cache and replays a
//! sliding window of texture requests over a number of turns, then prints
//! the cache counters.
//!
//! Usage: `texel <dir> [--gpu] [--turns N] [--window N]`
//!
//! The cache configuration is read from the JSON file named by
//! `TEXEL_CONFIG`, if set. Log verbosity follows `RUST_LOG`.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use texel_cache::TextureManager;
use texel_core::{CacheConfig, FormatKey, NeverFlush, NodeId, TextureHints};
use texel_gpu::{GraphicsDevice, HeadlessDevice, WgpuDevice};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

struct Options {
    dir: PathBuf,
    gpu: bool,
    turns: u64,
    window: usize,
}

fn parse_args() -> Result<Options> {
    let mut dir = None;
    let mut gpu = false;
    let mut turns = 300;
    let mut window = 16;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--gpu" => gpu = true,
            "--turns" => {
                turns = args
                    .next()
                    .context("--turns needs a value")?
                    .parse()
                    .context("--turns must be a number")?;
            }
            "--window" => {
                window = args
                    .next()
                    .context("--window needs a value")?
                    .parse()
                    .context("--window must be a number")?;
            }
            _ if dir.is_none() => dir = Some(PathBuf::from(arg)),
            other => bail!("Unexpected argument: {}", other),
        }
    }

    let Some(dir) = dir else {
        bail!("Usage: texel <dir> [--gpu] [--turns N] [--window N]");
    };
    Ok(Options {
        dir,
        gpu,
        turns,
        window: window.max(1),
    })
}

fn load_config() -> Result<CacheConfig> {
    match std::env::var_os("TEXEL_CONFIG") {
        Some(path) => {
            let config = CacheConfig::load_from_file(Path::new(&path))
                .with_context(|| format!("Failed to load config {:?}", path))?;
            info!("Loaded config from {:?}", path);
            Ok(config)
        }
        None => Ok(CacheConfig::default()),
    }
}

fn open_device(gpu: bool) -> Result<Box<dyn GraphicsDevice>> {
    if gpu {
        let device = WgpuDevice::new_blocking().context("Failed to open GPU device")?;
        info!("Using GPU adapter: {}", device.context().adapter_info().name);
        Ok(Box::new(device))
    } else {
        info!("Using headless device");
        Ok(Box::new(HeadlessDevice::new()))
    }
}

fn load_dir<D: GraphicsDevice>(cache: &mut TextureManager<D>, dir: &Path) -> Result<Vec<NodeId>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let limit = cache.config().max_texture_bytes as u64;
    let mut ids = Vec::with_capacity(paths.len());
    for path in paths {
        let len = std::fs::metadata(&path)?.len();
        if len > limit {
            warn!("Skipping {}: {} bytes exceeds {}", path.display(), len, limit);
            continue;
        }
        let id = cache.load(
            &path,
            FormatKey::Solid,
            TextureHints::NONE,
            false,
            NeverFlush::NONE,
        )?;
        ids.push(id);
    }
    Ok(ids)
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let options = parse_args()?;
    let config = load_config()?;
    let device = open_device(options.gpu)?;
    let mut cache = TextureManager::new(config, device)?;

    let ids = load_dir(&mut cache, &options.dir)?;
    if ids.is_empty() {
        bail!("No textures found in {}", options.dir.display());
    }
    info!("Loaded {} textures from {}", ids.len(), options.dir.display());

    let mut drawn = 0u64;
    let mut untextured = 0u64;
    for turn in 0..options.turns {
        let start = turn as usize % ids.len();
        for &id in ids.iter().cycle().skip(start).take(options.window) {
            match cache.acquire_resident(id)? {
                Some(_) => drawn += 1,
                None => untextured += 1,
            }
        }
        cache.housekeeping();
    }

    let stats = cache.stats();
    info!(
        drawn,
        untextured,
        resident = stats.resident,
        "Replayed {} turns",
        options.turns
    );
    println!("{:#?}", stats);
    println!("hit rate:          {:.3}", stats.hit_rate());
    println!("compression ratio: {:.3}", stats.compression_ratio());

    let purged = cache.purge();
    info!("Shut down, {} textures released", purged);
    Ok(())
}
