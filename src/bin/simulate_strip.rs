//! Headless terrain streaming run.
//!
//! Usage: cargo run --release --bin simulate_strip -- [OPTIONS]
//!
//! Options:
//!   --config <PATH>    JSON terrain config (default: built-in defaults)
//!   --ticks <N>        Number of frames to simulate (default: 3600)
//!   --speed <U/S>      Observer speed in world units per second (default: 12.0)
//!   --fps <N>          Fixed tick rate (default: 60)
//!   --seed <SEED>      Override the noise seed
//!   --count <N>        Use the count-bounded policy with N segments
//!   --teleport <TICK>  Jump the observer 1000 units ahead at this tick
//!   --snapshot <PATH>  Write the final window as JSON

use std::path::PathBuf;
use std::time::Instant;

use terrain_strip::core::logging;
use terrain_strip::streaming::TerrainStreamer;
use terrain_strip::terrain::TerrainConfig;

fn main() {
    logging::init();

    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> terrain_strip::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let ticks = parse_usize_arg(&args, "--ticks").unwrap_or(3600);
    let speed = parse_f32_arg(&args, "--speed").unwrap_or(12.0);
    let fps = parse_usize_arg(&args, "--fps").unwrap_or(60).max(1);
    let teleport_at = parse_usize_arg(&args, "--teleport");
    let snapshot_path = parse_str_arg(&args, "--snapshot").map(PathBuf::from);

    let mut config = match parse_str_arg(&args, "--config") {
        Some(path) => TerrainConfig::load(&PathBuf::from(path))?,
        None => TerrainConfig::default(),
    };
    if let Some(seed) = parse_u32_arg(&args, "--seed") {
        config.seed = seed;
    }
    if let Some(count) = parse_usize_arg(&args, "--count") {
        config = config.count_bounded(count);
    }

    println!("=== Terrain Strip Simulation ===");
    println!("Policy: {:?}", config.policy);
    println!("Segment: {} wide, {} points", config.segment_width, config.points_per_segment);
    println!("Pool:   {} initial, max {}", config.initial_pool_size, config.max_pool_size);
    println!("Ticks:  {} at {} fps, speed {}", ticks, fps, speed);
    println!();

    let mut streamer = TerrainStreamer::new(config)?;
    let dt = 1.0 / fps as f32;
    let mut observer_x = 0.0_f32;
    let mut spawned = 0;
    let mut retired = 0;
    let mut exhausted_ticks = 0;
    let start = Instant::now();

    for tick in 0..ticks {
        observer_x += speed * dt;
        if teleport_at == Some(tick) {
            observer_x += 1000.0;
            log::info!("Teleported observer to x={}", observer_x);
        }

        let report = streamer.tick(observer_x, dt)?;
        spawned += report.spawned;
        retired += report.retired;
        if report.exhausted {
            exhausted_ticks += 1;
        }

        if tick > 0 && tick % (fps * 10) == 0 {
            let stats = streamer.pool_stats();
            log::info!(
                "t={:.0}s x={:.1} active={} pool {}/{} free={}",
                tick as f32 * dt,
                observer_x,
                streamer.active_len(),
                stats.active,
                stats.total,
                stats.free
            );
        }
    }

    let elapsed = start.elapsed();
    let stats = streamer.pool_stats();
    println!("Done in {:.2?} ({:.1} us/tick)", elapsed, elapsed.as_secs_f64() * 1e6 / ticks.max(1) as f64);
    println!("Observer: x={:.1}, frontier={:.1}", observer_x, streamer.frontier_x());
    println!("Segments: {} spawned, {} retired, {} active", spawned, retired, streamer.active_len());
    println!("Pool:     {} slots ({} grown), {} exhausted ticks", stats.total, stats.grown, exhausted_ticks);

    if let Some(path) = snapshot_path {
        let json = serde_json::to_string_pretty(&streamer.snapshot())?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, json)?;
        println!("Snapshot: {}", path.display());
    }
    Ok(())
}

fn parse_str_arg(args: &[String], name: &str) -> Option<String> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn parse_f32_arg(args: &[String], name: &str) -> Option<f32> {
    parse_str_arg(args, name).and_then(|s| s.parse().ok())
}

fn parse_u32_arg(args: &[String], name: &str) -> Option<u32> {
    parse_str_arg(args, name).and_then(|s| s.parse().ok())
}

fn parse_usize_arg(args: &[String], name: &str) -> Option<usize> {
    parse_str_arg(args, name).and_then(|s| s.parse().ok())
}
