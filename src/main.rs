//! koreosync CLI: drive a simulated session and print delivered spans.
//!
//! Usage:
//!   koreosync [--config session.yaml] [--seconds N] [--fps N] [--transition]
//!
//! A looping music track authored at 44.1 kHz plays on a 48 kHz host
//! engine that mixes in fixed blocks, so position updates arrive out of
//! step with frames. With `--transition` an outro channel takes over
//! halfway through.

use std::path::Path;
use std::process;
use std::{env, fmt::Display};

use ks_host::{HostEngine, Sound};
use ks_master::{DispatchMode, Session, SessionConfig, SpanEvent, TrackInfo};

const MIX_RATE: u32 = 48000;
const AUTHORED_RATE: u32 = 44100;
/// Host mixing block, in output samples
const BLOCK: u64 = 1024;
const TRACK_SECONDS: u32 = 8;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    let config = match flag_value(&args, "--config") {
        Some(path) => SessionConfig::load(Path::new(path)).unwrap_or_else(|e| fail(e)),
        None => SessionConfig::default(),
    };
    let seconds: f64 = parse_flag(&args, "--seconds", 10.0);
    let fps: f64 = parse_flag(&args, "--fps", 60.0);
    let transition = args.iter().any(|a| a == "--transition");
    if !(seconds > 0.0 && fps > 0.0) {
        fail("--seconds and --fps must be positive");
    }

    run(config, seconds, fps, transition);
}

fn run(config: SessionConfig, seconds: f64, fps: f64, transition: bool) {
    let mut host = HostEngine::new(MIX_RATE);
    let master = host.master();
    let music = host.add_bus(master).unwrap_or_else(|e| fail(e));

    let length = MIX_RATE * TRACK_SECONDS;
    let sound = Sound::new(MIX_RATE, length).looping(MIX_RATE * 2, MIX_RATE * 6 - 1);
    let channel = host.play(sound, music).unwrap_or_else(|e| fail(e));
    let track = TrackInfo::new("theme", AUTHORED_RATE, AUTHORED_RATE * TRACK_SECONDS);

    let dispatch = config.dispatch;
    let mut session = Session::new(config).unwrap_or_else(|e| fail(e));
    if dispatch == DispatchMode::Callback {
        let callbacks = session.engine_callbacks();
        host.set_end_hook(Box::new(move |key| callbacks.channel_ended(key)));
    }
    let id = session.track(&host, &track, channel).unwrap_or_else(|e| fail(e));

    if transition {
        let start = (seconds / 2.0 * MIX_RATE as f64) as u64;
        host.set_end_tick(channel, Some(start)).unwrap_or_else(|e| fail(e));
        let outro = host
            .play_scheduled(Sound::new(MIX_RATE, length), music, start, MIX_RATE * 6)
            .unwrap_or_else(|e| fail(e));
        session
            .queue_transition(&host, id, outro)
            .unwrap_or_else(|e| fail(e));
        log::info!("outro scheduled at {:.2}s", start as f64 / MIX_RATE as f64);
    }

    println!(
        "Track:  {} ({} Hz authored, {} Hz engine)",
        track.name, AUTHORED_RATE, MIX_RATE
    );
    println!("Frames: {} at {} fps", (seconds * fps).round(), fps);
    println!();

    let frame = 1.0 / fps;
    let block_seconds = BLOCK as f64 / MIX_RATE as f64;
    let frames = (seconds * fps).round() as u64;
    let mut mixed = 0.0;
    let mut events: Vec<SpanEvent> = Vec::with_capacity(8);
    let mut delivered: i64 = 0;

    for n in 1..=frames {
        let now = n as f64 * frame;
        while mixed + block_seconds <= now {
            host.advance(BLOCK);
            mixed += block_seconds;
        }

        session.update(&host, Some(master), 1.0, frame as f32, &mut events);
        for e in events.drain(..) {
            delivered += e.len() as i64;
            println!(
                "{:>8.3}s  {:<8} [{:>7}, {:>7}]  offset {:.3}  length {:.4}s",
                now,
                e.track.as_str(),
                e.start,
                e.end,
                e.slice.offset_fraction,
                e.slice.length_seconds
            );
        }
    }

    println!();
    println!("Delivered: {} samples", delivered);
    match session.status(id) {
        Some(status) => println!("Status:    {:?}", status),
        None => println!("Status:    released"),
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn parse_flag(args: &[String], flag: &str, default: f64) -> f64 {
    match flag_value(args, flag) {
        Some(text) => text
            .parse()
            .unwrap_or_else(|_| fail(format!("{} expects a number, got '{}'", flag, text))),
        None => default,
    }
}

fn fail(message: impl Display) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}
