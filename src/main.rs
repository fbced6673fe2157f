use anyhow::Context;
use clap::Parser;
use crossterm::{
    cursor,
    event::{self, Event, KeyboardEnhancementFlags},
    execute, terminal,
};
use std::fs::File;
use std::io::{self, stdout};
use std::sync::Mutex;
use std::time::{Duration, Instant};

mod audio;
mod config;
mod energy;
mod error;
mod input;
mod pitch;
mod proximity;
mod render;
mod sim;
mod spawner;
mod synth;
mod voices;

use audio::AudioSink;
use config::{Args, Config};
use input::InputTracker;
use render::PixelBuf;
use sim::Simulation;

const FRAME: Duration = Duration::from_nanos(1_000_000_000 / 60);
// Longer stalls (a suspended terminal, a resize storm) count as one frame.
const MAX_DT: f64 = 0.1;

fn init_logging(path: &std::path::Path) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

// ── Main ────────────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_file)?;
    let cfg = Config::from_args(&args);
    tracing::info!(seed = cfg.seed, base_freq = cfg.pitch.base_freq, "starting");

    let mut audio = audio::open_output(cfg.mute);
    let mut sim = Simulation::new(cfg);

    terminal::enable_raw_mode()?;
    let mut out = stdout();
    execute!(
        out,
        terminal::EnterAlternateScreen,
        cursor::Hide,
        terminal::DisableLineWrap,
    )?;
    let release_events = terminal::supports_keyboard_enhancement().unwrap_or(false);
    if release_events {
        execute!(
            out,
            event::PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
    }
    tracing::debug!(release_events, "terminal ready");

    let result = run(&mut out, &mut sim, audio.as_mut(), release_events);

    // Sound goes off before anything else, whatever happened above.
    sim.shutdown(audio.as_mut());

    let cleanup = |out: &mut io::Stdout| -> io::Result<()> {
        if release_events {
            execute!(out, event::PopKeyboardEnhancementFlags)?;
        }
        execute!(
            out,
            terminal::LeaveAlternateScreen,
            cursor::Show,
            terminal::EnableLineWrap,
        )?;
        terminal::disable_raw_mode()
    };
    cleanup(&mut out)?;

    if let Err(e) = &result {
        tracing::error!(error = %e, "game loop failed");
    }
    tracing::info!("bye");
    result.map_err(Into::into)
}

fn run(
    out: &mut io::Stdout,
    sim: &mut Simulation,
    audio: &mut dyn AudioSink,
    release_events: bool,
) -> io::Result<()> {
    let (cols, rows) = terminal::size()?;
    let mut buf = PixelBuf::new(cols as usize, rows as usize * 2);
    let mut input = InputTracker::new(release_events);
    let mut last = Instant::now();
    let mut frame: u64 = 0;

    loop {
        let frame_start = Instant::now();

        // Input
        while event::poll(Duration::ZERO)? {
            match event::read()? {
                Event::Key(key) => input.handle(key, frame_start),
                Event::Resize(c, r) => buf.resize(c as usize, r as usize * 2),
                _ => {}
            }
        }
        let actions = input.poll(frame_start);
        if actions.quit {
            tracing::info!("quit requested");
            return Ok(());
        }

        // Update
        let dt = frame_start.duration_since(last).as_secs_f64().min(MAX_DT);
        last = frame_start;
        if let Some(state) = sim.step(&actions, dt, audio) {
            tracing::info!(?state, elapsed = sim.elapsed(), "game over");
        }

        // Render
        let labels = render::draw(sim, &mut buf, frame);
        buf.render(out, &labels)?;
        frame += 1;

        // Frame pacing
        let elapsed = frame_start.elapsed();
        if elapsed < FRAME {
            std::thread::sleep(FRAME - elapsed);
        }
    }
}
