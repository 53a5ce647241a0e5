use std::env;
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use sound_kit::control::ui::{self, ConsoleVoice};
use sound_kit::transport::NullSink;
use sound_kit::{Engine, EngineConfig, EngineStatus, Registry, Voice, probe};

const SAMPLE_RATE: u16 = 22_050;

fn build_voices(registry: &Arc<Registry>) -> Vec<ConsoleVoice> {
    let rate = SAMPLE_RATE;
    let entries = [
        ("beep 440 Hz", probe::sine_clip(rate, 440.0, rate as usize / 4)),
        ("chirp 880 Hz", probe::sine_clip(rate, 880.0, rate as usize / 8)),
        ("hum 110 Hz", probe::sine_clip(rate, 110.0, rate as usize / 2)),
    ];
    entries
        .into_iter()
        .map(|(label, clip)| ConsoleVoice {
            label: label.to_string(),
            voice: Voice::new(registry),
            clip,
        })
        .collect()
}

fn print_status(status: &EngineStatus) {
    println!(
        "rate={} Hz out={} Hz block={} frames ({:.2} ms) blocks={} voices={} active={}",
        status.sample_rate,
        status.output_rate,
        status.block_frames,
        status.block_ms,
        status.blocks_written,
        status.voices.len(),
        status.voices.iter().filter(|v| v.active).count(),
    );
}

fn run_demo(engine: &Engine, voices: &[ConsoleVoice]) {
    for entry in voices {
        entry.voice.play(&entry.clip);
    }
    while voices.iter().any(|entry| entry.voice.active()) {
        print_status(&engine.status());
        thread::sleep(Duration::from_millis(100));
    }
    print_status(&engine.status());
}

fn main() {
    let mut demo = false;
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--demo" | "-d" => demo = true,
            "--help" | "-h" => {
                println!(
                    "Usage: soundctl [--demo]\n\nWithout arguments the interactive console launches."
                );
                return;
            }
            other => {
                eprintln!("soundctl: unknown argument '{other}'");
                process::exit(1);
            }
        }
    }

    let _ = tracing_subscriber::fmt::try_init();

    let registry = Arc::new(Registry::new());
    let config = EngineConfig {
        rate_divisor: 1,
        ..EngineConfig::with_sample_rate(u32::from(SAMPLE_RATE))
    };
    let engine = match Engine::start(config, Arc::clone(&registry), Box::new(NullSink::new())) {
        Ok(engine) => engine,
        Err(err) => {
            eprintln!("soundctl: {err}");
            process::exit(1);
        }
    };

    let voices = build_voices(&registry);

    if demo {
        run_demo(&engine, &voices);
    } else if let Err(err) = ui::run(&engine, &voices) {
        eprintln!("soundctl: {err}");
        process::exit(1);
    }

    drop(voices);
    engine.shutdown();
}
