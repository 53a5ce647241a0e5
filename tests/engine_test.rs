use std::sync::Arc;

use sound_kit::transport::{NullSink, block_channel};
use sound_kit::{
    Clip, Engine, EngineConfig, EngineError, OUTPUT_SILENCE, Registry, TransportError, Voice,
};

fn test_config() -> EngineConfig {
    EngineConfig {
        sample_rate: 8_000,
        block_frames: 4,
        rate_divisor: 1,
        output_lanes: 2,
    }
}

#[test]
fn invalid_configurations_are_rejected() {
    let registry = Arc::new(Registry::new());
    let cases = [
        EngineConfig {
            sample_rate: 0,
            ..test_config()
        },
        EngineConfig {
            block_frames: 0,
            ..test_config()
        },
        EngineConfig {
            rate_divisor: 0,
            ..test_config()
        },
        EngineConfig {
            rate_divisor: 16_000,
            ..test_config()
        },
        EngineConfig {
            output_lanes: 0,
            ..test_config()
        },
    ];
    for config in cases {
        let result = Engine::start(
            config.clone(),
            Arc::clone(&registry),
            Box::new(NullSink::new()),
        );
        assert!(
            matches!(result, Err(EngineError::InvalidConfig(_))),
            "{config:?} must be rejected"
        );
    }
}

#[test]
fn transport_rejection_surfaces_from_start() {
    struct RejectingSink;
    impl sound_kit::Transport for RejectingSink {
        fn configure(&mut self, _rate: u32, lanes: usize) -> Result<(), TransportError> {
            Err(TransportError::UnsupportedLanes(lanes))
        }
        fn write_block(&mut self, block: &[u16]) -> Result<usize, TransportError> {
            Ok(block.len())
        }
    }

    let registry = Arc::new(Registry::new());
    let result = Engine::start(test_config(), registry, Box::new(RejectingSink));
    assert!(matches!(
        result,
        Err(EngineError::Transport(TransportError::UnsupportedLanes(2)))
    ));
}

#[test]
fn status_reports_configuration_and_progress() {
    let registry = Arc::new(Registry::new());
    let voice = Voice::new(&registry);
    voice.play(&Clip::from_pcm(8_000, vec![127; 1_000]));

    let (transport, blocks) = block_channel(2);
    let engine =
        Engine::start(test_config(), Arc::clone(&registry), Box::new(transport)).expect("start");

    let first = blocks.recv().expect("block");
    assert_eq!(first.len(), 8);

    let status = engine.status();
    assert_eq!(status.sample_rate, 8_000);
    assert_eq!(status.output_rate, 8_000);
    assert_eq!(status.block_frames, 4);
    assert_eq!(status.output_lanes, 2);
    assert!((status.block_ms - 0.5).abs() < 1e-3);
    assert!(status.blocks_written >= 1);
    assert_eq!(status.voices.len(), 1);
    assert_eq!(status.voices[0].id, voice.id());
    assert!(status.voices[0].active);
    assert!(status.voices[0].remaining < 1_000);

    drop(blocks);
    engine.shutdown();
}

#[test]
fn rate_divisor_scales_the_transport_rate() {
    let registry = Arc::new(Registry::new());
    let config = EngineConfig {
        sample_rate: 44_100,
        rate_divisor: 4,
        ..test_config()
    };
    assert_eq!(config.output_rate(), 11_025);

    let (transport, blocks) = block_channel(2);
    let engine = Engine::start(config, registry, Box::new(transport)).expect("start");
    assert_eq!(engine.status().output_rate, 11_025);
    drop(blocks);
    engine.shutdown();
}

#[test]
fn play_is_visible_to_the_running_loop() {
    let registry = Arc::new(Registry::new());
    let (transport, blocks) = block_channel(1);
    let engine =
        Engine::start(test_config(), Arc::clone(&registry), Box::new(transport)).expect("start");

    let voice = Voice::new(&registry);
    voice.play(&Clip::from_pcm(8_000, vec![255; 4_000]));

    // The loop starts on silence; once the play-request lands, full-scale
    // samples must show up within a bounded number of blocks.
    let mut saw_signal = false;
    for _ in 0..64 {
        let block = blocks.recv().expect("block");
        if let Some(first) = block.iter().position(|&sample| sample != OUTPUT_SILENCE) {
            // The request may land mid-block; from the first affected slot
            // onwards every sample must be the voice's full-scale value.
            assert!(block[first..].iter().all(|&sample| sample == 255 * 256));
            saw_signal = true;
            break;
        }
    }
    assert!(saw_signal, "play-request never reached the mixer loop");

    drop(blocks);
    engine.shutdown();
}

#[test]
fn independent_engines_do_not_share_registries() {
    let loud_registry = Arc::new(Registry::new());
    let quiet_registry = Arc::new(Registry::new());
    let voice = Voice::new(&loud_registry);
    voice.play(&Clip::from_pcm(8_000, vec![255; 4_000]));

    let (loud_tx, loud_rx) = block_channel(1);
    let (quiet_tx, quiet_rx) = block_channel(1);
    let loud = Engine::start(test_config(), Arc::clone(&loud_registry), Box::new(loud_tx))
        .expect("loud engine");
    let quiet = Engine::start(
        test_config(),
        Arc::clone(&quiet_registry),
        Box::new(quiet_tx),
    )
    .expect("quiet engine");

    let loud_block = loud_rx.recv().expect("loud block");
    assert!(loud_block.iter().all(|&sample| sample == 255 * 256));
    let quiet_block = quiet_rx.recv().expect("quiet block");
    assert!(quiet_block.iter().all(|&sample| sample == OUTPUT_SILENCE));

    drop(loud_rx);
    drop(quiet_rx);
    loud.shutdown();
    quiet.shutdown();
}
