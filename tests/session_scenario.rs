use beatfall::config::GameConfig;
use beatfall::core::clock::{AudioClock, ManualClock};
use beatfall::game::beatmap::{self, BeatmapParams};
use beatfall::game::gameplay::{self, SessionPhase};
use beatfall::game::judgment::JudgeGrade;
use beatfall::game::note::Note;
use beatfall::game::scroll::Playfield;
use beatfall::game::song;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;

fn half_second_travel() -> GameConfig {
    GameConfig {
        playfield: Playfield {
            note_speed: 20.0,
            pixels_per_second_unit: 60.0,
            spawn_distance: 600.0,
            terminal_distance: 650.0,
        },
        ..GameConfig::default()
    }
}

#[test]
fn documented_two_note_scenario() {
    let notes = vec![Note { time: 1.5, lane: 0 }, Note { time: 2.0, lane: 1 }];
    let mut state = gameplay::init(Arc::new(notes), &half_second_travel()).unwrap();
    gameplay::start(&mut state);

    let report = gameplay::update(&mut state, 1.0);
    assert_eq!(report.spawned, vec![0]);

    let hit = gameplay::judge_a_tap(&mut state, 0, 1.52).unwrap();
    assert_eq!(hit.grade, JudgeGrade::Perfect);
    assert_eq!((state.score, state.combo), (100, 1));
    assert!(state.arrows[0].is_empty());

    let report = gameplay::update(&mut state, 2.6);
    assert_eq!(report.misses.len(), 1);
    assert_eq!(report.misses[0].note_index, 1);
    assert_eq!(state.combo, 0);
    assert_eq!(state.score, 100);
}

#[test]
fn perfect_play_through_a_generated_chart() {
    let config = GameConfig::default();
    let song = song::find_song("Starlight Fever").unwrap();
    let desc = song.with_duration(30.0).unwrap();
    let mut rng = StdRng::seed_from_u64(2024);
    let notes =
        beatmap::generate(desc.bpm, desc.duration_seconds, &config.beatmap, &mut rng).unwrap();
    let notes = Arc::new(notes);
    assert!(!notes.is_empty());

    let mut state = gameplay::init(Arc::clone(&notes), &config).unwrap();
    gameplay::start(&mut state);

    // Tick right before each note time, then press exactly on it.
    let mut clock = ManualClock::new();
    for note in notes.iter() {
        clock.seek_forward(note.time);
        gameplay::drive(&mut state, &clock);
        let judgment = gameplay::judge_a_tap(&mut state, note.lane, note.time);
        assert_eq!(judgment.map(|j| j.grade), Some(JudgeGrade::Perfect));
    }
    clock.seek_forward(clock.current_time() + 5.0);
    gameplay::drive(&mut state, &clock);

    let summary = gameplay::summary(&state);
    assert_eq!(summary.perfect as usize, notes.len());
    assert_eq!(summary.miss, 0);
    assert_eq!(summary.max_combo as usize, notes.len());
    assert_eq!(summary.score, summary.possible_score);

    clock.pause();
    assert!(gameplay::drive(&mut state, &clock).is_none());
    assert_eq!(state.phase, SessionPhase::Ended);
}

#[test]
fn ignoring_every_note_misses_everything() {
    let config = GameConfig::default();
    let params = BeatmapParams::default();
    let mut rng = StdRng::seed_from_u64(8);
    let notes = Arc::new(beatmap::generate(110.0, 20.0, &params, &mut rng).unwrap());
    let mut state = gameplay::init(Arc::clone(&notes), &config).unwrap();
    gameplay::start(&mut state);

    let mut clock = ManualClock::new();
    let end = notes.last().unwrap().time + 2.0;
    let mut misses = 0;
    while clock.current_time() < end {
        clock.advance(1.0 / 60.0);
        if let Some(report) = gameplay::drive(&mut state, &clock) {
            misses += report.misses.len();
        }
    }
    assert_eq!(misses, notes.len());
    assert_eq!(state.score, 0);
    assert_eq!(state.combo, 0);
    assert_eq!(gameplay::active_note_count(&state), 0);
}
