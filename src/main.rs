use beatfall::config;
use beatfall::core::clock::{AudioClock, ManualClock};
use beatfall::game::gameplay::{self, GameplayEvent};
use beatfall::game::{beatmap, song};
use log::{LevelFilter, debug, error, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const FRAME_SECONDS: f64 = 1.0 / 60.0;
const DEFAULT_DURATION_SECONDS: f64 = 60.0;
// Autoplay press error is drawn from +/- this many seconds.
const AUTOPLAY_SPREAD: f64 = 0.14;
const AUTOPLAY_SKIP_CHANCE: f64 = 0.05;

/// Command line: `[song] [duration] [--beatmap <file>] [--save-beatmap <file>]`.
#[derive(Default)]
struct Args {
    positional: Vec<String>,
    load_beatmap: Option<PathBuf>,
    save_beatmap: Option<PathBuf>,
}

fn parse_args(mut raw: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut args = Args::default();
    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--beatmap" | "--save-beatmap" => {
                let path = raw.next().ok_or_else(|| format!("{} needs a file path", arg))?;
                if arg == "--beatmap" {
                    args.load_beatmap = Some(PathBuf::from(path));
                } else {
                    args.save_beatmap = Some(PathBuf::from(path));
                }
            }
            _ => args.positional.push(arg),
        }
    }
    Ok(args)
}

/// A scheduled key press from the autoplayer.
struct Press {
    at: f64,
    lane: usize,
}

fn main() -> Result<(), Box<dyn Error>> {
    // --- Logging Setup ---
    env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Info)
        .filter_module("beatfall::game::beatmap", LevelFilter::Debug)
        .init();

    info!("beatfall starting...");
    config::load(Path::new(config::CONFIG_INI_PATH));
    let config = config::get();

    // --- Song Selection ---
    let args = parse_args(std::env::args().skip(1))?;
    let mut positional = args.positional.iter();
    let selection = positional.next().cloned().unwrap_or_else(|| "0".to_string());
    let song = match selection.parse::<usize>() {
        Ok(index) => song::catalog().get(index).cloned(),
        Err(_) => song::find_song(&selection),
    };
    let Some(song) = song else {
        error!("No song matches '{}'. Available:", selection);
        for (i, s) in song::catalog().iter().enumerate() {
            error!("  {}: {} ({} BPM)", i, s.title, s.formatted_bpm());
        }
        return Err(format!("unknown song '{}'", selection).into());
    };
    let duration = match positional.next() {
        Some(raw) => raw.parse::<f64>()?,
        None => DEFAULT_DURATION_SECONDS,
    };
    let descriptor = song.with_duration(duration)?;
    info!(
        "Selected '{}' ({} BPM, {:.1}s): {}",
        song.title,
        song.formatted_bpm(),
        duration,
        song.description
    );

    // --- Beatmap ---
    let notes = match &args.load_beatmap {
        Some(path) => beatmap::load(path)?,
        None => beatmap::generate_seeded(
            descriptor.bpm,
            descriptor.duration_seconds,
            &config.beatmap,
            config.seed,
        )?,
    };
    if let Some(path) = &args.save_beatmap {
        beatmap::save(&notes, path)?;
    }
    let notes = Arc::new(notes);

    // --- Session ---
    let mut state = gameplay::init(Arc::clone(&notes), &config)?;
    gameplay::subscribe(
        &mut state,
        Box::new(|event: &GameplayEvent| {
            if let GameplayEvent::NoteJudged(judgment) = event {
                match serde_json::to_string(judgment) {
                    Ok(line) => debug!("{}", line),
                    Err(e) => debug!("{} on lane {} ({})", judgment.grade, judgment.lane, e),
                }
            }
        }),
    );
    let bindings: Vec<String> = (0..config.beatmap.lane_count)
        .map(|lane| match config.key_map.key_for(lane) {
            Some(key) => format!("{}={}", lane, key),
            None => format!("{}=unbound", lane),
        })
        .collect();
    info!("Lane bindings: {}", bindings.join(" "));
    gameplay::start(&mut state);

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
        None => StdRng::from_os_rng(),
    };
    let mut presses: Vec<Press> = Vec::with_capacity(notes.len());
    for note in notes.iter() {
        if rng.random_bool(AUTOPLAY_SKIP_CHANCE) {
            continue;
        }
        presses.push(Press {
            at: (note.time + rng.random_range(-AUTOPLAY_SPREAD..AUTOPLAY_SPREAD)).max(0.0),
            lane: note.lane,
        });
    }
    presses.sort_by(|a, b| a.at.total_cmp(&b.at));

    // --- Play ---
    let end_time = notes.last().map_or(0.0, |n| n.time) + 1.0;
    let mut clock = ManualClock::new();
    let mut next_press = 0;
    while clock.current_time() < end_time {
        clock.advance(FRAME_SECONDS);
        let now = clock.current_time();
        while next_press < presses.len() && presses[next_press].at <= now {
            let press = &presses[next_press];
            gameplay::judge_a_tap(&mut state, press.lane, press.at);
            next_press += 1;
        }
        gameplay::drive(&mut state, &clock);
    }

    let summary = gameplay::summary(&state);
    info!(
        "Finished '{}': score {} / {}, max combo {}, grade {}",
        song.title,
        summary.score,
        summary.possible_score,
        summary.max_combo,
        summary.grade.label()
    );
    if summary.unjudged() > 0 {
        info!("{} notes were still in flight.", summary.unjudged());
    }
    println!("{}", serde_json::to_string_pretty(&summary)?);

    clock.pause();
    gameplay::drive(&mut state, &clock);
    info!("Application exited gracefully.");
    Ok(())
}
