use crate::error::Error;
use crate::game::note::{Note, NoteKind};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::Path;

// Upper bound on up-front allocation; longer charts grow the Vec as they go.
const MAX_PREALLOCATED_NOTES: usize = 1 << 16;

/// Knobs for the beatmap generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatmapParams {
    pub lane_count: usize,
    /// Added to every note time so the first notes can spawn before playback reaches them.
    pub lead_in_offset: f64,
    pub offbeat_chance: f64,
    pub chord_chance: f64,
    /// Off-beat notes are only considered for beats strictly after this index.
    pub offbeat_after_beat: u64,
    /// Chord notes are only considered for beats strictly after this index.
    pub chord_after_beat: u64,
}

impl Default for BeatmapParams {
    fn default() -> Self {
        Self {
            lane_count: 4,
            lead_in_offset: 1.5,
            offbeat_chance: 0.5,
            chord_chance: 0.25,
            offbeat_after_beat: 4,
            chord_after_beat: 8,
        }
    }
}

impl BeatmapParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.lane_count < 2 {
            return Err(format!("LaneCount must be at least 2, got {}", self.lane_count));
        }
        if !self.lead_in_offset.is_finite() || self.lead_in_offset < 0.0 {
            return Err(format!("LeadInSeconds must be non-negative, got {}", self.lead_in_offset));
        }
        let chances = [("OffbeatChance", self.offbeat_chance), ("ChordChance", self.chord_chance)];
        for (name, chance) in chances {
            if !(0.0..=1.0).contains(&chance) {
                return Err(format!("{} must be within [0, 1], got {}", name, chance));
            }
        }
        Ok(())
    }
}

/// A note together with the generation step that placed it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlacedNote {
    pub beat: u64,
    pub kind: NoteKind,
    pub note: Note,
}

/// Running context threaded from one beat to the next.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
struct BeatContext {
    last_lane: Option<usize>,
}

/// Generates a beatmap for a track of `duration_seconds` at `bpm`.
///
/// A zero tempo or zero duration yields an empty beatmap. Negative or
/// non-finite inputs are rejected. The result is stably sorted by time.
pub fn generate<R: Rng>(
    bpm: f64,
    duration_seconds: f64,
    params: &BeatmapParams,
    rng: &mut R,
) -> Result<Vec<Note>, Error> {
    let placed = generate_placed(bpm, duration_seconds, params, rng)?;
    Ok(placed.into_iter().map(|p| p.note).collect())
}

/// Generates with a fresh `StdRng`: seeded when `seed` is set, from the OS otherwise.
pub fn generate_seeded(
    bpm: f64,
    duration_seconds: f64,
    params: &BeatmapParams,
    seed: Option<u64>,
) -> Result<Vec<Note>, Error> {
    let mut rng = match seed {
        Some(seed) => {
            debug!("Seeding beatmap generator with {}", seed);
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_os_rng(),
    };
    generate(bpm, duration_seconds, params, &mut rng)
}

/// Same as [`generate`] but keeps each note's beat index and kind.
pub fn generate_placed<R: Rng>(
    bpm: f64,
    duration_seconds: f64,
    params: &BeatmapParams,
    rng: &mut R,
) -> Result<Vec<PlacedNote>, Error> {
    if bpm == 0.0 || duration_seconds == 0.0 {
        return Ok(Vec::new());
    }
    if !bpm.is_finite() || bpm < 0.0 {
        return Err(Error::InvalidArgument(format!("bpm must be a positive number, got {}", bpm)));
    }
    if !duration_seconds.is_finite() || duration_seconds < 0.0 {
        return Err(Error::InvalidArgument(format!(
            "duration must be a non-negative number of seconds, got {}",
            duration_seconds
        )));
    }
    params.validate().map_err(Error::InvalidArgument)?;

    let beat_interval = 60.0 / bpm;
    let total_beats = (duration_seconds / beat_interval).floor() as u64;

    let mut placed = Vec::with_capacity(capacity_hint(total_beats));
    let mut context = BeatContext::default();
    for beat in 0..total_beats {
        context = place_beat(beat, beat_interval, params, context, rng, &mut placed);
    }

    // Vec::sort_by is stable, so chord partners keep their generation order.
    placed.sort_by(|a, b| a.note.time.total_cmp(&b.note.time));

    info!(
        "Generated {} notes over {} beats ({} BPM, {:.2}s).",
        placed.len(),
        total_beats,
        bpm,
        duration_seconds
    );
    Ok(placed)
}

fn place_beat<R: Rng>(
    beat: u64,
    beat_interval: f64,
    params: &BeatmapParams,
    context: BeatContext,
    rng: &mut R,
    out: &mut Vec<PlacedNote>,
) -> BeatContext {
    let base_time = beat as f64 * beat_interval;
    let hit_time = base_time + params.lead_in_offset;

    let lane = if beat % 4 == 0 {
        rng.random_range(0..params.lane_count)
    } else {
        lane_excluding(rng, params.lane_count, context.last_lane)
    };
    out.push(PlacedNote {
        beat,
        kind: NoteKind::Primary,
        note: Note { time: hit_time, lane },
    });

    if beat > params.offbeat_after_beat && rng.random_bool(params.offbeat_chance) {
        let offbeat_lane = rng.random_range(0..params.lane_count);
        out.push(PlacedNote {
            beat,
            kind: NoteKind::OffBeat,
            note: Note {
                time: base_time + beat_interval / 2.0 + params.lead_in_offset,
                lane: offbeat_lane,
            },
        });
    }

    if beat > params.chord_after_beat && rng.random_bool(params.chord_chance) {
        let chord_lane = lane_excluding(rng, params.lane_count, Some(lane));
        debug!("Chord at beat {}: lanes {} + {}", beat, lane, chord_lane);
        out.push(PlacedNote {
            beat,
            kind: NoteKind::Chord,
            note: Note { time: hit_time, lane: chord_lane },
        });
    }

    BeatContext { last_lane: Some(lane) }
}

fn capacity_hint(total_beats: u64) -> usize {
    usize::try_from(total_beats)
        .unwrap_or(usize::MAX)
        .saturating_mul(2)
        .min(MAX_PREALLOCATED_NOTES)
}

/// Serializes a beatmap as a JSON array of `{ "time", "lane" }` objects.
pub fn to_json(notes: &[Note]) -> Result<String, Error> {
    Ok(serde_json::to_string_pretty(notes)?)
}

/// Parses a JSON beatmap. Times must be finite, non-negative and sorted.
pub fn from_json(text: &str) -> Result<Vec<Note>, Error> {
    let notes: Vec<Note> = serde_json::from_str(text)?;
    if let Some(idx) = notes.iter().position(|n| !n.time.is_finite() || n.time < 0.0) {
        return Err(Error::InvalidArgument(format!(
            "note {} has time {}, expected a non-negative number of seconds",
            idx, notes[idx].time
        )));
    }
    if let Some(pos) = notes.windows(2).position(|w| w[0].time > w[1].time) {
        return Err(Error::InvalidArgument(format!(
            "beatmap is not sorted by time at note {}",
            pos + 1
        )));
    }
    Ok(notes)
}

pub fn save(notes: &[Note], path: &Path) -> Result<(), Error> {
    fs::write(path, to_json(notes)?)?;
    info!("Saved {} notes to '{}'.", notes.len(), path.display());
    Ok(())
}

pub fn load(path: &Path) -> Result<Vec<Note>, Error> {
    let text = fs::read_to_string(path)?;
    let notes = from_json(&text)?;
    info!("Loaded {} notes from '{}'.", notes.len(), path.display());
    Ok(notes)
}

/// Uniform lane in `0..lane_count`, never `excluded`.
fn lane_excluding<R: Rng>(rng: &mut R, lane_count: usize, excluded: Option<usize>) -> usize {
    match excluded {
        Some(skip) if skip < lane_count => {
            let lane = rng.random_range(0..lane_count - 1);
            if lane >= skip { lane + 1 } else { lane }
        }
        _ => rng.random_range(0..lane_count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    #[test]
    fn same_seed_same_beatmap() {
        let params = BeatmapParams::default();
        for seed in [0, 7, 42, 9001] {
            let a = generate(120.0, 90.0, &params, &mut seeded(seed)).unwrap();
            let b = generate(120.0, 90.0, &params, &mut seeded(seed)).unwrap();
            assert_eq!(a, b, "seed {} should be reproducible", seed);
            assert!(!a.is_empty());
        }
    }

    #[test]
    fn seeded_helper_matches_explicit_rng() {
        let params = BeatmapParams::default();
        let a = generate_seeded(110.0, 45.0, &params, Some(5)).unwrap();
        let b = generate(110.0, 45.0, &params, &mut seeded(5)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn output_is_sorted_by_time() {
        let params = BeatmapParams::default();
        for seed in 0..20 {
            let notes = generate(102.0, 120.0, &params, &mut seeded(seed)).unwrap();
            assert!(
                notes.windows(2).all(|w| w[0].time <= w[1].time),
                "seed {} produced an unsorted beatmap",
                seed
            );
        }
    }

    #[test]
    fn consecutive_non_measure_primaries_differ() {
        let params = BeatmapParams::default();
        for seed in 0..50 {
            let placed = generate_placed(110.0, 60.0, &params, &mut seeded(seed)).unwrap();
            let mut primaries: Vec<&PlacedNote> =
                placed.iter().filter(|p| p.kind == NoteKind::Primary).collect();
            primaries.sort_by_key(|p| p.beat);
            for pair in primaries.windows(2) {
                if pair[1].beat % 4 != 0 {
                    assert_ne!(
                        pair[0].note.lane, pair[1].note.lane,
                        "seed {}: beats {} and {} repeat a lane",
                        seed, pair[0].beat, pair[1].beat
                    );
                }
            }
        }
    }

    #[test]
    fn chords_use_two_distinct_lanes() {
        let params = BeatmapParams::default();
        let mut chords_seen = 0;
        for seed in 0..50 {
            let notes = generate(120.0, 60.0, &params, &mut seeded(seed)).unwrap();
            for pair in notes.windows(2) {
                if pair[0].time == pair[1].time {
                    chords_seen += 1;
                    assert_ne!(pair[0].lane, pair[1].lane, "seed {} doubled a lane", seed);
                }
            }
        }
        assert!(chords_seen > 0, "expected at least one chord across 50 seeds");
    }

    #[test]
    fn extras_respect_start_beats() {
        let params = BeatmapParams::default();
        for seed in 0..30 {
            let placed = generate_placed(120.0, 30.0, &params, &mut seeded(seed)).unwrap();
            for p in &placed {
                match p.kind {
                    NoteKind::Primary => {}
                    NoteKind::OffBeat => assert!(p.beat > 4, "off-beat at beat {}", p.beat),
                    NoteKind::Chord => assert!(p.beat > 8, "chord at beat {}", p.beat),
                }
            }
        }
    }

    #[test]
    fn one_primary_per_beat_with_lead_in() {
        let params = BeatmapParams::default();
        let placed = generate_placed(60.0, 10.5, &params, &mut seeded(3)).unwrap();
        let primaries: Vec<&PlacedNote> =
            placed.iter().filter(|p| p.kind == NoteKind::Primary).collect();
        assert_eq!(primaries.len(), 10);
        for p in primaries {
            assert_eq!(p.note.time, p.beat as f64 + 1.5);
            assert!(p.note.lane < 4);
        }
    }

    #[test]
    fn zero_tempo_or_duration_is_empty() {
        let params = BeatmapParams::default();
        for x in [0.0, 1.0, 120.0, -5.0] {
            assert!(generate(0.0, x, &params, &mut seeded(1)).unwrap().is_empty());
            assert!(generate(x, 0.0, &params, &mut seeded(1)).unwrap().is_empty());
        }
    }

    #[test]
    fn malformed_inputs_fail_fast() {
        let params = BeatmapParams::default();
        assert!(matches!(
            generate(-120.0, 60.0, &params, &mut seeded(1)),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            generate(120.0, -1.0, &params, &mut seeded(1)),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            generate(f64::NAN, 60.0, &params, &mut seeded(1)),
            Err(Error::InvalidArgument(_))
        ));
        let single_lane = BeatmapParams { lane_count: 1, ..params };
        assert!(generate(120.0, 60.0, &single_lane, &mut seeded(1)).is_err());
    }

    #[test]
    fn huge_charts_do_not_preallocate_everything() {
        assert_eq!(capacity_hint(10), 20);
        assert_eq!(capacity_hint(u64::MAX), MAX_PREALLOCATED_NOTES);
        let beats = (1e9 / (60.0 / 1e12_f64)).floor() as u64;
        assert_eq!(capacity_hint(beats), MAX_PREALLOCATED_NOTES);
    }

    #[test]
    fn json_keeps_the_generated_chart() {
        let params = BeatmapParams::default();
        let notes = generate(120.0, 20.0, &params, &mut seeded(8)).unwrap();
        let text = to_json(&notes).unwrap();
        assert!(text.contains("\"lane\""));
        assert_eq!(from_json(&text).unwrap(), notes);
    }

    #[test]
    fn bad_json_beatmaps_are_rejected() {
        assert!(matches!(from_json("[{\"time\": 1.0}]"), Err(Error::Json(_))));
        assert!(matches!(from_json("not json"), Err(Error::Json(_))));
        let negative = r#"[{"time": -1.0, "lane": 0}]"#;
        assert!(matches!(from_json(negative), Err(Error::InvalidArgument(_))));
        let unsorted = r#"[{"time": 2.0, "lane": 0}, {"time": 1.0, "lane": 1}]"#;
        assert!(matches!(from_json(unsorted), Err(Error::InvalidArgument(_))));
        assert_eq!(from_json("[]").unwrap(), Vec::new());
    }

    #[test]
    fn lane_exclusion_never_hits_excluded_lane() {
        let mut rng = seeded(11);
        for _ in 0..1000 {
            assert_ne!(lane_excluding(&mut rng, 4, Some(2)), 2);
            assert!(lane_excluding(&mut rng, 4, None) < 4);
        }
    }
}
