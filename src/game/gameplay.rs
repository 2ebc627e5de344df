use crate::config::GameConfig;
use crate::core::clock::AudioClock;
use crate::core::input::KeyMap;
use crate::error::Error;
use crate::game::judgment::{self, JudgeGrade, Judgment, TimingWindows};
use crate::game::note::{ActiveNote, Note};
use crate::game::scores::SessionSummary;
use crate::game::scroll::Playfield;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;

const PROGRESS_LOG_INTERVAL: f64 = 1.0;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Running,
    Ended,
}

/// Hook points for the view layer. Note identity is the index into the beatmap.
#[derive(Clone, Debug, PartialEq)]
pub enum GameplayEvent {
    NoteSpawned { note_index: usize, lane: usize },
    NoteJudged(Judgment),
    NoteExpired { note_index: usize, lane: usize },
    ComboChanged(u32),
    ScoreChanged(u64),
}

pub type EventListener = Box<dyn FnMut(&GameplayEvent) + Send>;

#[derive(Clone, Debug, PartialEq)]
pub struct NoteProgress {
    pub note_index: usize,
    pub lane: usize,
    pub position_px: f64,
}

/// What changed during one tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    pub spawned: Vec<usize>,
    pub expired: Vec<usize>,
    pub misses: Vec<Judgment>,
    pub progress: Vec<NoteProgress>,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        self.spawned.is_empty() && self.expired.is_empty()
    }
}

pub struct State {
    pub beatmap: Arc<Vec<Note>>,
    pub playfield: Playfield,
    pub windows: TimingWindows,
    pub key_map: KeyMap,
    pub phase: SessionPhase,
    pub travel_time: f64,

    pub current_music_time: f64,
    pub note_spawn_cursor: usize,
    /// In-flight notes per lane, in spawn order.
    pub arrows: Vec<Vec<ActiveNote>>,

    pub score: u64,
    pub combo: u32,
    pub max_combo: u32,
    pub judgment_counts: HashMap<JudgeGrade, u32>,
    pub last_judgment: Option<Judgment>,

    listeners: Vec<EventListener>,
    pending_events: Vec<GameplayEvent>,
    last_progress_log: Option<f64>,
}

/// Builds an idle session for `beatmap`.
///
/// The beatmap must be sorted by time and every lane must fit the configured
/// lane count.
pub fn init(beatmap: Arc<Vec<Note>>, config: &GameConfig) -> Result<State, Error> {
    config.validate()?;
    let lane_count = config.beatmap.lane_count;

    if let Some(pos) = beatmap.windows(2).position(|w| w[0].time > w[1].time) {
        return Err(Error::InvalidArgument(format!(
            "beatmap is not sorted by time at note {}",
            pos + 1
        )));
    }
    if let Some((idx, note)) = beatmap
        .iter()
        .enumerate()
        .find(|(_, n)| n.lane >= lane_count || !n.time.is_finite() || n.time < 0.0)
    {
        return Err(Error::InvalidArgument(format!(
            "note {} (time {}, lane {}) does not fit a {}-lane playfield",
            idx, note.time, note.lane, lane_count
        )));
    }

    if config.key_map.lane_count() != lane_count {
        warn!(
            "Key map '{}' binds {} lanes but the playfield has {}",
            config.key_map,
            config.key_map.lane_count(),
            lane_count
        );
    }

    let travel_time = config.playfield.travel_time_seconds();
    info!(
        "Gameplay ready: {} notes, {} lanes, {}",
        beatmap.len(),
        lane_count,
        config.playfield
    );

    Ok(State {
        beatmap,
        playfield: config.playfield,
        windows: config.windows,
        key_map: config.key_map.clone(),
        phase: SessionPhase::Idle,
        travel_time,
        current_music_time: 0.0,
        note_spawn_cursor: 0,
        arrows: vec![Vec::new(); lane_count],
        score: 0,
        combo: 0,
        max_combo: 0,
        judgment_counts: HashMap::new(),
        last_judgment: None,
        listeners: Vec::new(),
        pending_events: Vec::new(),
        last_progress_log: None,
    })
}

/// Registers a hook. Events are queued while an operation runs and handed to
/// listeners, in order, once it has finished.
pub fn subscribe(state: &mut State, listener: EventListener) {
    state.listeners.push(listener);
}

fn emit(state: &mut State, event: GameplayEvent) {
    state.pending_events.push(event);
}

/// Drains the events queued since the last drain, in the order they happened.
pub fn take_events(state: &mut State) -> Vec<GameplayEvent> {
    std::mem::take(&mut state.pending_events)
}

// Listeners run once the operation has finished mutating the state.
fn dispatch_events(state: &mut State) {
    let events = take_events(state);
    for event in &events {
        for listener in state.listeners.iter_mut() {
            listener(event);
        }
    }
}

fn reset_session_state(state: &mut State) {
    state.score = 0;
    state.combo = 0;
    state.max_combo = 0;
    state.note_spawn_cursor = 0;
    state.current_music_time = 0.0;
    for lane in state.arrows.iter_mut() {
        lane.clear();
    }
    state.judgment_counts.clear();
    state.last_judgment = None;
    state.last_progress_log = None;
    emit(state, GameplayEvent::ScoreChanged(0));
    emit(state, GameplayEvent::ComboChanged(0));
}

/// Idle/Ended -> Running. Restarting a running session starts it over.
pub fn start(state: &mut State) {
    begin_session(state);
    dispatch_events(state);
}

pub(crate) fn begin_session(state: &mut State) {
    reset_session_state(state);
    state.phase = SessionPhase::Running;
    info!("Session started with {} notes.", state.beatmap.len());
}

/// Running -> Ended. Drops every in-flight note and clears score and combo.
pub fn stop(state: &mut State) {
    end_session(state);
    dispatch_events(state);
}

pub(crate) fn end_session(state: &mut State) {
    if state.phase != SessionPhase::Running {
        return;
    }
    let in_flight = active_note_count(state);
    info!(
        "Session stopped at {:.2}s (score {}, combo {}, {} notes in flight discarded).",
        state.current_music_time, state.score, state.combo, in_flight
    );
    reset_session_state(state);
    state.phase = SessionPhase::Ended;
}

pub fn active_note_count(state: &State) -> usize {
    state.arrows.iter().map(Vec::len).sum()
}

#[inline(always)]
fn spawn_lookahead_notes(state: &mut State, music_time_sec: f64, report: &mut TickReport) {
    while state.note_spawn_cursor < state.beatmap.len()
        && music_time_sec >= state.beatmap[state.note_spawn_cursor].time - state.travel_time
    {
        let note_index = state.note_spawn_cursor;
        let note = state.beatmap[note_index];
        state.arrows[note.lane].push(ActiveNote::new(note_index, note, state.travel_time));
        state.note_spawn_cursor += 1;
        report.spawned.push(note_index);
        emit(state, GameplayEvent::NoteSpawned { note_index, lane: note.lane });
    }
}

#[inline(always)]
fn expire_passed_notes(state: &mut State, music_time_sec: f64, report: &mut TickReport) {
    let playfield = state.playfield;
    let mut expired = Vec::new();
    for col_arrows in state.arrows.iter_mut() {
        col_arrows.retain(|arrow| {
            if playfield.is_past_terminal(arrow.elapsed(music_time_sec)) {
                expired.push(*arrow);
                false
            } else {
                true
            }
        });
    }

    for arrow in expired {
        let judgment = Judgment {
            time_error_ms: arrow.time_error(music_time_sec) * 1000.0,
            grade: JudgeGrade::Miss,
            note_index: arrow.note_index,
            lane: arrow.note.lane,
        };
        debug!(
            "MISSED: Note {}, Lane {}, Time: {:.3}s",
            arrow.note_index, arrow.note.lane, music_time_sec
        );
        *state.judgment_counts.entry(JudgeGrade::Miss).or_insert(0) += 1;
        state.combo = 0;
        state.last_judgment = Some(judgment.clone());
        report.expired.push(arrow.note_index);
        report.misses.push(judgment.clone());
        emit(
            state,
            GameplayEvent::NoteExpired { note_index: arrow.note_index, lane: arrow.note.lane },
        );
        emit(state, GameplayEvent::NoteJudged(judgment));
        emit(state, GameplayEvent::ComboChanged(0));
    }
}

/// Advances the session to `music_time_sec`: spawns due notes, expires notes
/// that fell past the playfield, and reports every in-flight note's position.
///
/// Calling this again with the same time changes nothing.
pub fn update(state: &mut State, music_time_sec: f64) -> TickReport {
    let report = advance(state, music_time_sec);
    dispatch_events(state);
    report
}

pub(crate) fn advance(state: &mut State, music_time_sec: f64) -> TickReport {
    let mut report = TickReport::default();
    if state.phase != SessionPhase::Running {
        return report;
    }
    state.current_music_time = music_time_sec;

    spawn_lookahead_notes(state, music_time_sec, &mut report);
    expire_passed_notes(state, music_time_sec, &mut report);

    report.progress = state
        .arrows
        .iter()
        .flatten()
        .map(|arrow| NoteProgress {
            note_index: arrow.note_index,
            lane: arrow.note.lane,
            position_px: state.playfield.position_px(arrow.elapsed(music_time_sec)),
        })
        .collect();

    let due = state
        .last_progress_log
        .is_none_or(|last| music_time_sec - last >= PROGRESS_LOG_INTERVAL);
    if due {
        info!(
            "Time: {:.2}, Score: {}, Combo: {}, Active Notes: {}, Spawned: {}/{}",
            music_time_sec,
            state.score,
            state.combo,
            active_note_count(state),
            state.note_spawn_cursor,
            state.beatmap.len()
        );
        state.last_progress_log = Some(music_time_sec);
    }

    report
}

/// Polls `clock` once. A paused clock ends the session and yields `None`.
pub fn drive<C: AudioClock + ?Sized>(state: &mut State, clock: &C) -> Option<TickReport> {
    let report = poll_clock(state, clock);
    dispatch_events(state);
    report
}

pub(crate) fn poll_clock<C: AudioClock + ?Sized>(
    state: &mut State,
    clock: &C,
) -> Option<TickReport> {
    if state.phase != SessionPhase::Running {
        return None;
    }
    if clock.is_paused() {
        end_session(state);
        return None;
    }
    Some(advance(state, clock.current_time()))
}

/// Judges a press in `lane` at `music_time_sec`.
///
/// Picks the closest in-flight note of that lane inside the miss window. A
/// press that finds nothing, or lands outside both scoring windows, returns
/// `None` and leaves every note in play.
pub fn judge_a_tap(state: &mut State, lane: usize, music_time_sec: f64) -> Option<Judgment> {
    let judgment = judge_press(state, lane, music_time_sec);
    dispatch_events(state);
    judgment
}

pub(crate) fn judge_press(state: &mut State, lane: usize, music_time_sec: f64) -> Option<Judgment> {
    if state.phase != SessionPhase::Running {
        return None;
    }
    let Some(col_arrows) = state.arrows.get(lane) else {
        warn!("Ignoring press on lane {} ({} lanes configured)", lane, state.arrows.len());
        return None;
    };

    let windows = state.windows;
    let (arrow_list_index, abs_time_error) = col_arrows
        .iter()
        .enumerate()
        .map(|(idx, arrow)| (idx, arrow.time_error(music_time_sec).abs()))
        .filter(|(_, abs_err)| windows.selects(*abs_err))
        .min_by(|a, b| a.1.total_cmp(&b.1))?;

    let arrow = col_arrows[arrow_list_index];
    let Some(grade) = windows.classify(abs_time_error) else {
        debug!(
            "UNSCORED: Note {}, Lane {}, Error: {:.2}ms",
            arrow.note_index,
            lane,
            arrow.time_error(music_time_sec) * 1000.0
        );
        return None;
    };

    let judgment = Judgment {
        time_error_ms: arrow.time_error(music_time_sec) * 1000.0,
        grade,
        note_index: arrow.note_index,
        lane,
    };
    debug!(
        "JUDGED: Note {}, Lane {}, Error: {:.2}ms, Grade: {}",
        arrow.note_index, lane, judgment.time_error_ms, grade
    );

    state.arrows[lane].remove(arrow_list_index);
    state.score += judgment::grade_points_for(grade);
    state.combo += 1;
    state.max_combo = state.max_combo.max(state.combo);
    *state.judgment_counts.entry(grade).or_insert(0) += 1;
    state.last_judgment = Some(judgment.clone());

    emit(state, GameplayEvent::NoteJudged(judgment.clone()));
    emit(state, GameplayEvent::ScoreChanged(state.score));
    emit(state, GameplayEvent::ComboChanged(state.combo));

    Some(judgment)
}

/// Keyboard entry point: maps `key` through the session's key map. Unmapped keys are dropped.
pub fn handle_key_press(state: &mut State, key: char, music_time_sec: f64) -> Option<Judgment> {
    let lane = state.key_map.lane_for(key)?;
    judge_a_tap(state, lane, music_time_sec)
}

pub fn summary(state: &State) -> SessionSummary {
    SessionSummary::from_counts(
        state.score,
        state.max_combo,
        &state.judgment_counts,
        state.beatmap.len(),
    )
}
