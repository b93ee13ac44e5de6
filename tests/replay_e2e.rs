use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use cuefire::{
    ActionRef, Always, AnyOf, Classification, Command, ConfigurationError, CueError, EventIs,
    EventMatcher, FnAction, IndexedTranslator, KeyTranslator, Mask, MaskMatcher, MatcherRef,
    Phase, RangeTranslator, Replay, ReplayConfig, ReplayState, Settings, Translator,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Letter {
    A,
    B,
    C,
}

#[derive(Debug, Clone, PartialEq)]
enum JobEvent {
    Started { job: i64 },
    Finished { job: i64 },
    LightsReady,
}

fn counter() -> (Arc<AtomicUsize>, ActionRef) {
    let hits = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&hits);
    let action = FnAction::shared("count", move || {
        c.fetch_add(1, Ordering::SeqCst);
    });
    (hits, action)
}

#[test]
fn letters_scenario_end_to_end() {
    let translator = IndexedTranslator::new([Letter::A, Letter::B, Letter::C]).unwrap();
    assert_eq!(translator.translate(&Letter::A), Ok(0));
    assert_eq!(translator.translate(&Letter::B), Ok(1));
    assert_eq!(translator.translate(&Letter::C), Ok(2));

    let mut mask = Mask::new(translator.clone()).unwrap();
    mask.accept(&Letter::A).unwrap();
    assert!(mask.accepts(&Letter::A));
    assert!(!mask.accepts(&Letter::B));
    assert!(!mask.accepts(&Letter::C));

    let mut only_b = Mask::new(translator).unwrap();
    only_b.accept(&Letter::B).unwrap();

    let matches_a = MatcherRef::new(MaskMatcher::new(mask));
    let matches_b = MatcherRef::new(MaskMatcher::new(only_b));
    let or = AnyOf::new([matches_a.clone(), matches_b.clone()]);

    assert!(or.is_fired_by(&Letter::A));
    assert!(or.is_fired_by(&Letter::B));
    assert!(!or.is_fired_by(&Letter::C));

    let refs: HashSet<_> = or.references().into_iter().collect();
    assert_eq!(refs, HashSet::from([matches_a, matches_b]));
}

#[test]
fn job_masks_drive_a_full_replay() {
    let job_of = |e: &JobEvent| match e {
        JobEvent::Started { job } => Some(*job),
        _ => None,
    };
    let jobs = KeyTranslator::new(RangeTranslator::with_count(64).unwrap(), job_of);
    let mut watched: Mask<JobEvent, _> = Mask::new(jobs).unwrap();
    watched.set_identifier(3, true).unwrap();
    watched.set_identifier(42, true).unwrap();
    let watched_starts = MatcherRef::new(
        MaskMatcher::new(watched).with_classification(Classification::Scripted),
    );
    assert!(watched_starts.is_scripted());

    let ready = MatcherRef::new(
        EventIs::new(JobEvent::LightsReady).with_classification(Classification::Static),
    );
    let finished_3 = MatcherRef::new(EventIs::new(JobEvent::Finished { job: 3 }));

    let (pre_hits, pre_action) = counter();
    let (start_hits, start_action) = counter();
    let (any_hits, any_action) = counter();
    let (post_hits, post_action) = counter();

    let mut settings = Settings::new();
    settings.push_pre(Command::new(MatcherRef::new(Always::new()), pre_action));
    settings.push_event_driven(Command::new(watched_starts.clone(), start_action));
    settings.push_event_driven(Command::new(
        MatcherRef::new(AnyOf::new([watched_starts, ready, finished_3])),
        any_action,
    ));
    settings.push_post(Command::new(MatcherRef::new(Always::new()), post_action));

    let events = vec![
        JobEvent::LightsReady,
        JobEvent::Started { job: 3 },
        JobEvent::Started { job: 4 },
        JobEvent::Finished { job: 3 },
        JobEvent::Started { job: 42 },
        JobEvent::Started { job: 99 },
    ];
    let report = Replay::run(&settings, ReplayConfig::default(), &events).unwrap();

    assert_eq!(pre_hits.load(Ordering::SeqCst), 1);
    assert_eq!(start_hits.load(Ordering::SeqCst), 2);
    assert_eq!(any_hits.load(Ordering::SeqCst), 4);
    assert_eq!(post_hits.load(Ordering::SeqCst), 1);
    assert_eq!(report.state, ReplayState::Finished);
    assert_eq!(report.events_fed, 6);
    assert_eq!(report.fired, 8);
    assert_eq!(report.firings.first().map(|f| f.phase), Some(Phase::Pre));
    assert_eq!(report.firings.last().map(|f| f.phase), Some(Phase::Post));
}

#[test]
fn commands_fire_in_insertion_order_per_event() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut settings = Settings::new();

    for name in ["first", "second", "third"] {
        let log = Arc::clone(&log);
        settings.push_event_driven(Command::new(
            MatcherRef::new(EventIs::new(Letter::B)),
            FnAction::shared(name, move || log.lock().unwrap().push(name)),
        ));
    }

    let mut replay = Replay::new(&settings, ReplayConfig::default());
    replay.start().unwrap();
    assert_eq!(replay.feed(&Letter::A).unwrap(), 0);
    assert_eq!(replay.feed(&Letter::B).unwrap(), 3);
    replay.finish().unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
}

#[derive(Debug)]
struct ClaimsA;

impl EventMatcher<Letter> for ClaimsA {
    fn is_fired_by(&self, _event: &Letter) -> bool {
        false
    }

    fn references(&self) -> Vec<MatcherRef<Letter>> {
        vec![MatcherRef::new(EventIs::new(Letter::A))]
    }
}

#[test]
fn start_refuses_an_invalid_graph() {
    let (hits, action) = counter();
    let mut settings = Settings::new();
    settings.push_pre(Command::new(MatcherRef::new(Always::new()), action));
    // `references()` hands out fresh instances, so they can never be registered.
    settings.push_event_driven(Command::new(
        MatcherRef::new(ClaimsA),
        FnAction::shared("noop", || {}),
    ));

    let mut replay = Replay::new(&settings, ReplayConfig::default());
    let err = replay.start().unwrap_err();
    assert!(matches!(
        err,
        CueError::Configuration(ConfigurationError::UnregisteredReference { .. })
    ));
    assert_eq!(replay.state(), ReplayState::Idle);
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    let lenient = ReplayConfig {
        validate_on_start: false,
        ..ReplayConfig::default()
    };
    let report = Replay::run(&settings, lenient, [Letter::A]).unwrap();
    assert_eq!(report.fired, 1);
}
