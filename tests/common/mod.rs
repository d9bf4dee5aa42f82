#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use limelight::color::LedType;
use limelight::controller::{LedController, PwmSink};
use limelight::engine::{Animation, AnimationKind, Animator, Event, EventCallback};

/// Shared recording of everything a mock sink was asked to do.
#[derive(Clone, Default)]
pub struct Recorder {
    inner: Rc<RefCell<Inner>>,
}

#[derive(Default)]
struct Inner {
    writes: Vec<(usize, u16)>,
    latest: [u16; 4],
    starts: usize,
    stops: usize,
}

impl Recorder {
    fn record(&self, channel: usize, duty: u16) {
        let mut inner = self.inner.borrow_mut();
        inner.writes.push((channel, duty));
        inner.latest[channel] = duty;
    }

    /// Last duty written per channel
    pub fn latest(&self) -> [u16; 4] {
        self.inner.borrow().latest
    }

    /// Total number of duty writes so far
    pub fn write_count(&self) -> usize {
        self.inner.borrow().writes.len()
    }

    pub fn starts(&self) -> usize {
        self.inner.borrow().starts
    }

    pub fn stops(&self) -> usize {
        self.inner.borrow().stops
    }
}

/// A PWM sink that records instead of toggling pins.
#[derive(Clone)]
pub struct MockSink {
    channels: usize,
    recorder: Recorder,
}

impl MockSink {
    pub fn new(channels: usize, recorder: Recorder) -> Self {
        Self { channels, recorder }
    }
}

impl PwmSink for MockSink {
    fn channel_count(&self) -> usize {
        self.channels
    }

    fn set_duty_cycle(&mut self, channel: usize, duty: u16) {
        self.recorder.record(channel, duty);
    }

    fn start(&mut self) {
        self.recorder.inner.borrow_mut().starts += 1;
    }

    fn stop(&mut self) {
        self.recorder.inner.borrow_mut().stops += 1;
    }
}

pub type EventLog = Rc<RefCell<Vec<(AnimationKind, Event)>>>;

pub fn event_log() -> EventLog {
    Rc::new(RefCell::new(Vec::new()))
}

/// A callback that appends every notification to the shared log.
pub fn event_logger(log: &EventLog) -> impl FnMut(AnimationKind, Event, Option<&Animation>) {
    let log = log.clone();
    move |kind, event, _| log.borrow_mut().push((kind, event))
}

/// How many times `needle` was reported so far.
pub fn event_count(log: &EventLog, needle: Event) -> usize {
    log.borrow().iter().filter(|(_, event)| *event == needle).count()
}

/// An engine for an RGB package with a 1000-count timer period.
pub fn rgb_animator<'a>(
    recorder: &Recorder,
    callback: Option<&'a mut EventCallback>,
) -> Animator<'a, MockSink> {
    let controller = LedController::new(MockSink::new(3, recorder.clone()), LedType::Rgb, 1000)
        .expect("controller config");
    Animator::new(controller, callback)
}
