use biometrics::{Collector, Counter};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("deepchat.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("deepchat.client.request_errors");

pub(crate) static STREAM_EVENTS: Counter = Counter::new("deepchat.stream.events");
pub(crate) static STREAM_SKIPPED_LINES: Counter = Counter::new("deepchat.stream.skipped_lines");
pub(crate) static STREAM_INTERRUPTS: Counter = Counter::new("deepchat.stream.interrupts");

pub(crate) static HISTORY_SAVES: Counter = Counter::new("deepchat.history.saves");
pub(crate) static HISTORY_LOAD_FAILURES: Counter = Counter::new("deepchat.history.load_failures");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);

    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_SKIPPED_LINES);
    collector.register_counter(&STREAM_INTERRUPTS);

    collector.register_counter(&HISTORY_SAVES);
    collector.register_counter(&HISTORY_LOAD_FAILURES);
}
