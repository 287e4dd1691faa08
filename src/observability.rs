use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("modelchat.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("modelchat.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("modelchat.client.request_duration_seconds");

pub(crate) static STREAM_EVENTS: Counter = Counter::new("modelchat.stream.events");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("modelchat.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("modelchat.stream.bytes");
pub(crate) static STREAM_FRAGMENTS: Counter = Counter::new("modelchat.stream.fragments");
pub(crate) static STREAM_CANCELLED: Counter = Counter::new("modelchat.stream.cancelled");
pub(crate) static STREAM_DURATION: Moments = Moments::new("modelchat.stream.duration_seconds");

pub(crate) static TURNS_COMMITTED: Counter = Counter::new("modelchat.session.turns_committed");
pub(crate) static TURNS_ROLLED_BACK: Counter = Counter::new("modelchat.session.turns_rolled_back");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_counter(&STREAM_FRAGMENTS);
    collector.register_counter(&STREAM_CANCELLED);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&TURNS_COMMITTED);
    collector.register_counter(&TURNS_ROLLED_BACK);
}
