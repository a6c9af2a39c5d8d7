use biometrics::{Collector, Counter, Moments};

pub(crate) static TOKEN_FETCHES: Counter = Counter::new("ernie.token.fetches");
pub(crate) static TOKEN_FETCH_ERRORS: Counter = Counter::new("ernie.token.fetch_errors");
pub(crate) static TOKEN_CACHE_HITS: Counter = Counter::new("ernie.token.cache_hits");

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("ernie.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("ernie.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("ernie.client.request_duration_seconds");

pub(crate) static STREAM_CHUNKS: Counter = Counter::new("ernie.stream.chunks");
pub(crate) static STREAM_PARSE_ERRORS: Counter = Counter::new("ernie.stream.parse_errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("ernie.stream.bytes");
pub(crate) static STREAM_CANCELLATIONS: Counter = Counter::new("ernie.stream.cancellations");

pub(crate) static STORE_SENDS: Counter = Counter::new("ernie.store.sends");
pub(crate) static STORE_SEND_FAILURES: Counter = Counter::new("ernie.store.send_failures");
pub(crate) static STORE_BUSY_REJECTIONS: Counter = Counter::new("ernie.store.busy_rejections");
pub(crate) static STORE_ABANDONED_SENDS: Counter = Counter::new("ernie.store.abandoned_sends");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&TOKEN_FETCHES);
    collector.register_counter(&TOKEN_FETCH_ERRORS);
    collector.register_counter(&TOKEN_CACHE_HITS);

    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_CHUNKS);
    collector.register_counter(&STREAM_PARSE_ERRORS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_counter(&STREAM_CANCELLATIONS);

    collector.register_counter(&STORE_SENDS);
    collector.register_counter(&STORE_SEND_FAILURES);
    collector.register_counter(&STORE_BUSY_REJECTIONS);
    collector.register_counter(&STORE_ABANDONED_SENDS);
}
