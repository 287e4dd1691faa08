//! Consumes a streamed completion.
//!
//! [`consume_stream`] drives the update stream of one turn.  Every non-empty
//! fragment is written to the renderer the moment it arrives and appended to a
//! [`StreamAccumulator`], so the accumulated reply is exactly the displayed
//! text.  The cancellation token is raced against every read, so an interrupt
//! aborts a stalled network read instead of waiting for it.

use std::time::Instant;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::client::CompletionTransport;
use crate::error::{Error, Result};
use crate::observability::{STREAM_CANCELLED, STREAM_DURATION, STREAM_FRAGMENTS};
use crate::render::Renderer;
use crate::types::{ChatTurn, StreamUpdate, UsageStats};

/// The result of a fully received reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamedReply {
    /// The concatenated reply text.
    pub text: String,
    /// Usage reported by the server, if any.
    pub usage: Option<UsageStats>,
}

/// Per-turn buffer for incoming fragments.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    text: String,
    usage: Option<UsageStats>,
    fragments: usize,
}

impl StreamAccumulator {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one update: display and append its fragment, keep its usage.
    pub fn push(&mut self, update: StreamUpdate, renderer: &mut dyn Renderer) {
        if let Some(fragment) = update.fragment
            && !fragment.is_empty()
        {
            renderer.write_fragment(&fragment);
            self.text.push_str(&fragment);
            self.fragments += 1;
            STREAM_FRAGMENTS.click();
        }
        if let Some(usage) = update.usage {
            self.usage = Some(usage);
        }
    }

    /// Returns the text accumulated so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the number of non-empty fragments applied.
    pub fn fragment_count(&self) -> usize {
        self.fragments
    }

    /// Consumes the accumulator into the finished reply.
    pub fn finish(self) -> StreamedReply {
        StreamedReply {
            text: self.text,
            usage: self.usage,
        }
    }
}

/// Streams one completion for `turns`, rendering fragments as they arrive.
///
/// # Errors
///
/// Returns [`Error::Cancelled`] if `cancel` fires before or during the stream,
/// and the transport's error for any other failure.  In both cases the partial
/// reply is dropped.
pub async fn consume_stream<T>(
    transport: &T,
    turns: &[ChatTurn],
    renderer: &mut dyn Renderer,
    cancel: &CancellationToken,
) -> Result<StreamedReply>
where
    T: CompletionTransport + ?Sized,
{
    if cancel.is_cancelled() {
        STREAM_CANCELLED.click();
        return Err(Error::cancelled("cancelled before the request was sent"));
    }

    let start = Instant::now();
    let mut stream = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            STREAM_CANCELLED.click();
            return Err(Error::cancelled("cancelled while waiting for a response"));
        }
        stream = transport.stream_completion(turns, cancel) => stream?,
    };

    let mut accumulator = StreamAccumulator::new();
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                STREAM_CANCELLED.click();
                tracing::debug!(
                    fragments = accumulator.fragment_count(),
                    "stream cancelled; dropping partial reply"
                );
                return Err(Error::cancelled("cancelled while streaming the reply"));
            }
            next = stream.next() => next,
        };
        match next {
            Some(Ok(update)) => accumulator.push(update, renderer),
            Some(Err(err)) => {
                tracing::debug!(
                    fragments = accumulator.fragment_count(),
                    error = %err,
                    "stream failed; dropping partial reply"
                );
                return Err(err);
            }
            None => break,
        }
    }

    STREAM_DURATION.add(start.elapsed().as_secs_f64());
    tracing::debug!(
        fragments = accumulator.fragment_count(),
        chars = accumulator.text().len(),
        "stream finished"
    );
    Ok(accumulator.finish())
}

#[cfg(test)]
pub(crate) mod testing {
    //! Test doubles shared by the stream and session tests.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use futures::stream;

    use super::*;
    use crate::client::UpdateStream;

    /// One scripted response of a [`ScriptedTransport`].
    pub enum Script {
        /// The request itself fails.
        Fail(Error),
        /// The stream yields these items, then ends.
        Updates(Vec<Result<StreamUpdate>>),
        /// The stream yields these items, then never yields again.
        Stall(Vec<Result<StreamUpdate>>),
    }

    impl Script {
        pub fn reply(fragments: &[&str]) -> Self {
            Script::Updates(
                fragments
                    .iter()
                    .map(|f| Ok(StreamUpdate::fragment(*f)))
                    .collect(),
            )
        }
    }

    /// A transport that plays back scripts in order and records what it was sent.
    #[derive(Default)]
    pub struct ScriptedTransport {
        scripts: Mutex<VecDeque<Script>>,
        pub requests: Mutex<Vec<Vec<ChatTurn>>>,
    }

    impl ScriptedTransport {
        pub fn new(scripts: impl IntoIterator<Item = Script>) -> Self {
            Self {
                scripts: Mutex::new(scripts.into_iter().collect()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl CompletionTransport for ScriptedTransport {
        async fn stream_completion(
            &self,
            turns: &[ChatTurn],
            _cancel: &CancellationToken,
        ) -> Result<UpdateStream> {
            self.requests.lock().unwrap().push(turns.to_vec());
            let script = self
                .scripts
                .lock()
                .unwrap()
                .pop_front()
                .expect("no script left for request");
            match script {
                Script::Fail(err) => Err(err),
                Script::Updates(items) => Ok(Box::pin(stream::iter(items))),
                Script::Stall(items) => {
                    Ok(Box::pin(stream::iter(items).chain(stream::pending())))
                }
            }
        }
    }

    /// Everything a [`RecordingRenderer`] was asked to show.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Shown {
        Header,
        AssistantHeader,
        Fragment(String),
        Error(String),
        Usage(UsageStats),
        Info(String),
        Finish,
    }

    /// A renderer that records calls instead of printing.
    #[derive(Debug, Default)]
    pub struct RecordingRenderer {
        pub shown: Vec<Shown>,
    }

    impl RecordingRenderer {
        pub fn fragments(&self) -> Vec<&str> {
            self.shown
                .iter()
                .filter_map(|s| match s {
                    Shown::Fragment(text) => Some(text.as_str()),
                    _ => None,
                })
                .collect()
        }

        pub fn errors(&self) -> Vec<&str> {
            self.shown
                .iter()
                .filter_map(|s| match s {
                    Shown::Error(text) => Some(text.as_str()),
                    _ => None,
                })
                .collect()
        }
    }

    impl Renderer for RecordingRenderer {
        fn write_header(&mut self, _clear_screen: bool) {
            self.shown.push(Shown::Header);
        }

        fn write_assistant_header(&mut self) {
            self.shown.push(Shown::AssistantHeader);
        }

        fn write_fragment(&mut self, text: &str) {
            self.shown.push(Shown::Fragment(text.to_string()));
        }

        fn display_error(&mut self, error: &str) {
            self.shown.push(Shown::Error(error.to_string()));
        }

        fn display_usage(&mut self, usage: &UsageStats) {
            self.shown.push(Shown::Usage(*usage));
        }

        fn print_info(&mut self, info: &str) {
            self.shown.push(Shown::Info(info.to_string()));
        }

        fn finish_response(&mut self) {
            self.shown.push(Shown::Finish);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::testing::{RecordingRenderer, Script, ScriptedTransport, Shown};
    use super::*;

    fn turns() -> Vec<ChatTurn> {
        vec![ChatTurn::system("sys"), ChatTurn::user("hi")]
    }

    #[tokio::test]
    async fn accumulates_fragments_in_order() {
        let transport = ScriptedTransport::new([Script::reply(&["Hel", "lo", " world"])]);
        let mut renderer = RecordingRenderer::default();

        let reply = consume_stream(&transport, &turns(), &mut renderer, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(reply.text, "Hello world");
        assert_eq!(renderer.fragments(), vec!["Hel", "lo", " world"]);
        assert!(reply.usage.is_none());
        assert_eq!(transport.requests.lock().unwrap()[0], turns());
    }

    #[tokio::test]
    async fn empty_fragments_are_skipped_and_last_usage_wins() {
        let transport = ScriptedTransport::new([Script::Updates(vec![
            Ok(StreamUpdate::fragment("")),
            Ok(StreamUpdate::fragment("a")),
            Ok(StreamUpdate::usage(UsageStats::new(1, 1))),
            Ok(StreamUpdate {
                fragment: Some("b".to_string()),
                usage: Some(UsageStats::new(4, 2)),
            }),
        ])]);
        let mut renderer = RecordingRenderer::default();

        let reply = consume_stream(&transport, &turns(), &mut renderer, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(reply.text, "ab");
        assert_eq!(reply.usage, Some(UsageStats::new(4, 2)));
        assert_eq!(
            renderer.shown,
            vec![Shown::Fragment("a".into()), Shown::Fragment("b".into())]
        );
    }

    #[tokio::test]
    async fn request_error_is_returned() {
        let transport =
            ScriptedTransport::new([Script::Fail(Error::rate_limit("slow down", Some(2)))]);
        let mut renderer = RecordingRenderer::default();

        let err = consume_stream(&transport, &turns(), &mut renderer, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.is_rate_limit());
        assert!(renderer.shown.is_empty());
    }

    #[tokio::test]
    async fn mid_stream_error_drops_partial_reply() {
        let transport = ScriptedTransport::new([Script::Updates(vec![
            Ok(StreamUpdate::fragment("partial")),
            Err(Error::streaming("connection reset", None)),
            Ok(StreamUpdate::fragment("never")),
        ])]);
        let mut renderer = RecordingRenderer::default();

        let err = consume_stream(&transport, &turns(), &mut renderer, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(!err.is_cancelled());
        assert_eq!(renderer.fragments(), vec!["partial"]);
    }

    #[tokio::test]
    async fn already_cancelled_sends_nothing() {
        let transport = ScriptedTransport::new([]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut renderer = RecordingRenderer::default();

        let err = consume_stream(&transport, &turns(), &mut renderer, &cancel)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn cancellation_aborts_stalled_read() {
        let transport = ScriptedTransport::new([Script::Stall(vec![Ok(StreamUpdate::fragment(
            "thinking...",
        ))])]);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
            trigger.cancel();
        });
        let mut renderer = RecordingRenderer::default();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            consume_stream(&transport, &turns(), &mut renderer, &cancel),
        )
        .await
        .expect("cancellation should end the stream promptly");

        assert!(result.unwrap_err().is_cancelled());
        assert_eq!(renderer.fragments(), vec!["thinking..."]);
    }
}
