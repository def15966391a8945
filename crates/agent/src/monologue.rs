//! The monologue: an agent's ordered, size-bounded event history.
//!
//! Every appended event is clipped to the configured output length and
//! added to a running total of serialized sizes. Once the total passes the
//! ceiling, [`Monologue::condense`] swaps the older events for a shorter
//! summary while keeping the most recent ones verbatim.

use devloop_core::error::{Error, Result};
use devloop_core::event::{Conversation, Event};
use devloop_core::MonologueLimits;
use tracing::{debug, info};

use crate::condenser::Condenser;

#[derive(Debug, Clone)]
pub struct Monologue {
    events: Vec<Event>,
    total_length: usize,
    limits: MonologueLimits,
}

impl Monologue {
    pub fn new(limits: MonologueLimits) -> Self {
        Self {
            events: Vec::new(),
            total_length: 0,
            limits,
        }
    }

    pub fn limits(&self) -> MonologueLimits {
        self.limits
    }

    /// Clip, store, and return the stored event.
    pub fn append(&mut self, mut event: Event) -> &Event {
        if event.truncate_output(self.limits.max_output_length) {
            debug!(kind = %event.kind, max = self.limits.max_output_length, "Truncated event output");
        }
        self.total_length += event.serialized_len();
        self.events.push(event);
        &self.events[self.events.len() - 1]
    }

    /// Sum of the serialized sizes of every stored event.
    pub fn total_length(&self) -> usize {
        self.total_length
    }

    pub fn needs_condensation(&self) -> bool {
        self.total_length > self.limits.max_length
    }

    /// Summarize everything but the last `keep_recent` events.
    ///
    /// Does nothing at or below the ceiling. Fails with
    /// [`Error::CondensationIneffective`], leaving the log as it was, when
    /// the result would not be strictly smaller.
    pub async fn condense(&mut self, condenser: &dyn Condenser) -> Result<()> {
        if !self.needs_condensation() {
            return Ok(());
        }

        let before = self.total_length;
        let keep = self.limits.keep_recent.min(self.events.len());
        let split = self.events.len() - keep;
        if split == 0 {
            return Err(Error::CondensationIneffective {
                before,
                after: before,
            });
        }

        let (prefix, recent) = self.events.split_at(split);
        let mut condensed = condenser.condense(Conversation::new(prefix)).await?;
        condensed.extend_from_slice(recent);

        let after: usize = condensed.iter().map(Event::serialized_len).sum();
        if after >= before {
            return Err(Error::CondensationIneffective { before, after });
        }

        info!(
            condenser = condenser.name(),
            before,
            after,
            events = condensed.len(),
            "Condensed monologue"
        );
        self.events = condensed;
        self.total_length = after;
        Ok(())
    }

    pub fn as_conversation(&self) -> Conversation<'_> {
        Conversation::new(&self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn last(&self) -> Option<&Event> {
        self.events.last()
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.total_length = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condenser::DigestCondenser;
    use async_trait::async_trait;
    use devloop_core::event::ELLIPSIS;

    fn limits(max_output_length: usize, max_length: usize, keep_recent: usize) -> MonologueLimits {
        MonologueLimits {
            max_output_length,
            max_length,
            keep_recent,
        }
    }

    /// Hands the prefix back unchanged.
    struct EchoCondenser;

    #[async_trait]
    impl Condenser for EchoCondenser {
        fn name(&self) -> &str {
            "echo"
        }

        async fn condense(&self, prefix: Conversation<'_>) -> Result<Vec<Event>> {
            Ok(prefix.as_slice().to_vec())
        }
    }

    #[test]
    fn total_length_is_sum_of_stored_sizes() {
        let mut log = Monologue::new(limits(10, 100_000, 4));
        log.append(Event::think("planning"));
        log.append(Event::output("x".repeat(50)));
        log.append(Event::error("boom"));

        let expected: usize = log.events().iter().map(Event::serialized_len).sum();
        assert_eq!(log.total_length(), expected);
    }

    #[test]
    fn long_output_is_stored_at_max_plus_ellipsis() {
        let mut log = Monologue::new(limits(100, 100_000, 4));
        let stored = log.append(Event::output("y".repeat(5_000)));
        let output = stored.arg_str("output").unwrap();
        assert_eq!(output.chars().count(), 100 + ELLIPSIS.len());
    }

    #[test]
    fn thoughts_are_never_clipped() {
        let mut log = Monologue::new(limits(5, 100_000, 4));
        log.append(Event::think("a long thought that stays whole"));
        assert_eq!(log.last().unwrap().arg_str("thought"), Some("a long thought that stays whole"));
    }

    #[tokio::test]
    async fn condense_below_ceiling_is_a_no_op() {
        let mut log = Monologue::new(limits(5_000, 100_000, 2));
        for i in 0..5 {
            log.append(Event::think(format!("thought {i}")));
        }
        let before = log.events().to_vec();
        log.condense(&DigestCondenser::default()).await.unwrap();
        assert_eq!(log.events(), before.as_slice());
    }

    #[tokio::test]
    async fn condense_shrinks_and_keeps_recent_events() {
        let mut log = Monologue::new(limits(5_000, 1_000, 3));
        for i in 0..20 {
            log.append(Event::output(format!("line {i}: {}", "z".repeat(80))));
        }
        assert!(log.needs_condensation());

        let before = log.total_length();
        let recent = log.events()[17..].to_vec();
        log.condense(&DigestCondenser::default()).await.unwrap();

        assert!(log.total_length() < before);
        assert_eq!(&log.events()[log.len() - 3..], recent.as_slice());
        let expected: usize = log.events().iter().map(Event::serialized_len).sum();
        assert_eq!(log.total_length(), expected);
    }

    #[tokio::test]
    async fn ineffective_condensation_leaves_log_untouched() {
        let mut log = Monologue::new(limits(5_000, 100, 1));
        for i in 0..5 {
            log.append(Event::think(format!("thought number {i}")));
        }
        let before = log.events().to_vec();

        let err = log.condense(&EchoCondenser).await.unwrap_err();
        assert!(matches!(err, Error::CondensationIneffective { .. }));
        assert_eq!(log.events(), before.as_slice());
    }

    #[tokio::test]
    async fn nothing_to_summarize_is_ineffective() {
        let mut log = Monologue::new(limits(5_000, 10, 8));
        log.append(Event::think("only one event, larger than the ceiling"));
        let err = log.condense(&DigestCondenser::default()).await.unwrap_err();
        assert!(matches!(err, Error::CondensationIneffective { .. }));
    }

    #[test]
    fn clear_resets_length() {
        let mut log = Monologue::new(MonologueLimits::default());
        log.append(Event::think("a"));
        log.clear();
        assert!(log.is_empty());
        assert_eq!(log.total_length(), 0);
    }
}
