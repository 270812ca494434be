//! Result publishing with isolated subscriber failure.

use std::sync::Arc;

use crate::result::TestResultEvent;

#[derive(Clone, Debug, thiserror::Error)]
#[error("{0}")]
pub struct PublishError(pub String);

impl PublishError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A downstream consumer of result events. Implementations are responsible
/// for their own thread safety; the broadcaster calls them sequentially.
pub trait ResultPublisher: Send + Sync {
    fn name(&self) -> &str;

    fn publish(&self, event: &TestResultEvent) -> Result<(), PublishError>;

    fn close(&self) -> Result<(), PublishError> {
        Ok(())
    }
}

type ErrorHook = dyn Fn(&str, &PublishError) + Send + Sync;

/// Fans events out to its subscribers sequentially. A throwing subscriber
/// never prevents the others from receiving the event; its failure is
/// reported through the injected hook instead.
pub struct BroadcastingPublisher {
    subscribers: Vec<Box<dyn ResultPublisher>>,
    on_error: Arc<ErrorHook>,
}

impl BroadcastingPublisher {
    pub fn new(subscribers: Vec<Box<dyn ResultPublisher>>) -> Self {
        Self::with_error_hook(
            subscribers,
            Arc::new(|name, error| {
                error!(subscriber = name, %error, "publisher failed");
                eprintln!("publisher `{name}` failed: {error}");
            }),
        )
    }

    pub fn with_error_hook(
        subscribers: Vec<Box<dyn ResultPublisher>>,
        on_error: Arc<ErrorHook>,
    ) -> Self {
        Self {
            subscribers,
            on_error,
        }
    }

    pub fn publish(&self, event: &TestResultEvent) {
        for subscriber in &self.subscribers {
            if let Err(error) = subscriber.publish(event) {
                (self.on_error)(subscriber.name(), &error);
            }
        }
    }

    pub fn close(&self) {
        for subscriber in &self.subscribers {
            if let Err(error) = subscriber.close() {
                (self.on_error)(subscriber.name(), &error);
            }
        }
    }
}
