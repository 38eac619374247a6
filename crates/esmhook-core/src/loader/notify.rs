//! Dependency notifications for a supervising process.

use esmhook_proto::{write_frame, SupervisorMessage};
use std::io::Write;
use std::sync::mpsc::Sender;
use std::sync::Mutex;
use url::Url;

/// Receives every module URL the loader is asked for.
///
/// Notification is fire-and-forget: an observer that cannot deliver logs
/// and carries on, it never fails the load.
pub trait DependencyObserver: Send + Sync {
    fn dependency(&self, url: &Url);
}

/// Forwards notifications over an in-process channel.
#[derive(Debug)]
pub struct ChannelObserver {
    sender: Sender<SupervisorMessage>,
}

impl ChannelObserver {
    #[must_use]
    pub fn new(sender: Sender<SupervisorMessage>) -> Self {
        Self { sender }
    }
}

impl DependencyObserver for ChannelObserver {
    fn dependency(&self, url: &Url) {
        if self
            .sender
            .send(SupervisorMessage::dependency(url.as_str()))
            .is_err()
        {
            tracing::trace!(url = %url, "dependency receiver gone");
        }
    }
}

/// Writes length-prefixed JSON frames to a byte sink (a pipe to the parent,
/// a file).
#[derive(Debug)]
pub struct FrameObserver<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> FrameObserver<W> {
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Recover the sink.
    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> DependencyObserver for FrameObserver<W> {
    fn dependency(&self, url: &Url) {
        let mut writer = match self.writer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = write_frame(&mut *writer, &SupervisorMessage::dependency(url.as_str())) {
            tracing::warn!(url = %url, error = %e, "failed to report dependency");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use esmhook_proto::read_frame;
    use std::io::Cursor;
    use std::sync::mpsc;

    #[test]
    fn test_channel_observer() {
        let (tx, rx) = mpsc::channel();
        let observer = ChannelObserver::new(tx);
        observer.dependency(&Url::parse("file:///app/main.ts").unwrap());

        assert_eq!(
            rx.try_recv().unwrap(),
            SupervisorMessage::dependency("file:///app/main.ts")
        );
    }

    #[test]
    fn test_channel_observer_tolerates_closed_receiver() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        ChannelObserver::new(tx).dependency(&Url::parse("node:fs").unwrap());
    }

    #[test]
    fn test_frame_observer_writes_frames() {
        let observer = FrameObserver::new(Vec::new());
        observer.dependency(&Url::parse("file:///app/a.ts").unwrap());
        observer.dependency(&Url::parse("file:///app/b.json").unwrap());

        let mut cursor = Cursor::new(observer.into_inner());
        let first: SupervisorMessage = read_frame(&mut cursor).unwrap();
        let second: SupervisorMessage = read_frame(&mut cursor).unwrap();
        assert_eq!(first, SupervisorMessage::dependency("file:///app/a.ts"));
        assert_eq!(second, SupervisorMessage::dependency("file:///app/b.json"));
    }
}
