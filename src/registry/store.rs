//! Subscriber registry implementation
//!
//! The registry owns the listening socket, the set of connected
//! subscribers, and the admission-control state machine. Everything here
//! runs on one event-loop task; the producer thread and the subscriber
//! write loops reach it only through the command mailbox, so no locking is
//! needed around registry state.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::detections::DetectionList;
use crate::protocol::codec;
use crate::protocol::framing::Frame;
use crate::registry::subscriber::{EnqueueOutcome, Subscriber, SubscriberId};
use crate::server::config::ServerConfig;
use crate::stats::BroadcastStats;

/// Work posted onto the registry's event loop
#[derive(Debug)]
pub(crate) enum Command {
    /// Serialize a snapshot and fan it out to every subscriber
    Publish(DetectionList),
    /// Remove and close one subscriber
    Leave(SubscriberId),
    /// Close every subscriber and stop the event loop
    Shutdown,
}

/// Admission state of the accept loop
///
/// Driven purely by population versus capacity: crossing the ceiling on a
/// join pauses the loop, any leave re-arms it. While `Paused`, no accept is
/// issued at all; a would-be subscriber waits in the kernel backlog until
/// capacity frees up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Listening,
    Paused,
}

impl Admission {
    /// Transition taken after a subscriber joins
    pub(crate) fn on_join(self, population: usize, capacity: usize) -> Admission {
        if capacity != 0 && population >= capacity {
            Admission::Paused
        } else {
            self
        }
    }

    /// Transition taken after a subscriber leaves
    pub(crate) fn on_leave(self) -> Admission {
        Admission::Listening
    }

    pub(crate) fn is_listening(self) -> bool {
        self == Admission::Listening
    }
}

/// Producer-facing handle to a running registry
///
/// Cloneable and thread-safe; every operation is a non-blocking post onto
/// the registry's mailbox. Sends after the registry has stopped are
/// silently discarded.
#[derive(Debug, Clone)]
pub struct RegistryHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl RegistryHandle {
    /// Broadcast one snapshot to all connected subscribers, fire-and-forget
    pub fn publish(&self, list: DetectionList) {
        let _ = self.commands.send(Command::Publish(list));
    }

    /// Ask the registry to close all subscribers and stop
    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }
}

/// Central registry for all connected subscribers
pub struct SubscriberRegistry {
    listener: TcpListener,
    local_addr: SocketAddr,
    subscribers: HashMap<SubscriberId, Subscriber>,
    admission: Admission,
    next_id: u64,
    commands: mpsc::UnboundedReceiver<Command>,
    mailbox: mpsc::UnboundedSender<Command>,
    config: ServerConfig,
    stats: Arc<BroadcastStats>,
}

impl SubscriberRegistry {
    /// Bind the listening socket and set up an idle registry
    ///
    /// The accept loop does not run until [`run`](Self::run) is awaited.
    pub async fn bind(config: ServerConfig, stats: Arc<BroadcastStats>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        let (mailbox, commands) = mpsc::unbounded_channel();

        tracing::info!(
            addr = %local_addr,
            max_subscribers = config.max_subscribers,
            "Detection broadcast listening"
        );

        Ok(Self {
            listener,
            local_addr,
            subscribers: HashMap::new(),
            admission: Admission::Listening,
            next_id: 0,
            commands,
            mailbox,
            config,
            stats,
        })
    }

    /// The bound listen address (useful when binding to port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Get a producer-facing handle to this registry
    pub fn handle(&self) -> RegistryHandle {
        RegistryHandle {
            commands: self.mailbox.clone(),
        }
    }

    /// Drive the registry until shutdown
    ///
    /// Multiplexes the command mailbox with the accept loop. The accept
    /// branch is only armed while admission is `Listening`, so at capacity
    /// no pending accept exists that a concurrent leave could race with.
    pub async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Publish(list)) => self.publish(&list),
                    Some(Command::Leave(id)) => self.leave(id),
                    Some(Command::Shutdown) | None => break,
                },
                accepted = self.listener.accept(), if self.admission.is_listening() => {
                    match accepted {
                        Ok((socket, peer_addr)) => self.join(socket, peer_addr),
                        Err(e) => tracing::error!(error = %e, "Failed to accept subscriber"),
                    }
                }
            }
        }

        self.stop_all();
    }

    /// Serialize a snapshot once and fan the identical frame out
    ///
    /// The frame is shared by reference count; cost is one allocation plus
    /// O(subscribers) queue pushes, independent of frame size.
    fn publish(&mut self, list: &DetectionList) {
        let body = codec::encode_detection_list(list);
        let frame = match Frame::encode(&body) {
            Ok(frame) => frame,
            Err(e) => {
                self.stats.record_oversize_drop();
                tracing::warn!(
                    body_len = body.len(),
                    detections = list.len(),
                    error = %e,
                    "Detection list dropped"
                );
                return;
            }
        };

        self.stats.record_publish();

        let mut lagging = Vec::new();
        for (id, subscriber) in &self.subscribers {
            match subscriber.enqueue(frame.clone()) {
                EnqueueOutcome::Queued => self.stats.record_frame_queued(),
                EnqueueOutcome::Lagged => {
                    self.stats.record_lagging_disconnect();
                    tracing::warn!(
                        subscriber = %id,
                        peer = %subscriber.peer_addr(),
                        "Subscriber queue full, disconnecting"
                    );
                    lagging.push(*id);
                }
                EnqueueOutcome::Closed => lagging.push(*id),
            }
        }

        for id in lagging {
            self.leave(id);
        }
    }

    /// Admit an accepted socket into the registry
    fn join(&mut self, socket: TcpStream, peer_addr: SocketAddr) {
        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::debug!(error = %e, "Failed to set TCP_NODELAY");
            }
        }

        self.next_id += 1;
        let id = SubscriberId(self.next_id);
        let subscriber = Subscriber::spawn(
            id,
            peer_addr,
            socket,
            self.config.queue_capacity,
            self.mailbox.clone(),
        );
        self.subscribers.insert(id, subscriber);
        self.stats.record_join();

        self.admission = self
            .admission
            .on_join(self.subscribers.len(), self.config.max_subscribers);

        tracing::debug!(
            subscriber = %id,
            peer = %peer_addr,
            population = self.subscribers.len(),
            "Subscriber joined"
        );

        if self.admission == Admission::Paused {
            tracing::info!(
                population = self.subscribers.len(),
                "Subscriber capacity reached, pausing accepts"
            );
        }
    }

    /// Remove a subscriber from the set and close it
    ///
    /// Safe to call with an id that has already left; the write loop and
    /// the publish path can both report the same failed subscriber.
    fn leave(&mut self, id: SubscriberId) {
        let Some(subscriber) = self.subscribers.remove(&id) else {
            return;
        };
        subscriber.close();
        self.stats.record_leave();

        let was_paused = self.admission == Admission::Paused;
        self.admission = self.admission.on_leave();

        tracing::debug!(
            subscriber = %id,
            population = self.subscribers.len(),
            "Subscriber left"
        );

        if was_paused {
            tracing::info!(
                population = self.subscribers.len(),
                "Capacity available again, resuming accepts"
            );
        }
    }

    /// Close every subscriber, then clear the set
    ///
    /// Each connection is closed individually; clearing without closing
    /// would leak open sockets until process exit.
    fn stop_all(&mut self) {
        let population = self.subscribers.len();
        for (_, subscriber) in self.subscribers.drain() {
            tracing::debug!(
                subscriber = %subscriber.id(),
                peer = %subscriber.peer_addr(),
                "Subscriber closed"
            );
            subscriber.close();
            self.stats.record_leave();
        }

        if population > 0 {
            tracing::info!(closed = population, "All subscribers stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::AsyncReadExt;
    use tokio::net::TcpStream;
    use tokio::time::{sleep, timeout};

    use super::*;
    use crate::detections::{BoundingBox, Detection, MetaInfo};
    use crate::protocol::constants::HEADER_LENGTH;
    use crate::protocol::framing::decode_header;

    #[test]
    fn test_admission_transitions() {
        let state = Admission::Listening;

        assert_eq!(state.on_join(1, 2), Admission::Listening);
        assert_eq!(state.on_join(2, 2), Admission::Paused);
        assert_eq!(state.on_join(3, 2), Admission::Paused);
        assert_eq!(Admission::Paused.on_leave(), Admission::Listening);
        assert_eq!(Admission::Listening.on_leave(), Admission::Listening);
    }

    #[test]
    fn test_admission_unlimited_capacity_never_pauses() {
        let mut state = Admission::Listening;
        for population in 1..100 {
            state = state.on_join(population, 0);
        }
        assert_eq!(state, Admission::Listening);
    }

    fn sample_list(detections: usize) -> DetectionList {
        DetectionList {
            meta: MetaInfo {
                timestamp_ms: 42,
                image_width: 640,
                image_height: 480,
                crop_width: 320,
                crop_height: 320,
                elapsed_ms: 11,
            },
            detections: (0..detections)
                .map(|i| Detection {
                    class_id: i as i32,
                    class_name: format!("class_{}", i),
                    bounding_box: BoundingBox::new(i as i32, 0, 10, 10),
                    confidence: 0.9,
                })
                .collect(),
        }
    }

    fn oversize_list() -> DetectionList {
        // Each detection encodes to roughly 40 bytes, so 50 of them exceed
        // the 1024-byte body limit.
        sample_list(50)
    }

    async fn start_registry(
        max_subscribers: usize,
    ) -> (SocketAddr, RegistryHandle, Arc<BroadcastStats>) {
        let config = ServerConfig::default()
            .bind("127.0.0.1:0".parse().unwrap())
            .max_subscribers(max_subscribers);
        let stats = Arc::new(BroadcastStats::default());
        let registry = SubscriberRegistry::bind(config, Arc::clone(&stats))
            .await
            .unwrap();
        let addr = registry.local_addr();
        let handle = registry.handle();
        tokio::spawn(registry.run());
        (addr, handle, stats)
    }

    async fn read_frame(stream: &mut TcpStream) -> std::io::Result<Vec<u8>> {
        let mut header = [0u8; HEADER_LENGTH];
        stream.read_exact(&mut header).await?;
        let body_len = decode_header(&header)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let mut body = vec![0u8; body_len];
        stream.read_exact(&mut body).await?;

        let mut frame = header.to_vec();
        frame.extend_from_slice(&body);
        Ok(frame)
    }

    /// Wait until the registry has seen `population` joins.
    async fn wait_for_joins(stats: &BroadcastStats, population: u64) {
        for _ in 0..200 {
            if stats.subscribers_joined() >= population {
                return;
            }
            sleep(Duration::from_millis(5)).await;
        }
        panic!("Registry never reached {} joins", population);
    }

    #[tokio::test]
    async fn test_fan_out_identical_frames() {
        let (addr, handle, stats) = start_registry(0).await;

        let mut first = TcpStream::connect(addr).await.unwrap();
        let mut second = TcpStream::connect(addr).await.unwrap();
        wait_for_joins(&stats, 2).await;

        handle.publish(sample_list(3));

        let frame_a = timeout(Duration::from_secs(2), read_frame(&mut first))
            .await
            .unwrap()
            .unwrap();
        let frame_b = timeout(Duration::from_secs(2), read_frame(&mut second))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(frame_a, frame_b);
        let body_len = decode_header(&frame_a[..HEADER_LENGTH]).unwrap();
        assert_eq!(frame_a.len(), HEADER_LENGTH + body_len);

        handle.shutdown();
    }

    #[tokio::test]
    async fn test_frames_arrive_in_publish_order() {
        let (addr, handle, stats) = start_registry(0).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        wait_for_joins(&stats, 1).await;

        for i in 0..5 {
            handle.publish(sample_list(i));
        }

        let mut last_len = 0usize;
        for _ in 0..5 {
            let frame = timeout(Duration::from_secs(2), read_frame(&mut stream))
                .await
                .unwrap()
                .unwrap();
            // Bodies grow with the detection count, so publish order is
            // visible in the frame sizes.
            assert!(frame.len() > last_len);
            last_len = frame.len();
        }

        handle.shutdown();
    }

    #[tokio::test]
    async fn test_oversize_snapshot_dropped_whole() {
        let (addr, handle, stats) = start_registry(0).await;

        let mut stream = TcpStream::connect(addr).await.unwrap();
        wait_for_joins(&stats, 1).await;

        handle.publish(oversize_list());
        handle.publish(sample_list(1));

        // Only the second snapshot arrives.
        let frame = timeout(Duration::from_secs(2), read_frame(&mut stream))
            .await
            .unwrap()
            .unwrap();
        let body_len = decode_header(&frame[..HEADER_LENGTH]).unwrap();
        assert!(body_len < 100);
        assert_eq!(stats.oversize_drops(), 1);
        assert_eq!(stats.publishes(), 1);

        handle.shutdown();
    }

    #[tokio::test]
    async fn test_publish_with_no_subscribers_is_noop() {
        let (_addr, handle, stats) = start_registry(0).await;

        handle.publish(sample_list(2));

        for _ in 0..100 {
            if stats.publishes() == 1 {
                break;
            }
            sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(stats.publishes(), 1);
        assert_eq!(stats.frames_queued(), 0);

        handle.shutdown();
    }

    #[tokio::test]
    async fn test_write_failure_isolates_one_subscriber() {
        let (addr, handle, stats) = start_registry(0).await;

        let mut healthy = TcpStream::connect(addr).await.unwrap();
        let failing = TcpStream::connect(addr).await.unwrap();
        wait_for_joins(&stats, 2).await;

        // Tear down one peer; its server-side writes start failing once
        // the reset propagates.
        drop(failing);

        let mut received = 0;
        for _ in 0..50 {
            handle.publish(sample_list(1));
            let frame = timeout(Duration::from_secs(2), read_frame(&mut healthy))
                .await
                .unwrap()
                .unwrap();
            assert!(!frame.is_empty());
            received += 1;
            if stats.subscribers_left() >= 1 {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }

        assert!(received > 0);
        assert_eq!(stats.subscribers_left(), 1);

        handle.shutdown();
    }

    #[tokio::test]
    async fn test_admission_pauses_at_capacity_and_resumes() {
        let (addr, handle, stats) = start_registry(2).await;

        let first = TcpStream::connect(addr).await.unwrap();
        let mut second = TcpStream::connect(addr).await.unwrap();
        wait_for_joins(&stats, 2).await;

        // Third connection sits in the kernel backlog: the registry issues
        // no accept while paused, so it never receives a frame.
        let mut third = TcpStream::connect(addr).await.unwrap();
        handle.publish(sample_list(1));

        let mut probe = [0u8; 1];
        let unaccepted = timeout(Duration::from_millis(200), third.read(&mut probe)).await;
        assert!(unaccepted.is_err(), "Paused registry delivered a frame");

        // First subscriber goes away. Publishing makes its write loop hit
        // the dead socket, which triggers the leave that re-arms the
        // accept loop; the third connection is then finally admitted.
        drop(first);
        for _ in 0..200 {
            handle.publish(sample_list(2));
            if stats.subscribers_joined() >= 3 {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(
            stats.subscribers_joined(),
            3,
            "Third subscriber was never admitted"
        );

        handle.publish(sample_list(2));
        let frame = timeout(Duration::from_secs(2), read_frame(&mut third))
            .await
            .unwrap()
            .unwrap();
        assert!(!frame.is_empty());

        // The second subscriber was connected throughout; drain one frame
        // to confirm it is still healthy.
        let frame = timeout(Duration::from_secs(2), read_frame(&mut second))
            .await
            .unwrap()
            .unwrap();
        assert!(!frame.is_empty());

        handle.shutdown();
    }
}
