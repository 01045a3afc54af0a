use std::collections::VecDeque;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use pipemux_frame::Frame;
use tracing::{debug, trace};

use crate::error::{PipeError, Result};
use crate::traits::{Credential, Pipe, PipeEvent, PipeId};

/// Default per-direction high-water mark, in frames.
pub const DEFAULT_HWM: usize = 1000;

/// Configuration for an in-process pipe pair.
#[derive(Debug, Clone)]
pub struct PipeConfig {
    /// Maximum frames queued in each direction. `0` means unbounded.
    pub hwm: usize,
    /// Credential the left endpoint reports for its peer.
    pub left_credential: Credential,
    /// Credential the right endpoint reports for its peer.
    pub right_credential: Credential,
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            hwm: DEFAULT_HWM,
            left_credential: Credential::default(),
            right_credential: Credential::default(),
        }
    }
}

#[derive(Debug)]
struct Queue {
    frames: VecDeque<Frame>,
    closed: bool,
    /// Set when a write was refused; cleared (with a notification) once the
    /// reader frees a slot.
    writer_blocked: bool,
}

#[derive(Debug)]
struct Shared {
    /// `queues[side]` holds frames written by `side`.
    queues: [Mutex<Queue>; 2],
    notifiers: [Mutex<Option<Sender<PipeEvent>>>; 2],
    ids: [PipeId; 2],
    hwm: usize,
}

/// One endpoint of an in-process pipe pair.
#[derive(Debug)]
pub struct InprocPipe {
    side: usize,
    credential: Credential,
    shared: Arc<Shared>,
}

/// Create a connected pair of in-process pipe endpoints.
///
/// Frames written on one endpoint are read on the other.
pub fn pair(config: PipeConfig) -> (InprocPipe, InprocPipe) {
    let new_queue = || {
        Mutex::new(Queue {
            frames: VecDeque::new(),
            closed: false,
            writer_blocked: false,
        })
    };
    let shared = Arc::new(Shared {
        queues: [new_queue(), new_queue()],
        notifiers: [Mutex::new(None), Mutex::new(None)],
        ids: [PipeId::next(), PipeId::next()],
        hwm: config.hwm,
    });

    debug!(
        left = %shared.ids[0],
        right = %shared.ids[1],
        hwm = config.hwm,
        "created in-process pipe pair"
    );

    let left = InprocPipe {
        side: 0,
        credential: config.left_credential,
        shared: Arc::clone(&shared),
    };
    let right = InprocPipe {
        side: 1,
        credential: config.right_credential,
        shared,
    };
    (left, right)
}

impl InprocPipe {
    /// Route this endpoint's readiness events into `mailbox`.
    ///
    /// Current readiness is announced immediately: a write activation if the
    /// endpoint can accept frames, a read activation if frames are already
    /// waiting.
    pub fn set_notifier(&self, mailbox: Sender<PipeEvent>) {
        *lock(&self.shared.notifiers[self.side]) = Some(mailbox);

        if self.check_write() {
            self.notify(self.side, PipeEvent::WriteActivated(self.id()));
        }
        if self.check_read() {
            self.notify(self.side, PipeEvent::ReadActivated(self.id()));
        }
    }

    /// Close both directions and notify both endpoints.
    ///
    /// Frames already queued stay readable. Repeated calls are no-ops.
    pub fn terminate(&self) {
        let mut newly_closed = false;
        for queue in &self.shared.queues {
            let mut queue = lock(queue);
            newly_closed |= !queue.closed;
            queue.closed = true;
        }
        if !newly_closed {
            return;
        }

        debug!(pipe_id = %self.id(), "terminating in-process pipe");
        for side in 0..2 {
            self.notify(side, PipeEvent::Terminated(self.shared.ids[side]));
        }
    }

    /// Whether the pair has been terminated.
    pub fn is_terminated(&self) -> bool {
        lock(&self.shared.queues[self.side]).closed
    }

    /// Identity of the endpoint on the other side.
    pub fn peer_id(&self) -> PipeId {
        self.shared.ids[self.peer_side()]
    }

    /// Number of inbound frames waiting to be read.
    pub fn pending(&self) -> usize {
        lock(&self.shared.queues[self.peer_side()]).frames.len()
    }

    fn peer_side(&self) -> usize {
        1 - self.side
    }

    fn is_full(&self, queue: &Queue) -> bool {
        self.shared.hwm != 0 && queue.frames.len() >= self.shared.hwm
    }

    fn notify(&self, side: usize, event: PipeEvent) {
        let notifier = lock(&self.shared.notifiers[side]);
        if let Some(mailbox) = notifier.as_ref() {
            if mailbox.send(event).is_err() {
                trace!(pipe_id = %event.pipe_id(), ?event, "pipe mailbox closed; dropping event");
            }
        }
    }
}

impl Pipe for InprocPipe {
    fn id(&self) -> PipeId {
        self.shared.ids[self.side]
    }

    fn read(&self) -> Option<Frame> {
        let (frame, unblocked) = {
            let mut queue = lock(&self.shared.queues[self.peer_side()]);
            let frame = queue.frames.pop_front()?;
            let unblocked = queue.writer_blocked && !self.is_full(&queue);
            if unblocked {
                queue.writer_blocked = false;
            }
            (frame, unblocked)
        };

        if unblocked {
            let peer = self.peer_side();
            self.notify(peer, PipeEvent::WriteActivated(self.shared.ids[peer]));
        }
        Some(frame)
    }

    fn write(&self, frame: Frame) -> Result<()> {
        let was_empty = {
            let mut queue = lock(&self.shared.queues[self.side]);
            if queue.closed {
                return Err(PipeError::Closed { frame });
            }
            if self.is_full(&queue) {
                queue.writer_blocked = true;
                return Err(PipeError::Full { frame });
            }
            let was_empty = queue.frames.is_empty();
            queue.frames.push_back(frame);
            was_empty
        };

        if was_empty {
            let peer = self.peer_side();
            self.notify(peer, PipeEvent::ReadActivated(self.shared.ids[peer]));
        }
        Ok(())
    }

    fn check_read(&self) -> bool {
        !lock(&self.shared.queues[self.peer_side()]).frames.is_empty()
    }

    fn check_write(&self) -> bool {
        let mut queue = lock(&self.shared.queues[self.side]);
        if queue.closed {
            return false;
        }
        // A writer told "full" is owed a write activation, just as after a
        // refused write.
        let full = self.is_full(&queue);
        if full {
            queue.writer_blocked = true;
        }
        !full
    }

    fn credential(&self) -> Credential {
        self.credential.clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
