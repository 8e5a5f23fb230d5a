use crate::command::{Command, Envelope};
use crate::InputError;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use zonesim_common::SessionId;

/// Multi-producer queue of commands, drained by the room loop.
///
/// Transport threads hold [`CommandSender`]s; the room owns the queue.
#[derive(Debug)]
pub struct CommandQueue {
    tx: Sender<Envelope>,
    rx: Receiver<Envelope>,
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandQueue {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    /// A queue that refuses commands beyond `capacity`.
    pub fn bounded(capacity: usize) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        Self { tx, rx }
    }

    pub fn sender(&self) -> CommandSender {
        CommandSender {
            tx: self.tx.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Take the commands queued so far, in arrival order.
    pub fn drain(&self) -> Vec<Envelope> {
        let pending = self.rx.len();
        self.rx.try_iter().take(pending).collect()
    }
}

/// Cloneable handle for pushing commands from any thread.
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: Sender<Envelope>,
}

impl CommandSender {
    pub fn send(&self, session: SessionId, command: Command) -> Result<(), InputError> {
        self.tx
            .try_send(Envelope { session, command })
            .map_err(|e| match e {
                TrySendError::Full(env) => {
                    tracing::warn!(session = %env.session, command = env.command.name(), "command queue full");
                    InputError::QueueFull
                }
                TrySendError::Disconnected(_) => InputError::Disconnected,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn drain_preserves_order() {
        let q = CommandQueue::new();
        let tx = q.sender();
        tx.send("a".into(), Command::ResetPosition).unwrap();
        tx.send("b".into(), Command::RevivePressed).unwrap();
        let batch = q.drain();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].session, SessionId::from("a"));
        assert_eq!(batch[1].command, Command::RevivePressed);
        assert!(q.is_empty());
    }

    #[test]
    fn bounded_queue_reports_full() {
        let q = CommandQueue::bounded(1);
        let tx = q.sender();
        tx.send("a".into(), Command::ResetPosition).unwrap();
        assert!(matches!(
            tx.send("a".into(), Command::ResetPosition),
            Err(InputError::QueueFull)
        ));
    }

    #[test]
    fn senders_work_across_threads() {
        let q = CommandQueue::new();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let tx = q.sender();
                thread::spawn(move || {
                    for _ in 0..25 {
                        tx.send(SessionId::new(format!("s{i}")), Command::ResetPosition)
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(q.drain().len(), 100);
    }

    #[test]
    fn closed_queue_is_disconnected() {
        let q = CommandQueue::new();
        let tx = q.sender();
        drop(q);
        assert!(matches!(
            tx.send("a".into(), Command::ResetPosition),
            Err(InputError::Disconnected)
        ));
    }
}
