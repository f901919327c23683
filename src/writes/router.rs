//! Background completion router for deferred write outcomes.

use crate::permission::ErrorReporter;
use crate::store::{WriteOutcome, WriteTicket};
use crate::types::Operation;
use crossbeam_channel::{bounded, Receiver, RecvError, Select, Sender};
use serde_json::Value;
use std::thread::{self, JoinHandle};

/// Context remembered for a fired write, for diagnostics.
pub(crate) struct WriteContext {
    pub op: Operation,
    pub path: String,
    pub payload: Option<Value>,
}

/// A fired write whose outcome has not resolved yet.
pub(crate) struct PendingWrite {
    pub ticket: WriteTicket,
    pub ctx: WriteContext,
}

pub(crate) enum RouterMessage {
    Write(PendingWrite),
    Shutdown,
}

/// Owns the completion worker. Selects over the intake channel plus every
/// pending ticket; denials become error-channel broadcasts.
pub(crate) struct WriteRouter {
    intake: Sender<RouterMessage>,
    worker: Option<JoinHandle<()>>,
}

impl WriteRouter {
    pub(crate) fn spawn(reporter: ErrorReporter, queue: usize) -> Self {
        let (intake, receiver) = bounded(queue);
        let worker = thread::Builder::new()
            .name("lyra-write-router".to_string())
            .spawn(move || run(receiver, reporter))
            .expect("failed to spawn write router thread");
        Self {
            intake,
            worker: Some(worker),
        }
    }

    pub(crate) fn sender(&self) -> Sender<RouterMessage> {
        self.intake.clone()
    }
}

impl Drop for WriteRouter {
    fn drop(&mut self) {
        let _ = self.intake.send(RouterMessage::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run(intake: Receiver<RouterMessage>, reporter: ErrorReporter) {
    let mut pending: Vec<PendingWrite> = Vec::new();

    enum Step {
        Intake(Result<RouterMessage, RecvError>),
        Resolved(usize, Result<WriteOutcome, RecvError>),
    }

    loop {
        let step = {
            let mut select = Select::new();
            select.recv(&intake);
            for write in &pending {
                select.recv(write.ticket.receiver());
            }

            let op = select.select();
            let index = op.index();
            if index == 0 {
                Step::Intake(op.recv(&intake))
            } else {
                let slot = index - 1;
                Step::Resolved(slot, op.recv(pending[slot].ticket.receiver()))
            }
        };

        match step {
            Step::Intake(Ok(RouterMessage::Write(write))) => pending.push(write),
            Step::Intake(Ok(RouterMessage::Shutdown)) | Step::Intake(Err(_)) => {
                if !pending.is_empty() {
                    tracing::debug!(
                        outstanding = pending.len(),
                        "write router stopping with unresolved tickets"
                    );
                }
                break;
            }
            Step::Resolved(slot, outcome) => {
                let write = pending.swap_remove(slot);
                match outcome {
                    Ok(Ok(())) => {
                        tracing::trace!(path = %write.ctx.path, "write acknowledged");
                    }
                    Ok(Err(denied)) => {
                        reporter.report(denied.op, &denied.path, write.ctx.payload);
                    }
                    Err(_) => {
                        tracing::debug!(
                            path = %write.ctx.path,
                            "write ticket dropped without an outcome"
                        );
                    }
                }
            }
        }
    }
}
