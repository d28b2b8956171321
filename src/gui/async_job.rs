//! Background jobs polled from the GUI thread.
//!
//! A job runs on its own thread and reports back over a channel; the frame
//! loop polls it without blocking. Workflow jobs also carry the ticket the
//! controller issued, so a late result can be matched against it.

use crate::error::{NetworkError, SignerError};
use crate::network::{AccountLedgerState, SubmissionResult};
use crate::signer::{LedgerAccount, SignatureResult};
use crate::workflow::{PaymentWorkflow, Ticket};
use anyhow::{anyhow, Result};
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

pub struct AsyncJob<T> {
    receiver: Option<Receiver<Result<T>>>,
    started: Instant,
}

impl<T> AsyncJob<T> {
    pub fn new(receiver: Receiver<Result<T>>) -> Self {
        Self {
            receiver: Some(receiver),
            started: Instant::now(),
        }
    }

    /// Some(result) once the job has finished, None while it is still running
    pub fn poll(&mut self) -> Option<Result<T>> {
        let rx = self.receiver.as_ref()?;
        match rx.try_recv() {
            Ok(res) => {
                self.receiver = None;
                Some(res)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.receiver = None;
                Some(Err(anyhow!("Worker task disconnected")))
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.receiver.is_some()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// A job started for one workflow action.
pub struct WorkflowJob<T> {
    pub ticket: Ticket,
    job: AsyncJob<T>,
}

impl<T> WorkflowJob<T> {
    pub fn new(ticket: Ticket, job: AsyncJob<T>) -> Self {
        Self { ticket, job }
    }

    pub fn elapsed(&self) -> Duration {
        self.job.elapsed()
    }
}

/// Take a finished job out of its slot, returning its ticket and result.
pub fn take_finished<T>(slot: &mut Option<WorkflowJob<T>>) -> Option<(Ticket, Result<T>)> {
    let result = slot.as_mut()?.job.poll()?;
    let ticket = slot.take()?.ticket;
    Some((ticket, result))
}

/// How the controller took a finished workflow job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled<T = ()> {
    /// A newer action superseded the job; nothing to report
    Stale,
    Done(T),
    /// The controller recorded an error
    Failed,
}

fn settled(finished: bool, workflow: &PaymentWorkflow) -> Settled {
    match (finished, workflow.error()) {
        (false, _) => Settled::Stale,
        (true, None) => Settled::Done(()),
        (true, Some(_)) => Settled::Failed,
    }
}

/// A job that never produced a device reply.
fn signer_job_error(e: anyhow::Error) -> SignerError {
    SignerError::Device(e.to_string())
}

/// A job that never produced a server reply.
fn network_job_error(e: anyhow::Error) -> NetworkError {
    NetworkError::Job(e.to_string())
}

/// Hand a finished account lookup to the controller.
///
/// On success the ledger state lookup is begun at once; its ticket and the
/// address to query come back in `Done`.
pub fn settle_account_job(
    workflow: &mut PaymentWorkflow,
    ticket: Ticket,
    result: Result<std::result::Result<LedgerAccount, SignerError>>,
) -> Settled<(Ticket, String)> {
    let result = result.unwrap_or_else(|e| Err(signer_job_error(e)));
    match settled(workflow.finish_fetch_account(ticket, result), workflow) {
        Settled::Done(()) => match workflow.begin_fetch_ledger_state() {
            Ok(next) => Settled::Done(next),
            Err(_) => Settled::Failed,
        },
        Settled::Stale => Settled::Stale,
        Settled::Failed => Settled::Failed,
    }
}

pub fn settle_ledger_job(
    workflow: &mut PaymentWorkflow,
    ticket: Ticket,
    result: Result<std::result::Result<AccountLedgerState, NetworkError>>,
) -> Settled {
    let result = result.unwrap_or_else(|e| Err(network_job_error(e)));
    settled(workflow.finish_fetch_ledger_state(ticket, result), workflow)
}

pub fn settle_sign_job(
    workflow: &mut PaymentWorkflow,
    ticket: Ticket,
    result: Result<std::result::Result<SignatureResult, SignerError>>,
) -> Settled {
    let result = result.unwrap_or_else(|e| Err(signer_job_error(e)));
    settled(workflow.finish_sign(ticket, result), workflow)
}

/// The submission outcome, good or bad, is left on the workflow.
pub fn settle_submit_job(
    workflow: &mut PaymentWorkflow,
    ticket: Ticket,
    result: Result<std::result::Result<SubmissionResult, NetworkError>>,
) -> Settled {
    let result = result.unwrap_or_else(|e| Err(network_job_error(e)));
    settled(workflow.finish_submit(ticket, result), workflow)
}
