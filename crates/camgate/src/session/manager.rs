//! SessionManager - owns the one camera handle and serializes access to it.
//!
//! Every device interaction goes through an [`OperationTicket`], an owned guard
//! on the session mutex. The mutex is tokio's, so waiters are served in FIFO
//! order, and the guard travels into `spawn_blocking` with the device call so
//! the runtime never blocks on SDK I/O.
//!
//! There is no timeout: a hung device call holds the ticket until it returns.

use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

use super::types::{SessionState, SessionStatus, SessionTransition};
use crate::device::{DeviceDiscovery, DeviceHandle};
use crate::error::{GatewayError, GatewayResult};

struct SessionInner {
    state: SessionState,
    handle: Option<Box<dyn DeviceHandle>>,
    serial_number: Option<String>,
    serial_numbers: Vec<String>,
    last_error: Option<String>,
}

impl SessionInner {
    fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state,
            serial_number: self.serial_number.clone(),
            serial_numbers: self.serial_numbers.clone(),
            last_error: self.last_error.clone(),
        }
    }
}

/// Lifecycle transitions, shared between the manager and live tickets.
#[derive(Clone)]
struct Lifecycle {
    discovery: Arc<dyn DeviceDiscovery>,
    events: broadcast::Sender<SessionTransition>,
    status: Arc<watch::Sender<SessionStatus>>,
}

impl Lifecycle {
    fn set_state(&self, inner: &mut SessionInner, to: SessionState) {
        let from = inner.state;
        inner.state = to;
        self.status.send_replace(inner.status());
        if from != to {
            debug!(%from, %to, "session transition");
            // No subscribers is fine
            let _ = self.events.send(SessionTransition { from, to });
        }
    }

    fn fail(&self, inner: &mut SessionInner, message: String) -> GatewayResult<()> {
        error!(error = %message, "camera session failed");
        inner.last_error = Some(message.clone());
        inner.serial_number = None;
        self.set_state(inner, SessionState::Error);
        Err(GatewayError::DeviceUnavailable(message))
    }

    fn open(&self, inner: &mut SessionInner) -> GatewayResult<()> {
        if inner.state == SessionState::Ready && inner.handle.is_some() {
            return Ok(());
        }

        self.set_state(inner, SessionState::Discovering);
        let descriptors = match self.discovery.discover() {
            Ok(found) => found,
            Err(e) => return self.fail(inner, format!("camera discovery failed: {}", e)),
        };
        inner.serial_numbers = descriptors
            .iter()
            .map(|d| d.serial_number.clone())
            .collect();

        let Some(descriptor) = descriptors.first() else {
            return self.fail(inner, "no camera devices found".to_string());
        };
        info!(
            serial = %descriptor.serial_number,
            model = %descriptor.model,
            found = descriptors.len(),
            "opening camera"
        );

        let mut handle = match self.discovery.connect(descriptor) {
            Ok(handle) => handle,
            Err(e) => {
                return self.fail(
                    inner,
                    format!("failed to connect camera {}: {}", descriptor.serial_number, e),
                )
            }
        };
        if let Err(e) = handle.open() {
            return self.fail(
                inner,
                format!("failed to open camera {}: {}", descriptor.serial_number, e),
            );
        }
        self.set_state(inner, SessionState::Open);

        let serial = match handle.serial_number() {
            Ok(serial) if !serial.is_empty() => serial,
            Ok(_) => descriptor.serial_number.clone(),
            Err(e) => {
                warn!(error = %e, "could not read serial number, using discovery value");
                descriptor.serial_number.clone()
            }
        };

        inner.handle = Some(handle);
        inner.serial_number = Some(serial.clone());
        inner.last_error = None;
        self.set_state(inner, SessionState::Ready);
        info!(serial = %serial, "camera session ready");
        Ok(())
    }

    fn close(&self, inner: &mut SessionInner) {
        if let Some(mut handle) = inner.handle.take() {
            handle.close();
            info!("camera session closed");
        }
        inner.serial_number = None;
        self.set_state(inner, SessionState::Disconnected);
    }

    fn reload(&self, inner: &mut SessionInner) -> GatewayResult<()> {
        info!("reloading camera session");
        self.close(inner);
        self.open(inner)
    }
}

/// Exclusive access to the camera for one logical operation.
///
/// Dropping the ticket releases access.
pub struct OperationTicket {
    inner: OwnedMutexGuard<SessionInner>,
    lifecycle: Lifecycle,
}

impl OperationTicket {
    pub fn state(&self) -> SessionState {
        self.inner.state
    }

    /// The open handle. Fails with `DeviceNotReady` outside the Ready state.
    pub fn device(&mut self) -> GatewayResult<&mut dyn DeviceHandle> {
        let state = self.inner.state;
        match self.inner.handle.as_mut() {
            Some(handle) if state == SessionState::Ready => Ok(&mut **handle),
            _ => Err(GatewayError::DeviceNotReady(state)),
        }
    }

    /// Close and reopen the session without giving up the ticket.
    pub fn reload(&mut self) -> GatewayResult<()> {
        self.lifecycle.reload(&mut self.inner)
    }
}

/// Manages the single camera session.
pub struct SessionManager {
    inner: Arc<Mutex<SessionInner>>,
    lifecycle: Lifecycle,
    status_rx: watch::Receiver<SessionStatus>,
}

impl SessionManager {
    pub fn new(discovery: Arc<dyn DeviceDiscovery>) -> Self {
        let (events, _) = broadcast::channel(64);
        let (status_tx, status_rx) = watch::channel(SessionStatus::default());

        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                state: SessionState::Disconnected,
                handle: None,
                serial_number: None,
                serial_numbers: Vec::new(),
                last_error: None,
            })),
            lifecycle: Lifecycle {
                discovery,
                events,
                status: Arc::new(status_tx),
            },
            status_rx,
        }
    }

    async fn acquire(&self) -> OperationTicket {
        OperationTicket {
            inner: self.inner.clone().lock_owned().await,
            lifecycle: self.lifecycle.clone(),
        }
    }

    /// Discover and open the first camera. No-op when already Ready.
    pub async fn open(&self) -> GatewayResult<()> {
        let mut ticket = self.acquire().await;
        run_blocking(move || {
            let OperationTicket { inner, lifecycle } = &mut ticket;
            lifecycle.open(inner)
        })
        .await
    }

    /// Close the handle and open again.
    pub async fn reload(&self) -> GatewayResult<()> {
        let mut ticket = self.acquire().await;
        run_blocking(move || ticket.reload()).await
    }

    /// Reload when Ready, otherwise retry `open`.
    pub async fn reconnect(&self) -> GatewayResult<SessionStatus> {
        let mut ticket = self.acquire().await;
        run_blocking(move || {
            let OperationTicket { inner, lifecycle } = &mut ticket;
            if inner.state == SessionState::Ready {
                lifecycle.reload(inner)?;
            } else {
                lifecycle.open(inner)?;
            }
            Ok(inner.status())
        })
        .await
    }

    /// Release the handle. Safe to call repeatedly.
    pub async fn close(&self) {
        let mut ticket = self.acquire().await;
        let _ = run_blocking(move || {
            let OperationTicket { inner, lifecycle } = &mut ticket;
            lifecycle.close(inner);
            Ok(())
        })
        .await;
    }

    /// Run `op` with exclusive access to the Ready session.
    ///
    /// When the session is not Ready the op is never invoked.
    pub async fn with_device<T, F>(&self, op: F) -> GatewayResult<T>
    where
        F: FnOnce(&mut OperationTicket) -> GatewayResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let mut ticket = self.acquire().await;
        let state = ticket.state();
        if state != SessionState::Ready {
            debug!(%state, "rejecting operation, session not ready");
            return Err(GatewayError::DeviceNotReady(state));
        }
        run_blocking(move || op(&mut ticket)).await
    }

    pub fn state(&self) -> SessionState {
        self.status_rx.borrow().state
    }

    pub fn status(&self) -> SessionStatus {
        self.status_rx.borrow().clone()
    }

    pub fn serial_number(&self) -> Option<String> {
        self.status_rx.borrow().serial_number.clone()
    }

    pub fn serial_numbers(&self) -> Vec<String> {
        self.status_rx.borrow().serial_numbers.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.status_rx.borrow().last_error.clone()
    }

    /// Subscribe to state transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionTransition> {
        self.lifecycle.events.subscribe()
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.try_lock() {
            if let Some(mut handle) = inner.handle.take() {
                handle.close();
            }
        }
    }
}

async fn run_blocking<T, F>(f: F) -> GatewayResult<T>
where
    F: FnOnce() -> GatewayResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| GatewayError::DeviceOperationFailed(format!("device task failed: {}", e)))?
}
