//! Session establishment and the bit-bang mode transitions.

use std::cell::{RefCell, RefMut};

use log::{debug, info, warn};

use super::{Link, Mode, ANS_OK, BBIO_MAGIC, CMD_EXIT, CMD_RESET_BITBANG};
use crate::error::{Error, Result, TransportError};
use crate::settings::HandshakePolicy;
use crate::transport::Transport;
use crate::utils::trace_bytes;

// =============================================================================
// Public Interface
// =============================================================================

/// A binary-mode session with the probe over an exclusively owned transport.
///
/// A new session starts in [`Mode::Closed`]; call [`open`](Session::open)
/// to put the probe in bit-bang mode before anything else. All operations take
/// `&self` so that mode handles can borrow the session while it keeps
/// tracking the mode. A session is not `Sync`: a probe shared between several
/// callers must be put behind a lock.
pub struct Session<T: Transport> {
    link: RefCell<Link<T>>,
    policy: HandshakePolicy,
}

impl<T: Transport> Session<T> {
    /// Create a session using the default handshake policy.
    pub fn new(transport: T) -> Self {
        Self::with_policy(transport, HandshakePolicy::default())
    }

    pub fn with_policy(transport: T, policy: HandshakePolicy) -> Self {
        Session {
            link: RefCell::new(Link::new(transport)),
            policy,
        }
    }

    /// The mode the probe is in, as far as the host knows.
    pub fn mode(&self) -> Mode {
        self.link.borrow().mode
    }

    /// The protocol version of the current mode, 0 when no mode is
    /// established.
    pub fn mode_version(&self) -> u8 {
        self.link.borrow().version
    }

    /// Put the probe into binary bit-bang mode, whatever state it is in.
    ///
    /// The probe's command parser may need several `0x00` before it answers
    /// with `BBIO1`; unanswered probes are retried up to the policy's maximum
    /// number of attempts. Once it answered, anything left over from its
    /// previous state is drained until the line stays quiet. A wrong answer is
    /// fatal and leaves the session in [`Mode::Unknown`]; running out of
    /// attempts leaves the mode unchanged.
    pub fn open(&self) -> Result<()> {
        use retry::{delay, retry_with_index, OperationResult};

        let policy = self.policy;
        let mut link = self.link.borrow_mut();
        info!("Opening binary session, currently in {} mode", link.mode);

        link.transport.set_read_params(0, policy.probe_timeout)?;

        let result = retry_with_index(
            delay::NoDelay.take(policy.max_attempts.saturating_sub(1)),
            |attempt| {
                debug!("try {:2}: sending 0x00...", attempt);
                match probe_binary_mode(&mut *link) {
                    Ok(()) => OperationResult::Ok(()),
                    Err(err) if err.is_timeout() => {
                        debug!("try {:2}: timeout!", attempt);
                        OperationResult::Retry(err)
                    }
                    Err(err) => OperationResult::Err(err),
                }
            },
        );

        match result {
            Ok(()) => {}
            Err(retry::Error::Operation { error, .. }) if error.is_timeout() => {
                return Err(Error::RetriesExhausted {
                    attempts: policy.max_attempts.max(1),
                });
            }
            Err(retry::Error::Operation { error, tries, .. }) => {
                warn!("handshake failed after {} tries: {}", tries, error);
                link.clear_mode();
                return Err(error);
            }
            Err(retry::Error::Internal(msg)) => {
                warn!("internal retry error during handshake: {}", msg);
                return Err(Error::RetriesExhausted {
                    attempts: policy.max_attempts.max(1),
                });
            }
        }

        if let Err(err) = drain(&mut *link, &policy) {
            link.clear_mode();
            return Err(err);
        }

        link.commit(Mode::BitBang);
        Ok(())
    }

    /// Reset the probe to bit-bang mode from a known mode.
    ///
    /// Unlike [`open`](Session::open) there is no retry: this is a mode reset
    /// step, not a synchronization. Any failure leaves the session in
    /// [`Mode::Unknown`].
    pub fn enter_bitbang_mode(&self) -> Result<()> {
        let mut link = self.link.borrow_mut();
        let current = link.mode;
        match current {
            Mode::Unknown | Mode::Closed => Err(Error::ModeNotAllowed {
                op: "enter bitbang mode",
                current,
            }),
            _ => link.transition(Mode::BitBang, |link| {
                link.write_bytes(&[CMD_RESET_BITBANG])?;
                link.expect_version_string(BBIO_MAGIC)
            }),
        }
    }

    /// Leave binary mode, returning to bit-bang mode first if needed.
    ///
    /// The probe goes back to its text terminal afterwards. Releasing the
    /// transport is done with [`release`](Session::release).
    pub fn close(&self) -> Result<()> {
        let current = self.mode();
        if let Mode::Unknown | Mode::Closed = current {
            return Err(Error::ModeNotAllowed {
                op: "close",
                current,
            });
        }

        if current != Mode::BitBang {
            info!("need to go to bitbang mode before closing");
            self.enter_bitbang_mode()
                .map_err(|err| Error::CloseAborted(Box::new(err)))?;
        }

        self.link
            .borrow_mut()
            .exchange_byte_and_expect("close", CMD_EXIT, ANS_OK)?;
        info!("probe closed");
        Ok(())
    }

    /// Consume the session and hand back the transport.
    pub fn release(self) -> T {
        self.link.into_inner().transport
    }

    /// Borrow the link for an operation that needs the probe in `required`
    /// mode. Fails without touching the transport otherwise.
    pub(crate) fn require(
        &self,
        op: &'static str,
        required: Mode,
    ) -> Result<RefMut<'_, Link<T>>> {
        let link = self.link.borrow_mut();
        if link.mode != required {
            return Err(Error::WrongMode {
                op,
                required,
                current: link.mode,
            });
        }
        Ok(link)
    }
}

#[cfg(test)]
impl<T: Transport> Session<T> {
    /// A session that believes the probe is already in `mode`.
    pub(crate) fn in_mode(transport: T, mode: Mode) -> Self {
        let session = Self::new(transport);
        session.link.borrow_mut().commit(mode);
        session
    }
}

// =============================================================================
// Private stuff
// =============================================================================

/// One handshake attempt: `0x00` must be answered with `BBIO1`.
fn probe_binary_mode<T: Transport>(link: &mut Link<T>) -> Result<()> {
    link.write_bytes(&[CMD_RESET_BITBANG])?;
    link.expect_version_string(BBIO_MAGIC)
}

/// Discard whatever the probe sent before it switched to binary mode. The
/// drain succeeds when a read times out, i.e. the line went quiet.
fn drain<T: Transport>(link: &mut Link<T>, policy: &HandshakePolicy) -> Result<usize> {
    link.transport.set_read_params(0, policy.drain_timeout)?;

    let mut buf = vec![0u8; policy.drain_len];
    let mut filled = 0;
    while filled < buf.len() {
        match link.transport.read(&mut buf[filled..]) {
            Ok(0) | Err(TransportError::Timeout) => {
                trace_bytes("drained", &buf[..filled]);
                debug!("drained buffer, {} excess bytes discarded", filled);
                return Ok(filled);
            }
            Ok(n) => filled += n,
            Err(err) => return Err(err.into()),
        }
    }
    Err(Error::DrainOverflow { len: filled })
}

// =============================================================================
// Unit Tests
// =============================================================================
