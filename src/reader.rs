use crate::engine::Progress;
use crate::error::Error;
use crate::responses::Response;
use crate::transport::{ResetLine, Transport};
use crate::wifi::Adapter;
use fugit::{TimerDurationU32, TimerInstantU32};
use fugit_timer::Timer;

/// Inactivity deadline measured against the monotonic clock of the timer
pub(crate) struct Deadline<const TIMER_HZ: u32> {
    started: TimerInstantU32<TIMER_HZ>,
    timeout: TimerDurationU32<TIMER_HZ>,
}

impl<const TIMER_HZ: u32> Deadline<TIMER_HZ> {
    pub(crate) fn start<T: Timer<TIMER_HZ>>(timer: &mut T, timeout_ms: u32) -> Self {
        Self {
            started: timer.now(),
            timeout: TimerDurationU32::millis(timeout_ms),
        }
    }

    /// Restarts the deadline, e.g. when new data arrived
    pub(crate) fn restart<T: Timer<TIMER_HZ>>(&mut self, timer: &mut T) {
        self.started = timer.now();
    }

    pub(crate) fn is_expired<T: Timer<TIMER_HZ>>(&self, timer: &mut T) -> bool {
        timer
            .now()
            .checked_duration_since(self.started)
            .is_some_and(|elapsed| elapsed >= self.timeout)
    }
}

impl<S: Transport, T: Timer<TIMER_HZ>, R: ResetLine, const TIMER_HZ: u32> Adapter<S, T, R, TIMER_HZ> {
    /// Collects inbound bytes until the predicate signals completion.
    ///
    /// Flow control is enabled while waiting for data and disabled as soon as the available bytes
    /// are consumed. Returns [Error::Timeout] if no byte arrived within the given time span.
    pub(crate) fn read_response<P>(&mut self, timeout_ms: u32, mut predicate: P) -> Result<Response, Error>
    where
        P: FnMut(&[u8]) -> Progress,
    {
        let mut response = Response::new();
        let mut deadline = Deadline::start(&mut self.timer, timeout_ms);

        loop {
            self.transport.set_flow_control(true).map_err(Error::transport)?;
            let available = self.transport.read_available().map_err(Error::transport)?;

            if available == 0 {
                if deadline.is_expired(&mut self.timer) {
                    self.transport.set_flow_control(false).map_err(Error::transport)?;
                    return Err(Error::Timeout);
                }

                continue;
            }

            for _ in 0..available {
                let byte = self.transport.read_byte().map_err(Error::transport)?;
                response.push(byte)?;

                match predicate(response.as_bytes()) {
                    Progress::Complete => {
                        self.transport.set_flow_control(false).map_err(Error::transport)?;
                        return Ok(response);
                    }
                    Progress::Busy => {
                        warn!("Module busy, waiting {} ms", self.config.busy_backoff_ms);
                        self.delay_ms(self.config.busy_backoff_ms)?;
                    }
                    Progress::Pending => {}
                }
            }

            self.transport.set_flow_control(false).map_err(Error::transport)?;
            deadline.restart(&mut self.timer);
        }
    }

    /// Lets pending data stream in and drops it, so it does not get mixed into the next response
    pub(crate) fn discard_stale_input(&mut self) -> Result<(), Error> {
        self.transport.set_flow_control(true).map_err(Error::transport)?;
        self.delay_ms(self.config.settle_ms)?;
        self.transport.set_flow_control(false).map_err(Error::transport)?;

        let mut discarded = 0_usize;
        loop {
            let available = self.transport.read_available().map_err(Error::transport)?;
            if available == 0 {
                break;
            }

            for _ in 0..available {
                self.transport.read_byte().map_err(Error::transport)?;
            }
            discarded += available;
        }

        if discarded > 0 {
            trace!("Discarded {} stale bytes", discarded);
        }

        Ok(())
    }

    /// Blocks for the given time span
    pub(crate) fn delay_ms(&mut self, duration_ms: u32) -> Result<(), Error> {
        if duration_ms == 0 {
            return Ok(());
        }

        self.timer
            .start(TimerDurationU32::millis(duration_ms))
            .map_err(|_| Error::TimerError)?;
        nb::block!(self.timer.wait()).map_err(|_| Error::TimerError)
    }
}
