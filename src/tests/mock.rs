use crate::config::Config;
use crate::transport::{ResetLine, Transport};
use crate::wifi::Adapter;
use core::convert::Infallible;
use fugit::{TimerDurationU32, TimerInstantU32};
use fugit_timer::Timer as FugitTimer;
use mockall::mock;
use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Adapter using the scripted transport and the simulated clock
pub type AdapterType = Adapter<MockTransport, MockClock, MockResetLine, 1_000>;

/// Simulated time in ms shared by [MockClock] and [MockTransport]
pub type SimulatedTime = Rc<Cell<u32>>;

/// Chunk of a reply, delivered the given number of ms after the command was written
type Chunk = (u32, Vec<u8>);

/// Scripted serial link. Every write queues the chunks of the next reply for delivery.
#[derive(Default)]
pub struct MockTransport {
    /// Written data, one entry per write call
    writes: Vec<Vec<u8>>,

    /// Mocked replies which get returned in the same order as inserted
    replies: VecDeque<Vec<Chunk>>,

    /// Inbound data not delivered yet, by simulated delivery time
    scheduled: VecDeque<Chunk>,

    /// Clock the delivery times refer to
    time: SimulatedTime,

    /// Inbound bytes not read yet
    rx: VecDeque<u8>,

    /// Current flow control state
    flow_enabled: bool,

    /// Flow control states in the order set, repeated calls with the same state are skipped
    flow_sequence: Vec<bool>,

    /// Baud rates set by the driver
    baud_rates: Vec<u32>,
}

impl Transport for MockTransport {
    type Error = Infallible;

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.writes.push(data.to_vec());

        if let Some(reply) = self.replies.pop_front() {
            let now = self.time.get();

            for (delay, chunk) in reply {
                self.schedule(now + delay, chunk);
            }
        }

        Ok(())
    }

    fn read_available(&mut self) -> Result<usize, Self::Error> {
        let now = self.time.get();

        while self.scheduled.front().is_some_and(|(at, _)| *at <= now) {
            let (_, chunk) = self.scheduled.pop_front().unwrap();
            self.rx.extend(chunk);
        }

        Ok(self.rx.len())
    }

    fn read_byte(&mut self) -> Result<u8, Self::Error> {
        Ok(self.rx.pop_front().expect("read_byte() called without available data"))
    }

    fn set_flow_control(&mut self, enabled: bool) -> Result<(), Self::Error> {
        if self.flow_enabled != enabled {
            self.flow_enabled = enabled;
            self.flow_sequence.push(enabled);
        }

        Ok(())
    }

    fn set_baud_rate(&mut self, baud_rate: u32) -> Result<(), Self::Error> {
        self.baud_rates.push(baud_rate);
        Ok(())
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a mock reply for the next write
    pub fn add_reply(&mut self, reply: &[u8]) {
        self.replies.push_back(vec![(0, reply.to_vec())]);
    }

    /// Adds a mock reply for the next write, delivered in chunks. Each chunk is given with its delay
    /// in ms after the write.
    pub fn add_chunked_reply(&mut self, chunks: &[(u32, &[u8])]) {
        let chunks = chunks.iter().map(|(delay, chunk)| (*delay, chunk.to_vec())).collect();
        self.replies.push_back(chunks);
    }

    /// Simulates a plain OK reply
    pub fn add_ok(&mut self) {
        self.add_reply(b"\r\nOK\r\n");
    }

    /// Simulates a general error reply
    pub fn add_error(&mut self) {
        self.add_reply(b"\r\nERROR\r\n");
    }

    /// Simulates a status reply with the given code
    pub fn add_status(&mut self, code: u8) {
        self.add_reply(format!("STATUS:{}\r\n\r\nOK\r\n", code).as_bytes());
    }

    /// Simulates unsolicited inbound data
    pub fn push_incoming(&mut self, data: &[u8]) {
        self.rx.extend(data.iter().copied());
    }

    /// Simulates unsolicited inbound data arriving at the given simulated time in ms
    pub fn push_incoming_at(&mut self, at_ms: u32, data: &[u8]) {
        self.schedule(at_ms, data.to_vec());
    }

    /// Delivery times refer to the given clock
    pub fn attach_clock(&mut self, clock: &MockClock) {
        self.time = clock.time();
    }

    fn schedule(&mut self, at_ms: u32, chunk: Vec<u8>) {
        let index = self.scheduled.partition_point(|(at, _)| *at <= at_ms);
        self.scheduled.insert(index, (at_ms, chunk));
    }

    /// Returns a copy of the written data
    pub fn get_commands_as_strings(&self) -> Vec<String> {
        self.writes
            .iter()
            .map(|command| String::from_utf8(command.clone()).unwrap())
            .collect()
    }

    /// Inbound data not consumed by the driver, including data not delivered yet
    pub fn remaining(&self) -> Vec<u8> {
        let scheduled = self.scheduled.iter().flat_map(|(_, chunk)| chunk.iter());
        self.rx.iter().chain(scheduled).copied().collect()
    }

    pub fn is_flow_enabled(&self) -> bool {
        self.flow_enabled
    }

    pub fn flow_sequence(&self) -> &[bool] {
        &self.flow_sequence
    }

    pub fn baud_rates(&self) -> &[u32] {
        &self.baud_rates
    }
}

/// Simulated millisecond clock. Every clock read advances the time by 1 ms, delays complete immediately.
#[derive(Default)]
pub struct MockClock {
    now: SimulatedTime,

    /// Duration of the started delay
    delay: Option<u32>,

    /// Sum of all completed delays
    slept_ms: u32,
}

impl MockClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slept_ms(&self) -> u32 {
        self.slept_ms
    }

    /// Handle of the simulated time
    pub fn time(&self) -> SimulatedTime {
        Rc::clone(&self.now)
    }

    fn advance(&mut self, duration_ms: u32) {
        self.now.set(self.now.get() + duration_ms);
    }
}

impl FugitTimer<1_000> for MockClock {
    type Error = Infallible;

    fn now(&mut self) -> TimerInstantU32<1_000> {
        self.advance(1);
        TimerInstantU32::from_ticks(self.now.get())
    }

    fn start(&mut self, duration: TimerDurationU32<1_000>) -> Result<(), Self::Error> {
        self.delay = Some(duration.ticks());
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), Self::Error> {
        self.delay = None;
        Ok(())
    }

    fn wait(&mut self) -> nb::Result<(), Self::Error> {
        if let Some(delay) = self.delay.take() {
            self.advance(delay);
            self.slept_ms += delay;
        }

        Ok(())
    }
}

mock! {
    pub Timer{}

    impl FugitTimer<1_000> for Timer {
        type Error = u32;

        fn now(&mut self) -> TimerInstantU32<1000>;
        fn start(&mut self, duration: TimerDurationU32<1000>) -> Result<(), u32>;
        fn cancel(&mut self) -> Result<(), u32>;
        fn wait(&mut self) -> nb::Result<(), u32>;
    }
}

mock! {
    pub ResetLine{}

    impl ResetLine for ResetLine {
        type Error = u32;

        fn set_level(&mut self, high: bool) -> Result<(), u32>;
    }
}

/// Creates an adapter with default configuration and a reset line without expectations
pub fn adapter(transport: MockTransport) -> AdapterType {
    adapter_with_config(transport, Config::default())
}

/// Creates an adapter with the given configuration. Transport and clock share the simulated time.
pub fn adapter_with_config(mut transport: MockTransport, config: Config) -> AdapterType {
    let clock = MockClock::new();
    transport.attach_clock(&clock);

    Adapter::with_config(transport, clock, MockResetLine::new(), config)
}
