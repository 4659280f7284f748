/// Timing and protocol settings of the [Adapter](crate::wifi::Adapter)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Default time in ms to wait for a command response. Gets restarted on every received byte.
    pub command_timeout_ms: u32,

    /// Default number of attempts per command
    pub retries: usize,

    /// Time in ms inbound data may stream in before stale input is discarded
    pub settle_ms: u32,

    /// Pause in ms after the module signaled `busy s...` or `busy p...`
    pub busy_backoff_ms: u32,

    /// Pause in ms between two attempts of the same command
    pub retry_backoff_ms: u32,

    /// Pause in ms between socket status polls while waiting for a free socket
    pub socket_poll_interval_ms: u32,

    /// Max. number of socket status polls before opening a socket is given up
    pub socket_poll_limit: usize,

    /// TCP keep-alive in seconds used when opening sockets
    pub keep_alive_s: u16,

    /// SSL buffer size configured on initialization
    pub ssl_buffer_size: u16,

    /// Time in ms to wait for the data prompt and the send confirmation
    pub send_timeout_ms: u32,

    /// Time in ms to wait for inbound socket data when used as [embedded_nal::TcpClientStack]
    pub receive_timeout_ms: u32,

    /// True if the RTS/CTS lines are wired, requested when changing the baud rate
    pub hardware_flow_control: bool,

    /// Baud rate the transport is configured with initially
    pub baud_rate: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            command_timeout_ms: 20_000,
            retries: 3,
            settle_ms: 100,
            busy_backoff_ms: 1_000,
            retry_backoff_ms: 1_000,
            socket_poll_interval_ms: 1_000,
            socket_poll_limit: 30,
            keep_alive_s: 10,
            ssl_buffer_size: 4_096,
            send_timeout_ms: 10_000,
            receive_timeout_ms: 15_000,
            hardware_flow_control: false,
            baud_rate: 115_200,
        }
    }
}
