//! Server-Sent Events decoding for streamable HTTP responses.
//!
//! A streamable MCP server may answer a POST with `text/event-stream`
//! instead of a JSON body. The client reads the whole (short) body and runs
//! it through [`SseParser`] to pull out the JSON-RPC message.

/// SSE event parsed from the stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    /// Event ID
    pub id: Option<String>,
    /// Event type/name
    pub event: Option<String>,
    /// Event data, multi-line data joined with `\n`
    pub data: String,
}

impl SseEvent {
    /// Whether this is a default `message` event.
    pub fn is_message(&self) -> bool {
        matches!(self.event.as_deref(), None | Some("message"))
    }
}

/// Incremental SSE parser.
///
/// # Examples
///
/// ```rust
/// use dataprobe::shared::sse_parser::SseParser;
///
/// let mut parser = SseParser::new();
/// let events = parser.feed("event: message\ndata: {\"id\": 1}\n\n");
/// assert_eq!(events.len(), 1);
/// assert_eq!(events[0].data, "{\"id\": 1}");
/// ```
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: String,
    current: SseEvent,
}

impl SseParser {
    /// Create a new SSE parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed data to the parser and collect completed events.
    pub fn feed(&mut self, data: &str) -> Vec<SseEvent> {
        self.buffer.push_str(data);
        let mut events = Vec::new();

        while let Some(line_end) = self.buffer.find('\n') {
            let line: String = self.buffer[..line_end]
                .strip_suffix('\r')
                .unwrap_or(&self.buffer[..line_end])
                .to_string();
            self.buffer.drain(..=line_end);

            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }

        events
    }

    /// Flush an event left open by a stream that ended without a blank line.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if !self.buffer.is_empty() {
            let line = std::mem::take(&mut self.buffer);
            let line = line.strip_suffix('\r').unwrap_or(&line).to_string();
            self.process_line(&line);
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.current.event = Some(value.to_string()),
            "data" => {
                if !self.current.data.is_empty() {
                    self.current.data.push('\n');
                }
                self.current.data.push_str(value);
            },
            "id" if !value.contains('\0') => self.current.id = Some(value.to_string()),
            _ => {},
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = std::mem::take(&mut self.current);
        if event.data.is_empty() {
            None
        } else {
            Some(event)
        }
    }
}

/// Parse a complete SSE body into its events.
pub fn parse_events(body: &str) -> Vec<SseEvent> {
    let mut parser = SseParser::new();
    let mut events = parser.feed(body);
    events.extend(parser.finish());
    events
}
