use arcade_protocol::BackOut;
use arcade_protocol::game::LogEntry;
use arcade_socket::Middleware;
use arcade_socket::Next;
use arcade_socket::Outbound;
use arcade_socket::PipelineError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

/// Most recent log entries, oldest first.
#[derive(Debug)]
pub struct LogBuffer {
    capacity: usize,
    state: Mutex<BufferState>,
}

#[derive(Debug, Default)]
struct BufferState {
    entries: VecDeque<LogEntry>,
    /// Index the next entry gets; keeps counting past evictions.
    next_index: u64,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(BufferState::default()),
        }
    }

    /// Appends `entry` and returns its index.
    pub fn push(&self, entry: LogEntry) -> u64 {
        let mut state = self.lock();
        if state.entries.len() == self.capacity {
            state.entries.pop_front();
        }
        state.entries.push_back(entry);
        let index = state.next_index;
        state.next_index += 1;
        index
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.lock().entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, BufferState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Records every broadcast log entry before it goes out.
pub struct LogRecorder {
    buffer: Arc<LogBuffer>,
}

impl LogRecorder {
    pub fn new(buffer: Arc<LogBuffer>) -> Self {
        Self { buffer }
    }
}

#[async_trait]
impl Middleware<Outbound<BackOut>> for LogRecorder {
    async fn handle(
        &self,
        ctx: &mut Outbound<BackOut>,
        next: Next<'_, Outbound<BackOut>>,
    ) -> Result<(), PipelineError> {
        if let BackOut::LogEntryAdded(entry) = &ctx.message {
            self.buffer.push(entry.clone());
        }
        next.run(ctx).await
    }
}
