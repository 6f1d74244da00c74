use model::Kind;

/// One progress notification emitted during a [`crate::PrefetchManager`]
/// walk (spec §4.9). The Rust shape of `on_update: Callable[[PrefetchUpdate],
/// None]` — delivered over an `mpsc::UnboundedSender` instead of a callback.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefetchUpdate {
    pub stage: Kind,
    pub message: String,
    pub done: u64,
    pub total: Option<u64>,
    pub errors: u64,
    pub finished: bool,
    pub cancelled: bool,
}
