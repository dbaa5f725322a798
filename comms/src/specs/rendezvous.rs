use serde::{Deserialize, Serialize};

/// The body of a `POST /sync` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRequest {
    /// The hex encoded gradient set of the caller.
    pub grads: String,
}

/// The body of a successful `POST /sync` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncResponse {
    /// The hex encoded cross-worker mean of the round.
    #[serde(rename = "new-grads")]
    pub new_grads: String,
}

/// A read only view of the rendezvous round state, returned by `GET /status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundStatus {
    /// The current round generation, starts at zero and grows by one on every reset.
    pub round: u64,
    /// The amount of contributions every round waits for.
    pub workers: usize,
    /// Contributions received in the current round.
    pub received: usize,
    /// Acknowledgements of the published mean in the current round.
    pub sent: usize,
    /// Whether a partial sum is being accumulated.
    pub collecting: bool,
    /// Whether the mean of the current round is published.
    pub published: bool,
}
