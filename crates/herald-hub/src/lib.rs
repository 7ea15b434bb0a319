//! Single-value publish/subscribe core: the shared current message, the
//! subscriber registry with non-blocking fan-out, and the per-subscriber
//! streaming loop that transport adapters drive.

pub mod broadcaster;
pub mod hub;
pub mod state;
pub mod stream;

pub use broadcaster::{Broadcaster, SubscriberId, Subscription};
pub use hub::MessageHub;
pub use state::SharedState;
pub use stream::StreamEvent;
