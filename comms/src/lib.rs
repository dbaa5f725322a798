mod deserialize;
pub mod msg;
mod receiver;
mod sender;
mod serialize;
pub mod snapshot;
pub mod specs;
pub mod tensor;

use tokio::io::{AsyncRead, AsyncWrite};

pub use deserialize::Deserialize;
pub use receiver::OnoReceiver;
pub use sender::OnoSender;
pub use serialize::Serialize;
pub use snapshot::Snapshot;
pub use tensor::{Tensor, TensorSet};

type LenType = u64;
const LEN_TYPE_SIZE: usize = size_of::<LenType>();

/// The default limit on the body length of a single frame, enforced by both ends.
pub const MAX_FRAME_LEN: usize = 1 << 30;

/// Creates both `OnoReceiver` and `OnoSender` network channel parts.
///
/// Given a writer and reader creates and returns both ends of the communication.
///
/// # Arguments
/// * `rx` - An async readable.
/// * `tx` - An async writable.
///
/// # Returns
/// A communication stream in the form of an ono receiver and sender.
pub fn channel<R, W>(rx: R, tx: W) -> (OnoReceiver<R>, OnoSender<W>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    (OnoReceiver::new(rx), OnoSender::new(tx))
}
