use std::io;

/// Reads a value back from a received frame.
pub trait Deserialize<'a>: Sized {
    /// Deserializes a value from `buf`, the result may borrow from it.
    fn deserialize(buf: &'a [u8]) -> io::Result<Self>;
}
