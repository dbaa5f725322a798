use std::io;

use crate::TensorSet;

/// Everything a fresh invocation needs to continue training where the previous one stopped:
/// the model parameters and the optimizer's momentum buffers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub params: TensorSet,
    pub velocity: TensorSet,
}

impl Snapshot {
    /// Encodes the snapshot as the parameter set followed by the velocity set, hex-encoded.
    pub fn to_hex(&self) -> String {
        let mut buf = Vec::new();
        self.params.encode(&mut buf);
        self.velocity.encode(&mut buf);
        hex::encode(buf)
    }

    /// Decodes a snapshot produced by `to_hex`.
    ///
    /// # Returns
    /// The snapshot or an `InvalidData` error if the string is malformed or the two sets
    /// disagree in layout.
    pub fn from_hex(s: &str) -> io::Result<Self> {
        let buf = hex::decode(s).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let (params, rest) = TensorSet::decode_prefix(&buf)?;
        let velocity = TensorSet::decode(rest)?;

        if !params.same_layout(&velocity) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "snapshot parameters and velocity differ in layout",
            ));
        }

        Ok(Self { params, velocity })
    }
}
