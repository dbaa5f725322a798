//! Tensors, tensor sets and the binary codec shared by gradients and snapshots.
//!
//! A tensor set is encoded as a little endian `u32` entry count followed by every entry. Each
//! entry starts with a tag byte, `0` for an absent entry and `1` for a present one. Present
//! entries continue with a `u32` rank, `rank` `u64` dimensions and the `f32` data in row major
//! order.

use std::io;

type Count = u32;
type Dim = u64;

const ABSENT: u8 = 0;
const PRESENT: u8 = 1;
const MAX_RANK: usize = 8;

fn invalid_data<T>(msg: impl Into<String>) -> io::Result<T> {
    Err(io::Error::new(io::ErrorKind::InvalidData, msg.into()))
}

/// A dense row major `f32` tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl Tensor {
    /// Creates a new `Tensor`.
    ///
    /// # Arguments
    /// * `shape` - The dimensions of the tensor.
    /// * `data` - The row major values, must hold exactly the product of `shape` elements.
    ///
    /// # Returns
    /// The tensor or an `InvalidInput` error if `data` does not fit `shape`.
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> io::Result<Self> {
        let numel = shape.iter().product::<usize>();

        if numel != data.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("shape {shape:?} holds {numel} values but got {}", data.len()),
            ));
        }

        Ok(Self { shape, data })
    }

    /// Creates a tensor of the given shape filled with zeros.
    pub fn zeros(shape: Vec<usize>) -> Self {
        let numel = shape.iter().product();
        Self {
            shape,
            data: vec![0.0; numel],
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_parts(self) -> (Vec<usize>, Vec<f32>) {
        (self.shape, self.data)
    }
}

/// An ordered sequence of tensors or absent markers, positionally aligned to a model's
/// parameter order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TensorSet(Vec<Option<Tensor>>);

impl TensorSet {
    pub fn new(entries: Vec<Option<Tensor>>) -> Self {
        Self(entries)
    }

    pub fn entries(&self) -> &[Option<Tensor>] {
        &self.0
    }

    pub fn entries_mut(&mut self) -> &mut [Option<Tensor>] {
        &mut self.0
    }

    pub fn into_entries(self) -> Vec<Option<Tensor>> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Checks whether `self` and `other` have the same entry count, the same absent
    /// positions and the same shape on every present entry.
    pub fn same_layout(&self, other: &TensorSet) -> bool {
        self.0.len() == other.0.len()
            && self.0.iter().zip(&other.0).all(|pair| match pair {
                (None, None) => true,
                (Some(a), Some(b)) => a.shape == b.shape,
                _ => false,
            })
    }

    /// Appends the binary encoding of this set to `buf`.
    pub fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&(self.0.len() as Count).to_le_bytes());

        for entry in &self.0 {
            let Some(tensor) = entry else {
                buf.push(ABSENT);
                continue;
            };

            buf.push(PRESENT);
            buf.extend_from_slice(&(tensor.shape.len() as Count).to_le_bytes());
            for &dim in &tensor.shape {
                buf.extend_from_slice(&(dim as Dim).to_le_bytes());
            }

            if cfg!(target_endian = "little") {
                buf.extend_from_slice(bytemuck::cast_slice(&tensor.data));
            } else {
                buf.extend(tensor.data.iter().flat_map(|x| x.to_le_bytes()));
            }
        }
    }

    /// Decodes a set from the front of `buf`.
    ///
    /// # Arguments
    /// * `buf` - The encoded bytes, may hold more data after the set.
    ///
    /// # Returns
    /// The decoded set and the unread tail of `buf`, or an `InvalidData` error.
    pub fn decode_prefix(buf: &[u8]) -> io::Result<(Self, &[u8])> {
        let mut cursor = Cursor(buf);
        let count = cursor.read_u32()? as usize;

        // Every entry takes at least its tag byte.
        if count > cursor.0.len() {
            return invalid_data(format!(
                "tensor set declares {count} entries but only {} bytes follow",
                cursor.0.len()
            ));
        }

        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let entry = match cursor.read_u8()? {
                ABSENT => None,
                PRESENT => Some(cursor.read_tensor()?),
                tag => return invalid_data(format!("invalid tensor tag byte {tag}")),
            };

            entries.push(entry);
        }

        Ok((Self(entries), cursor.0))
    }

    /// Decodes a set that spans the whole of `buf`.
    pub fn decode(buf: &[u8]) -> io::Result<Self> {
        let (set, rest) = Self::decode_prefix(buf)?;

        if !rest.is_empty() {
            return invalid_data(format!("{} trailing bytes after tensor set", rest.len()));
        }

        Ok(set)
    }

    /// Encodes this set and hex-encodes the result.
    pub fn to_hex(&self) -> String {
        let mut buf = Vec::new();
        self.encode(&mut buf);
        hex::encode(buf)
    }

    /// Decodes a set from its hex encoding.
    pub fn from_hex(s: &str) -> io::Result<Self> {
        let buf = hex::decode(s).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Self::decode(&buf)
    }
}

struct Cursor<'a>(&'a [u8]);

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> io::Result<&'a [u8]> {
        if self.0.len() < n {
            return invalid_data(format!(
                "unexpected end of tensor data, wanted {n} bytes but {} remain",
                self.0.len()
            ));
        }

        let (head, tail) = self.0.split_at(n);
        self.0 = tail;
        Ok(head)
    }

    fn read_u8(&mut self) -> io::Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> io::Result<u32> {
        let mut bytes = [0; size_of::<Count>()];
        bytes.copy_from_slice(self.take(size_of::<Count>())?);
        Ok(Count::from_le_bytes(bytes))
    }

    fn read_u64(&mut self) -> io::Result<u64> {
        let mut bytes = [0; size_of::<Dim>()];
        bytes.copy_from_slice(self.take(size_of::<Dim>())?);
        Ok(Dim::from_le_bytes(bytes))
    }

    fn read_tensor(&mut self) -> io::Result<Tensor> {
        let rank = self.read_u32()? as usize;
        if rank > MAX_RANK {
            return invalid_data(format!("tensor rank {rank} exceeds {MAX_RANK}"));
        }

        let mut shape = Vec::with_capacity(rank);
        let mut numel = 1usize;
        for _ in 0..rank {
            let dim = usize::try_from(self.read_u64()?)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

            numel = match numel.checked_mul(dim) {
                Some(n) => n,
                None => return invalid_data("tensor element count overflows"),
            };

            shape.push(dim);
        }

        let Some(nbytes) = numel.checked_mul(size_of::<f32>()) else {
            return invalid_data("tensor byte length overflows");
        };

        let mut data: Vec<f32> = bytemuck::pod_collect_to_vec(self.take(nbytes)?);
        if cfg!(target_endian = "big") {
            for x in &mut data {
                *x = f32::from_bits(u32::from_le(x.to_bits()));
            }
        }

        Ok(Tensor { shape, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TensorSet {
        TensorSet::new(vec![
            Some(Tensor::new(vec![2, 3], vec![1.0, -2.0, 3.5, 0.0, 1e-3, 7.0]).unwrap()),
            None,
            Some(Tensor::new(vec![3], vec![0.25, 0.5, 0.75]).unwrap()),
        ])
    }

    #[test]
    fn hex_codec_preserves_absent_entries_and_shapes() {
        let set = sample();
        let decoded = TensorSet::from_hex(&set.to_hex()).unwrap();

        assert_eq!(decoded, set);
        assert!(decoded.entries()[1].is_none());
    }

    #[test]
    fn empty_set_encodes_to_a_bare_count() {
        let mut buf = Vec::new();
        TensorSet::default().encode(&mut buf);

        assert_eq!(buf, [0, 0, 0, 0]);
        assert!(TensorSet::decode(&buf).unwrap().is_empty());
    }

    #[test]
    fn decodes_little_endian_counts_and_dims() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&2u32.to_le_bytes());
        buf.push(ABSENT);
        buf.push(PRESENT);
        buf.extend_from_slice(&2u32.to_le_bytes());
        buf.extend_from_slice(&1u64.to_le_bytes());
        buf.extend_from_slice(&2u64.to_le_bytes());
        buf.extend_from_slice(&1.5f32.to_le_bytes());
        buf.extend_from_slice(&(-4.0f32).to_le_bytes());

        let set = TensorSet::decode(&buf).unwrap();

        assert_eq!(set.len(), 2);
        assert!(set.entries()[0].is_none());
        let tensor = set.entries()[1].as_ref().unwrap();
        assert_eq!(tensor.shape(), [1, 2]);
        assert_eq!(tensor.data(), [1.5, -4.0]);
    }

    #[test]
    fn truncated_input_is_invalid_data() {
        let mut buf = Vec::new();
        sample().encode(&mut buf);
        buf.truncate(buf.len() - 1);

        let err = TensorSet::decode(&buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn bad_tag_and_trailing_bytes_are_rejected() {
        let bad_tag = [1, 0, 0, 0, 9];
        assert!(TensorSet::decode(&bad_tag).is_err());

        let mut trailing = Vec::new();
        sample().encode(&mut trailing);
        trailing.push(0);
        assert!(TensorSet::decode(&trailing).is_err());
    }

    #[test]
    fn invalid_hex_is_rejected() {
        let err = TensorSet::from_hex("zz").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn layout_comparison() {
        let a = sample();
        let mut b = sample();
        assert!(a.same_layout(&b));

        b.entries_mut()[1] = Some(Tensor::zeros(vec![1]));
        assert!(!a.same_layout(&b));

        let c = TensorSet::new(vec![Some(Tensor::zeros(vec![3, 2])), None, Some(Tensor::zeros(vec![3]))]);
        assert!(!a.same_layout(&c));
    }

    #[test]
    fn tensor_rejects_mismatched_data() {
        assert!(Tensor::new(vec![2, 2], vec![1.0; 3]).is_err());
    }
}
