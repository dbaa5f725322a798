/// Writes a value into a frame buffer.
pub trait Serialize<'a> {
    /// Serializes `self` into `buf`.
    ///
    /// # Arguments
    /// * `buf` - The frame buffer, the serialized header and body get appended to it.
    ///
    /// # Returns
    /// An optional borrowed tail that gets written right after `buf` without being copied.
    fn serialize(&'a self, buf: &mut Vec<u8>) -> Option<&'a [u8]>;
}
