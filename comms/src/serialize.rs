use std::io;

/// A value that can be written as the body of a frame.
pub trait Serialize<'a> {
    /// Serializes `self` into `buf`.
    ///
    /// # Arguments
    /// * `buf` - The buffer to write the head of the body into.
    ///
    /// # Returns
    /// A trailing slice of the body to be written as is after `buf`, to avoid
    /// copying large payloads, or an `io::Error` if `self` can't be serialized.
    fn serialize(&'a self, buf: &mut Vec<u8>) -> io::Result<Option<&'a [u8]>>;
}
