//! Kind headers of the bodies of `Msg` frames.

pub type HeaderType = u32;
pub const HEADER_SIZE: usize = size_of::<HeaderType>();
pub type Header = [u8; HEADER_SIZE];

const ERR_H: HeaderType = 0;
const CONTROL_H: HeaderType = 1;
const PARTIAL_H: HeaderType = 2;

pub const ERR: Header = ERR_H.to_be_bytes();
pub const CONTROL: Header = CONTROL_H.to_be_bytes();
pub const PARTIAL: Header = PARTIAL_H.to_be_bytes();
