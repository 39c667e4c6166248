/// Frame integrity checks
use bitflags::bitflags;

bitflags! {
    /// These flags determine which checks [`DecodedFrame::check`](crate::DecodedFrame::check)
    /// performs on a received frame. Decoding alone performs none of them.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct FrameChecks: u8 {
        /// Bit 1 requires that the checksum trailer matches the frame contents
        const CHECKSUM = 0b00000001;
        /// Bit 2 requires that the frame is exactly as long as its length field says
        const LENGTH = 0b00000010;
        /// Bit 3 requires the start and end markers to be in place
        const MARKERS = 0b00000100;
    }
}
