//! Fuzz-style property tests for the wire codec.
//!
//! These validate that decoders handle arbitrary network input gracefully
//! without crashing.

use gatesim_proto::{Frame, PacketReader, PacketWriter};
use proptest::prelude::*;

proptest! {
    /// Property: arbitrary bytes don't crash the frame decoder.
    #[test]
    fn arbitrary_bytes_dont_crash_frame_decode(
        random_bytes in prop::collection::vec(any::<u8>(), 0..2000),
    ) {
        let _result = Frame::decode(&random_bytes);
        // No panic = success
    }

    /// Property: arbitrary bytes don't crash the field readers.
    #[test]
    fn arbitrary_bytes_dont_crash_reader(
        random_bytes in prop::collection::vec(any::<u8>(), 0..2000),
    ) {
        let mut r = PacketReader::new(&random_bytes);
        let _ = r.read_bool();
        let _ = r.read_u64();
        let _ = r.read_var_str();
        let _ = r.read_f32();
        let _ = r.read_args();
        let _ = r.read_data();
    }

    /// Property: var-strings roundtrip for any content.
    #[test]
    fn var_str_roundtrips(s in "\\PC{0,200}") {
        let mut w = PacketWriter::new();
        w.write_var_str(&s);
        let buf = w.into_inner();
        let mut r = PacketReader::new(&buf);
        prop_assert_eq!(r.read_var_str().unwrap(), s);
    }

    /// Property: frames roundtrip for any type code and payload.
    #[test]
    fn frame_roundtrips(
        msg_type in any::<u16>(),
        payload in prop::collection::vec(any::<u8>(), 0..500),
    ) {
        let frame = Frame { msg_type, payload };
        let decoded = Frame::decode(&frame.encode()).unwrap();
        prop_assert_eq!(decoded, frame);
    }
}
