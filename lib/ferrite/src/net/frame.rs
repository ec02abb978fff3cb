use crate::net::buffer::Buffer;
use crate::net::support::ErrorType;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Write;

/// Maximum payload bytes in a single frame.
pub const MAX_MSG: usize = 4096;
/// Maximum number of arguments in a request.
pub const MAX_ARGS: usize = 16;

const LEN_SIZE: usize = 4;

/// Response status codes.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Status {
    Ok = 0,
    Err = 1,
    Nx = 2,
}

/// Outcome of decoding the readable prefix of a connection buffer.
#[derive(Debug, Eq, PartialEq)]
pub enum Decode {
    /// Not enough bytes buffered for a full frame yet.
    Incomplete,
    /// The frame violates the protocol and the connection must be closed.
    Malformed(ErrorType),
    /// One complete request. `frame_len` covers the length prefix and the
    /// payload, i.e. the bytes to consume once the request is served.
    Request {
        argv: Vec<Vec<u8>>,
        frame_len: usize,
    },
}

/// Decode one request frame from the supplied bytes. Total over arbitrary
/// prefixes and never inspects bytes past the frame end; repeated calls on
/// the same incomplete prefix keep yielding `Incomplete`.
///
/// Layout: `[payload_len:u32][argc:u32]` followed by `argc` repetitions of
/// `[arg_len:u32][arg_bytes]`, all integers little-endian, `payload_len` not
/// counting its own four bytes.
pub fn decode_request(data: &[u8]) -> Decode {
    if data.len() < LEN_SIZE {
        return Decode::Incomplete;
    }

    let mut prefix = data;
    let payload_len = prefix
        .read_u32::<LittleEndian>()
        .expect("Length prefix must be readable") as usize;

    // An oversize length is rejected straight from the header, before the
    // rest of the frame arrives.
    if payload_len > MAX_MSG {
        return Decode::Malformed(ErrorType::PayloadTooLarge);
    }

    if data.len() < LEN_SIZE + payload_len {
        return Decode::Incomplete;
    }

    match parse_argv(&data[LEN_SIZE..LEN_SIZE + payload_len]) {
        Ok(argv) => Decode::Request {
            argv,
            frame_len: LEN_SIZE + payload_len,
        },
        Err(err_type) => Decode::Malformed(err_type),
    }
}

fn parse_argv(mut body: &[u8]) -> Result<Vec<Vec<u8>>, ErrorType> {
    if body.len() < LEN_SIZE {
        return Err(ErrorType::TruncatedFrame);
    }

    let argc = body
        .read_u32::<LittleEndian>()
        .expect("Argument count must be readable") as usize;

    if argc > MAX_ARGS {
        return Err(ErrorType::TooManyArgs);
    }

    let mut argv = Vec::with_capacity(argc);
    for _ in 0..argc {
        if body.len() < LEN_SIZE {
            return Err(ErrorType::TruncatedFrame);
        }

        let arg_len = body
            .read_u32::<LittleEndian>()
            .expect("Argument length must be readable") as usize;

        if body.len() < arg_len {
            return Err(ErrorType::TruncatedFrame);
        }

        argv.push(body[..arg_len].to_vec());
        body = &body[arg_len..];
    }

    if !body.is_empty() {
        return Err(ErrorType::TrailingBytes);
    }

    Ok(argv)
}

/// Append one response frame: `[total_len:u32][status:u32][body]`, where
/// `total_len` counts the status word and the body.
pub fn write_response(buffer: &mut Buffer, status: Status, body: &[u8]) {
    let total = LEN_SIZE + body.len();
    buffer.reserve(LEN_SIZE + total);

    let mut stream = buffer.write_slice();
    stream
        .write_u32::<LittleEndian>(total as u32)
        .expect("Error writing response length");
    stream
        .write_u32::<LittleEndian>(status as u32)
        .expect("Error writing response status");
    stream.write_all(body).expect("Error writing response body");

    buffer.move_tail(LEN_SIZE + total);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_request(args: &[&[u8]]) -> Vec<u8> {
        let mut payload = Vec::new();
        payload.write_u32::<LittleEndian>(args.len() as u32).unwrap();
        for arg in args {
            payload.write_u32::<LittleEndian>(arg.len() as u32).unwrap();
            payload.extend_from_slice(arg);
        }

        let mut frame = Vec::new();
        frame.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
        frame.extend_from_slice(&payload);
        frame
    }

    #[test]
    fn test_decode_request() {
        let frame = build_request(&[b"set", b"mykey", b"123"]);

        match decode_request(&frame) {
            Decode::Request { argv, frame_len } => {
                assert_eq!(argv, vec![b"set".to_vec(), b"mykey".to_vec(), b"123".to_vec()]);
                assert_eq!(frame_len, frame.len());
            }
            result => panic!("Unexpected result {:?}", result),
        }
    }

    #[test]
    fn test_decode_empty_argv() {
        let frame = build_request(&[]);

        match decode_request(&frame) {
            Decode::Request { argv, frame_len } => {
                assert!(argv.is_empty());
                assert_eq!(frame_len, frame.len());
            }
            result => panic!("Unexpected result {:?}", result),
        }
    }

    #[test]
    fn test_decode_incomplete_on_every_prefix() {
        let frame = build_request(&[b"get", b"mykey"]);

        for cut in 0..frame.len() {
            assert_eq!(decode_request(&frame[..cut]), Decode::Incomplete);
            // Idempotent: asking again yields the same answer.
            assert_eq!(decode_request(&frame[..cut]), Decode::Incomplete);
        }
    }

    #[test]
    fn test_decode_ignores_bytes_past_frame_end() {
        let mut data = build_request(&[b"get", b"mykey"]);
        let frame_size = data.len();
        data.extend_from_slice(&[0xAA; 32]);

        match decode_request(&data) {
            Decode::Request { argv, frame_len } => {
                assert_eq!(argv[0], b"get");
                assert_eq!(frame_len, frame_size);
            }
            result => panic!("Unexpected result {:?}", result),
        }
    }

    #[test]
    fn test_decode_oversize_payload_from_header_alone() {
        let mut frame = Vec::new();
        frame
            .write_u32::<LittleEndian>((MAX_MSG + 1) as u32)
            .unwrap();

        assert_eq!(
            decode_request(&frame),
            Decode::Malformed(ErrorType::PayloadTooLarge)
        );
    }

    #[test]
    fn test_decode_too_many_args() {
        let args: Vec<&[u8]> = (0..MAX_ARGS + 1).map(|_| &b"x"[..]).collect();
        let frame = build_request(&args);

        assert_eq!(
            decode_request(&frame),
            Decode::Malformed(ErrorType::TooManyArgs)
        );
    }

    #[test]
    fn test_decode_truncated_argument() {
        // argc = 1, arg_len = 100, but no argument bytes inside the payload.
        let mut payload = Vec::new();
        payload.write_u32::<LittleEndian>(1).unwrap();
        payload.write_u32::<LittleEndian>(100).unwrap();

        let mut frame = Vec::new();
        frame.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
        frame.extend_from_slice(&payload);

        assert_eq!(
            decode_request(&frame),
            Decode::Malformed(ErrorType::TruncatedFrame)
        );
    }

    #[test]
    fn test_decode_missing_argc() {
        // payload_len = 0 leaves no room for the argument count.
        let mut frame = Vec::new();
        frame.write_u32::<LittleEndian>(0).unwrap();

        assert_eq!(
            decode_request(&frame),
            Decode::Malformed(ErrorType::TruncatedFrame)
        );
    }

    #[test]
    fn test_decode_trailing_bytes_inside_frame() {
        let mut payload = Vec::new();
        payload.write_u32::<LittleEndian>(1).unwrap();
        payload.write_u32::<LittleEndian>(1).unwrap();
        payload.push(b'x');
        payload.push(0xFF);

        let mut frame = Vec::new();
        frame.write_u32::<LittleEndian>(payload.len() as u32).unwrap();
        frame.extend_from_slice(&payload);

        assert_eq!(
            decode_request(&frame),
            Decode::Malformed(ErrorType::TrailingBytes)
        );
    }

    #[test]
    fn test_write_response_layout() {
        let mut buffer = Buffer::new(64);

        write_response(&mut buffer, Status::Ok, b"123");

        let mut data = buffer.read_slice();
        assert_eq!(data.read_u32::<LittleEndian>().unwrap(), 7);
        assert_eq!(data.read_u32::<LittleEndian>().unwrap(), 0);
        assert_eq!(data, b"123");
    }

    #[test]
    fn test_write_response_without_body() {
        let mut buffer = Buffer::new(64);

        write_response(&mut buffer, Status::Nx, &[]);

        let mut data = buffer.read_slice();
        assert_eq!(data.read_u32::<LittleEndian>().unwrap(), 4);
        assert_eq!(data.read_u32::<LittleEndian>().unwrap(), 2);
        assert!(data.is_empty());
    }

    #[test]
    fn test_write_response_grows_small_buffer() {
        let mut buffer = Buffer::new(4);

        write_response(&mut buffer, Status::Err, b"Unknown command");

        assert_eq!(buffer.len(), 4 + 4 + 15);
    }
}
