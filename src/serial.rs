//! The narrow slice of serial port behavior [`Channel`](crate::channel::Channel)
//! and [`ReaderTask`](crate::reader::ReaderTask) depend on, abstracted behind
//! a trait so tests can run against an in-memory transport instead of a real
//! TTY.

use std::io::{self, Read, Write};
use std::time::Duration;

/// Everything the driver needs from a serial port: byte-oriented I/O plus a
/// read timeout, matching [`serialport::SerialPort`].
pub trait SerialTransport: Send {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()>;
}

impl<T: serialport::SerialPort + ?Sized> SerialTransport for T {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        Write::write_all(self, buf)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Read::read(self, buf)
    }

    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        serialport::SerialPort::set_timeout(self, timeout)
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::VecDeque;

    /// An in-memory stand-in for a serial port.
    ///
    /// `inbound` holds bytes queued up as if received from the device;
    /// `outbound` accumulates everything the driver writes, for assertions.
    pub struct MockTransport {
        pub inbound: VecDeque<u8>,
        pub outbound: Vec<u8>,
        pub timeout: Duration,
        pub fail_writes: bool,
    }

    impl MockTransport {
        pub fn new() -> Self {
            MockTransport {
                inbound: VecDeque::new(),
                outbound: Vec::new(),
                timeout: Duration::from_millis(100),
                fail_writes: false,
            }
        }

        pub fn queue_inbound(&mut self, bytes: &[u8]) {
            self.inbound.extend(bytes.iter().copied());
        }
    }

    impl Default for MockTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    /// A cloneable handle to a [`MockTransport`], for tests that need to
    /// inspect what was written after handing a transport off to a
    /// `Box<dyn SerialTransport>`.
    #[derive(Clone)]
    pub struct SharedMock(std::sync::Arc<std::sync::Mutex<MockTransport>>);

    impl SharedMock {
        pub fn new() -> Self {
            SharedMock(std::sync::Arc::new(std::sync::Mutex::new(MockTransport::new())))
        }

        pub fn queue_inbound(&self, bytes: &[u8]) {
            self.0.lock().unwrap().queue_inbound(bytes);
        }

        pub fn outbound(&self) -> Vec<u8> {
            self.0.lock().unwrap().outbound.clone()
        }

        pub fn set_fail_writes(&self, fail: bool) {
            self.0.lock().unwrap().fail_writes = fail;
        }
    }

    impl SerialTransport for SharedMock {
        fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
            self.0.lock().unwrap().write_all(buf)
        }

        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.0.lock().unwrap().read(buf)
        }

        fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
            self.0.lock().unwrap().set_timeout(timeout)
        }
    }

    impl SerialTransport for MockTransport {
        fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
            if self.fail_writes {
                return Err(io::Error::new(io::ErrorKind::Other, "simulated port failure"));
            }
            self.outbound.extend_from_slice(buf);
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.inbound.is_empty() {
                return Err(io::Error::new(io::ErrorKind::TimedOut, "no data queued"));
            }
            let mut n = 0;
            while n < buf.len() {
                match self.inbound.pop_front() {
                    Some(byte) => {
                        buf[n] = byte;
                        n += 1;
                    }
                    None => break,
                }
            }
            Ok(n)
        }

        fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
            self.timeout = timeout;
            Ok(())
        }
    }

    #[test]
    fn write_all_appends_to_outbound() {
        let mut transport = MockTransport::new();
        transport.write_all(b"O\r").unwrap();
        assert_eq!(transport.outbound, b"O\r");
    }

    #[test]
    fn read_drains_queued_inbound_bytes() {
        let mut transport = MockTransport::new();
        transport.queue_inbound(b"\r");
        let mut buf = [0u8; 4];
        let n = transport.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"\r");
    }

    #[test]
    fn read_times_out_on_empty_inbound() {
        let mut transport = MockTransport::new();
        let mut buf = [0u8; 4];
        let err = transport.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }
}
