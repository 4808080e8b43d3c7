//! Buffered output to an OS file descriptor.

use std::{
    fmt, io,
    ops::Shl,
    sync::{Mutex, MutexGuard, PoisonError},
};

use tracing::warn;

use crate::{
    format::{Emit, Sink},
    ring_buffer::{HeapSlots, RingBuffer, Slots},
    trace_verbose, Error, Result,
};

/// Line terminator for the host platform.
#[cfg(windows)]
pub const ENDL: &str = "\r\n";
#[cfg(not(windows))]
pub const ENDL: &str = "\n";

/// Where an [`Ostream`] sends its bytes.
pub trait Descriptor {
    /// Writes every byte, retrying short and interrupted writes.
    fn write_all(&self, bytes: &[u8]) -> io::Result<()>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stdout;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stderr;

/// A descriptor number chosen at runtime. The stream does not own it and
/// never closes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawDescriptor(pub i32);

#[cfg(unix)]
fn write_fd(fd: i32, mut bytes: &[u8]) -> io::Result<()> {
    while !bytes.is_empty() {
        // SAFETY: the pointer and length describe a live, readable slice.
        let n = unsafe { libc::write(fd, bytes.as_ptr() as *const libc::c_void, bytes.len()) };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        if n == 0 {
            return Err(io::ErrorKind::WriteZero.into());
        }
        bytes = &bytes[n as usize..];
    }
    Ok(())
}

#[cfg(unix)]
impl Descriptor for Stdout {
    fn write_all(&self, bytes: &[u8]) -> io::Result<()> {
        write_fd(libc::STDOUT_FILENO, bytes)
    }
}

#[cfg(unix)]
impl Descriptor for Stderr {
    fn write_all(&self, bytes: &[u8]) -> io::Result<()> {
        write_fd(libc::STDERR_FILENO, bytes)
    }
}

#[cfg(unix)]
impl Descriptor for RawDescriptor {
    fn write_all(&self, bytes: &[u8]) -> io::Result<()> {
        write_fd(self.0, bytes)
    }
}

#[cfg(not(unix))]
impl Descriptor for Stdout {
    fn write_all(&self, bytes: &[u8]) -> io::Result<()> {
        use io::Write;
        let mut out = io::stdout().lock();
        out.write_all(bytes)?;
        out.flush()
    }
}

#[cfg(not(unix))]
impl Descriptor for Stderr {
    fn write_all(&self, bytes: &[u8]) -> io::Result<()> {
        use io::Write;
        io::stderr().lock().write_all(bytes)
    }
}

#[cfg(not(unix))]
impl Descriptor for RawDescriptor {
    fn write_all(&self, _bytes: &[u8]) -> io::Result<()> {
        Err(io::ErrorKind::Unsupported.into())
    }
}

/// Collects output in a `CAP`-byte ring buffer and hands it to the
/// descriptor whenever the buffer fills, on [`flush`](Ostream::flush), and
/// when the stream is dropped.
///
/// Inputs longer than the buffer go out in `CAP`-sized chunks. Values are
/// written with [`put`](Ostream::put), with `<<`, or through
/// [`fmt::Write`]:
///
/// ```no_run
/// # use pmr_kit::ostream::{Ostream, ENDL};
/// let mut out: Ostream<1024> = Ostream::new().unwrap();
/// let _ = &mut out << "answer: " << 42 << ENDL;
/// assert!(out.take_error().is_none());
/// ```
///
/// `<<` cannot return an error, so the first failure is kept until
/// [`take_error`](Ostream::take_error) and later insertions still run.
pub struct Ostream<const CAP: usize, D: Descriptor = Stdout, S: Slots<u8, CAP> = HeapSlots<u8, CAP>> {
    buffer: RingBuffer<u8, CAP, S>,
    descriptor: D,
    error: Option<Error>,
}

impl<const CAP: usize, D: Descriptor, S: Slots<u8, CAP>> Ostream<CAP, D, S> {
    const NON_EMPTY: () = assert!(CAP > 0, "ostream buffer must hold at least one byte");

    pub fn new() -> Result<Self>
    where
        D: Default,
    {
        Self::with_descriptor(D::default())
    }

    pub fn with_descriptor(descriptor: D) -> Result<Self> {
        #[allow(clippy::let_unit_value)]
        let () = Self::NON_EMPTY;
        Ok(Self {
            buffer: RingBuffer::new()?,
            descriptor,
            error: None,
        })
    }

    pub fn descriptor(&self) -> &D {
        &self.descriptor
    }

    /// Bytes written but not yet flushed.
    pub fn pending(&self) -> &[u8] {
        self.buffer.as_slice()
    }

    /// Sends the pending bytes to the descriptor. The buffer is emptied even
    /// when the write fails.
    pub fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        trace_verbose!(bytes = self.buffer.pos(), "flushing ostream");
        let written = self.descriptor.write_all(self.buffer.as_slice());
        self.buffer.flush();
        written.map_err(Error::from)
    }

    pub fn write_bytes(&mut self, mut bytes: &[u8]) -> Result<()> {
        while !bytes.is_empty() {
            let n = bytes.len().min(self.buffer.remaining());
            let (chunk, rest) = bytes.split_at(n);
            self.buffer.write_contiguous(chunk)?;
            if self.buffer.is_full() {
                self.flush()?;
            }
            bytes = rest;
        }
        Ok(())
    }

    pub fn put<T: Emit + ?Sized>(&mut self, value: &T) -> Result<&mut Self> {
        value.emit(self)?;
        Ok(self)
    }

    /// The first error hit by `<<` since the last call.
    pub fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }
}

impl<const CAP: usize, D: Descriptor, S: Slots<u8, CAP>> Sink for Ostream<CAP, D, S> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        Ostream::write_bytes(self, bytes)
    }
}

impl<'a, T: Emit, const CAP: usize, D: Descriptor, S: Slots<u8, CAP>> Shl<T> for &'a mut Ostream<CAP, D, S> {
    type Output = &'a mut Ostream<CAP, D, S>;

    fn shl(self, value: T) -> Self::Output {
        if let Err(e) = value.emit(&mut *self) {
            warn!(%e, "ostream insertion failed");
            self.error.get_or_insert(e);
        }
        self
    }
}

impl<const CAP: usize, D: Descriptor, S: Slots<u8, CAP>> fmt::Write for Ostream<CAP, D, S> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_bytes(s.as_bytes()).map_err(|_| fmt::Error)
    }
}

impl<const CAP: usize, D: Descriptor, S: Slots<u8, CAP>> Drop for Ostream<CAP, D, S> {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(%e, "failed to flush ostream on drop");
        }
    }
}

impl<const CAP: usize, D: Descriptor + fmt::Debug, S: Slots<u8, CAP>> fmt::Debug for Ostream<CAP, D, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ostream")
            .field("descriptor", &self.descriptor)
            .field("pending", &self.pending().len())
            .field("capacity", &CAP)
            .finish()
    }
}

/// An [`Ostream`] shared between threads. Every insertion is serialized;
/// hold [`lock`](ConcurrentOstream::lock) to keep several insertions together.
pub struct ConcurrentOstream<const CAP: usize, D: Descriptor = Stdout, S: Slots<u8, CAP> = HeapSlots<u8, CAP>> {
    inner: Mutex<Ostream<CAP, D, S>>,
}

impl<const CAP: usize, D: Descriptor, S: Slots<u8, CAP>> ConcurrentOstream<CAP, D, S> {
    pub fn new() -> Result<Self>
    where
        D: Default,
    {
        Ok(Self::from(Ostream::new()?))
    }

    pub fn with_descriptor(descriptor: D) -> Result<Self> {
        Ok(Self::from(Ostream::with_descriptor(descriptor)?))
    }

    pub fn lock(&self) -> MutexGuard<'_, Ostream<CAP, D, S>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn put<T: Emit + ?Sized>(&self, value: &T) -> Result<()> {
        self.lock().put(value).map(|_| ())
    }

    pub fn flush(&self) -> Result<()> {
        self.lock().flush()
    }
}

impl<const CAP: usize, D: Descriptor, S: Slots<u8, CAP>> From<Ostream<CAP, D, S>> for ConcurrentOstream<CAP, D, S> {
    fn from(stream: Ostream<CAP, D, S>) -> Self {
        Self {
            inner: Mutex::new(stream),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::fmt::Write as _;

    use super::*;
    use crate::{ring_buffer::InlineSlots, OwnedString};
    use assert2::{assert, let_assert};

    struct Pipe {
        read: i32,
        write: i32,
    }

    impl Pipe {
        fn new() -> Self {
            let mut fds = [0; 2];
            assert!(unsafe { libc::pipe(fds.as_mut_ptr()) } == 0);
            Self {
                read: fds[0],
                write: fds[1],
            }
        }

        fn descriptor(&self) -> RawDescriptor {
            RawDescriptor(self.write)
        }

        /// Closes the write end and collects everything written to the pipe.
        fn read_all(self) -> Vec<u8> {
            unsafe { libc::close(self.write) };
            let mut out = Vec::new();
            let mut buf = [0u8; 512];
            loop {
                let n = unsafe { libc::read(self.read, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
                assert!(n >= 0);
                if n == 0 {
                    break;
                }
                out.extend_from_slice(&buf[..n as usize]);
            }
            unsafe { libc::close(self.read) };
            out
        }
    }

    #[test]
    fn drop_flushes_pending_bytes() {
        let pipe = Pipe::new();
        {
            let mut out: Ostream<1024, _> = Ostream::with_descriptor(pipe.descriptor()).unwrap();
            out.write_bytes(b"0123456789").unwrap();
            assert!(out.pending() == b"0123456789");
        }
        assert!(pipe.read_all() == b"0123456789");
    }

    #[test]
    fn long_input_is_chunked() {
        let pipe = Pipe::new();
        let data: Vec<u8> = (0..3000u32).map(|i| b'a' + (i % 26) as u8).collect();
        {
            let mut out: Ostream<1024, _> = Ostream::with_descriptor(pipe.descriptor()).unwrap();
            out.write_bytes(&data).unwrap();
            assert!(out.pending().len() == 3000 - 2 * 1024);
        }
        assert!(pipe.read_all() == data);
    }

    #[test]
    fn insertion_operators_format_values() {
        let pipe = Pipe::new();
        {
            let mut out: Ostream<16, _, InlineSlots<u8, 16>> = Ostream::with_descriptor(pipe.descriptor()).unwrap();
            let name: OwnedString = OwnedString::from("pi");
            let _ = &mut out << &name << '=' << 3.14159 << ' ' << -12 << ' ' << true << ENDL;
            out.put("done").unwrap().put(&b'!').unwrap();
            write!(out, " {}", 7).unwrap();
            assert!(out.take_error().is_none());
        }
        let expected = format!("pi=3.14 -12 true{ENDL}done! 7");
        assert!(pipe.read_all() == expected.as_bytes());
    }

    #[test]
    fn explicit_flush_empties_buffer() {
        let pipe = Pipe::new();
        let mut out: Ostream<64, _> = Ostream::with_descriptor(pipe.descriptor()).unwrap();
        out.write_bytes(b"abc").unwrap();
        out.flush().unwrap();
        assert!(out.pending().is_empty());
        out.flush().unwrap();
        drop(out);
        assert!(pipe.read_all() == b"abc");
    }

    #[test]
    fn write_errors_surface() {
        let mut out: Ostream<8, _> = Ostream::with_descriptor(RawDescriptor(-1)).unwrap();
        out.write_bytes(b"1234").unwrap();
        let_assert!(Err(Error::Io(_)) = out.flush());
        assert!(out.pending().is_empty());

        let _ = &mut out << "12345678";
        let_assert!(Some(Error::Io(_)) = out.take_error());
        assert!(out.take_error().is_none());
    }

    #[test]
    fn concurrent_ostream_serializes_insertions() {
        let pipe = Pipe::new();
        {
            let out: ConcurrentOstream<32, _> = ConcurrentOstream::with_descriptor(pipe.descriptor()).unwrap();
            std::thread::scope(|s| {
                for _ in 0..4 {
                    s.spawn(|| {
                        for _ in 0..50 {
                            out.put("ab").unwrap();
                        }
                    });
                }
            });
            let mut guard = out.lock();
            guard.put("|").unwrap().put("end").unwrap();
        }
        let bytes = pipe.read_all();
        assert!(bytes.len() == 4 * 50 * 2 + 4);
        assert!(bytes.ends_with(b"|end"));
        assert!(bytes[..400].chunks(2).all(|c| c == b"ab"));
    }
}
