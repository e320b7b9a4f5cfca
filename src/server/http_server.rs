use may::coroutine::JoinHandle;
use may_minihttp::HttpService;
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const READY_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Starts an [`HttpService`] (normally [`AppService`](super::AppService)) on
/// may_minihttp's accept loop.
pub struct HttpServer<T>(pub T);

/// A running server: its bound address and the accept-loop coroutine.
pub struct ServerHandle {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl ServerHandle {
    /// Block until the listener accepts a TCP connection or `timeout` elapses.
    ///
    /// `serve` calls this with `http.ready_timeout_ms` before announcing the address.
    ///
    /// # Errors
    ///
    /// `TimedOut` when nothing is accepting on the address in time.
    pub fn wait_ready(&self, timeout: Duration) -> io::Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if TcpStream::connect(self.addr).is_ok() {
                debug!(addr = %self.addr, "Listener accepting connections");
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("server on {} not ready after {timeout:?}", self.addr),
                ));
            }
            thread::sleep(READY_POLL_INTERVAL);
        }
    }

    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Cancel the accept loop and wait for it to unwind.
    ///
    /// A cancelled coroutine finishes by unwinding, so an `Err` from the join is the
    /// expected outcome here and is only logged.
    pub fn stop(self) {
        let addr = self.addr;
        // SAFETY: the handle is owned and joined below; nothing observes the
        // coroutine after cancellation.
        unsafe {
            self.handle.coroutine().cancel();
        }
        match self.handle.join() {
            Ok(()) => info!(%addr, "Server stopped"),
            Err(_) => info!(%addr, "Server stopped (accept loop cancelled)"),
        }
    }

    /// Block until the accept loop exits.
    ///
    /// # Errors
    ///
    /// Returns the panic payload if the accept loop panicked.
    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}

impl<T: HttpService + Clone + Send + Sync + 'static> HttpServer<T> {
    /// Bind `addr` (first resolved address) and spawn the accept loop.
    ///
    /// # Errors
    ///
    /// Fails when `addr` resolves to nothing or the port cannot be bound.
    pub fn start<A: ToSocketAddrs>(self, addr: A) -> io::Result<ServerHandle> {
        let addr = addr.to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "address resolves to nothing")
        })?;
        let handle = may_minihttp::HttpServer(self.0).start(addr)?;
        debug!(%addr, "Accept loop spawned");
        Ok(ServerHandle { addr, handle })
    }
}
