#![allow(dead_code)]

pub mod test_server {
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpListener, TcpStream};
    use std::sync::{Arc, Once};
    use std::time::Duration;

    use resttree::cli::Sample;
    use resttree::config::DispatchConfig;
    use resttree::dispatcher::Dispatcher;
    use resttree::middleware::{MetricsMiddleware, TracingMiddleware};
    use resttree::server::{AppService, HttpServer, ServerHandle};

    /// Ensures May coroutines are configured only once
    static MAY_INIT: Once = Once::new();

    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x8000);
        });
    }

    /// Server over a bundled sample tree on a free local port; stopped on drop.
    pub struct TestServer {
        handle: Option<ServerHandle>,
        addr: SocketAddr,
        pub metrics: Arc<MetricsMiddleware>,
        _tracing: tracing::subscriber::DefaultGuard,
    }

    impl TestServer {
        pub fn new(sample: Sample) -> Self {
            Self::with_config(sample, DispatchConfig::default())
        }

        pub fn with_config(sample: Sample, config: DispatchConfig) -> Self {
            setup_may_runtime();
            let subscriber = tracing_subscriber::fmt()
                .with_test_writer()
                .with_max_level(tracing::Level::DEBUG)
                .finish();
            let guard = tracing::subscriber::set_default(subscriber);

            let metrics = Arc::new(MetricsMiddleware::new());
            let mut dispatcher = Dispatcher::new(sample.build().unwrap()).with_config(config);
            dispatcher.add_middleware(Arc::new(TracingMiddleware));
            dispatcher.add_middleware(metrics.clone());
            let mut service = AppService::new(Arc::new(dispatcher));
            service.set_metrics_middleware(Arc::clone(&metrics));

            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = listener.local_addr().unwrap();
            drop(listener);
            let handle = HttpServer(service).start(addr).unwrap();
            handle.wait_ready(Duration::from_secs(1)).unwrap();

            Self {
                handle: Some(handle),
                addr,
                metrics,
                _tracing: guard,
            }
        }

        pub fn addr(&self) -> SocketAddr {
            self.addr
        }

        /// Send `method target` with an optional body and parse the reply.
        pub fn request(&self, method: &str, target: &str, body: Option<(&str, &str)>) -> Reply {
            let raw = match body {
                Some((content_type, body)) => format!(
                    "{method} {target} HTTP/1.1\r\nHost: localhost\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\n\r\n{body}",
                    body.len()
                ),
                None => format!("{method} {target} HTTP/1.1\r\nHost: localhost\r\n\r\n"),
            };
            parse_response(&send_request(&self.addr, &raw))
        }
    }

    impl Drop for TestServer {
        fn drop(&mut self) {
            if let Some(handle) = self.handle.take() {
                handle.stop();
            }
        }
    }

    pub fn send_request(addr: &SocketAddr, req: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(req.as_bytes()).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_millis(200)))
            .unwrap();
        let mut buf = Vec::new();
        loop {
            let mut tmp = [0u8; 1024];
            match stream.read(&mut tmp) {
                Ok(0) => break,
                Ok(n) => {
                    buf.extend_from_slice(&tmp[..n]);
                    if response_complete(&buf) {
                        break;
                    }
                }
                Err(ref e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    break
                }
                Err(e) => panic!("read error: {e:?}"),
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    /// Whether `buf` holds the full head plus `Content-Length` bytes of body.
    fn response_complete(buf: &[u8]) -> bool {
        let text = String::from_utf8_lossy(buf);
        let Some((head, body)) = text.split_once("\r\n\r\n") else {
            return false;
        };
        head.lines()
            .filter_map(|l| l.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.trim().parse::<usize>().ok())
            .is_some_and(|len| body.len() >= len)
    }

    #[derive(Debug)]
    pub struct Reply {
        pub status: u16,
        pub headers: Vec<(String, String)>,
        pub body: String,
    }

    impl Reply {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }

        pub fn json(&self) -> serde_json::Value {
            serde_json::from_str(&self.body).unwrap_or_default()
        }
    }

    pub fn parse_response(resp: &str) -> Reply {
        let (head, body) = resp.split_once("\r\n\r\n").unwrap_or((resp, ""));
        let mut status = 0;
        let mut headers = Vec::new();
        for line in head.lines() {
            if line.starts_with("HTTP/1.1") {
                status = line
                    .split_whitespace()
                    .nth(1)
                    .unwrap_or("0")
                    .parse()
                    .unwrap();
            } else if let Some((name, val)) = line.split_once(':') {
                headers.push((name.trim().to_string(), val.trim().to_string()));
            }
        }
        Reply {
            status,
            headers,
            body: body.to_string(),
        }
    }
}
