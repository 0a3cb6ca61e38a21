//! Knock sequence application service.

use std::io::{self, Write};
use std::net::{Ipv4Addr, SocketAddrV4};

use parking_lot::Mutex;
use tokio::time::sleep;
use tracing::debug;

use crate::config::KnockSettings;
use crate::domain::{KnockStep, Sequence};
use crate::error::Result;
use crate::ports::{HostResolver, KnockTransport};

/// Outcome of a sequence that ran to the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnockReport {
    /// Host that was knocked.
    pub host: String,
    /// Packets put on the wire.
    pub sent: usize,
    /// Address the last knock went to, if any were sent.
    pub last_address: Option<Ipv4Addr>,
}

/// Line written for each knock in verbose mode.
pub fn progress_line(step: KnockStep, address: Ipv4Addr) -> String {
    format!("hitting {} {}:{}", step.protocol, address, step.port)
}

/// Replays a knock sequence against one host.
///
/// Steps run strictly in order. The first failing step aborts the rest of
/// the sequence; knocks already sent are not undone. The resolver and
/// transport are injected so tests can observe every packet.
pub struct KnockEngine<R: HostResolver, T: KnockTransport> {
    resolver: R,
    transport: T,
    settings: KnockSettings,
    progress: Mutex<Box<dyn Write + Send>>,
}

impl<R: HostResolver, T: KnockTransport> KnockEngine<R, T> {
    /// Create an engine with the given resolver, transport and settings.
    pub fn new(resolver: R, transport: T, settings: KnockSettings) -> Self {
        Self {
            resolver,
            transport,
            settings,
            progress: Mutex::new(Box::new(io::stdout())),
        }
    }

    /// Send verbose progress lines to `out` instead of stdout.
    pub fn with_progress(mut self, out: impl Write + Send + 'static) -> Self {
        self.progress = Mutex::new(Box::new(out));
        self
    }

    /// Knock every step of `sequence`.
    ///
    /// `Ok` means the handoff may go ahead, including for an empty sequence.
    /// Tokens are parsed as they are reached, so a malformed token at index
    /// `i` aborts after exactly `i` packets.
    pub async fn run(&self, sequence: &Sequence) -> Result<KnockReport> {
        let host = sequence.host();
        let mut report = KnockReport {
            host: host.to_string(),
            sent: 0,
            last_address: None,
        };

        for (idx, step) in sequence.steps().enumerate() {
            if idx > 0 && !self.settings.step_delay.is_zero() {
                sleep(self.settings.step_delay).await;
            }

            let result = match step {
                Ok(step) => self.knock(host, step).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(target) => {
                    report.sent += 1;
                    report.last_address = Some(*target.ip());
                }
                Err(e) => {
                    debug!(host, step = idx, sent = report.sent, error = %e, "Knock sequence aborted");
                    return Err(e);
                }
            }
        }

        debug!(host, sent = report.sent, "Knock sequence complete");
        Ok(report)
    }

    /// Resolve `host` and send a single knock.
    pub async fn knock(&self, host: &str, step: KnockStep) -> Result<SocketAddrV4> {
        let address = self.resolver.resolve(host).await?;
        let target = SocketAddrV4::new(address, step.port);

        if self.settings.verbose {
            self.write_progress(step, address);
        }
        debug!(host, %target, protocol = %step.protocol, "Sending knock");

        self.transport.knock(target, step.protocol).await?;
        Ok(target)
    }

    /// Progress output never affects the run, so write errors are dropped.
    fn write_progress(&self, step: KnockStep, address: Ipv4Addr) {
        let mut out = self.progress.lock();
        let _ = writeln!(out, "{}", progress_line(step, address));
        let _ = out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use parking_lot::RwLock;

    use crate::domain::{ConfigRecord, Protocol};
    use crate::error::{Error, TokenFault};

    const TARGET: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 7);

    /// Mock resolver for testing.
    #[derive(Clone, Default)]
    struct MockResolver {
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    impl HostResolver for MockResolver {
        async fn resolve(&self, host: &str) -> Result<Ipv4Addr> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::UnresolvedHost {
                    host: host.to_string(),
                    reason: "mock".to_string(),
                });
            }
            Ok(TARGET)
        }
    }

    /// Ordered log shared by the progress writer and the mock transport.
    #[derive(Clone, Default)]
    struct Journal(Arc<RwLock<String>>);

    impl Journal {
        fn contents(&self) -> String {
            self.0.read().clone()
        }
    }

    impl Write for Journal {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.write().push_str(&String::from_utf8_lossy(buf));
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Mock transport recording every packet.
    #[derive(Clone, Default)]
    struct MockTransport {
        sent: Arc<RwLock<Vec<(SocketAddrV4, Protocol)>>>,
        fail_on_call: Option<usize>,
        calls: Arc<AtomicUsize>,
        journal: Option<Journal>,
    }

    impl MockTransport {
        fn failing_on(call: usize) -> Self {
            Self {
                fail_on_call: Some(call),
                ..Self::default()
            }
        }

        fn packets(&self) -> Vec<(u16, Protocol)> {
            self.sent
                .read()
                .iter()
                .map(|(addr, proto)| (addr.port(), *proto))
                .collect()
        }
    }

    impl KnockTransport for MockTransport {
        async fn knock(&self, target: SocketAddrV4, protocol: Protocol) -> Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(journal) = &self.journal {
                journal
                    .0
                    .write()
                    .push_str(&format!("send {} {}\n", protocol, target.port()));
            }
            if self.fail_on_call == Some(call) {
                return Err(Error::TransportFailure("mock socket".to_string()));
            }
            self.sent.write().push((target, protocol));
            Ok(())
        }
    }

    fn sequence(line: &str) -> Sequence {
        Sequence::from_record(&ConfigRecord::from_line(line), "host").unwrap()
    }

    fn engine(
        resolver: MockResolver,
        transport: MockTransport,
    ) -> KnockEngine<MockResolver, MockTransport> {
        KnockEngine::new(resolver, transport, KnockSettings::default().with_step_delay(Duration::ZERO))
    }

    #[tokio::test]
    async fn test_knocks_in_order() {
        let transport = MockTransport::default();
        let engine = engine(MockResolver::default(), transport.clone());

        let report = engine.run(&sequence("host:t00:22,u00:53,t00:22")).await.unwrap();

        assert_eq!(report.sent, 3);
        assert_eq!(report.last_address, Some(TARGET));
        assert_eq!(
            transport.packets(),
            vec![(22, Protocol::Tcp), (53, Protocol::Udp), (22, Protocol::Tcp)]
        );
        assert!(transport.sent.read().iter().all(|(addr, _)| *addr.ip() == TARGET));
    }

    #[tokio::test]
    async fn test_malformed_token_aborts_after_earlier_knocks() {
        let transport = MockTransport::default();
        let engine = engine(MockResolver::default(), transport.clone());

        let result = engine
            .run(&sequence("host:t00:22,u00:9999999-invalid,t00:80"))
            .await;

        assert!(matches!(
            result,
            Err(Error::MalformedToken {
                fault: TokenFault::OutOfRange,
                ..
            })
        ));
        assert_eq!(transport.packets(), vec![(22, Protocol::Tcp)]);
    }

    #[tokio::test]
    async fn test_bad_first_token_sends_nothing() {
        let transport = MockTransport::default();
        let resolver = MockResolver::default();
        let engine = engine(resolver.clone(), transport.clone());

        assert!(engine.run(&sequence("host:x00:22,t00:80")).await.is_err());
        assert!(transport.packets().is_empty());
    }

    #[tokio::test]
    async fn test_empty_sequence_is_done() {
        let transport = MockTransport::default();
        let resolver = MockResolver::default();
        let engine = engine(resolver.clone(), transport.clone());

        let report = engine.run(&sequence("host:")).await.unwrap();

        assert_eq!(report.sent, 0);
        assert_eq!(report.last_address, None);
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
        assert!(transport.packets().is_empty());
    }

    #[tokio::test]
    async fn test_unresolved_host_aborts() {
        let transport = MockTransport::default();
        let resolver = MockResolver {
            fail: true,
            ..MockResolver::default()
        };
        let engine = engine(resolver, transport.clone());

        let result = engine.run(&sequence("host:t00:22")).await;

        assert!(matches!(result, Err(Error::UnresolvedHost { .. })));
        assert!(transport.packets().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_skips_remaining_steps() {
        let transport = MockTransport::failing_on(1);
        let engine = engine(MockResolver::default(), transport.clone());

        let result = engine.run(&sequence("host:t00:1,u00:2,t00:3")).await;

        assert!(matches!(result, Err(Error::TransportFailure(_))));
        assert_eq!(transport.packets(), vec![(1, Protocol::Tcp)]);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_resolves_for_every_step() {
        let resolver = MockResolver::default();
        let engine = engine(resolver.clone(), MockTransport::default());

        engine.run(&sequence("host:t00:1,u00:2")).await.unwrap();

        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_delay_between_steps_only() {
        let delay = Duration::from_millis(30);
        let engine = KnockEngine::new(
            MockResolver::default(),
            MockTransport::default(),
            KnockSettings::default().with_step_delay(delay),
        );

        let started = Instant::now();
        engine.run(&sequence("host:t00:1,t00:2,t00:3")).await.unwrap();
        assert!(started.elapsed() >= delay * 2);

        let started = Instant::now();
        engine.run(&sequence("host:t00:1")).await.unwrap();
        assert!(started.elapsed() < delay);
    }

    fn verbose_engine(
        transport: MockTransport,
        journal: &Journal,
    ) -> KnockEngine<MockResolver, MockTransport> {
        KnockEngine::new(
            MockResolver::default(),
            transport,
            KnockSettings::default()
                .with_verbose(true)
                .with_step_delay(Duration::ZERO),
        )
        .with_progress(journal.clone())
    }

    #[test]
    fn test_progress_line_format() {
        assert_eq!(progress_line(KnockStep::udp(53), TARGET), "hitting udp 192.0.2.7:53");
    }

    #[tokio::test]
    async fn test_verbose_line_precedes_each_knock() {
        let journal = Journal::default();
        let transport = MockTransport {
            journal: Some(journal.clone()),
            ..MockTransport::default()
        };
        let engine = verbose_engine(transport, &journal);

        engine.run(&sequence("host:t00:22,u00:53")).await.unwrap();

        assert_eq!(
            journal.contents(),
            "hitting tcp 192.0.2.7:22\nsend tcp 22\nhitting udp 192.0.2.7:53\nsend udp 53\n"
        );
    }

    #[tokio::test]
    async fn test_verbose_abort_matches_quiet_abort() {
        let journal = Journal::default();
        let transport = MockTransport {
            journal: Some(journal.clone()),
            ..MockTransport::failing_on(1)
        };
        let engine = verbose_engine(transport.clone(), &journal);

        let result = engine.run(&sequence("host:t00:1,u00:2,t00:3")).await;

        assert!(matches!(result, Err(Error::TransportFailure(_))));
        assert_eq!(transport.packets(), vec![(1, Protocol::Tcp)]);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            journal.contents(),
            "hitting tcp 192.0.2.7:1\nsend tcp 1\nhitting udp 192.0.2.7:2\nsend udp 2\n"
        );
    }

    #[tokio::test]
    async fn test_quiet_mode_writes_no_progress() {
        let journal = Journal::default();
        let transport = MockTransport {
            journal: Some(journal.clone()),
            ..MockTransport::default()
        };
        let engine = engine(MockResolver::default(), transport).with_progress(journal.clone());

        engine.run(&sequence("host:t00:22")).await.unwrap();

        assert_eq!(journal.contents(), "send tcp 22\n");
    }
}
