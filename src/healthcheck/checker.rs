use crate::error::{Error, Result};
use crate::retry::{Retrier, RetryPolicy};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// The two hard dependencies an Airflow role can wait on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    Database,
    Broker,
}

impl DependencyKind {
    /// Progress line logged before every probe attempt.
    pub fn progress_message(&self) -> String {
        format!("Checking {} connection...", self)
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DependencyKind::Database => write!(f, "Postgresql"),
            DependencyKind::Broker => write!(f, "Rabbitmq"),
        }
    }
}

/// Readiness probe for one dependency.
///
/// `Ok(true)` means ready. `Ok(false)` and `Err` both count as a failed
/// attempt; the caller decides whether to retry.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    fn kind(&self) -> DependencyKind;

    async fn check(&self) -> Result<bool>;

    /// Upper bound for a single attempt.
    fn timeout(&self) -> Duration;
}

/// A probe together with its retry budget.
#[derive(Clone)]
pub struct DependencyCheck {
    pub probe: Arc<dyn ReadinessProbe>,
    pub policy: RetryPolicy,
    pub message: Option<String>,
}

impl DependencyCheck {
    pub fn new(probe: Arc<dyn ReadinessProbe>, policy: RetryPolicy) -> Self {
        let message = Some(probe.kind().progress_message());
        Self {
            probe,
            policy,
            message,
        }
    }

    pub fn kind(&self) -> DependencyKind {
        self.probe.kind()
    }
}

impl fmt::Debug for DependencyCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyCheck")
            .field("kind", &self.kind())
            .field("policy", &self.policy)
            .field("message", &self.message)
            .finish()
    }
}

/// What to do when a dependency never becomes ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadinessPolicy {
    /// Return the exhaustion error.
    #[default]
    FailFast,
    /// Return `Ok(false)` and let the caller carry on.
    FailSoft,
}

/// Runs dependency checks one after another through the retrier.
#[derive(Debug, Clone, Default)]
pub struct ReadinessProber {
    cancel: CancellationToken,
}

impl ReadinessProber {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    /// Retry one check until it passes or its budget is spent.
    pub async fn check_one(&self, check: &DependencyCheck) -> Result<()> {
        let label = check.kind().to_string();
        let retrier = Retrier::new(check.policy, self.cancel.clone());
        let probe = Arc::clone(&check.probe);

        retrier
            .run(&label, check.message.as_deref(), || {
                let probe = Arc::clone(&probe);
                async move { attempt(probe.as_ref()).await }
            })
            .await?;

        tracing::debug!("{} connection is: OK", label);
        Ok(())
    }

    /// Check every dependency in order. Each check runs to its own
    /// exhaustion even if an earlier one failed; cancellation stops at once.
    pub async fn check_all(&self, checks: &[DependencyCheck], policy: ReadinessPolicy) -> Result<bool> {
        let mut failures = Vec::new();

        for check in checks {
            match self.check_one(check).await {
                Ok(()) => {}
                Err(e @ Error::Cancelled(_)) => return Err(e),
                Err(e) => {
                    tracing::warn!("{}", e);
                    failures.push(e);
                }
            }
        }

        if failures.is_empty() {
            return Ok(true);
        }

        match policy {
            ReadinessPolicy::FailSoft => Ok(false),
            ReadinessPolicy::FailFast => {
                if failures.len() == 1 {
                    Err(failures.remove(0))
                } else {
                    Err(Error::Multiple(failures))
                }
            }
        }
    }
}

async fn attempt(probe: &dyn ReadinessProbe) -> std::result::Result<(), String> {
    let timeout = probe.timeout();
    match tokio::time::timeout(timeout, probe.check()).await {
        Ok(Ok(true)) => Ok(()),
        Ok(Ok(false)) => Err(format!("{} is not ready", probe.kind())),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!(
            "{} check timed out after {}s",
            probe.kind(),
            timeout.as_secs()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Scripted {
        kind: DependencyKind,
        succeed_on: Option<u32>,
        calls: AtomicU32,
    }

    impl Scripted {
        fn new(kind: DependencyKind, succeed_on: Option<u32>) -> Arc<Self> {
            Arc::new(Self {
                kind,
                succeed_on,
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl ReadinessProbe for Scripted {
        fn kind(&self) -> DependencyKind {
            self.kind
        }

        async fn check(&self) -> Result<bool> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            match self.succeed_on {
                Some(target) if n >= target => Ok(true),
                _ => Err(Error::Probe {
                    check: self.kind.to_string(),
                    message: format!("connection refused ({})", n),
                }),
            }
        }

        fn timeout(&self) -> Duration {
            Duration::from_secs(1)
        }
    }

    fn policy(retries: u32) -> RetryPolicy {
        RetryPolicy::new(retries, Duration::ZERO)
    }

    #[test]
    fn kinds_display_like_service_names() {
        assert_eq!(DependencyKind::Database.to_string(), "Postgresql");
        assert_eq!(
            DependencyKind::Broker.progress_message(),
            "Checking Rabbitmq connection..."
        );
    }

    #[tokio::test]
    async fn all_ready_returns_true() {
        let db = Scripted::new(DependencyKind::Database, Some(2));
        let mq = Scripted::new(DependencyKind::Broker, Some(1));
        let checks = vec![
            DependencyCheck::new(db.clone(), policy(3)),
            DependencyCheck::new(mq.clone(), policy(3)),
        ];

        let ready = ReadinessProber::default()
            .check_all(&checks, ReadinessPolicy::FailFast)
            .await
            .unwrap();

        assert!(ready);
        assert_eq!(db.calls.load(Ordering::SeqCst), 2);
        assert_eq!(mq.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_check_does_not_short_circuit() {
        let db = Scripted::new(DependencyKind::Database, None);
        let mq = Scripted::new(DependencyKind::Broker, Some(1));
        let checks = vec![
            DependencyCheck::new(db.clone(), policy(2)),
            DependencyCheck::new(mq.clone(), policy(2)),
        ];

        let ready = ReadinessProber::default()
            .check_all(&checks, ReadinessPolicy::FailSoft)
            .await
            .unwrap();

        assert!(!ready);
        assert_eq!(db.calls.load(Ordering::SeqCst), 3);
        assert_eq!(mq.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fail_fast_reports_every_exhausted_check() {
        let checks = vec![
            DependencyCheck::new(Scripted::new(DependencyKind::Database, None), policy(0)),
            DependencyCheck::new(Scripted::new(DependencyKind::Broker, None), policy(0)),
        ];

        let err = ReadinessProber::default()
            .check_all(&checks, ReadinessPolicy::FailFast)
            .await
            .unwrap_err();

        match err {
            Error::Multiple(errors) => {
                assert_eq!(errors.len(), 2);
                assert!(matches!(&errors[0], Error::RetryExhausted { check, .. } if check == "Postgresql"));
                assert!(matches!(&errors[1], Error::RetryExhausted { check, .. } if check == "Rabbitmq"));
            }
            other => panic!("expected Multiple, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn single_failure_is_returned_unwrapped() {
        let checks = vec![DependencyCheck::new(
            Scripted::new(DependencyKind::Database, None),
            policy(1),
        )];

        let err = ReadinessProber::default()
            .check_all(&checks, ReadinessPolicy::FailFast)
            .await
            .unwrap_err();

        assert!(
            matches!(err, Error::RetryExhausted { ref message, .. } if message.contains("connection refused (2)"))
        );
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_probing() {
        let token = CancellationToken::new();
        token.cancel();
        let db = Scripted::new(DependencyKind::Database, Some(1));
        let checks = vec![DependencyCheck::new(db.clone(), policy(3))];

        let err = ReadinessProber::new(token)
            .check_all(&checks, ReadinessPolicy::FailSoft)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled(_)));
        assert_eq!(db.calls.load(Ordering::SeqCst), 0);
    }
}
