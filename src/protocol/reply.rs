//! Reply classification and retry policy.

use std::time::Duration;

use super::settings::Settings;

/// Prefix that marks a passing reply
pub const PASS_PREFIX: &str = "OK";

/// Raw classification of a reply line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Line starts with `OK`
    Pass,
    /// Anything else
    NotOk,
}

/// Classify a (trimmed) reply line
pub fn classify(line: &str) -> Reply {
    if line.starts_with(PASS_PREFIX) {
        Reply::Pass
    } else {
        Reply::NotOk
    }
}

/// What the engine does with a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Definitive pass
    Pass,
    /// Retransmit the last command after `delay`
    Retry {
        /// Retry count after this attempt is scheduled
        attempt: u64,
        /// Delay before the retransmission
        delay: Duration,
    },
    /// Confirmed failure accepted by `failure-ok`
    AcceptedFailure,
    /// Confirmed failure
    Failure,
}

impl Verdict {
    /// Whether the reply was definitively classified
    pub fn is_definitive(&self) -> bool {
        !matches!(self, Self::Retry { .. })
    }
}

/// Decide the verdict for `reply` given how many retries the current
/// command already had.
pub fn judge(reply: Reply, retry_count: u64, settings: &Settings) -> Verdict {
    match reply {
        Reply::Pass => Verdict::Pass,
        Reply::NotOk => {
            if settings.retry_enabled() && retry_count < settings.retry_max_intervals() {
                Verdict::Retry {
                    attempt: retry_count + 1,
                    delay: settings.retry_interval(),
                }
            } else if settings.failure_ok() {
                Verdict::AcceptedFailure
            } else {
                Verdict::Failure
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::settings::SettingChange;
    use proptest::prelude::*;

    fn settings(directives: &[&str]) -> Settings {
        let mut settings = Settings::new();
        for d in directives {
            settings.apply(d.parse::<SettingChange>().unwrap());
        }
        settings
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("OK"), Reply::Pass);
        assert_eq!(classify("OK button pressed"), Reply::Pass);
        assert_eq!(classify("ERROR: no such element"), Reply::NotOk);
        assert_eq!(classify(" OK"), Reply::NotOk);
        assert_eq!(classify("ok"), Reply::NotOk);
        assert_eq!(classify(""), Reply::NotOk);
    }

    #[test]
    fn test_failure_without_retry() {
        let verdict = judge(Reply::NotOk, 0, &Settings::new());
        assert_eq!(verdict, Verdict::Failure);
    }

    #[test]
    fn test_failure_accepted() {
        let verdict = judge(Reply::NotOk, 0, &settings(&["failure-ok true"]));
        assert_eq!(verdict, Verdict::AcceptedFailure);
        assert!(verdict.is_definitive());
    }

    #[test]
    fn test_retry_until_exhausted() {
        let s = settings(&["retry 1", "retry-max-intervals 2", "retry-interval 50"]);
        assert_eq!(
            judge(Reply::NotOk, 0, &s),
            Verdict::Retry {
                attempt: 1,
                delay: Duration::from_millis(50)
            }
        );
        assert_eq!(
            judge(Reply::NotOk, 1, &s),
            Verdict::Retry {
                attempt: 2,
                delay: Duration::from_millis(50)
            }
        );
        assert_eq!(judge(Reply::NotOk, 2, &s), Verdict::Failure);
    }

    #[test]
    fn test_pass_ignores_retry_state() {
        let s = settings(&["retry 1"]);
        assert_eq!(judge(Reply::Pass, 5, &s), Verdict::Pass);
    }

    proptest! {
        #[test]
        fn prop_pass_iff_ok_prefix(s in ".*") {
            prop_assert_eq!(classify(&s) == Reply::Pass, s.starts_with("OK"));
        }

        #[test]
        fn prop_retry_never_exceeds_max(max in 0u64..50, count in 0u64..100) {
            let cap = format!("retry-max-intervals {max}");
            let s = settings(&["retry 1", cap.as_str()]);
            match judge(Reply::NotOk, count, &s) {
                Verdict::Retry { attempt, .. } => {
                    prop_assert!(attempt <= max);
                    prop_assert_eq!(attempt, count + 1);
                },
                _ => prop_assert!(count >= max),
            }
        }
    }
}
