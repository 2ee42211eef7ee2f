//! Result of a successful run, rendered as the one-line outcome log entry.

use chrono::{DateTime, Utc};
use std::{fmt, net::Ipv4Addr, time::Duration};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// record already points at the current address
    Unchanged { record: String, ip: Ipv4Addr },
    /// record content was overwritten
    Updated {
        record: String,
        from: String,
        to: Ipv4Addr,
    },
    /// run guard held the run back; nothing was queried
    Skipped {
        last_run: DateTime<Utc>,
        min_interval: Duration,
    },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unchanged { record, ip } => {
                write!(f, "{record} unchanged at {ip}, no change needed")
            }
            Self::Updated { record, from, to } => {
                write!(f, "{record} updated from {from} to {to}")
            }
            Self::Skipped {
                last_run,
                min_interval,
            } => write!(
                f,
                "skipped: previous run at {} is less than {}s ago",
                last_run.to_rfc3339(),
                min_interval.as_secs()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updated_line_names_both_addresses() {
        let o = Outcome::Updated {
            record: "home.example.com".into(),
            from: "203.0.113.5".into(),
            to: Ipv4Addr::new(203, 0, 113, 9),
        };
        assert_eq!(
            o.to_string(),
            "home.example.com updated from 203.0.113.5 to 203.0.113.9"
        );
    }

    #[test]
    fn unchanged_line() {
        let o = Outcome::Unchanged {
            record: "home.example.com".into(),
            ip: Ipv4Addr::new(203, 0, 113, 9),
        };
        assert!(o.to_string().contains("unchanged"));
    }
}
