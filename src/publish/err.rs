use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum PublishErr {
    /// Every attempt failed with a transient error; the batch may be published later.
    Exhausted { attempts: u32, last: String },
    /// The queue refused the batch; sending it again would fail the same way.
    Rejected(String),
}

impl PublishErr {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, PublishErr::Exhausted { .. })
    }
}

impl fmt::Display for PublishErr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use PublishErr::*;
        match self {
            Exhausted { attempts, last } => write!(
                f,
                "could not publish the batch after {} attempts; last error: {}",
                attempts, last
            ),
            Rejected(reason) => write!(f, "the queue rejected the batch: {}", reason),
        }
    }
}

impl std::error::Error for PublishErr {}
