/// Result of a bounded retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    Succeeded { attempts: u32 },
    TimedOut { attempts: u32 },
}

impl RetryOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, RetryOutcome::Succeeded { .. })
    }

    pub fn attempts(&self) -> u32 {
        match *self {
            RetryOutcome::Succeeded { attempts } | RetryOutcome::TimedOut { attempts } => attempts,
        }
    }
}

/// Calls `attempt` up to `max_attempts` times until it returns `true`.
///
/// Every failed attempt, the last one included, is followed by
/// `wait(ctx, interval_ms)`. `attempt` receives the 1-based attempt number.
pub fn retry_until<C: ?Sized>(
    ctx: &mut C,
    max_attempts: u32,
    interval_ms: u32,
    mut attempt: impl FnMut(&mut C, u32) -> bool,
    mut wait: impl FnMut(&mut C, u32),
) -> RetryOutcome {
    for n in 1..=max_attempts {
        if attempt(ctx, n) {
            return RetryOutcome::Succeeded { attempts: n };
        }
        wait(ctx, interval_ms);
    }

    RetryOutcome::TimedOut { attempts: max_attempts }
}
